//! Seeded stratified train/test partitioning with a fixed per-class test size.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("Feature rows ({rows}) and labels ({labels}) differ in length")]
    LengthMismatch { rows: usize, labels: usize },
    #[error("Stratified split needs two classes, found {0}")]
    ClassCount(usize),
    #[error("Class {label} has {available} rows; cannot hold out {requested} and keep training rows")]
    ClassTooSmall {
        label: u8,
        available: usize,
        requested: usize,
    },
}

/// Row indices of a partition; every index appears in exactly one side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Materialised partition of a labelled matrix.
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train_features: Array2<f32>,
    pub train_labels: Vec<u8>,
    pub test_features: Array2<f32>,
    pub test_labels: Vec<u8>,
    pub indices: SplitIndices,
}

/// Hold out exactly `test_per_class` rows of each class.
pub fn stratified_indices(
    labels: &[u8],
    test_per_class: usize,
    rng: &mut StdRng,
) -> Result<SplitIndices, SplitError> {
    let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }
    if by_class.len() != 2 {
        return Err(SplitError::ClassCount(by_class.len()));
    }
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::with_capacity(test_per_class * 2);
    for (label, mut members) in by_class {
        if members.len() <= test_per_class {
            return Err(SplitError::ClassTooSmall {
                label,
                available: members.len(),
                requested: test_per_class,
            });
        }
        members.shuffle(rng);
        let rest = members.split_off(test_per_class);
        test.extend(members);
        train.extend(rest);
    }
    train.shuffle(rng);
    test.shuffle(rng);
    Ok(SplitIndices { train, test })
}

pub fn split_dataset(
    features: ArrayView2<'_, f32>,
    labels: &[u8],
    test_per_class: usize,
    rng: &mut StdRng,
) -> Result<DatasetSplit, SplitError> {
    if features.nrows() != labels.len() {
        return Err(SplitError::LengthMismatch {
            rows: features.nrows(),
            labels: labels.len(),
        });
    }
    let indices = stratified_indices(labels, test_per_class, rng)?;
    Ok(DatasetSplit {
        train_features: features.select(Axis(0), &indices.train),
        train_labels: indices.train.iter().map(|&i| labels[i]).collect(),
        test_features: features.select(Axis(0), &indices.test),
        test_labels: indices.test.iter().map(|&i| labels[i]).collect(),
        indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    fn balanced_labels(per_class: usize) -> Vec<u8> {
        (0..per_class * 2).map(|i| (i % 2) as u8).collect()
    }

    #[test]
    fn holds_out_exact_per_class_counts() {
        let labels = balanced_labels(1000);
        let mut rng = StdRng::seed_from_u64(42);
        let split = stratified_indices(&labels, 300, &mut rng).unwrap();
        let test_pos = split.test.iter().filter(|&&i| labels[i] == 1).count();
        let test_neg = split.test.iter().filter(|&&i| labels[i] == 0).count();
        assert_eq!((test_neg, test_pos), (300, 300));
        assert_eq!(split.train.len(), 1400);
    }

    #[test]
    fn partitions_are_disjoint_and_complete() {
        let labels = balanced_labels(50);
        let mut rng = StdRng::seed_from_u64(7);
        let split = stratified_indices(&labels, 10, &mut rng).unwrap();
        let train: BTreeSet<_> = split.train.iter().copied().collect();
        let test: BTreeSet<_> = split.test.iter().copied().collect();
        assert!(train.is_disjoint(&test));
        let union: BTreeSet<_> = train.union(&test).copied().collect();
        assert_eq!(union, (0..labels.len()).collect::<BTreeSet<_>>());
    }

    #[test]
    fn same_seed_same_partition() {
        let labels = balanced_labels(40);
        let a = stratified_indices(&labels, 5, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = stratified_indices(&labels, 5, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_class_smaller_than_holdout() {
        let labels = vec![0, 0, 0, 1, 1];
        let mut rng = StdRng::seed_from_u64(0);
        let err = stratified_indices(&labels, 2, &mut rng).unwrap_err();
        assert!(matches!(err, SplitError::ClassTooSmall { label: 1, .. }));
    }

    #[test]
    fn materialised_rows_follow_indices() {
        let labels = balanced_labels(6);
        let features = Array2::from_shape_fn((12, 2), |(r, c)| (r * 10 + c) as f32);
        let mut rng = StdRng::seed_from_u64(3);
        let split = split_dataset(features.view(), &labels, 2, &mut rng).unwrap();
        for (pos, &idx) in split.indices.test.iter().enumerate() {
            assert_eq!(split.test_features.row(pos), features.row(idx));
            assert_eq!(split.test_labels[pos], labels[idx]);
        }
        assert_eq!(split.train_features.nrows(), 8);
    }
}
