//! Tabular data preparation: ingestion, scaling, splitting and the balanced set.

pub mod balanced;
pub mod ingest;
pub mod scale;
pub mod split;

pub use balanced::{BalancedDataset, PersistError, RowOrigin};
pub use ingest::{EncodedTable, IngestError, IngestOptions, read_csv};
pub use scale::{MinMaxScaler, ScaleError};
pub use split::{DatasetSplit, SplitError, SplitIndices, split_dataset, stratified_indices};

use std::collections::BTreeMap;

use ndarray::{Array2, Axis};

/// Normalized features in [0,1] plus binary labels.
#[derive(Debug, Clone)]
pub struct FeatureSpace {
    pub feature_names: Vec<String>,
    pub features: Array2<f32>,
    pub labels: Vec<u8>,
    /// Category list of every label-encoded column; the code is the index.
    pub categories: BTreeMap<String, Vec<String>>,
}

impl FeatureSpace {
    /// Min-max scale an encoded table; the fitted scaler is returned alongside.
    pub fn from_table(table: EncodedTable) -> Result<(Self, MinMaxScaler), ScaleError> {
        let scaler = MinMaxScaler::fit(table.features.view())?;
        let features = scaler.transform(table.features.view())?;
        Ok((
            Self {
                feature_names: table.feature_names,
                features,
                labels: table.labels,
                categories: table.categories,
            },
            scaler,
        ))
    }

    pub fn feature_count(&self) -> usize {
        self.features.ncols()
    }

    pub fn class_counts(&self) -> (usize, usize) {
        class_counts(&self.labels)
    }

    /// The less frequent label; ties resolve to 1.
    pub fn minority_label(&self) -> u8 {
        let (negatives, positives) = self.class_counts();
        if negatives < positives { 0 } else { 1 }
    }

    /// Rows carrying the minority label.
    pub fn minority(&self) -> Array2<f32> {
        let label = self.minority_label();
        let indices: Vec<usize> = self
            .labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == label)
            .map(|(idx, _)| idx)
            .collect();
        self.features.select(Axis(0), &indices)
    }
}

/// `(label 0 count, label 1 count)`; other values are ignored.
pub fn class_counts(labels: &[u8]) -> (usize, usize) {
    labels.iter().fold((0, 0), |(neg, pos), &label| match label {
        0 => (neg + 1, pos),
        1 => (neg, pos + 1),
        _ => (neg, pos),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn minority_rows_follow_the_rarer_label() {
        let space = FeatureSpace {
            feature_names: vec!["a".into(), "b".into()],
            features: array![[0.0_f32, 0.1], [0.2, 0.3], [0.4, 0.5], [0.6, 0.7]],
            labels: vec![0, 1, 0, 0],
            categories: BTreeMap::new(),
        };
        assert_eq!(space.minority_label(), 1);
        assert_eq!(space.minority(), array![[0.2_f32, 0.3]]);
    }

    #[test]
    fn from_table_scales_into_unit_range() {
        let table = EncodedTable {
            feature_names: vec!["Age".into()],
            features: array![[20.0_f32], [40.0], [30.0]],
            labels: vec![0, 1, 0],
            categories: Default::default(),
        };
        let (space, scaler) = FeatureSpace::from_table(table).unwrap();
        assert_eq!(space.features.column(0).to_vec(), vec![0.0, 1.0, 0.5]);
        assert_eq!(scaler.min, vec![20.0]);
    }
}
