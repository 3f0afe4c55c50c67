//! Merges generated minority rows into the original data.

use ndarray::{Array2, ArrayView2, Axis, concatenate};
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::info;

use crate::data::{BalancedDataset, RowOrigin, class_counts};
use crate::ml::gan::{GanError, TrainedGenerator};

#[derive(Debug, Error)]
pub enum AugmentError {
    #[error("Feature rows ({rows}) and labels ({labels}) differ in length")]
    LengthMismatch { rows: usize, labels: usize },
    #[error("Generator emits {generated} features but the data has {expected}")]
    DimensionMismatch { expected: usize, generated: usize },
    #[error("Feature names ({names}) do not match feature columns ({columns})")]
    NameMismatch { names: usize, columns: usize },
    #[error("Synthetic generation failed: {0}")]
    Generation(#[from] GanError),
}

/// Anything that can synthesise feature rows.
pub trait SyntheticSource {
    fn feature_count(&self) -> usize;
    fn generate(&self, count: usize, rng: &mut StdRng) -> Result<Array2<f32>, GanError>;
}

impl SyntheticSource for TrainedGenerator {
    fn feature_count(&self) -> usize {
        TrainedGenerator::feature_count(self)
    }

    fn generate(&self, count: usize, rng: &mut StdRng) -> Result<Array2<f32>, GanError> {
        self.sample(count, rng)
    }
}

/// Rows needed to lift the rarer class to the size of the larger one.
pub fn synthetic_count_for_parity(labels: &[u8]) -> usize {
    let (negatives, positives) = class_counts(labels);
    negatives.abs_diff(positives)
}

/// Append `synthetic_count` generated rows labelled `synthetic_label`.
///
/// Balance is the caller's choice of `synthetic_count`; nothing here checks it.
pub fn assemble(
    feature_names: &[String],
    features: ArrayView2<'_, f32>,
    labels: &[u8],
    source: &impl SyntheticSource,
    synthetic_count: usize,
    synthetic_label: u8,
    rng: &mut StdRng,
) -> Result<BalancedDataset, AugmentError> {
    if features.nrows() != labels.len() {
        return Err(AugmentError::LengthMismatch {
            rows: features.nrows(),
            labels: labels.len(),
        });
    }
    if feature_names.len() != features.ncols() {
        return Err(AugmentError::NameMismatch {
            names: feature_names.len(),
            columns: features.ncols(),
        });
    }
    if source.feature_count() != features.ncols() {
        return Err(AugmentError::DimensionMismatch {
            expected: features.ncols(),
            generated: source.feature_count(),
        });
    }

    let synthetic = source.generate(synthetic_count, rng)?;
    if synthetic.ncols() != features.ncols() {
        return Err(AugmentError::DimensionMismatch {
            expected: features.ncols(),
            generated: synthetic.ncols(),
        });
    }
    let merged = concatenate(Axis(0), &[features.view(), synthetic.view()])
        .map_err(|_| AugmentError::DimensionMismatch {
            expected: features.ncols(),
            generated: synthetic.ncols(),
        })?;

    let mut merged_labels = labels.to_vec();
    merged_labels.extend(std::iter::repeat_n(synthetic_label, synthetic.nrows()));
    let origins = (0..features.nrows())
        .map(RowOrigin::Original)
        .chain((0..synthetic.nrows()).map(RowOrigin::Synthetic))
        .collect();

    let dataset = BalancedDataset {
        feature_names: feature_names.to_vec(),
        features: merged,
        labels: merged_labels,
        origins,
    };
    let (negatives, positives) = dataset.class_counts();
    info!(
        "Balanced dataset: {} rows ({} synthetic), class counts 0={} 1={}",
        dataset.len(),
        synthetic.nrows(),
        negatives,
        positives
    );
    Ok(dataset)
}
