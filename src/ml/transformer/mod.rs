//! Transformer encoder classifier over per-feature sequences.
//!
//! Every flat feature row of width `F` is treated as a length-`F`
//! sequence with a single channel. Training runs on the autodiff backend;
//! the returned [`TransformerClassifier`] is frozen on the inference
//! backend, where dropout is inactive.

mod classifier;
mod listener;
mod model;
mod train;

use thiserror::Error;

pub use classifier::TransformerClassifier;
pub use listener::{EpochListener, TrainAucListener};
pub use model::{AttritionTransformer, EncoderBlock, FEATURE_CHANNELS, SelfAttention, TransformerOptions};
pub use train::{ClassifierTrainOptions, EpochMetrics, TrainingHistory, train_classifier};

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Training set is empty")]
    EmptyTrainingSet,
    #[error("Training set has no feature columns")]
    NoFeatures,
    #[error("Feature rows ({rows}) and labels ({labels}) differ in length")]
    LengthMismatch { rows: usize, labels: usize },
    #[error("Expected {expected} features per row, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Validation fraction must be in [0, 1), got {0}")]
    InvalidValidationFraction(f32),
    #[error("Validation split leaves no training rows")]
    NoTrainingRows,
    #[error("Batch size must be positive")]
    ZeroBatchSize,
    #[error("Invalid transformer architecture: {0}")]
    InvalidArchitecture(String),
    #[error("Labels must be 0 or 1, found {0}")]
    NonBinaryLabel(u8),
    #[error("Training loss became non-finite at epoch {epoch}")]
    Diverged { epoch: usize },
    #[error("Tensor conversion failed: {0}")]
    Tensor(String),
}
