//! Adversarial generator for synthetic minority-class rows.
//!
//! A generator and a discriminator are trained in alternation for a fixed
//! number of epochs. Each network owns its own Adam state; during the
//! generator update the discriminator is only read.

mod model;
mod train;

pub use model::{Discriminator, Generator, GeneratorOutput};
pub use train::{
    GanEpochLosses, GanOptions, GanTraining, TrainedGenerator, sample_latent, train_gan,
};

use thiserror::Error;

/// Errors raised while configuring or running GAN training.
#[derive(Debug, Error)]
pub enum GanError {
    /// The minority subset has no rows to learn from.
    #[error("Minority subset is empty; nothing to learn from")]
    EmptyMinority,
    /// The minority rows have zero columns.
    #[error("Minority rows have no features")]
    NoFeatures,
    #[error("GAN batch size must be at least 1")]
    ZeroBatchSize,
    #[error("Latent dimension must be at least 1")]
    ZeroLatentDim,
    /// A loss became NaN or infinite.
    #[error("GAN training diverged at epoch {epoch}")]
    Diverged { epoch: usize },
    #[error("GAN tensor error: {0}")]
    Tensor(String),
}
