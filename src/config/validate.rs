//! Up-front checks so a bad setting fails before any training starts.

use super::{ConfigError, PipelineConfig};

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(field, "must be at least 1"));
    }
    Ok(())
}

fn positive_rate(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(field, format!("must be a positive number, got {value}")));
    }
    Ok(())
}

fn probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(field, format!("must lie in [0, 1), got {value}")));
    }
    Ok(())
}

impl PipelineConfig {
    /// Reject settings no stage could run with.
    ///
    /// The held-out set is exactly `2 * test_per_class` rows, so explanation
    /// sizes are checked against that here rather than after training.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let gan = &self.gan;
        positive("gan.latent_dim", gan.latent_dim)?;
        positive("gan.epochs", gan.epochs)?;
        positive("gan.batch_size", gan.batch_size)?;
        positive("gan.generator_hidden", gan.generator_hidden.0.min(gan.generator_hidden.1))?;
        positive(
            "gan.discriminator_hidden",
            gan.discriminator_hidden.0.min(gan.discriminator_hidden.1),
        )?;
        positive_rate("gan.learning_rate", gan.learning_rate)?;

        positive("split.test_per_class", self.split.test_per_class)?;

        let classifier = &self.classifier;
        positive("classifier.epochs", classifier.epochs)?;
        positive("classifier.batch_size", classifier.batch_size)?;
        probability(
            "classifier.validation_fraction",
            f64::from(classifier.validation_fraction),
        )?;
        positive_rate("classifier.learning_rate", classifier.learning_rate)?;
        positive("classifier.head_size", classifier.head_size)?;
        positive("classifier.num_heads", classifier.num_heads)?;
        positive("classifier.ff_dim", classifier.ff_dim)?;
        positive("classifier.num_blocks", classifier.num_blocks)?;
        positive("classifier.mlp_units", classifier.mlp_units.0.min(classifier.mlp_units.1))?;
        probability("classifier.dropout", classifier.dropout)?;
        probability("classifier.mlp_dropout", classifier.mlp_dropout)?;

        let explain = &self.explain;
        let held_out = self.split.test_per_class.saturating_mul(2);
        positive("explain.background_pool", explain.background_pool)?;
        if explain.background_pool > held_out {
            return Err(invalid(
                "explain.background_pool",
                format!(
                    "{} exceeds the {held_out} held-out rows",
                    explain.background_pool
                ),
            ));
        }
        positive("explain.background_size", explain.background_size)?;
        if explain.background_size > explain.background_pool {
            return Err(invalid(
                "explain.background_size",
                format!(
                    "{} exceeds the background pool of {}",
                    explain.background_size, explain.background_pool
                ),
            ));
        }
        positive("explain.coalition_samples", explain.coalition_samples)?;
        positive("explain.explain_count", explain.explain_count)?;
        if explain.explain_count > held_out {
            return Err(invalid(
                "explain.explain_count",
                format!("{} exceeds the {held_out} held-out rows", explain.explain_count),
            ));
        }
        Ok(())
    }
}
