use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults::*;
use crate::data::IngestOptions;
use crate::ml::gan::{GanOptions, GeneratorOutput};
use crate::ml::transformer::{ClassifierTrainOptions, TransformerOptions};

/// Complete pipeline configuration as stored in TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Seed every component RNG is derived from.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Run output directory; falls back to the application runs folder.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub gan: GanSettings,
    #[serde(default)]
    pub augment: AugmentSettings,
    #[serde(default)]
    pub split: SplitSettings,
    #[serde(default)]
    pub classifier: ClassifierSettings,
    #[serde(default)]
    pub explain: ExplainSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            output_dir: None,
            data: DataSettings::default(),
            gan: GanSettings::default(),
            augment: AugmentSettings::default(),
            split: SplitSettings::default(),
            classifier: ClassifierSettings::default(),
            explain: ExplainSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// Input CSV; required before the pipeline can run.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_label_column")]
    pub label_column: String,
    #[serde(default = "default_positive_label")]
    pub positive_label: String,
    #[serde(default = "default_negative_label")]
    pub negative_label: String,
    #[serde(default = "default_drop_columns")]
    pub drop_columns: Vec<String>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            path: None,
            label_column: default_label_column(),
            positive_label: default_positive_label(),
            negative_label: default_negative_label(),
            drop_columns: default_drop_columns(),
        }
    }
}

impl DataSettings {
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            label_column: self.label_column.clone(),
            positive_label: self.positive_label.clone(),
            negative_label: self.negative_label.clone(),
            drop_columns: self.drop_columns.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GanSettings {
    #[serde(default = "default_latent_dim")]
    pub latent_dim: usize,
    #[serde(default = "default_gan_epochs")]
    pub epochs: usize,
    #[serde(default = "default_gan_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_gan_log_every")]
    pub log_every: usize,
    #[serde(default = "default_gan_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_beta1")]
    pub beta1: f32,
    #[serde(default = "default_generator_hidden")]
    pub generator_hidden: (usize, usize),
    #[serde(default = "default_discriminator_hidden")]
    pub discriminator_hidden: (usize, usize),
    #[serde(default = "default_generator_output")]
    pub output: GeneratorOutput,
}

impl Default for GanSettings {
    fn default() -> Self {
        Self {
            latent_dim: default_latent_dim(),
            epochs: default_gan_epochs(),
            batch_size: default_gan_batch_size(),
            log_every: default_gan_log_every(),
            learning_rate: default_gan_learning_rate(),
            beta1: default_beta1(),
            generator_hidden: default_generator_hidden(),
            discriminator_hidden: default_discriminator_hidden(),
            output: default_generator_output(),
        }
    }
}

impl GanSettings {
    pub fn options(&self) -> GanOptions {
        GanOptions {
            latent_dim: self.latent_dim,
            epochs: self.epochs,
            batch_size: self.batch_size,
            log_every: self.log_every,
            learning_rate: self.learning_rate,
            beta1: self.beta1,
            generator_hidden: self.generator_hidden,
            discriminator_hidden: self.discriminator_hidden,
            output: self.output,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentSettings {
    /// Synthetic rows to add; `None` brings the minority up to parity.
    #[serde(default)]
    pub synthetic_rows: Option<usize>,
    /// File name of the persisted balanced set inside the output directory.
    #[serde(default = "default_balanced_file")]
    pub output_file: String,
}

impl Default for AugmentSettings {
    fn default() -> Self {
        Self {
            synthetic_rows: None,
            output_file: default_balanced_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitSettings {
    #[serde(default = "default_test_per_class")]
    pub test_per_class: usize,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            test_per_class: default_test_per_class(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSettings {
    #[serde(default = "default_classifier_epochs")]
    pub epochs: usize,
    #[serde(default = "default_classifier_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_validation_fraction")]
    pub validation_fraction: f32,
    #[serde(default = "default_classifier_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_head_size")]
    pub head_size: usize,
    #[serde(default = "default_num_heads")]
    pub num_heads: usize,
    #[serde(default = "default_ff_dim")]
    pub ff_dim: usize,
    #[serde(default = "default_num_blocks")]
    pub num_blocks: usize,
    #[serde(default = "default_mlp_units")]
    pub mlp_units: (usize, usize),
    #[serde(default = "default_dropout")]
    pub dropout: f64,
    #[serde(default = "default_mlp_dropout")]
    pub mlp_dropout: f64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            epochs: default_classifier_epochs(),
            batch_size: default_classifier_batch_size(),
            validation_fraction: default_validation_fraction(),
            learning_rate: default_classifier_learning_rate(),
            head_size: default_head_size(),
            num_heads: default_num_heads(),
            ff_dim: default_ff_dim(),
            num_blocks: default_num_blocks(),
            mlp_units: default_mlp_units(),
            dropout: default_dropout(),
            mlp_dropout: default_mlp_dropout(),
        }
    }
}

impl ClassifierSettings {
    pub fn options(&self) -> ClassifierTrainOptions {
        ClassifierTrainOptions {
            epochs: self.epochs,
            batch_size: self.batch_size,
            validation_fraction: self.validation_fraction,
            learning_rate: self.learning_rate,
            model: TransformerOptions {
                head_size: self.head_size,
                num_heads: self.num_heads,
                ff_dim: self.ff_dim,
                num_blocks: self.num_blocks,
                mlp_units: self.mlp_units,
                dropout: self.dropout,
                mlp_dropout: self.mlp_dropout,
                ..TransformerOptions::default()
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainSettings {
    /// Held-out rows the background is summarised from.
    #[serde(default = "default_background_pool")]
    pub background_pool: usize,
    /// k-means centroids kept as the background.
    #[serde(default = "default_background_size")]
    pub background_size: usize,
    #[serde(default = "default_coalition_samples")]
    pub coalition_samples: usize,
    /// Leading held-out rows to explain.
    #[serde(default = "default_explain_count")]
    pub explain_count: usize,
    #[serde(default = "default_report_file")]
    pub report_file: String,
}

impl Default for ExplainSettings {
    fn default() -> Self {
        Self {
            background_pool: default_background_pool(),
            background_size: default_background_size(),
            coalition_samples: default_coalition_samples(),
            explain_count: default_explain_count(),
            report_file: default_report_file(),
        }
    }
}
