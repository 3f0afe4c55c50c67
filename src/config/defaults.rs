use crate::ml::gan::GeneratorOutput;

pub(super) fn default_seed() -> u64 {
    42
}

pub(super) fn default_label_column() -> String {
    "Attrition".to_string()
}

pub(super) fn default_positive_label() -> String {
    "Yes".to_string()
}

pub(super) fn default_negative_label() -> String {
    "No".to_string()
}

pub(super) fn default_drop_columns() -> Vec<String> {
    crate::data::ingest::DEFAULT_DROP_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .collect()
}

pub(super) fn default_latent_dim() -> usize {
    16
}

pub(super) fn default_gan_epochs() -> usize {
    1000
}

pub(super) fn default_gan_batch_size() -> usize {
    128
}

pub(super) fn default_gan_log_every() -> usize {
    100
}

pub(super) fn default_gan_learning_rate() -> f64 {
    2e-4
}

pub(super) fn default_beta1() -> f32 {
    0.5
}

pub(super) fn default_generator_hidden() -> (usize, usize) {
    (64, 128)
}

pub(super) fn default_discriminator_hidden() -> (usize, usize) {
    (128, 64)
}

pub(super) fn default_generator_output() -> GeneratorOutput {
    GeneratorOutput::UnitInterval
}

pub(super) fn default_balanced_file() -> String {
    "balanced_dataset.csv".to_string()
}

pub(super) fn default_test_per_class() -> usize {
    300
}

pub(super) fn default_classifier_epochs() -> usize {
    50
}

pub(super) fn default_classifier_batch_size() -> usize {
    32
}

pub(super) fn default_validation_fraction() -> f32 {
    0.2
}

pub(super) fn default_classifier_learning_rate() -> f64 {
    1e-4
}

pub(super) fn default_head_size() -> usize {
    64
}

pub(super) fn default_num_heads() -> usize {
    4
}

pub(super) fn default_ff_dim() -> usize {
    4
}

pub(super) fn default_num_blocks() -> usize {
    2
}

pub(super) fn default_mlp_units() -> (usize, usize) {
    (128, 64)
}

pub(super) fn default_dropout() -> f64 {
    0.25
}

pub(super) fn default_mlp_dropout() -> f64 {
    0.4
}

pub(super) fn default_background_pool() -> usize {
    50
}

pub(super) fn default_background_size() -> usize {
    10
}

pub(super) fn default_coalition_samples() -> usize {
    100
}

pub(super) fn default_explain_count() -> usize {
    20
}

pub(super) fn default_report_file() -> String {
    "report.json".to_string()
}
