//! GAN oversampling of the attrition minority class, a transformer
//! classifier trained on the balanced set, and Kernel SHAP explanations.

/// Application directories for logs and run outputs.
pub mod app_dirs;
/// Command-line flags shared by the binaries.
pub mod cli;
/// TOML pipeline configuration.
pub mod config;
/// Ingestion, scaling, splitting and the balanced dataset.
pub mod data;
/// Tracing subscriber setup.
pub mod logging;
/// Networks, metrics and explanations.
pub mod ml;
/// Stage orchestration and the JSON report.
pub mod pipeline;
