//! Kernel SHAP attributions for the trained classifier.

mod background;
mod kernel;
mod solver;

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::ml::transformer::ClassifierError;

pub use background::{Background, summarize_background};
pub use kernel::{KernelShap, Predictor};
pub use solver::{SolveError, solve_linear_system, weighted_least_squares};

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("Background pool is empty")]
    EmptyBackground,
    #[error("Background size {requested} must be between 1 and the pool size {available}")]
    BackgroundSize { requested: usize, available: usize },
    #[error("Background has {rows} rows but {weights} weights")]
    BackgroundWeights { rows: usize, weights: usize },
    #[error("Background weights must be non-negative with a positive sum")]
    InvalidBackgroundWeights,
    #[error("Coalition sample count must be positive")]
    ZeroCoalitionSamples,
    #[error("{context} has {found} features, expected {expected}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("k-means summarisation failed: {0}")]
    Clustering(String),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error(transparent)]
    Model(#[from] ClassifierError),
}

/// Signed per-feature contributions, one row per explained instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapleyAttribution {
    pub values: Array2<f32>,
    /// Model output for each explained instance.
    pub predictions: Vec<f32>,
    /// Weighted mean model output over the background.
    pub expected_value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub mean_abs_shap: f32,
}

impl ShapleyAttribution {
    pub fn instance_count(&self) -> usize {
        self.values.nrows()
    }

    pub fn feature_count(&self) -> usize {
        self.values.ncols()
    }

    /// Mean absolute attribution per feature column.
    pub fn mean_abs_importance(&self) -> Vec<f32> {
        let rows = self.values.nrows().max(1) as f32;
        self.values
            .columns()
            .into_iter()
            .map(|column| column.iter().map(|v| v.abs()).sum::<f32>() / rows)
            .collect()
    }

    /// Features ordered by decreasing mean absolute attribution.
    pub fn ranking(&self, feature_names: &[String]) -> Vec<FeatureImportance> {
        let mut ranked: Vec<FeatureImportance> = self
            .mean_abs_importance()
            .into_iter()
            .enumerate()
            .map(|(index, mean_abs_shap)| FeatureImportance {
                feature: feature_names
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| format!("feature_{index}")),
                mean_abs_shap,
            })
            .collect();
        ranked.sort_by(|a, b| b.mean_abs_shap.total_cmp(&a.mean_abs_shap));
        ranked
    }
}

/// Summarise `background_pool` and explain each row of `instances`.
pub fn explain<P: Predictor + ?Sized>(
    model: &P,
    background_pool: ArrayView2<'_, f32>,
    instances: ArrayView2<'_, f32>,
    background_size: usize,
    coalition_samples: usize,
    rng: &mut StdRng,
) -> Result<ShapleyAttribution, ExplainError> {
    if background_pool.ncols() != model.feature_count() {
        return Err(ExplainError::DimensionMismatch {
            context: "background pool",
            expected: model.feature_count(),
            found: background_pool.ncols(),
        });
    }
    let background = summarize_background(background_pool, background_size, rng)?;
    let explainer = KernelShap::new(background, coalition_samples)?;
    info!(
        "Explaining {} instances with {} background centroids and {} coalitions each",
        instances.nrows(),
        explainer.background().len(),
        coalition_samples
    );
    explainer.explain(model, instances, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn attribution() -> ShapleyAttribution {
        ShapleyAttribution {
            values: array![[0.1_f32, -0.4, 0.0], [-0.3, 0.2, 0.05]],
            predictions: vec![0.6, 0.3],
            expected_value: 0.4,
        }
    }

    #[test]
    fn mean_abs_importance_is_per_column() {
        let importance = attribution().mean_abs_importance();
        assert!((importance[0] - 0.2).abs() < 1e-6);
        assert!((importance[1] - 0.3).abs() < 1e-6);
        assert!((importance[2] - 0.025).abs() < 1e-6);
    }

    #[test]
    fn ranking_orders_by_importance() {
        let names = vec!["Age".to_string(), "OverTime".to_string()];
        let ranked = attribution().ranking(&names);
        let order: Vec<&str> = ranked.iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(order, vec!["OverTime", "Age", "feature_2"]);
    }

    struct Sum;

    impl Predictor for Sum {
        fn feature_count(&self) -> usize {
            2
        }

        fn predict(&self, rows: ArrayView2<'_, f32>) -> Result<Vec<f32>, ExplainError> {
            Ok(rows.outer_iter().map(|r| r.sum()).collect())
        }
    }

    #[test]
    fn explain_validates_pool_width() {
        let mut rng = rand::SeedableRng::seed_from_u64(0);
        let err = explain(
            &Sum,
            array![[0.1_f32, 0.2, 0.3]].view(),
            array![[0.1_f32, 0.2]].view(),
            1,
            10,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ExplainError::DimensionMismatch { context: "background pool", .. }
        ));
    }

    #[test]
    fn explain_produces_one_row_per_instance() {
        let mut rng: StdRng = rand::SeedableRng::seed_from_u64(3);
        let pool = Array2::from_shape_fn((8, 2), |(r, c)| ((r + c) % 5) as f32 / 4.0);
        let instances = array![[0.9_f32, 0.1], [0.4, 0.6], [0.0, 0.0]];
        let attribution = explain(&Sum, pool.view(), instances.view(), 3, 10, &mut rng).unwrap();
        assert_eq!(attribution.values.dim(), (3, 2));
        assert_eq!(attribution.predictions.len(), 3);
    }
}
