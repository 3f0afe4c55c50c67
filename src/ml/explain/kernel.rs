use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::index::sample as sample_indices;
use tracing::debug;

use super::background::Background;
use super::solver::weighted_least_squares;
use super::{ExplainError, ShapleyAttribution};
use crate::ml::transformer::TransformerClassifier;

/// Largest feature count for which full enumeration is ever attempted.
const MAX_ENUMERATED_FEATURES: usize = 30;

/// Anything that maps flat feature rows to one score per row.
pub trait Predictor {
    fn feature_count(&self) -> usize;
    fn predict(&self, rows: ArrayView2<'_, f32>) -> Result<Vec<f32>, ExplainError>;
}

impl Predictor for TransformerClassifier {
    fn feature_count(&self) -> usize {
        TransformerClassifier::feature_count(self)
    }

    fn predict(&self, rows: ArrayView2<'_, f32>) -> Result<Vec<f32>, ExplainError> {
        Ok(self.predict_proba(rows)?)
    }
}

/// Kernel SHAP over a weighted background.
#[derive(Debug, Clone)]
pub struct KernelShap {
    background: Background,
    coalition_samples: usize,
}

/// A coalition mask (`true` = feature taken from the instance) with its
/// regression weight.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Coalition {
    pub(crate) present: Vec<bool>,
    pub(crate) weight: f64,
}

impl KernelShap {
    pub fn new(background: Background, coalition_samples: usize) -> Result<Self, ExplainError> {
        if coalition_samples == 0 {
            return Err(ExplainError::ZeroCoalitionSamples);
        }
        Ok(Self {
            background,
            coalition_samples,
        })
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Attributions for every row of `instances`.
    pub fn explain<P: Predictor + ?Sized>(
        &self,
        model: &P,
        instances: ArrayView2<'_, f32>,
        rng: &mut StdRng,
    ) -> Result<ShapleyAttribution, ExplainError> {
        let features = self.background.feature_count();
        if model.feature_count() != features {
            return Err(ExplainError::DimensionMismatch {
                context: "model",
                expected: features,
                found: model.feature_count(),
            });
        }
        if instances.ncols() != features {
            return Err(ExplainError::DimensionMismatch {
                context: "instances",
                expected: features,
                found: instances.ncols(),
            });
        }

        let background_scores = model.predict(self.background.rows())?;
        let expected_value = weighted_mean(&background_scores, self.background.weights());
        let predictions = model.predict(instances)?;
        let mut values = Array2::<f32>::zeros((instances.nrows(), features));

        for (index, instance) in instances.outer_iter().enumerate() {
            let coalitions = self.coalitions(features, rng);
            let phi = self.explain_row(
                model,
                instance,
                predictions[index],
                expected_value,
                &coalitions,
            )?;
            for (slot, value) in values.row_mut(index).iter_mut().zip(phi) {
                *slot = value as f32;
            }
        }
        debug!(
            "Explained {} instances over {} background rows",
            instances.nrows(),
            self.background.len()
        );
        Ok(ShapleyAttribution {
            values,
            predictions,
            expected_value,
        })
    }

    fn coalitions(&self, features: usize, rng: &mut StdRng) -> Vec<Coalition> {
        if features < 2 {
            return Vec::new();
        }
        let exhaustive = features <= MAX_ENUMERATED_FEATURES
            && (1usize << features) - 2 <= self.coalition_samples;
        if exhaustive {
            enumerate_coalitions(features)
        } else {
            sample_coalitions(features, self.coalition_samples, rng)
        }
    }

    fn explain_row<P: Predictor + ?Sized>(
        &self,
        model: &P,
        instance: ArrayView1<'_, f32>,
        prediction: f32,
        expected_value: f32,
        coalitions: &[Coalition],
    ) -> Result<Vec<f64>, ExplainError> {
        let features = instance.len();
        let delta = f64::from(prediction) - f64::from(expected_value);
        if features == 1 {
            return Ok(vec![delta]);
        }

        let background = self.background.rows();
        let rows_per_coalition = background.nrows();
        let mut masked = Array2::<f32>::zeros((coalitions.len() * rows_per_coalition, features));
        for (c, coalition) in coalitions.iter().enumerate() {
            for (b, reference) in background.outer_iter().enumerate() {
                let mut row = masked.row_mut(c * rows_per_coalition + b);
                for j in 0..features {
                    row[j] = if coalition.present[j] {
                        instance[j]
                    } else {
                        reference[j]
                    };
                }
            }
        }
        let scores = model.predict(masked.view())?;

        // Eliminate the last feature so the attributions sum to `delta`.
        let last = features - 1;
        let mut design = Array2::<f64>::zeros((coalitions.len(), last));
        let mut targets = Vec::with_capacity(coalitions.len());
        let mut weights = Vec::with_capacity(coalitions.len());
        for (c, coalition) in coalitions.iter().enumerate() {
            let chunk = &scores[c * rows_per_coalition..(c + 1) * rows_per_coalition];
            let value = weighted_mean(chunk, self.background.weights());
            let z_last = f64::from(u8::from(coalition.present[last]));
            for j in 0..last {
                design[[c, j]] = f64::from(u8::from(coalition.present[j])) - z_last;
            }
            targets.push(f64::from(value) - f64::from(expected_value) - z_last * delta);
            weights.push(coalition.weight);
        }

        let mut phi = weighted_least_squares(design.view(), &targets, &weights)?;
        let remainder = delta - phi.iter().sum::<f64>();
        phi.push(remainder);
        Ok(phi)
    }
}

fn weighted_mean(values: &[f32], weights: &[f32]) -> f32 {
    values
        .iter()
        .zip(weights)
        .map(|(v, w)| f64::from(*v) * f64::from(*w))
        .sum::<f64>() as f32
}

/// Shapley kernel weight for a coalition of `size` out of `features`.
pub(crate) fn shapley_kernel_weight(features: usize, size: usize) -> f64 {
    if size == 0 || size >= features {
        return 0.0;
    }
    let m = features as f64;
    let s = size as f64;
    (m - 1.0) / (binomial(features, size) * s * (m - s))
}

fn binomial(n: usize, k: usize) -> f64 {
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Every proper non-empty coalition with its exact kernel weight.
pub(crate) fn enumerate_coalitions(features: usize) -> Vec<Coalition> {
    (1..(1u64 << features) - 1)
        .map(|bits| {
            let present: Vec<bool> = (0..features).map(|j| bits & (1 << j) != 0).collect();
            let size = present.iter().filter(|&&p| p).count();
            Coalition {
                present,
                weight: shapley_kernel_weight(features, size),
            }
        })
        .collect()
}

/// Draw coalition sizes in proportion to their total kernel mass, pair each
/// draw with its complement, and merge repeats by summing their weights.
pub(crate) fn sample_coalitions(features: usize, budget: usize, rng: &mut StdRng) -> Vec<Coalition> {
    let size_mass: Vec<f64> = (1..features)
        .map(|s| 1.0 / (s as f64 * (features - s) as f64))
        .collect();
    let total_mass: f64 = size_mass.iter().sum();
    let pairs = (budget / 2).max(1);

    let mut merged: BTreeMap<Vec<bool>, f64> = BTreeMap::new();
    for _ in 0..pairs {
        let mut target = rng.random::<f64>() * total_mass;
        let mut size = features - 1;
        for (offset, mass) in size_mass.iter().enumerate() {
            if target < *mass {
                size = offset + 1;
                break;
            }
            target -= mass;
        }
        let mut present = vec![false; features];
        for j in sample_indices(rng, features, size) {
            present[j] = true;
        }
        let complement: Vec<bool> = present.iter().map(|p| !p).collect();
        *merged.entry(present).or_default() += 1.0;
        *merged.entry(complement).or_default() += 1.0;
    }
    merged
        .into_iter()
        .map(|(present, weight)| Coalition { present, weight })
        .collect()
}
