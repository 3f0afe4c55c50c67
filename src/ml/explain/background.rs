use linfa::DatasetBase;
use linfa::traits::{Fit, Predict};
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2, ArrayView2};
use rand::Rng;
use rand::rngs::StdRng;
use rand_08::SeedableRng as _;
use tracing::debug;

use super::ExplainError;

const KMEANS_MAX_ITERATIONS: u64 = 300;
const KMEANS_TOLERANCE: f64 = 1e-4;

/// Weighted reference rows standing in for "feature absent".
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    rows: Array2<f32>,
    /// Normalised to sum to one.
    weights: Vec<f32>,
}

impl Background {
    pub fn new(rows: Array2<f32>, weights: Vec<f32>) -> Result<Self, ExplainError> {
        if rows.nrows() == 0 {
            return Err(ExplainError::EmptyBackground);
        }
        if weights.len() != rows.nrows() {
            return Err(ExplainError::BackgroundWeights {
                rows: rows.nrows(),
                weights: weights.len(),
            });
        }
        let total: f32 = weights.iter().sum();
        if !total.is_finite() || total <= 0.0 || weights.iter().any(|w| *w < 0.0) {
            return Err(ExplainError::InvalidBackgroundWeights);
        }
        let weights = weights.into_iter().map(|w| w / total).collect();
        Ok(Self { rows, weights })
    }

    /// Equal weight for every row.
    pub fn uniform(rows: Array2<f32>) -> Result<Self, ExplainError> {
        let weights = vec![1.0; rows.nrows()];
        Self::new(rows, weights)
    }

    pub fn rows(&self) -> ArrayView2<'_, f32> {
        self.rows.view()
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.nrows() == 0
    }

    pub fn feature_count(&self) -> usize {
        self.rows.ncols()
    }
}

/// Reduce `pool` to `size` k-means centroids weighted by cluster size.
///
/// Centroid coordinates are snapped to the closest value observed in the
/// pool for that feature, so encoded categories stay valid codes. Clusters
/// that end up empty are dropped.
pub fn summarize_background(
    pool: ArrayView2<'_, f32>,
    size: usize,
    rng: &mut StdRng,
) -> Result<Background, ExplainError> {
    if pool.nrows() == 0 {
        return Err(ExplainError::EmptyBackground);
    }
    if size == 0 || size > pool.nrows() {
        return Err(ExplainError::BackgroundSize {
            requested: size,
            available: pool.nrows(),
        });
    }
    if size == pool.nrows() {
        return Background::uniform(pool.to_owned());
    }

    let records: Array2<f64> = pool.mapv(f64::from);
    let kmeans_rng = rand_08::rngs::StdRng::seed_from_u64(rng.random::<u64>());
    let model = KMeans::params_with_rng(size, kmeans_rng)
        .max_n_iterations(KMEANS_MAX_ITERATIONS)
        .tolerance(KMEANS_TOLERANCE)
        .fit(&DatasetBase::from(records.clone()))
        .map_err(|err| ExplainError::Clustering(err.to_string()))?;
    let assignments: Array1<usize> = model.predict(&records);

    let mut counts = vec![0usize; size];
    for &cluster in &assignments {
        if let Some(count) = counts.get_mut(cluster) {
            *count += 1;
        }
    }
    let centroids = model.centroids();
    let mut rows = Vec::new();
    let mut weights = Vec::new();
    for (cluster, centroid) in centroids.outer_iter().enumerate() {
        if counts[cluster] == 0 {
            continue;
        }
        let snapped: Vec<f32> = centroid
            .iter()
            .enumerate()
            .map(|(feature, &value)| nearest_observed(pool, feature, value))
            .collect();
        rows.extend(snapped);
        weights.push(counts[cluster] as f32);
    }
    debug!(
        "Summarised {} background rows into {} weighted centroids",
        pool.nrows(),
        weights.len()
    );
    let rows = Array2::from_shape_vec((weights.len(), pool.ncols()), rows)
        .map_err(|err| ExplainError::Clustering(err.to_string()))?;
    Background::new(rows, weights)
}

fn nearest_observed(pool: ArrayView2<'_, f32>, feature: usize, value: f64) -> f32 {
    pool.column(feature)
        .iter()
        .copied()
        .min_by(|a, b| {
            (f64::from(*a) - value)
                .abs()
                .total_cmp(&(f64::from(*b) - value).abs())
        })
        .unwrap_or(value as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn two_blobs() -> Array2<f32> {
        let mut rows = Vec::new();
        for i in 0..6 {
            rows.extend([0.0 + 0.01 * i as f32, 0.0]);
        }
        for i in 0..4 {
            rows.extend([1.0 - 0.01 * i as f32, 1.0]);
        }
        Array2::from_shape_vec((10, 2), rows).unwrap()
    }

    #[test]
    fn weights_follow_cluster_sizes() {
        let mut rng = StdRng::seed_from_u64(4);
        let background = summarize_background(two_blobs().view(), 2, &mut rng).unwrap();
        assert_eq!(background.len(), 2);
        let mut weights = background.weights().to_vec();
        weights.sort_by(f32::total_cmp);
        assert!((weights[0] - 0.4).abs() < 1e-6);
        assert!((weights[1] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn centroids_are_snapped_to_observed_values() {
        let pool = two_blobs();
        let mut rng = StdRng::seed_from_u64(9);
        let background = summarize_background(pool.view(), 2, &mut rng).unwrap();
        for row in background.rows().outer_iter() {
            for (feature, value) in row.iter().enumerate() {
                assert!(pool.column(feature).iter().any(|v| v == value));
            }
        }
    }

    #[test]
    fn full_pool_is_used_as_is() {
        let pool = array![[0.1_f32, 0.2], [0.3, 0.4]];
        let mut rng = StdRng::seed_from_u64(0);
        let background = summarize_background(pool.view(), 2, &mut rng).unwrap();
        assert_eq!(background.rows(), pool.view());
        assert_eq!(background.weights(), &[0.5, 0.5]);
    }

    #[test]
    fn size_must_fit_the_pool() {
        let pool = array![[0.1_f32], [0.2]];
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            summarize_background(pool.view(), 3, &mut rng),
            Err(ExplainError::BackgroundSize { requested: 3, available: 2 })
        ));
        assert!(matches!(
            summarize_background(pool.view(), 0, &mut rng),
            Err(ExplainError::BackgroundSize { .. })
        ));
        let empty = Array2::<f32>::zeros((0, 1));
        assert!(matches!(
            summarize_background(empty.view(), 1, &mut rng),
            Err(ExplainError::EmptyBackground)
        ));
    }
}
