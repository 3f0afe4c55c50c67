use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use ndarray::{ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::classifier::{TransformerClassifier, predict_rows};
use super::listener::EpochListener;
use super::model::{AttritionTransformer, TransformerOptions};
use super::ClassifierError;
use crate::ml::backend::{
    InferenceBackend, TrainBackend, default_device, labels_to_column, matrix_to_sequence,
    scalar_of, tensor_to_vec,
};
use crate::ml::layers::binary_cross_entropy;
use crate::ml::metrics::DECISION_THRESHOLD;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierTrainOptions {
    pub epochs: usize,
    pub batch_size: usize,
    /// Share of the training rows (taken from the tail) held out for validation.
    pub validation_fraction: f32,
    pub learning_rate: f64,
    pub model: TransformerOptions,
}

impl Default for ClassifierTrainOptions {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 32,
            validation_fraction: 0.2,
            learning_rate: 1e-4,
            model: TransformerOptions::default(),
        }
    }
}

/// One epoch of the training history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub accuracy: f32,
    pub loss: f32,
    pub val_accuracy: Option<f32>,
    pub val_loss: Option<f32>,
    /// Filled by listeners; `None` when no listener ran or AUC was undefined.
    pub train_auc: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

/// Train the transformer for a fixed number of epochs.
pub fn train_classifier(
    features: ArrayView2<'_, f32>,
    labels: &[u8],
    options: &ClassifierTrainOptions,
    listeners: &mut [&mut dyn EpochListener],
    rng: &mut StdRng,
) -> Result<(TransformerClassifier, TrainingHistory), ClassifierError> {
    validate_inputs(features, labels, options)?;
    let (train_rows, val_rows) = validation_partition(labels.len(), options.validation_fraction)?;

    let device = default_device();
    let feature_count = features.ncols();
    let mut model =
        AttritionTransformer::<TrainBackend>::new(feature_count, &options.model, rng, &device);
    let mut optim = AdamConfig::new().init::<TrainBackend, AttritionTransformer<TrainBackend>>();

    let val_features = features.select(Axis(0), &val_rows);
    let val_labels: Vec<u8> = val_rows.iter().map(|&i| labels[i]).collect();
    let mut order = train_rows;
    info!(
        "Training transformer on {} rows ({} held out for validation) for {} epochs",
        order.len(),
        val_rows.len(),
        options.epochs
    );

    let mut history = TrainingHistory::default();
    for epoch in 1..=options.epochs {
        order.shuffle(rng);
        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;
        let mut seen = 0usize;
        for batch in order.chunks(options.batch_size) {
            let batch_x = features.select(Axis(0), batch);
            let batch_y: Vec<u8> = batch.iter().map(|&i| labels[i]).collect();
            let probs = model.forward(matrix_to_sequence(batch_x.view(), &device));
            let loss = binary_cross_entropy(probs.clone(), labels_to_column(&batch_y, &device));

            let batch_loss = scalar_of(loss.clone()).map_err(ClassifierError::Tensor)?;
            if !batch_loss.is_finite() {
                return Err(ClassifierError::Diverged { epoch });
            }
            let scores = tensor_to_vec(probs.detach()).map_err(ClassifierError::Tensor)?;
            correct += count_correct(&batch_y, &scores);
            loss_sum += f64::from(batch_loss) * batch.len() as f64;
            seen += batch.len();

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(options.learning_rate, model, grads);
        }

        let frozen = model.valid();
        let (val_loss, val_accuracy) = if val_labels.is_empty() {
            (None, None)
        } else {
            let (loss, acc) = evaluate_rows(&frozen, val_features.view(), &val_labels)?;
            (Some(loss), Some(acc))
        };
        let mut metrics = EpochMetrics {
            epoch,
            accuracy: correct as f32 / seen.max(1) as f32,
            loss: (loss_sum / seen.max(1) as f64) as f32,
            val_accuracy,
            val_loss,
            train_auc: None,
        };
        for listener in listeners.iter_mut() {
            listener.on_epoch_end(&frozen, &mut metrics)?;
        }
        info!(
            "Epoch {} | Train Acc: {:.4} | Val Acc: {} | Train Loss: {:.4} | Val Loss: {} | Train AUC: {}",
            metrics.epoch,
            metrics.accuracy,
            format_optional(metrics.val_accuracy),
            metrics.loss,
            format_optional(metrics.val_loss),
            format_optional(metrics.train_auc)
        );
        history.epochs.push(metrics);
    }

    Ok((TransformerClassifier::new(model.valid(), device), history))
}

fn validate_inputs(
    features: ArrayView2<'_, f32>,
    labels: &[u8],
    options: &ClassifierTrainOptions,
) -> Result<(), ClassifierError> {
    if features.nrows() == 0 {
        return Err(ClassifierError::EmptyTrainingSet);
    }
    if features.ncols() == 0 {
        return Err(ClassifierError::NoFeatures);
    }
    if features.nrows() != labels.len() {
        return Err(ClassifierError::LengthMismatch {
            rows: features.nrows(),
            labels: labels.len(),
        });
    }
    if let Some(&label) = labels.iter().find(|&&l| l > 1) {
        return Err(ClassifierError::NonBinaryLabel(label));
    }
    if options.batch_size == 0 {
        return Err(ClassifierError::ZeroBatchSize);
    }
    let model = &options.model;
    if model.num_heads == 0 || model.head_size == 0 || model.ff_dim == 0 {
        return Err(ClassifierError::InvalidArchitecture(
            "head count, head size and feed-forward width must be positive".to_string(),
        ));
    }
    if model.mlp_units.0 == 0 || model.mlp_units.1 == 0 {
        return Err(ClassifierError::InvalidArchitecture(
            "dense head widths must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Training rows first, validation rows from the tail.
fn validation_partition(
    rows: usize,
    fraction: f32,
) -> Result<(Vec<usize>, Vec<usize>), ClassifierError> {
    if !(0.0..1.0).contains(&fraction) {
        return Err(ClassifierError::InvalidValidationFraction(fraction));
    }
    // Round the held-out count so f32 widening never steals a training row.
    let held_out = (rows as f64 * f64::from(fraction)).round() as usize;
    let split_at = rows.saturating_sub(held_out);
    if split_at == 0 {
        return Err(ClassifierError::NoTrainingRows);
    }
    Ok(((0..split_at).collect(), (split_at..rows).collect()))
}

fn evaluate_rows(
    model: &AttritionTransformer<InferenceBackend>,
    rows: ArrayView2<'_, f32>,
    labels: &[u8],
) -> Result<(f32, f32), ClassifierError> {
    let scores = predict_rows(model, rows, &default_device())?;
    let loss = mean_log_loss(labels, &scores);
    let accuracy = count_correct(labels, &scores) as f32 / labels.len().max(1) as f32;
    Ok((loss, accuracy))
}

fn count_correct(labels: &[u8], scores: &[f32]) -> usize {
    labels
        .iter()
        .zip(scores)
        .filter(|&(&label, &score)| (score >= DECISION_THRESHOLD) == (label == 1))
        .count()
}

fn mean_log_loss(labels: &[u8], scores: &[f32]) -> f32 {
    const EPS: f64 = 1e-7;
    let total: f64 = labels
        .iter()
        .zip(scores)
        .map(|(&label, &score)| {
            let p = f64::from(score).clamp(EPS, 1.0 - EPS);
            if label == 1 { -p.ln() } else { -(1.0 - p).ln() }
        })
        .sum();
    (total / labels.len().max(1) as f64) as f32
}

fn format_optional(value: Option<f32>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::transformer::TrainAucListener;
    use ndarray::Array2;
    use rand::{Rng, SeedableRng};

    fn tiny_options(epochs: usize) -> ClassifierTrainOptions {
        ClassifierTrainOptions {
            epochs,
            batch_size: 8,
            validation_fraction: 0.2,
            learning_rate: 1e-3,
            model: TransformerOptions {
                head_size: 4,
                num_heads: 2,
                ff_dim: 4,
                num_blocks: 1,
                mlp_units: (8, 4),
                ..TransformerOptions::default()
            },
        }
    }

    fn tiny_dataset(rows: usize, rng: &mut StdRng) -> (Array2<f32>, Vec<u8>) {
        let labels: Vec<u8> = (0..rows).map(|i| (i % 2) as u8).collect();
        let features = Array2::from_shape_fn((rows, 5), |(r, c)| {
            let base = if labels[r] == 1 { 0.7 } else { 0.3 };
            (base + 0.05 * c as f32 + rng.random_range(-0.1..0.1)).clamp(0.0, 1.0)
        });
        (features, labels)
    }

    #[test]
    fn validation_partition_takes_the_tail() {
        let (train, val) = validation_partition(10, 0.2).unwrap();
        assert_eq!(train, (0..8).collect::<Vec<_>>());
        assert_eq!(val, vec![8, 9]);
    }

    #[test]
    fn twenty_percent_holds_out_exactly_a_fifth() {
        for (rows, expected) in [(100, 20), (1070, 214), (1400, 280)] {
            let (train, val) = validation_partition(rows, 0.2).unwrap();
            assert_eq!(val.len(), expected);
            assert_eq!(train.len() + val.len(), rows);
        }
    }

    #[test]
    fn validation_fraction_must_leave_training_rows() {
        assert!(matches!(
            validation_partition(3, 0.9),
            Err(ClassifierError::NoTrainingRows)
        ));
        assert!(matches!(
            validation_partition(3, 1.0),
            Err(ClassifierError::InvalidValidationFraction(_))
        ));
    }

    #[test]
    fn one_epoch_history_has_every_metric() {
        let mut rng = StdRng::seed_from_u64(17);
        let (features, labels) = tiny_dataset(40, &mut rng);
        let mut auc = TrainAucListener::new(features.clone(), labels.clone());
        let (classifier, history) = train_classifier(
            features.view(),
            &labels,
            &tiny_options(1),
            &mut [&mut auc],
            &mut rng,
        )
        .unwrap();
        assert_eq!(history.epochs.len(), 1);
        let metrics = history.last().unwrap();
        assert!((0.0..=1.0).contains(&metrics.accuracy));
        assert!(metrics.loss.is_finite());
        assert!(metrics.val_accuracy.is_some());
        assert!(metrics.val_loss.is_some_and(f32::is_finite));
        assert!(metrics.train_auc.is_some_and(|a| a.is_finite() && (0.0..=1.0).contains(&a)));
        assert_eq!(classifier.feature_count(), 5);
    }

    #[test]
    fn single_class_training_set_leaves_auc_empty() {
        let mut rng = StdRng::seed_from_u64(3);
        let features = Array2::from_elem((12, 3), 0.5_f32);
        let labels = vec![1u8; 12];
        let mut auc = TrainAucListener::new(features.clone(), labels.clone());
        let (_, history) = train_classifier(
            features.view(),
            &labels,
            &tiny_options(1),
            &mut [&mut auc],
            &mut rng,
        )
        .unwrap();
        assert_eq!(history.epochs[0].train_auc, None);
    }

    #[test]
    fn training_runs_without_listeners() {
        let mut rng = StdRng::seed_from_u64(5);
        let (features, labels) = tiny_dataset(20, &mut rng);
        let (_, history) =
            train_classifier(features.view(), &labels, &tiny_options(2), &mut [], &mut rng).unwrap();
        assert_eq!(history.epochs.len(), 2);
        assert!(history.epochs.iter().all(|m| m.train_auc.is_none()));
    }

    #[test]
    fn predictions_stay_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(8);
        let (features, labels) = tiny_dataset(24, &mut rng);
        let (classifier, _) =
            train_classifier(features.view(), &labels, &tiny_options(1), &mut [], &mut rng).unwrap();
        let probe = Array2::from_shape_fn((9, 5), |(r, c)| ((r + c) % 3) as f32 / 2.0);
        let scores = classifier.predict_proba(probe.view()).unwrap();
        assert_eq!(scores.len(), 9);
        assert!(scores.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn rejects_mismatched_labels() {
        let mut rng = StdRng::seed_from_u64(0);
        let features = Array2::from_elem((4, 2), 0.5_f32);
        let err = train_classifier(features.view(), &[0, 1], &tiny_options(1), &mut [], &mut rng)
            .unwrap_err();
        assert!(matches!(err, ClassifierError::LengthMismatch { rows: 4, labels: 2 }));
    }

    #[test]
    fn predict_rejects_wrong_width() {
        let mut rng = StdRng::seed_from_u64(1);
        let (features, labels) = tiny_dataset(10, &mut rng);
        let (classifier, _) =
            train_classifier(features.view(), &labels, &tiny_options(1), &mut [], &mut rng).unwrap();
        let err = classifier
            .predict_proba(Array2::from_elem((2, 4), 0.1_f32).view())
            .unwrap_err();
        assert!(matches!(err, ClassifierError::DimensionMismatch { expected: 5, found: 4 }));
    }
}
