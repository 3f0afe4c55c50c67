use ndarray::Array2;
use tracing::warn;

use super::classifier::predict_rows;
use super::model::AttritionTransformer;
use super::train::EpochMetrics;
use super::ClassifierError;
use crate::ml::backend::{ComputeDevice, InferenceBackend, default_device};
use crate::ml::metrics::roc_auc;

/// Hook run by the training loop after every epoch.
///
/// Receives the frozen model for that epoch and may annotate the epoch's
/// metrics record.
pub trait EpochListener {
    fn on_epoch_end(
        &mut self,
        model: &AttritionTransformer<InferenceBackend>,
        metrics: &mut EpochMetrics,
    ) -> Result<(), ClassifierError>;
}

/// Scores the full training set each epoch and records its ROC AUC.
#[derive(Debug, Clone)]
pub struct TrainAucListener {
    features: Array2<f32>,
    labels: Vec<u8>,
    device: ComputeDevice,
}

impl TrainAucListener {
    pub fn new(features: Array2<f32>, labels: Vec<u8>) -> Self {
        Self {
            features,
            labels,
            device: default_device(),
        }
    }
}

impl EpochListener for TrainAucListener {
    fn on_epoch_end(
        &mut self,
        model: &AttritionTransformer<InferenceBackend>,
        metrics: &mut EpochMetrics,
    ) -> Result<(), ClassifierError> {
        let scores = predict_rows(model, self.features.view(), &self.device)?;
        match roc_auc(&self.labels, &scores) {
            Ok(auc) => metrics.train_auc = Some(auc),
            Err(err) => {
                warn!("Train AUC unavailable for epoch {}: {err}", metrics.epoch);
                metrics.train_auc = None;
            }
        }
        Ok(())
    }
}
