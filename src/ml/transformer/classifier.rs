use burn::tensor::backend::Backend;
use ndarray::{ArrayView2, Axis};

use super::model::AttritionTransformer;
use super::ClassifierError;
use crate::ml::backend::{ComputeDevice, InferenceBackend, matrix_to_sequence, tensor_to_vec};

const PREDICT_CHUNK_ROWS: usize = 512;

/// Frozen classifier that scores flat feature rows.
#[derive(Debug, Clone)]
pub struct TransformerClassifier {
    model: AttritionTransformer<InferenceBackend>,
    device: ComputeDevice,
}

impl TransformerClassifier {
    pub(crate) fn new(model: AttritionTransformer<InferenceBackend>, device: ComputeDevice) -> Self {
        Self { model, device }
    }

    pub fn feature_count(&self) -> usize {
        self.model.feature_count()
    }

    pub fn model(&self) -> &AttritionTransformer<InferenceBackend> {
        &self.model
    }

    /// Attrition probability for every row of `[rows, features]`.
    pub fn predict_proba(&self, rows: ArrayView2<'_, f32>) -> Result<Vec<f32>, ClassifierError> {
        predict_rows(&self.model, rows, &self.device)
    }
}

/// Chunked forward pass; each chunk is reshaped to `[chunk, features, 1]`
/// right before it reaches the model.
pub(crate) fn predict_rows<B: Backend>(
    model: &AttritionTransformer<B>,
    rows: ArrayView2<'_, f32>,
    device: &B::Device,
) -> Result<Vec<f32>, ClassifierError> {
    if rows.ncols() != model.feature_count() {
        return Err(ClassifierError::DimensionMismatch {
            expected: model.feature_count(),
            found: rows.ncols(),
        });
    }
    let mut probabilities = Vec::with_capacity(rows.nrows());
    for chunk in rows.axis_chunks_iter(Axis(0), PREDICT_CHUNK_ROWS) {
        let output = model.forward(matrix_to_sequence::<B>(chunk, device));
        probabilities.extend(tensor_to_vec(output).map_err(ClassifierError::Tensor)?);
    }
    Ok(probabilities)
}
