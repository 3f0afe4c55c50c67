//! Burn backend selection and tensor <-> ndarray plumbing shared by the networks.

use burn::backend::ndarray::{NdArray, NdArrayDevice};
use burn::backend::Autodiff;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use ndarray::{Array2, ArrayView2};

/// Backend used for frozen models (evaluation, generation, explanation).
pub type InferenceBackend = NdArray;
/// Backend used while a network is being optimised.
pub type TrainBackend = Autodiff<InferenceBackend>;
/// Device shared by both backends.
pub type ComputeDevice = NdArrayDevice;

/// Default CPU device.
pub fn default_device() -> ComputeDevice {
    NdArrayDevice::default()
}

/// Copy a `[rows, cols]` matrix into a rank-2 tensor.
pub(crate) fn matrix_to_tensor<B: Backend>(rows: ArrayView2<'_, f32>, device: &B::Device) -> Tensor<B, 2> {
    let shape = [rows.nrows(), rows.ncols()];
    let values: Vec<f32> = rows.iter().copied().collect();
    Tensor::<B, 2>::from_data(TensorData::new(values, shape), device)
}

/// Copy a `[rows, cols]` matrix into a `[rows, cols, 1]` sequence tensor.
pub(crate) fn matrix_to_sequence<B: Backend>(
    rows: ArrayView2<'_, f32>,
    device: &B::Device,
) -> Tensor<B, 3> {
    let shape = [rows.nrows(), rows.ncols(), 1];
    let values: Vec<f32> = rows.iter().copied().collect();
    Tensor::<B, 3>::from_data(TensorData::new(values, shape), device)
}

/// Build a `[len, 1]` column tensor from binary labels.
pub(crate) fn labels_to_column<B: Backend>(labels: &[u8], device: &B::Device) -> Tensor<B, 2> {
    let values: Vec<f32> = labels.iter().map(|&label| f32::from(label)).collect();
    Tensor::<B, 2>::from_data(TensorData::new(values, [labels.len(), 1]), device)
}

/// Read any float tensor back as a flat `Vec<f32>`.
pub(crate) fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>, String> {
    let data = tensor.into_data();
    data.as_slice::<f32>()
        .map(|values| values.to_vec())
        .map_err(|err| format!("Failed to read Burn tensor: {err}"))
}

/// Read a rank-2 tensor back as an `Array2`.
pub(crate) fn tensor_to_matrix<B: Backend>(tensor: Tensor<B, 2>) -> Result<Array2<f32>, String> {
    let [rows, cols] = tensor.dims();
    let values = tensor_to_vec(tensor)?;
    Array2::from_shape_vec((rows, cols), values)
        .map_err(|err| format!("Tensor shape mismatch: {err}"))
}

/// Read a scalar loss tensor.
pub(crate) fn scalar_of<B: Backend>(tensor: Tensor<B, 1>) -> Result<f32, String> {
    tensor_to_vec(tensor)?
        .first()
        .copied()
        .ok_or_else(|| "Expected a scalar tensor".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn matrix_round_trips_through_tensor() {
        let device = default_device();
        let rows = array![[0.1_f32, 0.2, 0.3], [0.4, 0.5, 0.6]];
        let tensor = matrix_to_tensor::<InferenceBackend>(rows.view(), &device);
        assert_eq!(tensor.dims(), [2, 3]);
        let back = tensor_to_matrix(tensor).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn sequence_tensor_has_single_channel() {
        let device = default_device();
        let rows = array![[0.1_f32, 0.2, 0.3, 0.4]];
        let tensor = matrix_to_sequence::<InferenceBackend>(rows.view(), &device);
        assert_eq!(tensor.dims(), [1, 4, 1]);
    }
}
