//! Building blocks shared by the GAN and the transformer classifier.

use burn::module::{Module, Param};
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use rand::rngs::StdRng;
use rand::Rng;

const BCE_EPSILON: f32 = 1e-7;

/// Fully connected layer whose weights are drawn from an explicit RNG.
///
/// Burn's stock `Linear` initialises from the backend's global generator; the
/// pipeline needs every random draw to come from a seeded `StdRng`.
#[derive(Module, Debug)]
pub struct Dense<B: Backend> {
    weight: Param<Tensor<B, 2>>,
    bias: Param<Tensor<B, 1>>,
}

impl<B: Backend> Dense<B> {
    /// Glorot-uniform weights, zero bias.
    pub fn new(d_input: usize, d_output: usize, rng: &mut StdRng, device: &B::Device) -> Self {
        let limit = (6.0 / (d_input + d_output).max(1) as f32).sqrt();
        let values: Vec<f32> = (0..d_input * d_output)
            .map(|_| rng.random_range(-limit..=limit))
            .collect();
        let weight = Tensor::<B, 2>::from_data(TensorData::new(values, [d_input, d_output]), device);
        let bias = Tensor::<B, 1>::zeros([d_output], device);
        Self {
            weight: Param::from_tensor(weight),
            bias: Param::from_tensor(bias),
        }
    }

    pub fn d_output(&self) -> usize {
        self.weight.val().dims()[1]
    }

    /// `[batch, d_input] -> [batch, d_output]`.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        input.matmul(self.weight.val()) + self.bias.val().unsqueeze::<2>()
    }

    /// Applies the layer to every position of a `[batch, seq, d_input]` sequence.
    pub fn forward_sequence(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, seq, d_input] = input.dims();
        let output = self.forward(input.reshape([batch * seq, d_input]));
        output.reshape([batch, seq, self.d_output()])
    }
}

/// Mean binary cross-entropy between probabilities and `{0,1}` targets.
///
/// Probabilities are clipped away from 0 and 1 before the log.
pub fn binary_cross_entropy<B: Backend>(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let probs = probs.clamp(BCE_EPSILON, 1.0 - BCE_EPSILON);
    let ones = probs.ones_like();
    let positive = targets.clone() * probs.clone().log();
    let negative = (ones.clone() - targets) * (ones - probs).log();
    (positive + negative).neg().mean()
}
