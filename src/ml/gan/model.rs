use burn::module::Module;
use burn::tensor::activation::{leaky_relu, sigmoid, tanh};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::ml::layers::Dense;

const LEAKY_SLOPE: f64 = 0.2;

/// How the generator's `tanh` output is mapped before leaving the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorOutput {
    /// `(tanh + 1) / 2`, matching the [0,1] range of min-max scaled features.
    #[default]
    UnitInterval,
    /// Raw `tanh` in [-1,1].
    Symmetric,
}

impl GeneratorOutput {
    pub fn bounds(self) -> (f32, f32) {
        match self {
            Self::UnitInterval => (0.0, 1.0),
            Self::Symmetric => (-1.0, 1.0),
        }
    }
}

/// Maps latent noise to a synthetic feature vector.
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    hidden1: Dense<B>,
    hidden2: Dense<B>,
    output: Dense<B>,
    unit_interval: bool,
}

impl<B: Backend> Generator<B> {
    pub fn new(
        latent_dim: usize,
        hidden: (usize, usize),
        feature_count: usize,
        output: GeneratorOutput,
        rng: &mut StdRng,
        device: &B::Device,
    ) -> Self {
        Self {
            hidden1: Dense::new(latent_dim, hidden.0, rng, device),
            hidden2: Dense::new(hidden.0, hidden.1, rng, device),
            output: Dense::new(hidden.1, feature_count, rng, device),
            unit_interval: output == GeneratorOutput::UnitInterval,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.output.d_output()
    }

    /// `[batch, latent] -> [batch, features]`.
    pub fn forward(&self, noise: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = leaky_relu(self.hidden1.forward(noise), LEAKY_SLOPE);
        let x = leaky_relu(self.hidden2.forward(x), LEAKY_SLOPE);
        let x = tanh(self.output.forward(x));
        if self.unit_interval {
            x.add_scalar(1.0).mul_scalar(0.5)
        } else {
            x
        }
    }
}

/// Scores a feature vector with the probability that it is real.
#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    hidden1: Dense<B>,
    hidden2: Dense<B>,
    output: Dense<B>,
}

impl<B: Backend> Discriminator<B> {
    pub fn new(feature_count: usize, hidden: (usize, usize), rng: &mut StdRng, device: &B::Device) -> Self {
        Self {
            hidden1: Dense::new(feature_count, hidden.0, rng, device),
            hidden2: Dense::new(hidden.0, hidden.1, rng, device),
            output: Dense::new(hidden.1, 1, rng, device),
        }
    }

    /// `[batch, features] -> [batch, 1]`.
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = leaky_relu(self.hidden1.forward(features), LEAKY_SLOPE);
        let x = leaky_relu(self.hidden2.forward(x), LEAKY_SLOPE);
        sigmoid(self.output.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend::{InferenceBackend, default_device, tensor_to_vec};
    use burn::tensor::TensorData;
    use rand::SeedableRng;

    fn noise(rows: usize, cols: usize, scale: f32) -> Tensor<InferenceBackend, 2> {
        let values: Vec<f32> = (0..rows * cols)
            .map(|i| ((i as f32 * 0.37).sin()) * scale)
            .collect();
        Tensor::from_data(TensorData::new(values, [rows, cols]), &default_device())
    }

    #[test]
    fn generator_output_respects_unit_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        let generator = Generator::<InferenceBackend>::new(
            16,
            (8, 8),
            5,
            GeneratorOutput::UnitInterval,
            &mut rng,
            &default_device(),
        );
        let out = generator.forward(noise(32, 16, 50.0));
        assert_eq!(out.dims(), [32, 5]);
        for value in tensor_to_vec(out).unwrap() {
            assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn symmetric_generator_can_emit_negative_values() {
        let mut rng = StdRng::seed_from_u64(2);
        let generator = Generator::<InferenceBackend>::new(
            16,
            (8, 8),
            5,
            GeneratorOutput::Symmetric,
            &mut rng,
            &default_device(),
        );
        let values = tensor_to_vec(generator.forward(noise(64, 16, 50.0))).unwrap();
        assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert!(values.iter().any(|v| *v < 0.0));
    }

    #[test]
    fn discriminator_emits_probabilities() {
        let mut rng = StdRng::seed_from_u64(4);
        let discriminator = Discriminator::<InferenceBackend>::new(5, (8, 4), &mut rng, &default_device());
        let out = discriminator.forward(noise(10, 5, 3.0));
        assert_eq!(out.dims(), [10, 1]);
        for value in tensor_to_vec(out).unwrap() {
            assert!((0.0..=1.0).contains(&value));
        }
    }
}
