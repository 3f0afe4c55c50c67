use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig};
use burn::tensor::activation::{relu, sigmoid, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::ml::layers::Dense;

/// Every scalar feature is one sequence position with this many channels.
pub const FEATURE_CHANNELS: usize = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerOptions {
    pub head_size: usize,
    pub num_heads: usize,
    /// Width of the position-wise feed-forward expansion.
    pub ff_dim: usize,
    pub num_blocks: usize,
    pub mlp_units: (usize, usize),
    pub dropout: f64,
    pub mlp_dropout: f64,
    pub layer_norm_epsilon: f64,
}

impl Default for TransformerOptions {
    fn default() -> Self {
        Self {
            head_size: 64,
            num_heads: 4,
            ff_dim: 4,
            num_blocks: 2,
            mlp_units: (128, 64),
            dropout: 0.25,
            mlp_dropout: 0.4,
            layer_norm_epsilon: 1e-6,
        }
    }
}

/// Multi-head scaled dot-product self-attention with independent head width.
#[derive(Module, Debug)]
pub struct SelfAttention<B: Backend> {
    query: Dense<B>,
    key: Dense<B>,
    value: Dense<B>,
    output: Dense<B>,
    num_heads: usize,
    head_size: usize,
}

impl<B: Backend> SelfAttention<B> {
    pub fn new(
        channels: usize,
        num_heads: usize,
        head_size: usize,
        rng: &mut StdRng,
        device: &B::Device,
    ) -> Self {
        let inner = num_heads * head_size;
        Self {
            query: Dense::new(channels, inner, rng, device),
            key: Dense::new(channels, inner, rng, device),
            value: Dense::new(channels, inner, rng, device),
            output: Dense::new(inner, channels, rng, device),
            num_heads,
            head_size,
        }
    }

    /// `[batch, seq, channels] -> [batch, seq, channels]`.
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, seq, _] = input.dims();
        let split_heads = |x: Tensor<B, 3>| {
            x.reshape([batch, seq, self.num_heads, self.head_size])
                .swap_dims(1, 2)
        };
        let q = split_heads(self.query.forward_sequence(input.clone()));
        let k = split_heads(self.key.forward_sequence(input.clone()));
        let v = split_heads(self.value.forward_sequence(input));

        let scale = (self.head_size as f64).sqrt();
        let scores = q.matmul(k.swap_dims(2, 3)).div_scalar(scale);
        let weights = softmax(scores, 3);
        let context = weights
            .matmul(v)
            .swap_dims(1, 2)
            .reshape([batch, seq, self.num_heads * self.head_size]);
        self.output.forward_sequence(context)
    }
}

/// Pre-norm encoder block: attention and feed-forward, each with a residual.
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    attention_norm: LayerNorm<B>,
    attention: SelfAttention<B>,
    attention_dropout: Dropout,
    feed_forward_norm: LayerNorm<B>,
    expand: Dense<B>,
    feed_forward_dropout: Dropout,
    project: Dense<B>,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn new(options: &TransformerOptions, rng: &mut StdRng, device: &B::Device) -> Self {
        let norm = LayerNormConfig::new(FEATURE_CHANNELS).with_epsilon(options.layer_norm_epsilon);
        Self {
            attention_norm: norm.init(device),
            attention: SelfAttention::new(
                FEATURE_CHANNELS,
                options.num_heads,
                options.head_size,
                rng,
                device,
            ),
            attention_dropout: DropoutConfig::new(options.dropout).init(),
            feed_forward_norm: norm.init(device),
            expand: Dense::new(FEATURE_CHANNELS, options.ff_dim, rng, device),
            feed_forward_dropout: DropoutConfig::new(options.dropout).init(),
            project: Dense::new(options.ff_dim, FEATURE_CHANNELS, rng, device),
        }
    }

    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.attention_norm.forward(input.clone());
        let x = self.attention_dropout.forward(self.attention.forward(x));
        let residual = x + input;

        let x = self.feed_forward_norm.forward(residual.clone());
        let x = relu(self.expand.forward_sequence(x));
        let x = self.feed_forward_dropout.forward(x);
        self.project.forward_sequence(x) + residual
    }
}

/// Encoder stack plus a two-stage dense head ending in a sigmoid.
#[derive(Module, Debug)]
pub struct AttritionTransformer<B: Backend> {
    blocks: Vec<EncoderBlock<B>>,
    hidden1: Dense<B>,
    dropout1: Dropout,
    hidden2: Dense<B>,
    dropout2: Dropout,
    output: Dense<B>,
    feature_count: usize,
}

impl<B: Backend> AttritionTransformer<B> {
    pub fn new(
        feature_count: usize,
        options: &TransformerOptions,
        rng: &mut StdRng,
        device: &B::Device,
    ) -> Self {
        let blocks = (0..options.num_blocks)
            .map(|_| EncoderBlock::new(options, rng, device))
            .collect();
        let flat = feature_count * FEATURE_CHANNELS;
        let (units1, units2) = options.mlp_units;
        Self {
            blocks,
            hidden1: Dense::new(flat, units1, rng, device),
            dropout1: DropoutConfig::new(options.mlp_dropout).init(),
            hidden2: Dense::new(units1, units2, rng, device),
            dropout2: DropoutConfig::new(options.mlp_dropout).init(),
            output: Dense::new(units2, 1, rng, device),
            feature_count,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// `[batch, features, 1] -> [batch, 1]` attrition probabilities.
    pub fn forward(&self, sequence: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, seq, channels] = sequence.dims();
        let mut x = sequence;
        for block in &self.blocks {
            x = block.forward(x);
        }
        let x = x.reshape([batch, seq * channels]);
        let x = self.dropout1.forward(relu(self.hidden1.forward(x)));
        let x = self.dropout2.forward(relu(self.hidden2.forward(x)));
        sigmoid(self.output.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend::{InferenceBackend, default_device, tensor_to_vec};
    use burn::tensor::TensorData;
    use rand::SeedableRng;

    fn small_options() -> TransformerOptions {
        TransformerOptions {
            head_size: 8,
            num_heads: 2,
            ff_dim: 4,
            num_blocks: 2,
            mlp_units: (16, 8),
            ..TransformerOptions::default()
        }
    }

    #[test]
    fn attention_preserves_sequence_shape() {
        let device = default_device();
        let mut rng = StdRng::seed_from_u64(0);
        let attention = SelfAttention::<InferenceBackend>::new(1, 3, 5, &mut rng, &device);
        let input = Tensor::<InferenceBackend, 3>::from_data(
            TensorData::new((0..14).map(|v| v as f32 / 14.0).collect::<Vec<_>>(), [2, 7, 1]),
            &device,
        );
        assert_eq!(attention.forward(input).dims(), [2, 7, 1]);
    }

    #[test]
    fn outputs_are_probabilities_for_any_valid_row() {
        let device = default_device();
        let mut rng = StdRng::seed_from_u64(11);
        let model = AttritionTransformer::<InferenceBackend>::new(6, &small_options(), &mut rng, &device);
        let values: Vec<f32> = (0..5 * 6).map(|i| ((i * 7) % 11) as f32 / 10.0).collect();
        let input = Tensor::<InferenceBackend, 3>::from_data(TensorData::new(values, [5, 6, 1]), &device);
        let out = model.forward(input);
        assert_eq!(out.dims(), [5, 1]);
        for p in tensor_to_vec(out).unwrap() {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn inference_backend_forward_is_deterministic() {
        let device = default_device();
        let mut rng = StdRng::seed_from_u64(2);
        let model = AttritionTransformer::<InferenceBackend>::new(4, &small_options(), &mut rng, &device);
        let make = || {
            Tensor::<InferenceBackend, 3>::from_data(
                TensorData::new(vec![0.1_f32, 0.9, 0.4, 0.6], [1, 4, 1]),
                &device,
            )
        };
        let a = tensor_to_vec(model.forward(make())).unwrap();
        let b = tensor_to_vec(model.forward(make())).unwrap();
        assert_eq!(a, b);
    }
}
