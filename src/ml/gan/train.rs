use burn::module::{AutodiffModule, Module};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;
use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::model::{Discriminator, Generator, GeneratorOutput};
use super::GanError;
use crate::ml::backend::{
    ComputeDevice, InferenceBackend, TrainBackend, default_device, matrix_to_tensor, scalar_of,
    tensor_to_matrix,
};
use crate::ml::layers::binary_cross_entropy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GanOptions {
    pub latent_dim: usize,
    pub epochs: usize,
    pub batch_size: usize,
    /// Loss lines are logged at epoch 1 and every `log_every` epochs.
    pub log_every: usize,
    pub learning_rate: f64,
    pub beta1: f32,
    pub generator_hidden: (usize, usize),
    pub discriminator_hidden: (usize, usize),
    pub output: GeneratorOutput,
}

impl Default for GanOptions {
    fn default() -> Self {
        Self {
            latent_dim: 16,
            epochs: 1000,
            batch_size: 128,
            log_every: 100,
            learning_rate: 2e-4,
            beta1: 0.5,
            generator_hidden: (64, 128),
            discriminator_hidden: (128, 64),
            output: GeneratorOutput::UnitInterval,
        }
    }
}

/// Losses recorded after one adversarial epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GanEpochLosses {
    pub epoch: usize,
    /// Mean of the real-batch and fake-batch discriminator losses.
    pub discriminator_loss: f32,
    pub generator_loss: f32,
}

/// Frozen generator ready to synthesise minority rows.
#[derive(Debug, Clone)]
pub struct TrainedGenerator {
    model: Generator<InferenceBackend>,
    latent_dim: usize,
    output: GeneratorOutput,
    device: ComputeDevice,
}

impl TrainedGenerator {
    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    pub fn feature_count(&self) -> usize {
        self.model.feature_count()
    }

    pub fn output(&self) -> GeneratorOutput {
        self.output
    }

    /// Draw `count` latent vectors and map them to feature rows.
    pub fn sample(&self, count: usize, rng: &mut StdRng) -> Result<Array2<f32>, GanError> {
        if count == 0 {
            return Ok(Array2::zeros((0, self.feature_count())));
        }
        let noise = sample_latent(count, self.latent_dim, rng);
        let rows = self
            .model
            .forward(matrix_to_tensor(noise.view(), &self.device));
        tensor_to_matrix(rows).map_err(GanError::Tensor)
    }
}

/// Result of a full adversarial run.
#[derive(Debug, Clone)]
pub struct GanTraining {
    pub generator: TrainedGenerator,
    pub history: Vec<GanEpochLosses>,
}

/// Train a generator to mimic `minority` for a fixed epoch budget.
pub fn train_gan(
    minority: ArrayView2<'_, f32>,
    options: &GanOptions,
    rng: &mut StdRng,
) -> Result<GanTraining, GanError> {
    if minority.nrows() == 0 {
        return Err(GanError::EmptyMinority);
    }
    if minority.ncols() == 0 {
        return Err(GanError::NoFeatures);
    }
    if options.batch_size == 0 {
        return Err(GanError::ZeroBatchSize);
    }
    if options.latent_dim == 0 {
        return Err(GanError::ZeroLatentDim);
    }

    let device = default_device();
    let feature_count = minority.ncols();
    let mut generator = Generator::<TrainBackend>::new(
        options.latent_dim,
        options.generator_hidden,
        feature_count,
        options.output,
        rng,
        &device,
    );
    let mut discriminator =
        Discriminator::<TrainBackend>::new(feature_count, options.discriminator_hidden, rng, &device);
    let mut generator_optim = AdamConfig::new()
        .with_beta_1(options.beta1)
        .init::<TrainBackend, Generator<TrainBackend>>();
    let mut discriminator_optim = AdamConfig::new()
        .with_beta_1(options.beta1)
        .init::<TrainBackend, Discriminator<TrainBackend>>();

    info!(
        "Training GAN on {} minority rows ({} features) for {} epochs",
        minority.nrows(),
        feature_count,
        options.epochs
    );
    let mut history = Vec::with_capacity(options.epochs);
    for epoch in 1..=options.epochs {
        let real = sample_rows_with_replacement(minority, options.batch_size, rng);
        let real = matrix_to_tensor::<TrainBackend>(real.view(), &device);
        let noise = sample_latent(options.batch_size, options.latent_dim, rng);
        let fake = generator
            .forward(matrix_to_tensor(noise.view(), &device))
            .detach();

        let (next_discriminator, d_loss) = discriminator_step(
            discriminator,
            &mut discriminator_optim,
            real,
            fake,
            options.learning_rate,
        )
        .map_err(GanError::Tensor)?;
        discriminator = next_discriminator;

        let noise = sample_latent(options.batch_size, options.latent_dim, rng);
        let (next_generator, g_loss) = generator_step(
            generator,
            &discriminator,
            &mut generator_optim,
            matrix_to_tensor(noise.view(), &device),
            options.learning_rate,
        )
        .map_err(GanError::Tensor)?;
        generator = next_generator;

        if !d_loss.is_finite() || !g_loss.is_finite() {
            return Err(GanError::Diverged { epoch });
        }
        let losses = GanEpochLosses {
            epoch,
            discriminator_loss: d_loss,
            generator_loss: g_loss,
        };
        if should_log(epoch, options.log_every) {
            info!(
                "Epoch {}/{} | D-loss: {:.4} | G-loss: {:.4}",
                epoch, options.epochs, d_loss, g_loss
            );
        } else {
            debug!(?losses, "gan epoch");
        }
        history.push(losses);
    }

    Ok(GanTraining {
        generator: TrainedGenerator {
            model: generator.valid(),
            latent_dim: options.latent_dim,
            output: options.output,
            device,
        },
        history,
    })
}

/// One step on the real batch (target 1), then one on the fake batch (target 0).
///
/// Returns the updated discriminator and the mean of the two losses.
pub(crate) fn discriminator_step<B, O>(
    discriminator: Discriminator<B>,
    optim: &mut O,
    real: Tensor<B, 2>,
    fake: Tensor<B, 2>,
    learning_rate: f64,
) -> Result<(Discriminator<B>, f32), String>
where
    B: AutodiffBackend,
    O: Optimizer<Discriminator<B>, B>,
{
    let device = real.device();
    let [real_rows, _] = real.dims();
    let [fake_rows, _] = fake.dims();

    let real_loss = binary_cross_entropy(
        discriminator.forward(real),
        Tensor::<B, 2>::ones([real_rows, 1], &device),
    );
    let real_value = scalar_of(real_loss.clone())?;
    let grads = GradientsParams::from_grads(real_loss.backward(), &discriminator);
    let discriminator = optim.step(learning_rate, discriminator, grads);

    let fake_loss = binary_cross_entropy(
        discriminator.forward(fake),
        Tensor::<B, 2>::zeros([fake_rows, 1], &device),
    );
    let fake_value = scalar_of(fake_loss.clone())?;
    let grads = GradientsParams::from_grads(fake_loss.backward(), &discriminator);
    let discriminator = optim.step(learning_rate, discriminator, grads);

    Ok((discriminator, 0.5 * (real_value + fake_value)))
}

/// Non-saturating generator update through a read-only discriminator.
///
/// The discriminator is cloned with gradient tracking disabled and only the
/// generator's gradients are handed to the generator's optimizer.
pub(crate) fn generator_step<B, O>(
    generator: Generator<B>,
    discriminator: &Discriminator<B>,
    optim: &mut O,
    noise: Tensor<B, 2>,
    learning_rate: f64,
) -> Result<(Generator<B>, f32), String>
where
    B: AutodiffBackend,
    O: Optimizer<Generator<B>, B>,
{
    let device = noise.device();
    let [rows, _] = noise.dims();
    let frozen = discriminator.clone().no_grad();
    let scores = frozen.forward(generator.forward(noise));
    let loss = binary_cross_entropy(scores, Tensor::<B, 2>::ones([rows, 1], &device));
    let value = scalar_of(loss.clone())?;
    let grads = GradientsParams::from_grads(loss.backward(), &generator);
    Ok((optim.step(learning_rate, generator, grads), value))
}

/// `rows` standard-normal latent vectors.
pub fn sample_latent(rows: usize, latent_dim: usize, rng: &mut StdRng) -> Array2<f32> {
    Array2::from_shape_simple_fn((rows, latent_dim), || rng.sample::<f32, _>(StandardNormal))
}

/// Uniform draw of `count` rows, with replacement.
pub(crate) fn sample_rows_with_replacement(
    rows: ArrayView2<'_, f32>,
    count: usize,
    rng: &mut StdRng,
) -> Array2<f32> {
    let indices: Vec<usize> = (0..count)
        .map(|_| rng.random_range(0..rows.nrows()))
        .collect();
    rows.select(Axis(0), &indices)
}

fn should_log(epoch: usize, every: usize) -> bool {
    epoch == 1 || (every > 0 && epoch % every == 0)
}
