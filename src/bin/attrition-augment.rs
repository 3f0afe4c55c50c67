//! Oversample the minority class with the GAN and write the balanced CSV only.

use attrition_gan::{cli, logging, pipeline};

const USAGE: &str = "attrition-augment --data <csv> [--config <toml>] [--out <dir>]";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = cli::parse_args(std::env::args().skip(1).collect(), USAGE)?;
    let config = options.load_config().map_err(|err| err.to_string())?;
    let out_dir = cli::resolve_output_dir(&config).map_err(|err| err.to_string())?;
    if let Err(err) = logging::init(&cli::resolve_log_dir(&out_dir)) {
        eprintln!("File logging disabled: {err}");
    }

    let outcome = pipeline::oversample(&config, &out_dir).map_err(|err| err.to_string())?;
    let (negative, positive) = outcome.balanced.class_counts();
    println!(
        "original: {} / {}  balanced: {negative} / {positive}  synthetic: {}",
        outcome.original_counts.negative,
        outcome.original_counts.positive,
        outcome.balanced.synthetic_count()
    );
    if let Some(last) = outcome.gan_history.last() {
        println!(
            "final GAN losses: D {:.4}  G {:.4}",
            last.discriminator_loss, last.generator_loss
        );
    }
    println!("balanced dataset: {}", outcome.balanced_path.display());
    Ok(())
}
