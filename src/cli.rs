//! Command-line flags shared by the binaries.

use std::path::{Path, PathBuf};

use crate::app_dirs::{AppDirError, AppDirs};
use crate::config::{self, ConfigError, PipelineConfig};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "attrition.toml";

/// Flags that override the configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    pub data: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub seed: Option<u64>,
    pub gan_epochs: Option<usize>,
    pub epochs: Option<usize>,
}

impl CliOptions {
    /// Load the config file (explicit or default) and apply the flags on top.
    pub fn load_config(&self) -> Result<PipelineConfig, ConfigError> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if self.config.is_some() && !path.exists() {
            return Err(ConfigError::Read {
                path,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
            });
        }
        let mut config = config::load_or_default(&path)?;
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(data) = &self.data {
            config.data.path = Some(data.clone());
        }
        if let Some(out) = &self.out {
            config.output_dir = Some(out.clone());
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(epochs) = self.gan_epochs {
            config.gan.epochs = epochs;
        }
        if let Some(epochs) = self.epochs {
            config.classifier.epochs = epochs;
        }
    }
}

/// Output directory from the config, else `<app root>/runs`.
pub fn resolve_output_dir(config: &PipelineConfig) -> Result<PathBuf, AppDirError> {
    match &config.output_dir {
        Some(dir) => Ok(dir.clone()),
        None => AppDirs::discover()?.runs_dir(),
    }
}

/// Log directory under the app root, falling back to `<out>/logs`.
pub fn resolve_log_dir(out_dir: &Path) -> PathBuf {
    AppDirs::discover()
        .and_then(|dirs| dirs.logs_dir())
        .unwrap_or_else(|_| out_dir.join("logs"))
}

pub fn parse_args(args: Vec<String>, usage: &str) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "-h" | "--help" => return Err(help_text(usage)),
            "--data" | "--config" | "--out" | "--seed" | "--gan-epochs" | "--epochs" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| format!("{flag} requires a value"))?;
                match flag {
                    "--data" => options.data = Some(PathBuf::from(value)),
                    "--config" => options.config = Some(PathBuf::from(value)),
                    "--out" => options.out = Some(PathBuf::from(value)),
                    "--seed" => options.seed = Some(parse_number(flag, value)?),
                    "--gan-epochs" => options.gan_epochs = Some(parse_number(flag, value)?),
                    _ => options.epochs = Some(parse_number(flag, value)?),
                }
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text(usage))),
        }
        idx += 1;
    }
    Ok(options)
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

pub fn help_text(usage: &str) -> String {
    [
        usage,
        "",
        "Options:",
        "  --data <csv>          Input HR attrition CSV (overrides [data].path).",
        "  --config <toml>       Pipeline config (default ./attrition.toml when present).",
        "  --out <dir>           Output directory (default <app root>/runs).",
        "  --seed <n>            Seed for every component RNG (default 42).",
        "  --gan-epochs <n>      GAN training epochs (default 1000).",
        "  --epochs <n>          Classifier training epochs (default 50).",
        "",
        "Set ATTRITION_GAN_HOME to relocate logs and default outputs.",
        "Set RUST_LOG to change log verbosity (default info).",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn parses_every_flag() {
        let options = parse_args(
            args(&[
                "--data", "hr.csv", "--config", "run.toml", "--out", "out", "--seed", "7",
                "--gan-epochs", "20", "--epochs", "3",
            ]),
            "usage",
        )
        .unwrap();
        assert_eq!(options.data, Some(PathBuf::from("hr.csv")));
        assert_eq!(options.config, Some(PathBuf::from("run.toml")));
        assert_eq!(options.out, Some(PathBuf::from("out")));
        assert_eq!(options.seed, Some(7));
        assert_eq!(options.gan_epochs, Some(20));
        assert_eq!(options.epochs, Some(3));
    }

    #[test]
    fn rejects_missing_values_and_unknown_flags() {
        assert_eq!(
            parse_args(args(&["--seed"]), "usage").unwrap_err(),
            "--seed requires a value"
        );
        assert!(parse_args(args(&["--epochs", "many"]), "usage")
            .unwrap_err()
            .starts_with("Invalid --epochs value"));
        assert!(parse_args(args(&["--verbose"]), "usage")
            .unwrap_err()
            .starts_with("Unknown argument: --verbose"));
    }

    #[test]
    fn flags_override_config_values() {
        let mut config = PipelineConfig::default();
        let options = CliOptions {
            seed: Some(9),
            gan_epochs: Some(12),
            data: Some(PathBuf::from("x.csv")),
            ..CliOptions::default()
        };
        options.apply(&mut config);
        assert_eq!(config.seed, 9);
        assert_eq!(config.gan.epochs, 12);
        assert_eq!(config.classifier.epochs, 50);
        assert_eq!(config.data.path, Some(PathBuf::from("x.csv")));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let options = CliOptions {
            config: Some(PathBuf::from("/definitely/not/here.toml")),
            ..CliOptions::default()
        };
        assert!(matches!(options.load_config(), Err(ConfigError::Read { .. })));
    }
}
