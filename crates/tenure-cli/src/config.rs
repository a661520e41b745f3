//! # Config Subcommand
//!
//! Loads the engine configuration the same way every other subcommand does
//! (YAML file, then environment overrides, then validation) and prints the
//! effective result.
//!
//! ```bash
//! tenure --config tenure.yaml config
//! TENURE_UTC_OFFSET_MINUTES=420 tenure config --format json
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};

use tenure_lifecycle::EngineConfig;

/// Output encoding for the effective configuration.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// YAML, as accepted by `--config`.
    #[default]
    Yaml,
    /// JSON.
    Json,
}

/// Config subcommand arguments.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Output encoding.
    #[arg(long, value_enum, default_value_t = ConfigFormat::Yaml)]
    pub format: ConfigFormat,
}

/// Load the engine configuration from `path` (defaults when absent), apply
/// environment overrides and validate.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            EngineConfig::from_yaml_str(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    config
        .apply_env()
        .context("invalid environment override")?;

    let errors = config.validate();
    if !errors.is_empty() {
        bail!("invalid engine configuration: {}", errors.join("; "));
    }
    tracing::debug!(?config, "engine configuration loaded");
    Ok(config)
}

/// Execute the config subcommand.
pub fn run_config(args: &ConfigArgs, config_path: Option<&Path>) -> Result<u8> {
    let config = load_engine_config(config_path)?;
    let rendered = match args.format {
        ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
    };
    println!("{}", rendered.trim_end());
    Ok(0)
}
