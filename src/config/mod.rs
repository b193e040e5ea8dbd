mod schema;

pub use schema::Config;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::dataset::InputPaths;
use crate::scoring::OptionAlphabet;

/// Get the config directory path (~/.config/sqa-flip/)
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("sqa-flip"))
}

/// Get the default config file path (~/.config/sqa-flip/config.yaml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.yaml"))
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses the default path
///   (~/.config/sqa-flip/config.yaml) and treats a missing file as an empty config.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed or has unknown keys
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                anyhow::bail!("Config file not found at {}", p.display());
            }
            p
        }
        None => match get_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(Config::default()),
        },
    };

    parse_config_file(&config_path)
}

fn parse_config_file(config_path: &Path) -> Result<Config> {
    let config_content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    if config_content.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_saphyr::from_str(&config_content).with_context(|| {
        format!(
            "Failed to parse config: invalid YAML in {}",
            config_path.display()
        )
    })?;

    Ok(config)
}

/// Fully resolved settings for a scoring run
#[derive(Debug, Clone)]
pub struct ScoreSettings {
    pub inputs: InputPaths,
    pub output_file: PathBuf,
    pub output_result: PathBuf,
    pub alphabet: OptionAlphabet,
    pub seed: Option<u64>,
}

fn require(value: Option<PathBuf>, flag: &str, key: &str) -> Result<PathBuf> {
    value.with_context(|| format!("Missing --{} (or `{}` in the config file)", flag, key))
}

impl ScoreSettings {
    /// Check that every required path is present and the alphabet parses
    pub fn from_config(config: Config) -> Result<Self> {
        let base_dir = require(config.base_dir, "base-dir", "base_dir")?;
        let result_file = require(config.result_file, "result-file", "result_file")?;
        let attack_file = require(config.attack_file, "attack-file", "attack_file")?;
        let output_file = require(config.output_file, "output-file", "output_file")?;
        let output_result = require(config.output_result, "output-result", "output_result")?;

        let alphabet = match config.options {
            Some(options) => options
                .parse::<OptionAlphabet>()
                .map_err(anyhow::Error::msg)
                .context("Invalid options")?,
            None => OptionAlphabet::default(),
        };

        Ok(Self {
            inputs: InputPaths::new(&base_dir, &result_file, &attack_file),
            output_file,
            output_result,
            alphabet,
            seed: config.seed,
        })
    }
}
