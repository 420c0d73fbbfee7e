mod init;
mod schema;
mod validation;

pub use init::write_default_config;
pub use schema::{CategoryOverrides, Config, OutputConfig, TruthPaths};
pub use validation::validate_config;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Get the config directory path (~/.config/t2i-bias/)
pub fn get_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("t2i-bias"))
}

/// Get the default config file path (~/.config/t2i-bias/config.yaml)
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.yaml"))
}

/// Load configuration from a YAML file
///
/// An explicitly given `path` must exist. Without one, the default
/// location is tried and built-in defaults are used if nothing is there.
///
/// # Errors
///
/// Returns an error if:
/// - An explicit config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found at {}", path.display());
            }
            path
        }
        None => match get_config_path() {
            Ok(path) if path.exists() => path,
            Ok(path) => {
                info!(
                    "No config at {}, using built-in defaults",
                    path.display()
                );
                return Ok(Config::default());
            }
            Err(e) => {
                debug!("{:#}", e);
                info!("Using built-in defaults");
                return Ok(Config::default());
            }
        },
    };

    read_config(&config_path)
}

fn read_config(config_path: &Path) -> Result<Config> {
    let config_content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content).with_context(|| {
        format!(
            "Failed to parse config: invalid YAML in {}",
            config_path.display()
        )
    })?;

    debug!("Loaded config from {}", config_path.display());
    Ok(config)
}
