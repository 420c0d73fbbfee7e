use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::{get_config_path, Config};

const HEADER: &str = "\
# t2i-bias configuration
#
# generated: JSON file or directory of align_*.json shards (default ./aligned/<model>)
# truth.dir: directory holding eta.json, category.json, weight.json,
#            char_gt.json, oc_gt.json and sr_gt.json
# output.schema: legacy | v2
";

/// Write the default configuration as YAML and return where it went.
///
/// An existing file is only replaced when `force` is set.
pub fn write_default_config(path: Option<PathBuf>, force: bool) -> Result<PathBuf> {
    let config_path = match path {
        Some(path) => path,
        None => get_config_path()?,
    };

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {}. Pass --force to overwrite",
            config_path.display()
        );
    }

    let yaml = serde_saphyr::to_string(&Config::default())
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

    // Create parent directories
    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    std::fs::write(&config_path, format!("{}\n{}", HEADER, yaml))
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(config_path)
}
