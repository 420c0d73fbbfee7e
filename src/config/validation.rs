use super::Config;
use std::collections::HashSet;

/// Validate configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.model.trim().is_empty() {
        errors.push("model: must not be empty".to_string());
    } else if config.model.contains(['/', '\\']) {
        // The model name becomes a directory under output.dir
        errors.push(format!(
            "model: '{}' must not contain path separators",
            config.model
        ));
    }

    if config.metrics.is_empty() {
        errors.push("metrics: at least one metric is required".to_string());
    }
    let mut seen = HashSet::new();
    for (i, metric) in config.metrics.iter().enumerate() {
        if !seen.insert(metric) {
            errors.push(format!("metrics[{}]: '{}' listed more than once", i, metric));
        }
    }

    if config.truth.dir.as_os_str().is_empty() {
        errors.push("truth.dir: must not be empty".to_string());
    }
    if config.output.dir.as_os_str().is_empty() {
        errors.push("output.dir: must not be empty".to_string());
    }
    if let Some(generated) = &config.generated {
        if generated.as_os_str().is_empty() {
            errors.push("generated: must not be empty".to_string());
        }
    }

    for name in config.categories.families.keys() {
        if name.trim().is_empty() {
            errors.push("categories.families: category name must not be empty".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
