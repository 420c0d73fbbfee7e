use super::types::{PromptFamily, SubjectDistribution};
use crate::error::{BiasError, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Shard file name pattern inside a generated-results directory.
pub const GENERATED_SHARD_PATTERN: &str = "align_*.json";

/// Locations of the persisted distributions.
#[derive(Debug, Clone, PartialEq)]
pub struct StorePaths {
    /// A single distribution file, or a directory of `align_*.json` shards.
    pub generated: PathBuf,
    pub characteristic: PathBuf,
    pub occupation: PathBuf,
    pub social_relation: PathBuf,
}

impl StorePaths {
    pub fn reference(&self, family: PromptFamily) -> &Path {
        match family {
            PromptFamily::Characteristic => &self.characteristic,
            PromptFamily::Occupation => &self.occupation,
            PromptFamily::SocialRelation => &self.social_relation,
        }
    }
}

/// Convert an on-disk prompt key (directory name) to its prompt text.
pub fn normalize_prompt_key(raw: &str) -> String {
    raw.replace('_', " ")
}

/// Read one JSON table.
///
/// An absent file is a `MissingRecord`; a file of the wrong shape is a
/// `MalformedTable`.
pub fn read_json_table<T: DeserializeOwned>(table: &str, path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(BiasError::missing(table, path));
    }
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| BiasError::malformed(table, format!("{} ({})", e, path.display())))
}

/// Read a prompt -> distribution table record by record.
///
/// The table must be a JSON object; anything else is a `MalformedTable`.
/// A record that does not parse as a distribution is skipped with a warning.
pub fn read_distribution_table(
    table: &str,
    path: &Path,
) -> Result<IndexMap<String, SubjectDistribution>> {
    let raw: IndexMap<String, serde_json::Value> = read_json_table(table, path)?;
    let mut records = IndexMap::with_capacity(raw.len());
    for (key, value) in raw {
        match serde_json::from_value::<SubjectDistribution>(value) {
            Ok(dist) => {
                records.insert(normalize_prompt_key(&key), dist);
            }
            Err(e) => warn!("{} [{}]: skipped malformed record: {}", key, table, e),
        }
    }
    Ok(records)
}

/// Load generated distributions from a file or a directory of shards.
///
/// Shards are merged in lexical file order; a later shard overrides a prompt
/// already seen.
pub fn load_generated(path: &Path) -> Result<IndexMap<String, SubjectDistribution>> {
    let files = if path.is_dir() {
        let pattern = path.join(GENERATED_SHARD_PATTERN);
        let mut shards: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
            .filter_map(|entry| entry.ok())
            .collect();
        shards.sort();
        if shards.is_empty() {
            return Err(BiasError::missing("generated", pattern));
        }
        shards
    } else {
        vec![path.to_path_buf()]
    };

    let mut generated = IndexMap::new();
    for file in &files {
        let shard = read_distribution_table("generated", file)?;
        debug!("Loaded {} prompts from {}", shard.len(), file.display());
        generated.extend(shard);
    }
    info!(
        "Loaded {} generated prompts from {} file(s)",
        generated.len(),
        files.len()
    );
    Ok(generated)
}

pub fn load_reference(
    family: PromptFamily,
    path: &Path,
) -> Result<IndexMap<String, SubjectDistribution>> {
    let table = read_distribution_table(family.as_str(), path)?;
    debug!("Loaded {} {} reference prompts", table.len(), family);
    Ok(table)
}
