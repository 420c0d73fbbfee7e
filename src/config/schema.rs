use crate::output::OutputSchema;
use crate::scoring::Metric;
use crate::store::{PromptFamily, StorePaths};
use crate::tables::TablePaths;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Benchmark configuration.
///
/// Example YAML:
/// ```yaml
/// model: lcm
/// generated: ./aligned/lcm
/// truth:
///   dir: ./data/truth
///   weights: ./data/truth/weight_v2.json
/// output:
///   dir: ./result
///   schema: v2
/// metrics: [eta, implicit]
/// categories:
///   families:
///     Hobbies: characteristic
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Name of the evaluated model; artifacts land in `<output.dir>/<model>/`.
    pub model: String,

    /// Generated distributions: one JSON file, or a directory of
    /// `align_*.json` shards. Defaults to `./aligned/<model>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<PathBuf>,

    #[serde(default)]
    pub truth: TruthPaths,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default = "default_metrics")]
    pub metrics: Vec<Metric>,

    #[serde(default)]
    pub categories: CategoryOverrides,
}

fn default_metrics() -> Vec<Metric> {
    Metric::ALL.to_vec()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "lcm".to_string(),
            generated: None,
            truth: TruthPaths::default(),
            output: OutputConfig::default(),
            metrics: default_metrics(),
            categories: CategoryOverrides::default(),
        }
    }
}

impl Config {
    pub fn generated_path(&self) -> PathBuf {
        self.generated
            .clone()
            .unwrap_or_else(|| PathBuf::from("./aligned").join(&self.model))
    }

    pub fn store_paths(&self) -> StorePaths {
        StorePaths {
            generated: self.generated_path(),
            characteristic: self.truth.resolve(&self.truth.characteristic, "char_gt.json"),
            occupation: self.truth.resolve(&self.truth.occupation, "oc_gt.json"),
            social_relation: self.truth.resolve(&self.truth.social_relation, "sr_gt.json"),
        }
    }

    pub fn table_paths(&self) -> TablePaths {
        TablePaths {
            pairs: self.truth.resolve(&self.truth.pairs, "eta.json"),
            categories: self.truth.resolve(&self.truth.categories, "category.json"),
            weights: self.truth.resolve(&self.truth.weights, "weight.json"),
        }
    }

    /// `<output.dir>/<model>`
    pub fn model_output_dir(&self) -> PathBuf {
        self.output.dir.join(&self.model)
    }
}

/// Truth tables. Each table defaults to its conventional file name inside
/// `dir`; an explicit path overrides it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TruthPaths {
    #[serde(default = "default_truth_dir")]
    pub dir: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairs: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characteristic: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_relation: Option<PathBuf>,
}

fn default_truth_dir() -> PathBuf {
    PathBuf::from("./data/truth")
}

impl Default for TruthPaths {
    fn default() -> Self {
        Self {
            dir: default_truth_dir(),
            pairs: None,
            categories: None,
            weights: None,
            characteristic: None,
            occupation: None,
            social_relation: None,
        }
    }
}

impl TruthPaths {
    fn resolve(&self, explicit: &Option<PathBuf>, file_name: &str) -> PathBuf {
        explicit
            .clone()
            .unwrap_or_else(|| self.dir.join(file_name))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// File naming of the persisted artifacts (default: legacy)
    #[serde(default)]
    pub schema: OutputSchema,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./result")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            schema: OutputSchema::default(),
        }
    }
}

/// Extra category name -> prompt family tags, applied over the built-in
/// classification.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CategoryOverrides {
    #[serde(default)]
    pub families: IndexMap<String, PromptFamily>,
}
