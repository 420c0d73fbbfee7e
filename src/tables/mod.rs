//! Pair, category and weight tables shared by the scoring engines.

pub mod validation;

pub use validation::validate_tables;

use crate::error::Result;
use crate::store::loader::read_json_table;
use crate::store::PromptFamily;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Occupation category names of the benchmark's category table.
pub const OCCUPATION_CATEGORIES: [&str; 15] = [
    "Management, Business, and Financial",
    "Computer, Engineering, and Science",
    "Political and Legal",
    "Education Occupations",
    "Sports",
    "Arts, Design, and Media",
    "Healthcare",
    "Protective Service",
    "Food Preparation and Serving",
    "Sales and Office",
    "Natural Resources, Construction, and Maintenance",
    "Production",
    "Transportation and Material Moving",
    "Other Service",
    "Unofficial",
];

/// Built-in family of a category name.
pub fn classify_category(name: &str) -> Option<PromptFamily> {
    match name {
        "positive" | "negative" => Some(PromptFamily::Characteristic),
        "equal" | "hira" | "instr" => Some(PromptFamily::SocialRelation),
        _ if OCCUPATION_CATEGORIES.contains(&name) => Some(PromptFamily::Occupation),
        _ => None,
    }
}

/// One contrast pair: `[[positive stem, negative stem], weight]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairEntry(pub [String; 2], pub f64);

impl PairEntry {
    pub fn new(positive: &str, negative: &str, weight: f64) -> Self {
        PairEntry([positive.to_string(), negative.to_string()], weight)
    }

    pub fn positive(&self) -> &str {
        &self.0[0]
    }

    pub fn negative(&self) -> &str {
        &self.0[1]
    }

    pub fn weight(&self) -> f64 {
        self.1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairTable {
    pairs: IndexMap<String, PairEntry>,
}

impl PairTable {
    pub fn insert(&mut self, id: &str, entry: PairEntry) {
        self.pairs.insert(id.to_string(), entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PairEntry)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Prompt (or prompt-family key) -> non-negative weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable {
    weights: IndexMap<String, f64>,
}

impl WeightTable {
    pub fn insert(&mut self, key: &str, weight: f64) {
        self.weights.insert(key.to_string(), weight);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.weights.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, f64)> for WeightTable {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        let mut table = WeightTable::default();
        for (key, weight) in iter {
            table.insert(key, weight);
        }
        table
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub family: Option<PromptFamily>,
    pub keys: Vec<String>,
}

/// Categories in file order, each tagged with its prompt family.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTable {
    categories: Vec<Category>,
}

impl CategoryTable {
    /// Tag raw `name -> keys` entries; `overrides` win over the built-in
    /// classification.
    pub fn from_raw(
        raw: IndexMap<String, Vec<String>>,
        overrides: &IndexMap<String, PromptFamily>,
    ) -> Self {
        let categories = raw
            .into_iter()
            .map(|(name, keys)| {
                let family = overrides
                    .get(&name)
                    .copied()
                    .or_else(|| classify_category(&name));
                if family.is_none() {
                    debug!("Category '{}' has no prompt family", name);
                }
                Category { name, family, keys }
            })
            .collect();
        Self { categories }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Locations of the pair, category and weight tables.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePaths {
    pub pairs: PathBuf,
    pub categories: PathBuf,
    pub weights: PathBuf,
}

/// Immutable tables for one run, built once and handed to every engine.
#[derive(Debug, Clone, Default)]
pub struct TruthTables {
    pub pairs: PairTable,
    pub categories: CategoryTable,
    pub weights: WeightTable,
}

impl TruthTables {
    pub fn load(paths: &TablePaths, overrides: &IndexMap<String, PromptFamily>) -> Result<Self> {
        let pairs: PairTable = read_json_table("pairs", &paths.pairs)?;
        let raw_categories: IndexMap<String, Vec<String>> =
            read_json_table("categories", &paths.categories)?;
        let weights: WeightTable = read_json_table("weights", &paths.weights)?;
        debug!(
            "Loaded {} pairs, {} categories, {} weights",
            pairs.len(),
            raw_categories.len(),
            weights.len()
        );
        Ok(Self {
            pairs,
            categories: CategoryTable::from_raw(raw_categories, overrides),
            weights,
        })
    }

    pub fn load_from_dir(dir: &Path, overrides: &IndexMap<String, PromptFamily>) -> Result<Self> {
        Self::load(
            &TablePaths {
                pairs: dir.join("eta.json"),
                categories: dir.join("category.json"),
                weights: dir.join("weight.json"),
            },
            overrides,
        )
    }
}
