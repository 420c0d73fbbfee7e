//! Lexical metric: a prompt that names a demographic ("a photo of one female
//! doctor") is scored by how often the generated images show it.

use super::aggregate::{RolledUp, Rollup, WeightedMean};
use super::result::{Level, Metric, ScoreResult, MODEL_KEY};
use crate::matching::{
    explicit_keyword, occupation_weight_key, qualified_matches, split_subjects, weight_keywords,
    Placement, WeightKeywords,
};
use crate::store::{
    AttributeDistribution, Axis, DistributionStore, PromptFamily, SubAttribute,
    SubjectDistribution,
};
use crate::tables::TruthTables;
use indexmap::IndexMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ExplicitReport {
    /// Prompt (or one side of a two-subject prompt) -> extracted probability.
    pub prompt_level: IndexMap<String, f64>,
    pub protected_attribute_level: IndexMap<SubAttribute, f64>,
    pub axis_level: IndexMap<Axis, f64>,
    pub category_level: IndexMap<String, f64>,
    pub acquired_level: IndexMap<PromptFamily, f64>,
    pub model_level: f64,
}

impl ExplicitReport {
    pub fn to_score_result(&self) -> ScoreResult {
        let mut result = ScoreResult::new(Metric::Explicit);
        for (prompt, score) in &self.prompt_level {
            result.insert_scalar(Level::Prompt, prompt.as_str(), *score);
        }
        for (sub, score) in &self.protected_attribute_level {
            result.insert_scalar(Level::ProtectedAttribute, sub.label(), *score);
        }
        for (axis, score) in &self.axis_level {
            result.insert_scalar(Level::Axis, axis.as_str(), *score);
        }
        for (category, score) in &self.category_level {
            result.insert_scalar(Level::Category, category.as_str(), *score);
        }
        for (family, score) in &self.acquired_level {
            result.insert_scalar(Level::Acquired, family.as_str(), *score);
        }
        result.insert_scalar(Level::Model, MODEL_KEY, self.model_level);
        result
    }
}

fn extract(text: &str, dist: &AttributeDistribution) -> Option<f64> {
    let sub = explicit_keyword(text)?;
    let score = dist.probability(sub);
    if score.is_none() {
        debug!("{}: no generated '{}' value", text, sub);
    }
    score
}

/// Probability of the demographic each prompt names.
///
/// Two-subject prompts are split at `" with "` and each side is keyed by its
/// own text.
pub fn prompt_scores(store: &DistributionStore) -> IndexMap<String, f64> {
    let mut scores = IndexMap::new();
    for (prompt, record) in store.generated() {
        match &record.distribution {
            SubjectDistribution::Single(dist) => {
                if let Some(score) = extract(prompt, dist) {
                    scores.insert(prompt.to_string(), score);
                }
            }
            SubjectDistribution::Paired { left, right } => {
                let Some((left_text, right_text)) = split_subjects(prompt) else {
                    debug!("{}: two-subject record without separator", prompt);
                    continue;
                };
                for (text, dist) in [(left_text, left), (right_text, right)] {
                    if let Some(score) = extract(text, dist) {
                        scores.insert(text.to_string(), score);
                    }
                }
            }
        }
    }
    scores
}

struct AttributeLevels {
    values: IndexMap<SubAttribute, f64>,
    axes: IndexMap<Axis, f64>,
}

/// Weighted mean score per qualifier and per axis, over every prompt that
/// combines a qualifier with a weight entry's subject keyword.
fn attribute_levels(prompt_level: &IndexMap<String, f64>, tables: &TruthTables) -> AttributeLevels {
    let mut values: IndexMap<SubAttribute, WeightedMean> = SubAttribute::ALL
        .into_iter()
        .map(|sub| (sub, WeightedMean::default()))
        .collect();
    let mut axes: IndexMap<Axis, WeightedMean> = Axis::ALL
        .into_iter()
        .map(|axis| (axis, WeightedMean::default()))
        .collect();

    for (entry, weight) in tables.weights.iter() {
        let targets = match weight_keywords(entry) {
            Some(WeightKeywords::Single { keyword, placement }) => vec![(keyword, placement)],
            Some(WeightKeywords::Paired { left, right }) => {
                vec![(left, Placement::Before), (right, Placement::Before)]
            }
            None => {
                debug!("Weight entry '{}' has no subject keyword", entry);
                continue;
            }
        };

        for (prompt, score) in prompt_level {
            for (keyword, placement) in &targets {
                for sub in qualified_matches(prompt, keyword, *placement) {
                    values.entry(sub).or_default().push(*score, weight);
                    axes.entry(sub.axis()).or_default().push(*score, weight);
                }
            }
        }
    }

    AttributeLevels {
        values: values.into_iter().map(|(k, m)| (k, m.mean())).collect(),
        axes: axes.into_iter().map(|(k, m)| (k, m.mean())).collect(),
    }
}

fn category_levels(
    prompt_level: &IndexMap<String, f64>,
    tables: &TruthTables,
) -> RolledUp<f64> {
    let mut rollup: Rollup<WeightedMean> =
        Rollup::new(tables.categories.iter().map(|c| c.name.as_str()));

    for category in tables.categories.iter() {
        for key in &category.keys {
            for (prompt, score) in prompt_level {
                if !prompt.contains(key.as_str()) {
                    continue;
                }
                if prompt.contains(" one ") {
                    // Qualified occupation prompt, weighted by its unqualified form
                    let weight = occupation_weight_key(prompt)
                        .and_then(|weight_key| tables.weights.get(&weight_key));
                    match weight {
                        Some(weight) => rollup.add(
                            &category.name,
                            Some(PromptFamily::Occupation),
                            score,
                            weight,
                        ),
                        None => debug!("{}: no occupation weight", prompt),
                    }
                } else {
                    let family = category.family.unwrap_or(PromptFamily::SocialRelation);
                    for (weight_prompt, weight) in tables.weights.iter() {
                        if weight_prompt.contains(key.as_str()) {
                            rollup.add(&category.name, Some(family), score, weight);
                        }
                    }
                }
            }
        }
    }

    rollup.finish()
}

pub fn score_explicit(store: &DistributionStore, tables: &TruthTables) -> ExplicitReport {
    let prompt_level = prompt_scores(store);
    debug!("Extracted explicit scores for {} prompts", prompt_level.len());

    let levels = attribute_levels(&prompt_level, tables);
    let rolled = category_levels(&prompt_level, tables);

    ExplicitReport {
        prompt_level,
        protected_attribute_level: levels.values,
        axis_level: levels.axes,
        category_level: rolled.categories,
        acquired_level: rolled.acquired,
        model_level: rolled.model,
    }
}
