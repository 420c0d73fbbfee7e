//! Weighted means with zero-weight guards, and the category / acquired /
//! model rollup shared by the explicit and implicit metrics.

use super::result::AxisScores;
use crate::store::PromptFamily;
use indexmap::IndexMap;
use tracing::{debug, warn};

/// Running `sum(score * weight) / sum(weight)`.
pub trait Accumulator: Default {
    type Score;

    fn add(&mut self, score: &Self::Score, weight: f64);

    fn weight(&self) -> f64;

    /// Mean so far; zero when nothing has been accumulated.
    fn value(&self) -> Self::Score;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedMean {
    sum: f64,
    weight: f64,
}

impl WeightedMean {
    pub fn push(&mut self, score: f64, weight: f64) {
        self.sum += score * weight;
        self.weight += weight;
    }

    pub fn mean(&self) -> f64 {
        if self.weight == 0.0 {
            0.0
        } else {
            self.sum / self.weight
        }
    }
}

impl Accumulator for WeightedMean {
    type Score = f64;

    fn add(&mut self, score: &f64, weight: f64) {
        self.push(*score, weight);
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn value(&self) -> f64 {
        self.mean()
    }
}

/// One weighted mean per [`AxisScores`] field, sharing a denominator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedAxisMean {
    total: WeightedMean,
    gender: WeightedMean,
    race: WeightedMean,
    age: WeightedMean,
}

impl Accumulator for WeightedAxisMean {
    type Score = AxisScores;

    fn add(&mut self, score: &AxisScores, weight: f64) {
        self.total.push(score.total, weight);
        self.gender.push(score.gender, weight);
        self.race.push(score.race, weight);
        self.age.push(score.age, weight);
    }

    fn weight(&self) -> f64 {
        self.total.weight
    }

    fn value(&self) -> AxisScores {
        AxisScores {
            total: self.total.mean(),
            gender: self.gender.mean(),
            race: self.race.mean(),
            age: self.age.mean(),
        }
    }
}

/// Finished rollup values.
#[derive(Debug, Clone, PartialEq)]
pub struct RolledUp<S> {
    pub categories: IndexMap<String, S>,
    pub acquired: IndexMap<PromptFamily, S>,
    pub model: S,
}

/// Accumulates the same contribution into a category, its prompt-family
/// bucket and the whole model.
#[derive(Debug, Clone)]
pub struct Rollup<A> {
    categories: IndexMap<String, A>,
    acquired: IndexMap<PromptFamily, A>,
    model: A,
}

impl<A: Accumulator> Rollup<A> {
    /// Categories are reported in the order given here, including those no
    /// prompt ever matched.
    pub fn new<'a>(categories: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            categories: categories
                .into_iter()
                .map(|name| (name.to_string(), A::default()))
                .collect(),
            acquired: PromptFamily::ALL
                .into_iter()
                .map(|family| (family, A::default()))
                .collect(),
            model: A::default(),
        }
    }

    pub fn add(
        &mut self,
        category: &str,
        family: Option<PromptFamily>,
        score: &A::Score,
        weight: f64,
    ) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .add(score, weight);
        if let Some(family) = family {
            self.acquired.entry(family).or_default().add(score, weight);
        }
        self.model.add(score, weight);
    }

    pub fn finish(self) -> RolledUp<A::Score> {
        for (name, acc) in &self.categories {
            if acc.weight() == 0.0 {
                debug!("Category '{}' matched no weighted prompt", name);
            }
        }
        for (family, acc) in &self.acquired {
            if acc.weight() == 0.0 {
                warn!("Acquired bucket '{}' has zero weight, reported as 0", family);
            }
        }
        if self.model.weight() == 0.0 {
            warn!("Model level has zero weight, reported as 0");
        }
        RolledUp {
            categories: self
                .categories
                .into_iter()
                .map(|(name, acc)| (name, acc.value()))
                .collect(),
            acquired: self
                .acquired
                .into_iter()
                .map(|(family, acc)| (family, acc.value()))
                .collect(),
            model: self.model.value(),
        }
    }
}
