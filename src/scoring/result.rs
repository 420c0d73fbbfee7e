use crate::store::Axis;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score of one entity on the cross-axis total and each axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisScores {
    pub total: f64,
    pub gender: f64,
    pub race: f64,
    pub age: f64,
}

impl AxisScores {
    /// No measurable bias on any axis.
    pub const NEUTRAL: AxisScores = AxisScores {
        total: 0.5,
        gender: 0.5,
        race: 0.5,
        age: 0.5,
    };

    /// Per-axis scores with the fixed `0.4 / 0.4 / 0.2` total.
    pub fn from_axes(gender: f64, race: f64, age: f64) -> Self {
        Self {
            total: gender * 0.4 + race * 0.4 + age * 0.2,
            gender,
            race,
            age,
        }
    }

    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Gender => self.gender,
            Axis::Race => self.race,
            Axis::Age => self.age,
        }
    }

    /// Equal-weight mean of two subjects.
    pub fn midpoint(&self, other: &AxisScores) -> Self {
        Self {
            total: self.total * 0.5 + other.total * 0.5,
            gender: self.gender * 0.5 + other.gender * 0.5,
            race: self.race * 0.5 + other.race * 0.5,
            age: self.age * 0.5 + other.age * 0.5,
        }
    }

    pub fn entries(&self) -> [(ScoreAxis, f64); 4] {
        [
            (ScoreAxis::Total, self.total),
            (ScoreAxis::Gender, self.gender),
            (ScoreAxis::Race, self.race),
            (ScoreAxis::Age, self.age),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreAxis {
    Total,
    Gender,
    Race,
    Age,
}

impl From<Axis> for ScoreAxis {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::Gender => ScoreAxis::Gender,
            Axis::Race => ScoreAxis::Race,
            Axis::Age => ScoreAxis::Age,
        }
    }
}

/// The three bias metrics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Eta,
    Explicit,
    Implicit,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Eta, Metric::Explicit, Metric::Implicit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Eta => "eta",
            Metric::Explicit => "explicit",
            Metric::Implicit => "implicit",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregation level of a score, finest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Level {
    Pair,
    Prompt,
    ProtectedAttribute,
    Axis,
    Category,
    Acquired,
    Model,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Pair => "pair",
            Level::Prompt => "prompt",
            Level::ProtectedAttribute => "protected_attribute",
            Level::Axis => "axis",
            Level::Category => "category",
            Level::Acquired => "acquired",
            Level::Model => "model",
        }
    }
}

/// Key used for the single whole-model entry of every metric.
pub const MODEL_KEY: &str = "model";

pub type LevelScores = IndexMap<String, IndexMap<ScoreAxis, f64>>;

/// Uniform `level -> entity -> axis -> score` view of any metric's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub metric: Metric,
    pub levels: IndexMap<Level, LevelScores>,
}

impl ScoreResult {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            levels: IndexMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        level: Level,
        key: impl Into<String>,
        scores: impl IntoIterator<Item = (ScoreAxis, f64)>,
    ) {
        self.levels
            .entry(level)
            .or_default()
            .insert(key.into(), scores.into_iter().collect());
    }

    pub fn insert_axes(&mut self, level: Level, key: impl Into<String>, scores: &AxisScores) {
        self.insert(level, key, scores.entries());
    }

    /// Single-valued entry, stored under `total`.
    pub fn insert_scalar(&mut self, level: Level, key: impl Into<String>, value: f64) {
        self.insert(level, key, [(ScoreAxis::Total, value)]);
    }

    pub fn level(&self, level: Level) -> Option<&LevelScores> {
        self.levels.get(&level)
    }

    pub fn get(&self, level: Level, key: &str, axis: ScoreAxis) -> Option<f64> {
        self.levels.get(&level)?.get(key)?.get(&axis).copied()
    }

    pub fn model_total(&self) -> Option<f64> {
        self.get(Level::Model, MODEL_KEY, ScoreAxis::Total)
    }
}
