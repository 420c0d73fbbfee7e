use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Protected-attribute dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Gender,
    Race,
    Age,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Gender, Axis::Race, Axis::Age];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Gender => "gender",
            Axis::Race => "race",
            Axis::Age => "age",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete value on one axis, as labelled by the annotator.
///
/// Serialized with the annotator's labels (`male`, `East Asian`, `0-30`, ...)
/// so it can key the persisted alpha and protected-attribute tables directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubAttribute {
    #[serde(rename = "male")]
    Male,
    #[serde(rename = "female")]
    Female,
    #[serde(rename = "White")]
    White,
    #[serde(rename = "East Asian")]
    EastAsian,
    #[serde(rename = "Black")]
    Black,
    #[serde(rename = "South Asian")]
    SouthAsian,
    #[serde(rename = "0-30")]
    Young,
    #[serde(rename = "30-60")]
    MiddleAged,
    #[serde(rename = "60+")]
    Elderly,
}

impl SubAttribute {
    pub const ALL: [SubAttribute; 9] = [
        SubAttribute::Male,
        SubAttribute::Female,
        SubAttribute::White,
        SubAttribute::EastAsian,
        SubAttribute::Black,
        SubAttribute::SouthAsian,
        SubAttribute::Young,
        SubAttribute::MiddleAged,
        SubAttribute::Elderly,
    ];

    pub fn axis(&self) -> Axis {
        match self {
            SubAttribute::Male | SubAttribute::Female => Axis::Gender,
            SubAttribute::White
            | SubAttribute::EastAsian
            | SubAttribute::Black
            | SubAttribute::SouthAsian => Axis::Race,
            SubAttribute::Young | SubAttribute::MiddleAged | SubAttribute::Elderly => Axis::Age,
        }
    }

    /// Label used as the key inside an axis distribution.
    pub fn label(&self) -> &'static str {
        match self {
            SubAttribute::Male => "male",
            SubAttribute::Female => "female",
            SubAttribute::White => "White",
            SubAttribute::EastAsian => "East Asian",
            SubAttribute::Black => "Black",
            SubAttribute::SouthAsian => "South Asian",
            SubAttribute::Young => "0-30",
            SubAttribute::MiddleAged => "30-60",
            SubAttribute::Elderly => "60+",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        SubAttribute::ALL.into_iter().find(|s| s.label() == label)
    }

    /// All values of one axis, in canonical order.
    pub fn of_axis(axis: Axis) -> impl Iterator<Item = SubAttribute> {
        SubAttribute::ALL.into_iter().filter(move |s| s.axis() == axis)
    }
}

impl fmt::Display for SubAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reference table family a prompt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptFamily {
    Characteristic,
    Occupation,
    SocialRelation,
}

impl PromptFamily {
    pub const ALL: [PromptFamily; 3] = [
        PromptFamily::Characteristic,
        PromptFamily::Occupation,
        PromptFamily::SocialRelation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptFamily::Characteristic => "characteristic",
            PromptFamily::Occupation => "occupation",
            PromptFamily::SocialRelation => "social_relation",
        }
    }
}

impl fmt::Display for PromptFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a subject in a two-subject image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// Sub-attribute label -> probability for one axis.
pub type AxisDistribution = IndexMap<String, f64>;

/// Axis -> sub-attribute -> probability for one subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeDistribution {
    axes: IndexMap<Axis, AxisDistribution>,
}

impl AttributeDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by tests and by the label tally.
    pub fn with_axis(mut self, axis: Axis, values: &[(&str, f64)]) -> Self {
        self.insert_axis(
            axis,
            values.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        );
        self
    }

    pub fn insert_axis(&mut self, axis: Axis, values: AxisDistribution) {
        self.axes.insert(axis, values);
    }

    pub fn axis(&self, axis: Axis) -> Option<&AxisDistribution> {
        self.axes.get(&axis)
    }

    pub fn axes(&self) -> impl Iterator<Item = (Axis, &AxisDistribution)> {
        self.axes.iter().map(|(axis, values)| (*axis, values))
    }

    pub fn value(&self, axis: Axis, label: &str) -> Option<f64> {
        self.axes.get(&axis)?.get(label).copied()
    }

    pub fn probability(&self, sub: SubAttribute) -> Option<f64> {
        self.value(sub.axis(), sub.label())
    }

    /// Sum of one axis; zero for an axis nobody labelled.
    pub fn axis_total(&self, axis: Axis) -> Option<f64> {
        self.axes.get(&axis).map(|values| values.values().sum())
    }

    /// Describe values outside [0, 1] and observed axes that do not sum to 1.
    pub fn sanity_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for (axis, values) in &self.axes {
            for (label, p) in values {
                if !p.is_finite() || *p < 0.0 || *p > 1.0 {
                    issues.push(format!("{}.{} = {} is outside [0, 1]", axis, label, p));
                }
            }
            let total: f64 = values.values().sum();
            if total != 0.0 && (total - 1.0).abs() > 1e-6 {
                issues.push(format!("{} sums to {} (expected 1 or 0)", axis, total));
            }
        }
        issues
    }
}

/// Distribution of a single-subject or a two-subject prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubjectDistribution {
    Paired {
        left: AttributeDistribution,
        right: AttributeDistribution,
    },
    Single(AttributeDistribution),
}

impl SubjectDistribution {
    pub fn is_paired(&self) -> bool {
        matches!(self, SubjectDistribution::Paired { .. })
    }

    pub fn single(&self) -> Option<&AttributeDistribution> {
        match self {
            SubjectDistribution::Single(d) => Some(d),
            SubjectDistribution::Paired { .. } => None,
        }
    }

    pub fn side(&self, side: Side) -> Option<&AttributeDistribution> {
        match (self, side) {
            (SubjectDistribution::Paired { left, .. }, Side::Left) => Some(left),
            (SubjectDistribution::Paired { right, .. }, Side::Right) => Some(right),
            (SubjectDistribution::Single(_), _) => None,
        }
    }

    /// Every subject with its side, `None` for single-subject prompts.
    pub fn subjects(&self) -> Vec<(Option<Side>, &AttributeDistribution)> {
        match self {
            SubjectDistribution::Single(d) => vec![(None, d)],
            SubjectDistribution::Paired { left, right } => {
                vec![(Some(Side::Left), left), (Some(Side::Right), right)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_attribute_labels_roundtrip() {
        for sub in SubAttribute::ALL {
            assert_eq!(SubAttribute::from_label(sub.label()), Some(sub));
        }
        assert_eq!(SubAttribute::from_label("Latino"), None);
    }

    #[test]
    fn test_of_axis_partitions_all_values() {
        let gender: Vec<_> = SubAttribute::of_axis(Axis::Gender).collect();
        let race: Vec<_> = SubAttribute::of_axis(Axis::Race).collect();
        let age: Vec<_> = SubAttribute::of_axis(Axis::Age).collect();
        assert_eq!(gender, vec![SubAttribute::Male, SubAttribute::Female]);
        assert_eq!(race.len(), 4);
        assert_eq!(
            age,
            vec![SubAttribute::Young, SubAttribute::MiddleAged, SubAttribute::Elderly]
        );
    }

    #[test]
    fn test_parse_single_distribution() {
        let json = r#"{"gender": {"male": 0.7, "female": 0.3}, "age": {"0-30": 1.0}}"#;
        let dist: SubjectDistribution = serde_json::from_str(json).unwrap();
        assert!(!dist.is_paired());
        let single = dist.single().unwrap();
        assert_eq!(single.probability(SubAttribute::Male), Some(0.7));
        assert_eq!(single.probability(SubAttribute::Young), Some(1.0));
        assert_eq!(single.axis(Axis::Race), None);
    }

    #[test]
    fn test_parse_paired_distribution() {
        let json = r#"{
            "left": {"gender": {"male": 1.0, "female": 0.0}},
            "right": {"gender": {"male": 0.0, "female": 1.0}}
        }"#;
        let dist: SubjectDistribution = serde_json::from_str(json).unwrap();
        assert!(dist.is_paired());
        assert_eq!(
            dist.side(Side::Right).unwrap().probability(SubAttribute::Female),
            Some(1.0)
        );
        assert_eq!(dist.subjects().len(), 2);
        assert!(dist.single().is_none());
    }

    #[test]
    fn test_unknown_axis_is_rejected() {
        let json = r#"{"height": {"tall": 1.0}}"#;
        assert!(serde_json::from_str::<SubjectDistribution>(json).is_err());
    }

    #[test]
    fn test_sanity_issues() {
        let ok = AttributeDistribution::new()
            .with_axis(Axis::Gender, &[("male", 0.25), ("female", 0.75)])
            .with_axis(Axis::Age, &[("0-30", 0.0), ("30-60", 0.0), ("60+", 0.0)]);
        assert!(ok.sanity_issues().is_empty());

        let bad = AttributeDistribution::new()
            .with_axis(Axis::Gender, &[("male", 0.9), ("female", 0.3)])
            .with_axis(Axis::Race, &[("White", 1.5)]);
        assert_eq!(bad.sanity_issues().len(), 3);
    }
}
