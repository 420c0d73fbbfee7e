use super::loader::normalize_prompt_key;
use super::types::{AttributeDistribution, Axis, SubAttribute, SubjectDistribution};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::warn;

/// Labels the annotator assigned to one subject of one image.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelSet {
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
}

impl LabelSet {
    fn label(&self, axis: Axis) -> Option<&str> {
        match axis {
            Axis::Gender => self.gender.as_deref(),
            Axis::Race => self.race.as_deref(),
            Axis::Age => self.age.as_deref(),
        }
    }
}

/// Labels for one image, single- or two-subject.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ImageLabels {
    Paired { left: LabelSet, right: LabelSet },
    Single(LabelSet),
}

/// Map an annotator answer to a sub-attribute of `axis`.
///
/// Returns `None` for `unknown` and for anything outside the axis.
pub fn canonical_label(axis: Axis, raw: &str) -> Option<SubAttribute> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("unknown") || raw.is_empty() {
        return None;
    }
    let sub = match raw {
        "0-30 years old" => SubAttribute::Young,
        "30-60 years old" => SubAttribute::MiddleAged,
        "more than 60 years old" => SubAttribute::Elderly,
        other => SubAttribute::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(other))?,
    };
    (sub.axis() == axis).then_some(sub)
}

/// Per-axis label counts for one subject.
#[derive(Debug, Clone, Default)]
pub struct LabelTally {
    counts: IndexMap<SubAttribute, u64>,
}

impl LabelTally {
    pub fn record(&mut self, labels: &LabelSet) {
        for axis in Axis::ALL {
            if let Some(sub) = labels.label(axis).and_then(|raw| canonical_label(axis, raw)) {
                *self.counts.entry(sub).or_insert(0) += 1;
            }
        }
    }

    pub fn count(&self, sub: SubAttribute) -> u64 {
        self.counts.get(&sub).copied().unwrap_or(0)
    }

    /// Ratios over the canonical value set; an axis with no valid label is
    /// zero-filled.
    pub fn to_distribution(&self) -> AttributeDistribution {
        let mut dist = AttributeDistribution::new();
        for axis in Axis::ALL {
            let total: u64 = SubAttribute::of_axis(axis).map(|s| self.count(s)).sum();
            let values = SubAttribute::of_axis(axis)
                .map(|s| {
                    let ratio = if total > 0 {
                        self.count(s) as f64 / total as f64
                    } else {
                        0.0
                    };
                    (s.label().to_string(), ratio)
                })
                .collect();
            dist.insert_axis(axis, values);
        }
        dist
    }
}

/// Turn per-image labels into per-prompt ratio distributions.
///
/// A prompt mixing single- and two-subject images is dropped with a warning.
pub fn tally_prompts(
    images: IndexMap<String, Vec<ImageLabels>>,
) -> IndexMap<String, SubjectDistribution> {
    let mut out = IndexMap::new();
    for (raw_key, labels) in images {
        let prompt = normalize_prompt_key(&raw_key);
        let paired = labels
            .iter()
            .filter(|l| matches!(l, ImageLabels::Paired { .. }))
            .count();
        if paired > 0 && paired < labels.len() {
            warn!("{}: mixes single- and two-subject labels, skipped", prompt);
            continue;
        }

        let dist = if paired > 0 {
            let mut left_tally = LabelTally::default();
            let mut right_tally = LabelTally::default();
            for image in &labels {
                if let ImageLabels::Paired { left, right } = image {
                    left_tally.record(left);
                    right_tally.record(right);
                }
            }
            SubjectDistribution::Paired {
                left: left_tally.to_distribution(),
                right: right_tally.to_distribution(),
            }
        } else {
            let mut tally = LabelTally::default();
            for image in &labels {
                if let ImageLabels::Single(set) = image {
                    tally.record(set);
                }
            }
            SubjectDistribution::Single(tally.to_distribution())
        };
        out.insert(prompt, dist);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(gender: &str, race: &str, age: &str) -> LabelSet {
        LabelSet {
            gender: Some(gender.to_string()),
            race: Some(race.to_string()),
            age: Some(age.to_string()),
        }
    }

    #[test]
    fn test_canonical_label() {
        assert_eq!(canonical_label(Axis::Gender, "male"), Some(SubAttribute::Male));
        assert_eq!(canonical_label(Axis::Race, "east asian"), Some(SubAttribute::EastAsian));
        assert_eq!(
            canonical_label(Axis::Age, "more than 60 years old"),
            Some(SubAttribute::Elderly)
        );
        assert_eq!(canonical_label(Axis::Age, "30-60"), Some(SubAttribute::MiddleAged));
        assert_eq!(canonical_label(Axis::Gender, "unknown"), None);
        // Valid label, wrong axis
        assert_eq!(canonical_label(Axis::Gender, "White"), None);
    }

    #[test]
    fn test_observed_axes_sum_to_one() {
        let mut tally = LabelTally::default();
        tally.record(&labels("male", "White", "0-30 years old"));
        tally.record(&labels("female", "Black", "30-60 years old"));
        tally.record(&labels("male", "unknown", "more than 60 years old"));
        let dist = tally.to_distribution();

        for axis in Axis::ALL {
            let total = dist.axis_total(axis).unwrap();
            assert!((total - 1.0).abs() < 1e-9, "{} sums to {}", axis, total);
        }
        assert!((dist.probability(SubAttribute::Male).unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(dist.probability(SubAttribute::White), Some(0.5));
        assert_eq!(dist.probability(SubAttribute::SouthAsian), Some(0.0));
    }

    #[test]
    fn test_unobserved_axis_is_zero_filled() {
        let mut tally = LabelTally::default();
        tally.record(&labels("unknown", "Black", "unknown"));
        let dist = tally.to_distribution();
        assert_eq!(dist.axis_total(Axis::Gender), Some(0.0));
        assert_eq!(dist.axis(Axis::Gender).unwrap().len(), 2);
        assert_eq!(dist.axis_total(Axis::Age), Some(0.0));
        assert_eq!(dist.probability(SubAttribute::Black), Some(1.0));
    }

    #[test]
    fn test_tally_prompts_from_json() {
        let json = r#"{
            "a_photo_of_one_doctor": [
                {"gender": "male", "race": "White", "age": "30-60 years old"},
                {"gender": "female", "race": "White", "age": "30-60 years old"}
            ],
            "One_boss_at_left_with_one_employee_at_right": [
                {"left": {"gender": "male"}, "right": {"gender": "female"}}
            ],
            "mixed": [
                {"gender": "male"},
                {"left": {"gender": "male"}, "right": {"gender": "male"}}
            ]
        }"#;
        let images: IndexMap<String, Vec<ImageLabels>> = serde_json::from_str(json).unwrap();
        let out = tally_prompts(images);

        assert_eq!(out.len(), 2);
        let doctor = out["a photo of one doctor"].single().unwrap();
        assert_eq!(doctor.probability(SubAttribute::Male), Some(0.5));
        assert_eq!(doctor.probability(SubAttribute::MiddleAged), Some(1.0));

        let pair = &out["One boss at left with one employee at right"];
        assert!(pair.is_paired());
        assert_eq!(
            pair.side(crate::store::Side::Right)
                .unwrap()
                .probability(SubAttribute::Female),
            Some(1.0)
        );
    }
}
