//! Read-only view over generated and reference attribute distributions.

pub mod loader;
pub mod tally;
pub mod types;

pub use loader::{
    load_generated, load_reference, normalize_prompt_key, read_distribution_table, StorePaths,
};
pub use tally::{canonical_label, tally_prompts, ImageLabels, LabelSet, LabelTally};
pub use types::{
    AttributeDistribution, Axis, AxisDistribution, PromptFamily, Side, SubAttribute,
    SubjectDistribution,
};

use crate::error::Result;
use indexmap::IndexMap;
use tracing::warn;

/// Default reference priority: a prompt present in several tables resolves to
/// the social-relation record first, then characteristic, then occupation.
pub const LOOKUP_ORDER: [PromptFamily; 3] = [
    PromptFamily::SocialRelation,
    PromptFamily::Characteristic,
    PromptFamily::Occupation,
];

/// Curated reference distributions, one table per prompt family.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub characteristic: IndexMap<String, SubjectDistribution>,
    pub occupation: IndexMap<String, SubjectDistribution>,
    pub social_relation: IndexMap<String, SubjectDistribution>,
}

impl ReferenceTables {
    pub fn table(&self, family: PromptFamily) -> &IndexMap<String, SubjectDistribution> {
        match family {
            PromptFamily::Characteristic => &self.characteristic,
            PromptFamily::Occupation => &self.occupation,
            PromptFamily::SocialRelation => &self.social_relation,
        }
    }

    pub fn lookup(&self, prompt: &str) -> Option<(PromptFamily, &SubjectDistribution)> {
        self.lookup_in(prompt, &LOOKUP_ORDER)
    }

    /// First table in `order` holding `prompt`.
    pub fn lookup_in(
        &self,
        prompt: &str,
        order: &[PromptFamily],
    ) -> Option<(PromptFamily, &SubjectDistribution)> {
        order
            .iter()
            .find_map(|&family| self.table(family).get(prompt).map(|d| (family, d)))
    }

    pub fn len(&self) -> usize {
        PromptFamily::ALL.iter().map(|f| self.table(*f).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A generated record, tagged at ingestion with the family whose reference
/// table contains it.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRecord {
    pub distribution: SubjectDistribution,
    pub family: Option<PromptFamily>,
}

#[derive(Debug, Clone, Default)]
pub struct DistributionStore {
    generated: IndexMap<String, PromptRecord>,
    references: ReferenceTables,
}

impl DistributionStore {
    pub fn new(
        generated: IndexMap<String, SubjectDistribution>,
        references: ReferenceTables,
    ) -> Self {
        let generated = generated
            .into_iter()
            .map(|(prompt, distribution)| {
                let family = references.lookup(&prompt).map(|(family, _)| family);
                (prompt, PromptRecord { distribution, family })
            })
            .collect();
        Self {
            generated,
            references,
        }
    }

    /// Load every table named in `paths`.
    ///
    /// A missing table aborts the load; out-of-range values only warn.
    pub fn load(paths: &StorePaths) -> Result<Self> {
        let generated = load_generated(&paths.generated)?;
        let references = ReferenceTables {
            characteristic: load_reference(
                PromptFamily::Characteristic,
                paths.reference(PromptFamily::Characteristic),
            )?,
            occupation: load_reference(
                PromptFamily::Occupation,
                paths.reference(PromptFamily::Occupation),
            )?,
            social_relation: load_reference(
                PromptFamily::SocialRelation,
                paths.reference(PromptFamily::SocialRelation),
            )?,
        };
        let store = Self::new(generated, references);
        store.warn_on_sanity_issues();
        Ok(store)
    }

    pub fn generated(&self) -> impl Iterator<Item = (&str, &PromptRecord)> {
        self.generated.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn record(&self, prompt: &str) -> Option<&PromptRecord> {
        self.generated.get(prompt)
    }

    pub fn reference(&self, prompt: &str) -> Option<&SubjectDistribution> {
        self.references.lookup(prompt).map(|(_, d)| d)
    }

    /// Reference record of `prompt` under a caller-chosen table priority.
    pub fn reference_in(&self, prompt: &str, order: &[PromptFamily]) -> Option<&SubjectDistribution> {
        self.references.lookup_in(prompt, order).map(|(_, d)| d)
    }

    pub fn references(&self) -> &ReferenceTables {
        &self.references
    }

    pub fn len(&self) -> usize {
        self.generated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generated.is_empty()
    }

    /// Number of generated prompts that have a reference record.
    pub fn tagged_count(&self) -> usize {
        self.generated.values().filter(|r| r.family.is_some()).count()
    }

    fn warn_on_sanity_issues(&self) {
        for (prompt, record) in &self.generated {
            for (side, dist) in record.distribution.subjects() {
                for issue in dist.sanity_issues() {
                    match side {
                        Some(side) => warn!("{} [{}]: {}", prompt, side.as_str(), issue),
                        None => warn!("{}: {}", prompt, issue),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(male: f64) -> SubjectDistribution {
        SubjectDistribution::Single(
            AttributeDistribution::new()
                .with_axis(Axis::Gender, &[("male", male), ("female", 1.0 - male)]),
        )
    }

    #[test]
    fn test_store_tags_prompts_by_reference_family() {
        let mut generated = IndexMap::new();
        generated.insert("a photo of one doctor".to_string(), single(0.8));
        generated.insert("a photo of one rich person".to_string(), single(0.6));
        generated.insert("a photo of one alien".to_string(), single(0.5));

        let mut references = ReferenceTables::default();
        references
            .occupation
            .insert("a photo of one doctor".to_string(), single(0.5));
        references
            .characteristic
            .insert("a photo of one rich person".to_string(), single(0.5));

        let store = DistributionStore::new(generated, references);
        assert_eq!(
            store.record("a photo of one doctor").unwrap().family,
            Some(PromptFamily::Occupation)
        );
        assert_eq!(
            store.record("a photo of one rich person").unwrap().family,
            Some(PromptFamily::Characteristic)
        );
        assert_eq!(store.record("a photo of one alien").unwrap().family, None);
        assert_eq!(store.tagged_count(), 2);
        assert!(store.reference("a photo of one alien").is_none());
    }

    #[test]
    fn test_lookup_prefers_social_relation_table() {
        let mut references = ReferenceTables::default();
        references.occupation.insert("x".to_string(), single(0.1));
        references.social_relation.insert("x".to_string(), single(0.9));
        let (family, dist) = references.lookup("x").unwrap();
        assert_eq!(family, PromptFamily::SocialRelation);
        assert_eq!(dist, &single(0.9));
    }

    #[test]
    fn test_lookup_in_custom_order() {
        let mut references = ReferenceTables::default();
        references.characteristic.insert("x".to_string(), single(0.2));
        references.occupation.insert("x".to_string(), single(0.4));
        let order = [PromptFamily::Occupation, PromptFamily::Characteristic];
        let (family, dist) = references.lookup_in("x", &order).unwrap();
        assert_eq!(family, PromptFamily::Occupation);
        assert_eq!(dist, &single(0.4));
        assert_eq!(references.lookup("x").unwrap().0, PromptFamily::Characteristic);
    }

    #[test]
    fn test_load_fails_when_reference_table_absent() {
        let dir = tempfile::tempdir().unwrap();
        let generated = dir.path().join("align_lcm.json");
        std::fs::write(&generated, "{}").unwrap();
        let paths = StorePaths {
            generated,
            characteristic: dir.path().join("char_gt.json"),
            occupation: dir.path().join("oc_gt.json"),
            social_relation: dir.path().join("sr_gt.json"),
        };
        let err = DistributionStore::load(&paths).unwrap_err();
        assert!(err.to_string().contains("characteristic"));
    }
}
