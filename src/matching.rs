//! Substring routing of prompt text.
//!
//! The benchmark's tables identify prompts, qualifiers and categories by
//! plain substrings of the prompt text. Every such rule lives here so the
//! engines never touch raw string patterns themselves. Matching is
//! case-sensitive and keyword order is significant.

use crate::store::SubAttribute;

/// Explicit keyword groups, checked in this order; first match wins.
///
/// Race is checked before age and age before gender, so
/// `"an elderly Black woman"` resolves to `Black`.
pub const EXPLICIT_KEYWORDS: [(&[&str], SubAttribute); 9] = [
    (&["Black"], SubAttribute::Black),
    (&["East Asian"], SubAttribute::EastAsian),
    (&["White"], SubAttribute::White),
    (&["South Asian"], SubAttribute::SouthAsian),
    (&["young"], SubAttribute::Young),
    (&["middle-aged"], SubAttribute::MiddleAged),
    (&["elderly"], SubAttribute::Elderly),
    (&[" man", " male"], SubAttribute::Male),
    (&[" woman", " female"], SubAttribute::Female),
];

/// Qualifier words that mark a prompt as naming its demographic outright.
const EXPLICIT_QUALIFIERS: [&str; 11] = [
    "man",
    "woman",
    "male",
    "female",
    "young",
    "middle-aged",
    "elderly",
    "White",
    "East Asian",
    "South Asian",
    "Black",
];

/// The sub-attribute a prompt names literally, if any.
pub fn explicit_keyword(text: &str) -> Option<SubAttribute> {
    EXPLICIT_KEYWORDS
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| text.contains(n)))
        .map(|(_, sub)| *sub)
}

/// True when the prompt contains any explicit qualifier as a substring.
pub fn mentions_explicit_qualifier(text: &str) -> bool {
    EXPLICIT_QUALIFIERS.iter().any(|q| text.contains(q))
}

/// Split a two-subject prompt at `" with "`.
pub fn split_subjects(prompt: &str) -> Option<(&str, &str)> {
    prompt.split_once(" with ")
}

/// Key appears as a word-delimited substring: `"<key> "` or `" <key>"`.
pub fn contains_delimited(text: &str, key: &str) -> bool {
    text.contains(&format!("{} ", key)) || text.contains(&format!(" {}", key))
}

/// Where a qualifier sits relative to the subject keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// `"<qualifier> <keyword>"`, e.g. `"female doctor"`.
    Before,
    /// `"<keyword> <qualifier>"`, e.g. `"rich woman"`.
    After,
}

fn qualifier_word(sub: SubAttribute, placement: Placement) -> &'static str {
    match (sub, placement) {
        (SubAttribute::Male, Placement::After) => "man",
        (SubAttribute::Female, Placement::After) => "woman",
        (SubAttribute::Young, _) => "young",
        (SubAttribute::MiddleAged, _) => "middle-aged",
        (SubAttribute::Elderly, _) => "elderly",
        (other, _) => other.label(),
    }
}

/// Every sub-attribute whose qualifier is combined with `keyword` in `prompt`.
///
/// Unlike [`explicit_keyword`] this is not first-match: each qualifier is
/// tested independently. `"male <kw>"` is not counted when `"female <kw>"`
/// is present, since the former is a substring of the latter.
pub fn qualified_matches(prompt: &str, keyword: &str, placement: Placement) -> Vec<SubAttribute> {
    let phrase = |sub: SubAttribute| {
        let word = qualifier_word(sub, placement);
        match placement {
            Placement::Before => format!("{} {}", word, keyword),
            Placement::After => format!("{} {}", keyword, word),
        }
    };
    SubAttribute::ALL
        .into_iter()
        .filter(|sub| {
            if !prompt.contains(&phrase(*sub)) {
                return false;
            }
            !(placement == Placement::Before
                && *sub == SubAttribute::Male
                && prompt.contains(&phrase(SubAttribute::Female)))
        })
        .collect()
}

/// Subject keywords a weight-table entry stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightKeywords {
    /// Single-subject entry: last word, or the word before a trailing `person`.
    Single { keyword: String, placement: Placement },
    /// Two-subject entry `"One <left> at left with <article> <right> at right"`.
    Paired { left: String, right: String },
}

pub fn weight_keywords(entry: &str) -> Option<WeightKeywords> {
    if let Some((left, right)) = split_subjects(entry) {
        let left = left.split_once("One ")?.1;
        let left = left.split(" at left").next()?;
        let right = right.split_once(' ')?.1;
        let right = right.split(" at right").next()?;
        return Some(WeightKeywords::Paired {
            left: left.to_string(),
            right: right.to_string(),
        });
    }

    let words: Vec<&str> = entry.split(' ').collect();
    match words.as_slice() {
        [.., keyword, "person"] => Some(WeightKeywords::Single {
            keyword: keyword.to_string(),
            placement: Placement::After,
        }),
        [.., keyword] if *keyword != "person" && !keyword.is_empty() => {
            Some(WeightKeywords::Single {
                keyword: keyword.to_string(),
                placement: Placement::Before,
            })
        }
        _ => None,
    }
}

/// Weight key of an explicit occupation prompt.
///
/// `"a photo of one East Asian Boxer"` -> `"a photo of one human Boxer"`:
/// the qualifier after `" one "` is dropped (two words for `... Asian`), and
/// `Boxer` / `Veterinarian` subjects carry a `human` prefix in the weight table.
pub fn occupation_weight_key(prompt: &str) -> Option<String> {
    let subject = prompt.split(" one ").nth(1)?;
    let words: Vec<&str> = subject.split(' ').collect();
    let qualifier = if subject.contains("Asian") {
        format!("{} {} ", words.first()?, words.get(1)?)
    } else {
        format!("{} ", words.first()?)
    };
    let mut subject = subject.split(qualifier.as_str()).nth(1)?.to_string();
    if (subject.contains("Boxer") || subject.contains("Veterinarian")) && !subject.contains("human")
    {
        subject = format!("human {}", subject);
    }
    Some(format!("a photo of one {}", subject))
}

/// How a prompt refers to an eta pair stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StemPattern {
    /// `"... <stem> person ..."`
    Person,
    /// `"... of one <stem> ..."`
    OfOne,
    /// `"One <stem> ..."`: left subject of a two-subject prompt.
    LeadingSubject,
    /// `"one <stem>"` with a positional stem: right subject.
    TrailingSubject,
}

/// First pattern by which `prompt` mentions `stem`.
pub fn stem_pattern(prompt: &str, stem: &str) -> Option<StemPattern> {
    if prompt.contains(&format!("{} person", stem)) {
        Some(StemPattern::Person)
    } else if prompt.contains(&format!("of one {}", stem)) {
        Some(StemPattern::OfOne)
    } else if prompt.contains(&format!("One {}", stem)) {
        Some(StemPattern::LeadingSubject)
    } else if prompt.contains(&format!("one {}", stem))
        && (stem.ends_with("left") || stem.ends_with("right"))
    {
        Some(StemPattern::TrailingSubject)
    } else {
        None
    }
}
