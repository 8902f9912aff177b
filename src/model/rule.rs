// ./src/model/rule.rs
//! Rules for the Rule-Based Selector (spec §3, §4.3).
use regex::Regex;

/// A rule's match pattern: either a case-insensitive keyword list (all
/// keywords must appear, spec §4.3 treats a bare keyword rule as an AND of
/// its keywords) or a regex evaluated case-insensitively.
#[derive(Clone, Debug)]
pub enum Pattern {
    Keywords(Vec<String>),
    Regex(String),
}

/// A static or startup-loaded rule (spec §3). Rules are additive: more than
/// one may match a query, and all matching rules contribute candidates.
#[derive(Clone, Debug)]
pub struct Rule {
    pub pattern: Pattern,
    pub function_ids: Vec<String>,
    pub confidence: f64,
}

impl Rule {
    pub fn keywords(keywords: impl IntoIterator<Item = impl Into<String>>, function_ids: impl IntoIterator<Item = impl Into<String>>, confidence: f64) -> Self {
        Rule {
            pattern: Pattern::Keywords(keywords.into_iter().map(Into::into).collect()),
            function_ids: function_ids.into_iter().map(Into::into).collect(),
            confidence,
        }
    }

    pub fn regex(pattern: impl Into<String>, function_ids: impl IntoIterator<Item = impl Into<String>>, confidence: f64) -> Self {
        Rule {
            pattern: Pattern::Regex(pattern.into()),
            function_ids: function_ids.into_iter().map(Into::into).collect(),
            confidence,
        }
    }

    /// Matches `query` against this rule's pattern. Case-insensitive;
    /// diacritic folding is handled by the caller via
    /// [`crate::util::fold_diacritics`] before this is invoked, so this
    /// function itself only lower-cases.
    pub fn matches(&self, normalised_query: &str) -> bool {
        match &self.pattern {
            Pattern::Keywords(keywords) => keywords
                .iter()
                .all(|kw| normalised_query.contains(&kw.to_lowercase())),
            Pattern::Regex(pattern) => Regex::new(&format!("(?i){pattern}"))
                .map(|re| re.is_match(normalised_query))
                .unwrap_or(false),
        }
    }
}
