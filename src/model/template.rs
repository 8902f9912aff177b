// ./src/model/template.rs
//! Templates for the Parameter Synthesizer's tier 1 strategy (spec §3, §4.5).
use regex::Regex;
use std::collections::BTreeMap;

/// A literal parameter value, possibly containing a `{group1}`-style
/// placeholder referring to a regex capture group of whichever pattern
/// matched.
#[derive(Clone, Debug)]
pub enum TemplateValue {
    Literal(serde_json::Value),
    /// `{group1}` / `{group2}` / ... — substituted from the matching
    /// pattern's capture groups (1-indexed, as regex capture groups are).
    GroupPlaceholder(usize),
}

#[derive(Clone, Debug)]
pub struct Template {
    pub name: String,
    pub patterns: Vec<String>,
    pub parameters: BTreeMap<String, TemplateValue>,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Template {
            name: name.into(),
            patterns: Vec::new(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn with_literal(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), TemplateValue::Literal(value.into()));
        self
    }

    pub fn with_group(mut self, key: impl Into<String>, group: usize) -> Self {
        self.parameters.insert(key.into(), TemplateValue::GroupPlaceholder(group));
        self
    }

    /// Tries each pattern in turn against `query`; on the first match,
    /// returns the candidate argument map with placeholders substituted
    /// from that pattern's capture groups.
    pub fn try_match(&self, query: &str) -> Option<BTreeMap<String, serde_json::Value>> {
        for pattern in &self.patterns {
            let re = Regex::new(&format!("(?i){pattern}")).ok()?;
            if let Some(caps) = re.captures(query) {
                let mut out = BTreeMap::new();
                for (key, value) in &self.parameters {
                    let resolved = match value {
                        TemplateValue::Literal(v) => v.clone(),
                        TemplateValue::GroupPlaceholder(idx) => caps
                            .get(*idx)
                            .map(|m| serde_json::Value::String(m.as_str().to_string()))
                            .unwrap_or(serde_json::Value::Null),
                    };
                    out.insert(key.clone(), resolved);
                }
                return Some(out);
            }
        }
        None
    }
}
