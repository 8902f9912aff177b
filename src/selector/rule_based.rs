// ./src/selector/rule_based.rs
//! The Rule-Based Selector (C3, spec §4.3): a pure, synchronous first tier.
use crate::model::rule::Rule;
use crate::util::fold_diacritics;
use std::collections::HashMap;

/// One merged candidate: the highest confidence across every rule that
/// matched, attributed to the order its id was first seen (spec §4.3
/// "rules are ordered only to break ties by insertion order").
#[derive(Clone, Debug, PartialEq)]
pub struct RuleCandidate {
    pub function_id: String,
    pub confidence: f64,
}

/// Evaluates every rule against `query`, merges candidates by
/// `function_id` taking the max confidence, and returns them ordered by
/// descending confidence, ties broken by first-seen order. Pure: no I/O, no
/// capability calls (spec §4.3 "the selector is pure").
pub fn select(query: &str, rules: &[Rule]) -> Vec<RuleCandidate> {
    let normalised = fold_diacritics(query);

    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, f64> = HashMap::new();

    for rule in rules {
        if !rule.matches(&normalised) {
            continue;
        }
        for function_id in &rule.function_ids {
            let entry = best.entry(function_id.clone()).or_insert_with(|| {
                order.push(function_id.clone());
                0.0
            });
            if rule.confidence > *entry {
                *entry = rule.confidence;
            }
        }
    }

    let mut candidates: Vec<RuleCandidate> = order
        .into_iter()
        .map(|function_id| {
            let confidence = best[&function_id];
            RuleCandidate { function_id, confidence }
        })
        .collect();

    candidates.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    candidates
}

/// The highest per-candidate confidence, or 0.0 if `candidates` is empty
/// (spec §4.3 "overall selector-level confidence is the highest
/// per-candidate confidence").
pub fn overall_confidence(candidates: &[RuleCandidate]) -> f64 {
    candidates.iter().map(|c| c.confidence).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::rule::Rule;

    #[test]
    fn empty_rules_yield_empty_candidates() {
        let candidates = select("book a flight", &[]);
        assert!(candidates.is_empty());
        assert_eq!(overall_confidence(&candidates), 0.0);
    }

    #[test]
    fn matching_keyword_rule_contributes_candidates() {
        let rules = vec![Rule::keywords(["book", "flight"], ["flights.search"], 0.9)];
        let candidates = select("please book a flight to Hanoi", &rules);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].function_id, "flights.search");
        assert!((candidates[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn merges_duplicate_candidates_taking_max_confidence() {
        let rules = vec![
            Rule::keywords(["weather"], ["weather.today"], 0.6),
            Rule::keywords(["weather", "today"], ["weather.today"], 0.95),
        ];
        let candidates = select("what's the weather today", &rules);
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn diacritic_insensitive_match() {
        let rules = vec![Rule::keywords(["dat ve"], ["flights.book"], 0.85)];
        let candidates = select("tôi muốn đặt vé máy bay", &rules);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].function_id, "flights.book");
    }

    #[test]
    fn regex_rule_matches_case_insensitively() {
        let rules = vec![Rule::regex(r"\bweather\b", ["weather.today"], 0.8)];
        let candidates = select("WEATHER report please", &rules);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn no_rule_fires_returns_empty() {
        let rules = vec![Rule::keywords(["flight"], ["flights.search"], 0.9)];
        let candidates = select("what is the capital of France", &rules);
        assert!(candidates.is_empty());
    }
}
