// ./src/synthesizer/aliases.rs
//! Deterministic alias tables for the Template and Extraction strategies
//! (spec §4.5: `"miền Bắc"→"North"`, `"hôm nay"→"today"`), bilingual
//! (Vietnamese + English).
use chrono::{DateTime, Datelike, Duration as ChronoDuration, Utc};

/// Resolves a free-text region phrase to its canonical enum token. Returns
/// `None` when the phrase isn't a known alias, so the caller can fall
/// through to the next strategy instead of guessing.
pub fn resolve_region(phrase: &str) -> Option<&'static str> {
    let folded = crate::util::fold_diacritics(phrase);
    REGION_ALIASES
        .iter()
        .find(|(alias, _)| folded.contains(alias))
        .map(|(_, canonical)| *canonical)
}

const REGION_ALIASES: &[(&str, &str)] = &[
    ("mien bac", "North"),
    ("north", "North"),
    ("mien trung", "Central"),
    ("central", "Central"),
    ("mien nam", "South"),
    ("south", "South"),
];

/// Resolves a relative date/time phrase to a concrete ISO-8601 date (or
/// date range, as `(start, end)`) using `reference_clock` as "now" (spec
/// §4.5 "using a reference clock passed in context"). Returns `None` for
/// phrases outside the known set.
pub fn resolve_relative_date(phrase: &str, reference_clock: DateTime<Utc>) -> Option<(String, String)> {
    let folded = crate::util::fold_diacritics(phrase);
    let today = reference_clock.date_naive();

    if folded.contains("hom nay") || folded.contains("today") {
        let s = today.format("%Y-%m-%d").to_string();
        return Some((s.clone(), s));
    }
    if folded.contains("hom qua") || folded.contains("yesterday") {
        let d = today - ChronoDuration::days(1);
        let s = d.format("%Y-%m-%d").to_string();
        return Some((s.clone(), s));
    }
    if folded.contains("ngay mai") || folded.contains("tomorrow") {
        let d = today + ChronoDuration::days(1);
        let s = d.format("%Y-%m-%d").to_string();
        return Some((s.clone(), s));
    }
    if folded.contains("tuan nay") || folded.contains("this week") {
        let weekday = today.weekday().num_days_from_monday() as i64;
        let start = today - ChronoDuration::days(weekday);
        let end = start + ChronoDuration::days(6);
        return Some((start.format("%Y-%m-%d").to_string(), end.format("%Y-%m-%d").to_string()));
    }
    if folded.contains("7 ngay qua") || folded.contains("last 7 days") {
        let start = today - ChronoDuration::days(6);
        return Some((start.format("%Y-%m-%d").to_string(), today.format("%Y-%m-%d").to_string()));
    }
    if folded.contains("thang nay") || folded.contains("this month") {
        let start = today.with_day(1).unwrap_or(today);
        return Some((start.format("%Y-%m-%d").to_string(), today.format("%Y-%m-%d").to_string()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn resolves_region_aliases_bilingually() {
        assert_eq!(resolve_region("miền Bắc"), Some("North"));
        assert_eq!(resolve_region("the north region"), Some("North"));
        assert_eq!(resolve_region("unknown zone"), None);
    }

    #[test]
    fn resolves_today_relative_to_reference_clock() {
        let clock = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let (start, end) = resolve_relative_date("hôm nay", clock).unwrap();
        assert_eq!(start, "2026-07-28");
        assert_eq!(end, "2026-07-28");
    }

    #[test]
    fn resolves_last_7_days_as_a_range() {
        let clock = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let (start, end) = resolve_relative_date("last 7 days", clock).unwrap();
        assert_eq!(start, "2026-07-22");
        assert_eq!(end, "2026-07-28");
    }

    #[test]
    fn unknown_phrase_resolves_to_none() {
        assert!(resolve_relative_date("next quarter", Utc::now()).is_none());
    }
}
