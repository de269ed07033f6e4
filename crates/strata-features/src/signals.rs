// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure heuristic signals computed from raw request text.
//!
//! Zero-cost rules: no LLM pre-call, no network, no latency. Each signal
//! is independent of the others, which is what lets the extractor compute
//! them with partial-failure isolation.

use std::collections::HashMap;
use std::collections::HashSet;

/// Structured-data/validation markers contributing to schema strictness.
const SCHEMA_MARKERS: &[(&str, f64)] = &[
    ("json", 0.25),
    ("schema", 0.3),
    ("required", 0.2),
    ("format", 0.15),
    ("validate", 0.2),
    ("must match", 0.2),
    ("structured", 0.15),
    ("```json", 0.3),
];

/// Domain keyword table. A domain flag is set when any keyword matches.
const DOMAIN_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "customer_support",
        &["help", "support", "issue", "problem", "ticket", "complaint", "refund request"],
    ),
    (
        "sales",
        &["pricing", "quote", "purchase", "upgrade", "plan", "discount", "demo"],
    ),
    (
        "technical",
        &["api", "error code", "stack trace", "integration", "webhook", "sdk", "deploy"],
    ),
    (
        "billing",
        &["invoice", "billing", "charge", "payment", "subscription", "receipt"],
    ),
];

/// Rough token estimate: text length over four.
pub fn estimate_tokens(text: &str) -> u32 {
    (text.len() / 4) as u32
}

/// Presence of structured-data/validation markers, capped at 1.0.
pub fn schema_strictness(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let score: f64 = SCHEMA_MARKERS
        .iter()
        .filter(|(marker, _)| lower.contains(marker))
        .map(|(_, weight)| weight)
        .sum();
    score.min(1.0)
}

/// Keyword pattern matching against the fixed domain table.
pub fn domain_flags(text: &str) -> HashMap<String, bool> {
    let lower = text.to_lowercase();
    DOMAIN_KEYWORDS
        .iter()
        .map(|(domain, keywords)| {
            let hit = keywords.iter().any(|k| lower.contains(k));
            ((*domain).to_string(), hit)
        })
        .collect()
}

/// Weighted sum of text length, field count, and nesting, capped at 1.0.
pub fn request_complexity(text: &str) -> f64 {
    let length_factor = (text.len() as f64 / 2000.0).min(1.0);

    // Field count: colon-separated pairs are a cheap proxy for structured
    // payloads regardless of whether the body is JSON or prose.
    let field_count = text.matches(':').count();
    let field_factor = (field_count as f64 / 20.0).min(1.0);

    let nested = text.contains('{') && text.rfind('{') != text.find('{')
        || text.contains('[') && text.rfind('[') != text.find('[');
    let nesting_factor = if nested { 1.0 } else { 0.0 };

    (0.5 * length_factor + 0.3 * field_factor + 0.2 * nesting_factor).min(1.0)
}

/// 1 minus the max Jaccard word-set similarity against recent requests.
///
/// An empty history means everything is novel.
pub fn novelty_score(text: &str, recent: &[String]) -> f64 {
    let words = word_set(text);
    if words.is_empty() {
        return 0.5;
    }
    let max_similarity = recent
        .iter()
        .map(|prior| jaccard(&words, &word_set(prior)))
        .fold(0.0_f64, f64::max);
    1.0 - max_similarity
}

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_is_length_over_four() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens(&"x".repeat(400)), 100);
    }

    #[test]
    fn schema_strictness_caps_at_one() {
        let text = "json schema required format validate structured ```json must match";
        assert!((schema_strictness(text) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn schema_strictness_zero_for_plain_prose() {
        assert!(schema_strictness("tell me a story about a dog").abs() < f64::EPSILON);
    }

    #[test]
    fn domain_flags_match_keyword_table() {
        let flags = domain_flags("I need help with my invoice payment");
        assert_eq!(flags.get("customer_support"), Some(&true));
        assert_eq!(flags.get("billing"), Some(&true));
        assert_eq!(flags.get("sales"), Some(&false));
        assert_eq!(flags.get("technical"), Some(&false));
    }

    #[test]
    fn all_four_domains_always_present() {
        let flags = domain_flags("hello");
        assert_eq!(flags.len(), 4);
        assert!(flags.values().all(|hit| !hit));
    }

    #[test]
    fn complexity_grows_with_structure() {
        let simple = request_complexity("hi");
        let structured = request_complexity(
            "{\"a\": {\"b\": 1, \"c\": 2}, \"d\": [1, [2, 3]], \"e\": 4, \"f\": 5}",
        );
        assert!(simple < structured);
        assert!(structured <= 1.0);
    }

    #[test]
    fn novelty_is_one_against_empty_history() {
        assert!((novelty_score("completely new request", &[]) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn novelty_drops_for_repeated_request() {
        let recent = vec!["reset my password please".to_string()];
        let repeat = novelty_score("reset my password please", &recent);
        let fresh = novelty_score("compare quantum annealing approaches", &recent);
        assert!(repeat < 0.1, "identical request should not be novel, got {repeat}");
        assert!(fresh > 0.8, "unrelated request should be novel, got {fresh}");
    }

    #[test]
    fn empty_text_novelty_is_neutral() {
        assert!((novelty_score("", &[]) - 0.5).abs() < f64::EPSILON);
    }
}
