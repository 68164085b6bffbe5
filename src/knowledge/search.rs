//! Scoring helpers for ranked search.

use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Lowercased whitespace-separated query terms.
pub fn query_terms(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Fraction of terms found as substrings of `text_lower`.
pub fn lexical_similarity(terms: &[String], text_lower: &str) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let matched = terms
        .iter()
        .filter(|term| text_lower.contains(term.as_str()))
        .count();
    matched as f64 / terms.len() as f64
}

/// 1.0 when just updated, falling linearly to 0.0 after `window_days`.
pub fn recency_factor(updated_at: DateTime<Utc>, now: DateTime<Utc>, window_days: f64) -> f64 {
    let age_days = (now - updated_at).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY;
    (1.0 - age_days / window_days).clamp(0.0, 1.0)
}

/// Connection count scaled to [0, 1], saturating at `saturation`.
pub fn connectivity_factor(connections: usize, saturation: usize) -> f64 {
    (connections as f64 / saturation.max(1) as f64).min(1.0)
}

/// Mean of recency and connectivity.
pub fn relevance_score(recency: f64, connectivity: f64) -> f64 {
    (recency + connectivity) / 2.0
}

/// Excerpt of `content` around the first query term it contains.
///
/// Keeps `before` characters ahead of the match and `after` characters
/// from the match onward. Without a match, returns the first `fallback`
/// characters. Truncated sides are marked with `...`.
pub fn extract_snippet(
    content: &str,
    terms: &[String],
    before: usize,
    after: usize,
    fallback: usize,
) -> String {
    let chars: Vec<char> = content.chars().collect();

    // Lowercasing can expand a char (U+0130 becomes two), so keep the
    // source index of every lowercased char.
    let mut lower = String::with_capacity(content.len());
    let mut source_index = Vec::with_capacity(chars.len());
    for (i, c) in chars.iter().enumerate() {
        for lc in c.to_lowercase() {
            lower.push(lc);
            source_index.push(i);
        }
    }

    let hit = terms
        .iter()
        .filter(|term| !term.is_empty())
        .find_map(|term| lower.find(term.as_str()));

    let (start, end) = match hit {
        Some(byte_idx) => {
            let lower_idx = lower[..byte_idx].chars().count();
            let char_idx = source_index.get(lower_idx).copied().unwrap_or(chars.len());
            (
                char_idx.saturating_sub(before),
                (char_idx + after).min(chars.len()),
            )
        }
        None => (0, fallback.min(chars.len())),
    };

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str("...");
    }
    snippet.extend(&chars[start..end]);
    if end < chars.len() {
        snippet.push_str("...");
    }
    snippet
}
