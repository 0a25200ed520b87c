//! "Did you mean" suggestions for queries with no matches.

use super::matcher::NormalizedQuery;
use crate::index::{IndexShard, normalize_label};
use rapidfuzz::distance::jaro_winkler;
use std::sync::Arc;

/// Minimum Jaro-Winkler similarity for a label to be suggested.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Up to `limit` labels from `shards` close to the query, best first.
pub fn suggest(query: &NormalizedQuery, shards: &[Arc<IndexShard>], limit: usize) -> Vec<String> {
    if limit == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(f64, &str)> = shards
        .iter()
        .flat_map(|shard| shard.entries())
        .filter_map(|entry| {
            let label = normalize_label(&entry.label);
            let score = jaro_winkler::similarity(query.label().chars(), label.chars());
            (score >= SUGGESTION_THRESHOLD).then_some((score, entry.label.as_str()))
        })
        .collect();

    scored.sort_by(|(a_score, a), (b_score, b)| b_score.total_cmp(a_score).then_with(|| a.cmp(b)));
    scored.dedup_by(|(_, a), (_, b)| a == b);
    scored
        .into_iter()
        .take(limit)
        .map(|(_, label)| label.to_string())
        .collect()
}
