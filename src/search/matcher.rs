//! Query normalization and match classification.
//!
//! A query is normalized exactly like keys, so key comparisons are plain
//! byte comparisons. Matches are tiered:
//! - `ExactKey`: key equals the query
//! - `PrefixKey`: key starts with the query
//! - `SubstringKey`: key contains the query elsewhere, aligned to escapes
//! - `LabelSubstring`: only the display label contains the query

use crate::error::QueryError;
use crate::index::{
    IndexShard, SymbolEntry, key_contains, normalize_key, normalize_label, partition_of,
};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// How an entry matched, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    ExactKey,
    PrefixKey,
    SubstringKey,
    LabelSubstring,
}

impl MatchKind {
    /// Base relevance of the tier.
    const fn weight(self) -> u32 {
        match self {
            Self::ExactKey => 4000,
            Self::PrefixKey => 3000,
            Self::SubstringKey => 2000,
            Self::LabelSubstring => 1000,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExactKey => "exact",
            Self::PrefixKey => "prefix",
            Self::SubstringKey => "substring",
            Self::LabelSubstring => "label",
        }
    }
}

/// When label-only matches are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMatchPolicy {
    /// Always include them, ranked after key matches.
    #[default]
    Always,
    /// Only when no key-based match exists.
    Fallback,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    pub label_matching: LabelMatchPolicy,
    /// Queries whose key form is at most this many characters also scan
    /// other loaded partitions for substring and label matches.
    pub cross_partition_max_len: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            label_matching: LabelMatchPolicy::Always,
            cross_partition_max_len: 2,
        }
    }
}

/// A query in the forms used for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    text: String,
    key: String,
    label: String,
    partition: char,
}

impl NormalizedQuery {
    /// Normalizes a raw query. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let text = raw.trim();
        let key = normalize_key(text);
        let partition = partition_of(&key).ok_or(QueryError::EmptyQuery)?;
        Ok(Self {
            text: text.to_string(),
            label: normalize_label(text),
            key,
            partition,
        })
    }

    /// The query as typed, trimmed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub const fn partition(&self) -> char {
        self.partition
    }
}

/// One matching entry.
#[derive(Debug, Clone, Copy)]
pub struct SymbolMatch<'a> {
    pub entry: &'a SymbolEntry,
    pub kind: MatchKind,
    pub score: u32,
}

/// Result order: better tier, then shorter key, then key order.
pub fn rank_order(a: &SymbolMatch<'_>, b: &SymbolMatch<'_>) -> Ordering {
    a.kind
        .cmp(&b.kind)
        .then(a.entry.key.len().cmp(&b.entry.key.len()))
        .then_with(|| a.entry.key.cmp(&b.entry.key))
}

/// Classifies an entry against a query, ignoring label policy.
pub fn classify(query: &NormalizedQuery, entry: &SymbolEntry) -> Option<MatchKind> {
    let key = entry.key.as_str();
    if key == query.key {
        Some(MatchKind::ExactKey)
    } else if key.starts_with(&query.key) {
        Some(MatchKind::PrefixKey)
    } else if key_contains(key, &query.key) {
        Some(MatchKind::SubstringKey)
    } else if normalize_label(&entry.label).contains(&query.label) {
        Some(MatchKind::LabelSubstring)
    } else {
        None
    }
}

/// Score consistent with [`rank_order`] up to the final key tie-break.
fn score(kind: MatchKind, entry: &SymbolEntry) -> u32 {
    let length = u32::try_from(entry.key.len()).unwrap_or(u32::MAX).min(999);
    kind.weight() - length
}

#[derive(Debug, Clone, Default)]
pub struct QueryMatcher {
    options: MatchOptions,
}

impl QueryMatcher {
    pub const fn new(options: MatchOptions) -> Self {
        Self { options }
    }

    pub const fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Normalizes `raw` and matches it against `shards`.
    pub fn match_query<'a>(
        &self,
        raw: &str,
        shards: &'a [Arc<IndexShard>],
    ) -> Result<Vec<SymbolMatch<'a>>, QueryError> {
        let query = NormalizedQuery::parse(raw)?;
        Ok(self.matches(&query, shards))
    }

    /// All matches of `query` among `shards`, in rank order.
    ///
    /// Every shard of the query's partition is scanned. Short queries also
    /// scan the other given shards, where only substring and label matches
    /// are possible.
    pub fn matches<'a>(
        &self,
        query: &NormalizedQuery,
        shards: &'a [Arc<IndexShard>],
    ) -> Vec<SymbolMatch<'a>> {
        let cross_partition = query.key.chars().count() <= self.options.cross_partition_max_len;

        let mut seen: AHashSet<&'a str> = AHashSet::new();
        let mut matches = Vec::new();

        for shard in shards {
            if shard.partition() != query.partition && !cross_partition {
                continue;
            }
            for entry in shard.entries() {
                let Some(kind) = classify(query, entry) else {
                    continue;
                };
                if !seen.insert(entry.key.as_str()) {
                    continue;
                }
                matches.push(SymbolMatch {
                    entry,
                    kind,
                    score: score(kind, entry),
                });
            }
        }

        match self.options.label_matching {
            LabelMatchPolicy::Always => {}
            LabelMatchPolicy::Never => matches.retain(|m| m.kind != MatchKind::LabelSubstring),
            LabelMatchPolicy::Fallback => {
                if matches.iter().any(|m| m.kind != MatchKind::LabelSubstring) {
                    matches.retain(|m| m.kind != MatchKind::LabelSubstring);
                }
            }
        }

        matches.sort_by(rank_order);
        tracing::trace!(
            "Query '{}' (key '{}') matched {} entries",
            query.text,
            query.key,
            matches.len()
        );
        matches
    }
}
