//! Capped, display-ready result rows.

use super::matcher::{MatchKind, NormalizedQuery, SymbolMatch, rank_order};
use crate::index::{Occurrence, SymbolKind, find_ignore_ascii_case};
use serde::Serialize;
use std::ops::Range;

/// Default row cap; bounds render cost of a results panel.
pub const DEFAULT_MAX_RESULTS: usize = 50;

/// One clickable result: a single occurrence of a matched entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub key: String,
    pub label: String,
    pub container_label: String,
    pub anchor_url: String,
    pub kind_hint: Option<SymbolKind>,
    pub match_kind: MatchKind,
    pub score: u32,
    /// Position of the entry in rank order; rows of one entry share it.
    pub entry_rank: usize,
    /// Byte range of the query inside `label`, when it appears there verbatim.
    pub highlight: Option<Range<usize>>,
}

/// The rows shown for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RankedResultSet {
    query: String,
    rows: Vec<DisplayRow>,
    /// Matched entries before capping.
    total_entries: usize,
    truncated: bool,
    suggestions: Vec<String>,
}

impl RankedResultSet {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Orders matches, expands each entry into one row per occurrence, and
    /// caps the row count.
    ///
    /// Entries are never split across the cap: expansion stops at the first
    /// entry that does not fit. The only exception is a first entry that
    /// alone exceeds the cap, which is cut to `cap` rows.
    pub fn build(query: &NormalizedQuery, mut matches: Vec<SymbolMatch<'_>>, cap: usize) -> Self {
        matches.sort_by(rank_order);

        let mut rows = Vec::with_capacity(cap.min(matches.len() * 2));
        let mut truncated = false;

        for (rank, m) in matches.iter().enumerate() {
            let remaining = cap - rows.len();
            let count = m.entry.occurrences.len();
            if count > remaining {
                if rank == 0 && remaining > 0 {
                    rows.extend(expand(query, m, rank).take(remaining));
                }
                truncated = true;
                break;
            }
            rows.extend(expand(query, m, rank));
        }

        Self {
            query: query.text().to_string(),
            rows,
            total_entries: matches.len(),
            truncated,
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub const fn total_entries(&self) -> usize {
        self.total_entries
    }

    /// Whether matched entries were left out by the cap.
    pub const fn truncated(&self) -> bool {
        self.truncated
    }

    /// Close labels offered when nothing matched.
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }
}

/// Rows for one entry, occurrences ordered by container then link.
fn expand<'m>(
    query: &NormalizedQuery,
    m: &'m SymbolMatch<'_>,
    rank: usize,
) -> impl Iterator<Item = DisplayRow> + 'm {
    let mut occurrences: Vec<&Occurrence> = m.entry.occurrences.iter().collect();
    occurrences.sort_by(|a, b| {
        a.container_label
            .cmp(&b.container_label)
            .then_with(|| a.anchor_url.cmp(&b.anchor_url))
    });
    let highlight = find_ignore_ascii_case(&m.entry.label, query.text());

    occurrences.into_iter().map(move |o| DisplayRow {
        key: m.entry.key.clone(),
        label: m.entry.label.clone(),
        container_label: o.container_label.clone(),
        anchor_url: o.anchor_url.clone(),
        kind_hint: o.kind_hint,
        match_kind: m.kind,
        score: m.score,
        entry_rank: rank,
        highlight: highlight.clone(),
    })
}
