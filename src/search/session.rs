//! Incremental search session.
//!
//! A session turns keystrokes into published result sets. Every query is
//! stamped with a generation number when it is issued; results are published
//! only if their generation is still the newest, so a slow shard load for an
//! old query can never overwrite the results of a newer one.
//!
//! ```text
//! Idle --keystroke--> Typing --shard missing--> Loading --> Displaying
//!                        \----------shard cached-------------^
//! ```
//!
//! Any keystroke restarts the machine; an empty query returns to `Idle`.

use super::matcher::{NormalizedQuery, QueryMatcher};
use super::ranking::RankedResultSet;
use super::suggest::suggest;
use crate::config::SearchConfig;
use crate::error::{LoadError, ManifestError};
use crate::index::IndexCatalog;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No query; nothing shown.
    Idle,
    /// A query was entered and is waiting to run.
    Typing,
    /// Waiting for a shard fetch.
    Loading,
    /// Results for the current query are published.
    Displaying,
}

/// Everything a UI needs to render the session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// Incremented for every query, section switch, and clear.
    pub generation: u64,
    pub section: String,
    /// The query the snapshot belongs to, trimmed.
    pub query: String,
    /// Results for `query`; empty until the state reaches `Displaying`.
    pub results: Arc<RankedResultSet>,
    /// Set when the shard for the query could not be loaded.
    pub error: Option<LoadError>,
}

/// Result of running one query.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// The results were published to subscribers.
    Published(Arc<RankedResultSet>),
    /// A newer query was issued first; nothing was published.
    Superseded,
}

impl QueryOutcome {
    /// The published results, if any.
    pub fn results(&self) -> Option<&Arc<RankedResultSet>> {
        match self {
            Self::Published(results) => Some(results),
            Self::Superseded => None,
        }
    }
}

/// A query stamped with the generation it was issued under.
struct Ticket {
    generation: u64,
    section: String,
    query: Option<NormalizedQuery>,
}

struct SessionInner {
    catalog: IndexCatalog,
    matcher: QueryMatcher,
    config: SearchConfig,
    snapshot: watch::Sender<SessionSnapshot>,
    /// Debounce task of the latest keystroke
    pending: Mutex<Option<CancellationToken>>,
}

/// One user's incremental search over a catalog.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct SearchSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SearchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.inner.snapshot.borrow();
        f.debug_struct("SearchSession")
            .field("state", &snapshot.state)
            .field("generation", &snapshot.generation)
            .field("section", &snapshot.section)
            .field("query", &snapshot.query)
            .finish_non_exhaustive()
    }
}

impl SearchSession {
    /// Starts an idle session searching `config.section`.
    pub fn new(catalog: IndexCatalog, config: SearchConfig) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot {
            state: SessionState::Idle,
            generation: 0,
            section: config.section.clone(),
            query: String::new(),
            results: Arc::new(RankedResultSet::default()),
            error: None,
        });

        Self {
            inner: Arc::new(SessionInner {
                matcher: QueryMatcher::new(config.match_options()),
                catalog,
                config,
                snapshot,
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn catalog(&self) -> &IndexCatalog {
        &self.inner.catalog
    }

    pub fn config(&self) -> &SearchConfig {
        &self.inner.config
    }

    /// Receives every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Runs `raw` immediately, superseding anything in progress.
    ///
    /// Returns the published results, or `Superseded` if another query was
    /// issued before this one finished.
    pub async fn query(&self, raw: &str) -> QueryOutcome {
        self.cancel_pending();
        let ticket = self.begin(raw);
        self.run(ticket).await
    }

    /// Records a keystroke; the query runs once `debounce` passes without
    /// another keystroke. Must be called within a tokio runtime.
    pub fn keystroke(&self, raw: &str) {
        let ticket = self.begin(raw);
        let token = CancellationToken::new();
        if let Some(previous) = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone())
        {
            previous.cancel();
        }

        if ticket.query.is_none() {
            return;
        }

        let session = self.clone();
        let delay = self.inner.config.debounce();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    tracing::trace!("Keystroke {} superseded during debounce", ticket.generation);
                }
                () = tokio::time::sleep(delay) => {
                    session.run(ticket).await;
                }
            }
        });
    }

    /// Clears the query and returns to `Idle`.
    pub fn clear(&self) {
        self.cancel_pending();
        self.begin("");
    }

    /// Switches the searched section and returns to `Idle`.
    pub fn set_section(&self, name: &str) -> Result<(), ManifestError> {
        if self.inner.catalog.manifest().section(name).is_none() {
            return Err(ManifestError::UnknownSection(name.to_string()));
        }
        self.cancel_pending();
        self.inner.snapshot.send_modify(|snap| {
            snap.generation += 1;
            snap.section = name.to_string();
            snap.state = SessionState::Idle;
            snap.query.clear();
            snap.results = Arc::new(RankedResultSet::default());
            snap.error = None;
        });
        tracing::debug!("Switched to section '{}'", name);
        Ok(())
    }

    fn cancel_pending(&self) {
        if let Some(token) = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            token.cancel();
        }
    }

    /// Issues a new generation for `raw` and publishes `Typing`, or `Idle`
    /// for an empty query.
    fn begin(&self, raw: &str) -> Ticket {
        let query = NormalizedQuery::parse(raw).ok();
        let mut issued = (0, String::new());

        self.inner.snapshot.send_modify(|snap| {
            snap.generation += 1;
            snap.error = None;
            if let Some(query) = &query {
                snap.state = SessionState::Typing;
                snap.query = query.text().to_string();
                snap.results = Arc::new(RankedResultSet::empty(query.text()));
            } else {
                snap.state = SessionState::Idle;
                snap.query.clear();
                snap.results = Arc::new(RankedResultSet::default());
            }
            issued = (snap.generation, snap.section.clone());
        });

        let (generation, section) = issued;
        Ticket {
            generation,
            section,
            query,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.snapshot.borrow().generation == generation
    }

    /// Applies `update` only if `generation` is still the newest. Checked
    /// under the channel lock, so a newer `begin` cannot interleave.
    fn publish(&self, generation: u64, update: impl FnOnce(&mut SessionSnapshot)) -> bool {
        self.inner.snapshot.send_if_modified(|snap| {
            if snap.generation != generation {
                return false;
            }
            update(snap);
            true
        })
    }

    async fn run(&self, ticket: Ticket) -> QueryOutcome {
        let Some(query) = ticket.query else {
            // Empty queries were published as Idle by `begin`
            return if self.is_current(ticket.generation) {
                QueryOutcome::Published(Arc::new(RankedResultSet::default()))
            } else {
                QueryOutcome::Superseded
            };
        };
        let generation = ticket.generation;
        let section = ticket.section;
        let catalog = &self.inner.catalog;

        let mut error = None;
        if !catalog.is_loaded(&section, query.partition()) {
            if !self.publish(generation, |snap| snap.state = SessionState::Loading) {
                return QueryOutcome::Superseded;
            }
            let partitions = BTreeSet::from([query.partition()]);
            if let Err(e) = catalog.ensure_loaded(&section, &partitions).await {
                tracing::warn!("Query '{}' degraded: {}", query.text(), e);
                error = Some(e);
            }
            if !self.is_current(generation) {
                tracing::debug!("Discarding stale results for '{}'", query.text());
                return QueryOutcome::Superseded;
            }
        }

        // A failed partition still leaves the loaded ones searchable
        let results = Arc::new(self.rank(&section, &query));

        let published = self.publish(generation, |snap| {
            snap.state = SessionState::Displaying;
            snap.results = results.clone();
            snap.error = error;
        });

        if published {
            tracing::trace!(
                "Published {} rows for '{}' (generation {})",
                results.len(),
                query.text(),
                generation
            );
            QueryOutcome::Published(results)
        } else {
            QueryOutcome::Superseded
        }
    }

    fn rank(&self, section: &str, query: &NormalizedQuery) -> RankedResultSet {
        let shards = self.inner.catalog.loaded_shards(section);
        let matches = self.inner.matcher.matches(query, &shards);
        let results = RankedResultSet::build(query, matches, self.inner.config.max_results);

        if results.is_empty() && self.inner.config.suggestions > 0 {
            let suggestions = suggest(query, &shards, self.inner.config.suggestions);
            results.with_suggestions(suggestions)
        } else {
            results
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{CatalogManifest, MemorySource};
    use assert2::{check, let_assert};

    fn session() -> SearchSession {
        let manifest = CatalogManifest::single("all", "All", "abcdefghijklmnopqrstuvwxyz");
        let source = MemorySource::new()
            .with(
                "all_11.js",
                "var searchData=[['randuni',['RandUni',['../rands_8h.html#a1',1,'rands.h']]]];",
            )
            .with("all_12.js", "not a table");
        let config = SearchConfig {
            debounce_ms: 10,
            ..SearchConfig::default()
        };
        SearchSession::new(IndexCatalog::new(manifest, Arc::new(source)), config)
    }

    #[tokio::test]
    async fn test_query_publishes() {
        let session = session();
        let_assert!(QueryOutcome::Published(results) = session.query("randu").await);
        check!(results.len() == 1);

        let snapshot = session.snapshot();
        check!(snapshot.state == SessionState::Displaying);
        check!(snapshot.query == "randu");
        check!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_empty_query_is_idle() {
        let session = session();
        let_assert!(QueryOutcome::Published(results) = session.query("").await);
        check!(results.is_empty());
        check!(session.snapshot().state == SessionState::Idle);

        session.query("randu").await;
        session.clear();
        check!(session.snapshot().state == SessionState::Idle);
        check!(session.snapshot().results.is_empty());
    }

    #[tokio::test]
    async fn test_load_error_is_flagged() {
        let session = session();
        let_assert!(QueryOutcome::Published(results) = session.query("shard").await);
        check!(results.is_empty());

        let snapshot = session.snapshot();
        check!(snapshot.state == SessionState::Displaying);
        let_assert!(Some(LoadError::Malformed { partition: 's', .. }) = snapshot.error);

        // Other partitions are unaffected
        let_assert!(QueryOutcome::Published(results) = session.query("randuni").await);
        check!(results.len() == 1);
        check!(session.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_typing_drops_previous_results() {
        let session = session();
        let_assert!(QueryOutcome::Published(results) = session.query("randu").await);
        check!(!results.is_empty());

        session.keystroke("rain");
        let snapshot = session.snapshot();
        check!(snapshot.state == SessionState::Typing);
        check!(snapshot.query == "rain");
        check!(snapshot.results.is_empty());
        check!(snapshot.results.query() == "rain");
        session.clear();
    }

    #[tokio::test]
    async fn test_set_section() {
        let session = session();
        session.query("randu").await;
        let_assert!(Ok(()) = session.set_section("all"));
        check!(session.snapshot().state == SessionState::Idle);
        let_assert!(Err(ManifestError::UnknownSection(_)) = session.set_section("functions"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystrokes_debounce() {
        let session = session();
        let mut rx = session.subscribe();

        session.keystroke("r");
        session.keystroke("ra");
        session.keystroke("randu");
        check!(session.snapshot().state == SessionState::Typing);

        let_assert!(
            Ok(snapshot) = rx
                .wait_for(|s| s.state == SessionState::Displaying)
                .await
                .map(|s| s.clone())
        );
        check!(snapshot.query == "randu");
        check!(snapshot.results.len() == 1);
    }
}
