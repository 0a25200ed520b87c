//! Session-scoped shard cache with shared in-flight loads.
//!
//! The catalog is created empty for a search session and fills lazily.
//! Concurrent requests for the same shard await one shared future instead
//! of fetching twice. Failed loads are not cached, so the next request
//! retries; a failure never touches shards that are already loaded.

use super::manifest::CatalogManifest;
use super::shard::IndexShard;
use super::source::ShardSource;
use crate::error::LoadError;
use ahash::AHashMap;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared, join_all};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Type alias for shared shard loading futures.
type SharedLoad = Shared<BoxFuture<'static, Result<Arc<IndexShard>, LoadError>>>;

/// Cache key: one partition of one section.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ShardId {
    section: String,
    partition: char,
}

impl ShardId {
    fn new(section: &str, partition: char) -> Self {
        Self {
            section: section.to_string(),
            partition,
        }
    }
}

struct CatalogState {
    manifest: CatalogManifest,
    source: Arc<dyn ShardSource>,
    /// Loaded shards, never evicted
    shards: RwLock<AHashMap<ShardId, Arc<IndexShard>>>,
    /// Loads in progress (can be awaited by multiple callers)
    in_flight: Mutex<AHashMap<ShardId, SharedLoad>>,
}

/// Lazily loaded mapping from partition to shard.
///
/// Cloning is cheap and yields a handle to the same cache.
#[derive(Clone)]
pub struct IndexCatalog {
    state: Arc<CatalogState>,
}

impl fmt::Debug for IndexCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexCatalog")
            .field("sections", &self.state.manifest.sections().len())
            .field("loaded", &read(&self.state.shards).len())
            .field("in_flight", &lock(&self.state.in_flight).len())
            .finish()
    }
}

impl IndexCatalog {
    /// Create an empty catalog over the given layout and source.
    pub fn new(manifest: CatalogManifest, source: Arc<dyn ShardSource>) -> Self {
        Self {
            state: Arc::new(CatalogState {
                manifest,
                source,
                shards: RwLock::new(AHashMap::new()),
                in_flight: Mutex::new(AHashMap::new()),
            }),
        }
    }

    pub fn manifest(&self) -> &CatalogManifest {
        &self.state.manifest
    }

    /// Loads every listed partition that is not cached yet.
    ///
    /// All partitions are attempted even if one fails; the first failure in
    /// partition order is returned.
    pub async fn ensure_loaded(
        &self,
        section: &str,
        partitions: &BTreeSet<char>,
    ) -> Result<(), LoadError> {
        let results = join_all(partitions.iter().map(|&p| self.load(section, p))).await;
        results
            .into_iter()
            .find_map(Result::err)
            .map_or(Ok(()), Err)
    }

    /// Get a shard, waiting for an in-flight load or starting one if needed.
    pub async fn load(&self, section: &str, partition: char) -> Result<Arc<IndexShard>, LoadError> {
        let id = ShardId::new(section, partition);

        let future = {
            // Cache check and registration happen under one lock so two
            // callers can never both start a fetch for the same shard
            let mut in_flight = lock(&self.state.in_flight);

            if let Some(shard) = read(&self.state.shards).get(&id) {
                tracing::debug!("Cache hit for {}:{}", section, partition);
                return Ok(shard.clone());
            }

            if let Some(future) = in_flight.get(&id) {
                tracing::debug!("Awaiting in-flight load of {}:{}", section, partition);
                future.clone()
            } else {
                let section_meta = self
                    .state
                    .manifest
                    .section(section)
                    .cloned()
                    .ok_or_else(|| LoadError::NotFound {
                        section: section.to_string(),
                        partition,
                    })?;

                tracing::info!("Loading partition '{}' of section '{}'", partition, section);
                let state = self.state.clone();
                let load_id = id.clone();
                let future: BoxFuture<'static, Result<Arc<IndexShard>, LoadError>> =
                    Box::pin(async move {
                        let result =
                            IndexShard::load(state.source.as_ref(), &section_meta, load_id.partition)
                                .await
                                .map(Arc::new);

                        match &result {
                            Ok(shard) => {
                                tracing::debug!(
                                    "Cached {}:{} ({} entries)",
                                    load_id.section,
                                    load_id.partition,
                                    shard.len()
                                );
                                write(&state.shards).insert(load_id.clone(), shard.clone());
                            }
                            Err(e) => tracing::warn!("Shard load failed: {}", e),
                        }

                        lock(&state.in_flight).remove(&load_id);
                        result
                    });

                let shared = future.shared();
                in_flight.insert(id, shared.clone());
                shared
            }
        };

        future.await
    }

    /// The cached shard, if loaded.
    pub fn shard(&self, section: &str, partition: char) -> Option<Arc<IndexShard>> {
        read(&self.state.shards)
            .get(&ShardId::new(section, partition))
            .cloned()
    }

    /// The cached shard, or an empty one if it has not been loaded.
    pub fn entries_for(&self, section: &str, partition: char) -> Arc<IndexShard> {
        self.shard(section, partition)
            .unwrap_or_else(|| Arc::new(IndexShard::empty(section, partition)))
    }

    /// Every loaded shard of a section, in partition order.
    pub fn loaded_shards(&self, section: &str) -> Vec<Arc<IndexShard>> {
        let mut shards: Vec<_> = read(&self.state.shards)
            .iter()
            .filter(|(id, _)| id.section == section)
            .map(|(_, shard)| shard.clone())
            .collect();
        shards.sort_by_key(|s| s.partition());
        shards
    }

    pub fn is_loaded(&self, section: &str, partition: char) -> bool {
        read(&self.state.shards).contains_key(&ShardId::new(section, partition))
    }

    pub fn is_loading(&self, section: &str, partition: char) -> bool {
        lock(&self.state.in_flight).contains_key(&ShardId::new(section, partition))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
