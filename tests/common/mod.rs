//! Shared test fixtures and utilities for integration tests.
//!
//! # Fixture index
//!
//! `tests/fixtures/search/` is a generated `search/` directory:
//! - `searchdata.js`: sections `all` (a-z), `files` (r) and `functions` (r)
//! - `all_11.js`: partition `r` of `all`, as emitted by the generator
//! - `all_10.js`: partition `q` of `all`, an empty table
//! - `files_0.js`: partition `r` of `files`
//!
//! `functions_0.js` is deliberately absent so loads of that section fail.
//!
//! # Controlling fetch timing
//!
//! [`GatedSource`] wraps another source and holds every fetch until the test
//! releases it, which lets a test issue a second query while the first is
//! still loading.

#![allow(dead_code)] // Helpers used across different integration test crates

use futures::future::BoxFuture;
use rstest::fixture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use symbol_search::error::SourceError;
use symbol_search::index::{CatalogManifest, DirectorySource, IndexCatalog, MANIFEST_FILE, MemorySource, ShardSource};
use symbol_search::{SearchConfig, SearchSession};
use tempfile::TempDir;
use tokio::sync::Semaphore;

/// Returns the project root directory (where Cargo.toml lives).
pub fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// The fixture `search/` directory.
pub fn fixture_dir() -> PathBuf {
    project_root().join("tests").join("fixtures").join("search")
}

/// Reads a fixture payload.
pub fn fixture_text(name: &str) -> String {
    std::fs::read_to_string(fixture_dir().join(name))
        .unwrap_or_else(|e| panic!("Failed to read fixture '{}': {}", name, e))
}

/// The fixture manifest.
#[fixture]
pub fn manifest() -> CatalogManifest {
    CatalogManifest::parse(&fixture_text(MANIFEST_FILE)).expect("Fixture manifest should parse")
}

/// The fixture directory as a source.
#[fixture]
pub fn directory_source() -> Arc<DirectorySource> {
    Arc::new(DirectorySource::new(fixture_dir()))
}

/// Every fixture payload, held in memory.
///
/// Used by tests with paused time, where file reads on the blocking pool
/// would race the auto-advancing clock.
#[fixture]
pub fn memory_source() -> Arc<MemorySource> {
    let source = ["all_10.js", "all_11.js", "files_0.js"]
        .into_iter()
        .fold(MemorySource::new(), |source, name| source.with(name, fixture_text(name)));
    Arc::new(source)
}

/// Session over `source` with the fixture manifest.
pub fn session_over(source: Arc<dyn ShardSource>, config: SearchConfig) -> SearchSession {
    let catalog = IndexCatalog::new(manifest(), source);
    SearchSession::new(catalog, config)
}

/// Config with no debounce, as used by tests that call `query` directly.
pub fn test_config() -> SearchConfig {
    SearchConfig {
        debounce_ms: 0,
        ..SearchConfig::default()
    }
}

/// A source that counts fetches and holds each one until released.
pub struct GatedSource {
    inner: Arc<dyn ShardSource>,
    gate: Arc<Semaphore>,
    fetches: AtomicUsize,
}

impl GatedSource {
    /// All fetches wait until [`release`](Self::release) is called.
    pub fn closed(inner: Arc<dyn ShardSource>) -> Self {
        Self {
            inner,
            gate: Arc::new(Semaphore::new(0)),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Fetches pass straight through; only counted.
    pub fn open(inner: Arc<dyn ShardSource>) -> Self {
        let source = Self::closed(inner);
        source.gate.add_permits(Semaphore::MAX_PERMITS);
        source
    }

    /// Lets `count` waiting (or future) fetches complete.
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// Number of fetches started so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ShardSource for GatedSource {
    fn fetch(&self, name: &str) -> BoxFuture<'static, Result<String, SourceError>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.clone();
        let fetch = self.inner.fetch(name);
        Box::pin(async move {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
            fetch.await
        })
    }
}

/// A temporary directory for tests that build their own `search/` layout.
///
/// Cleaned up when dropped.
pub struct TempWorkspace {
    _temp: TempDir,
    root: PathBuf,
}

impl TempWorkspace {
    /// Creates a new empty temporary workspace.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    /// Returns the root path of this workspace.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Creates a file with the given content within this workspace.
    ///
    /// Parent directories are created automatically if they don't exist.
    ///
    /// # Panics
    /// Panics if file creation fails.
    pub fn create_file(&self, path: &str, content: &str) {
        let full_path = self.root.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap_or_else(|e| {
                panic!("Failed to create parent directory for '{}': {}", path, e)
            });
        }
        std::fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("Failed to write file '{}': {}", path, e));
    }

    /// Copies a fixture payload into `search/` of this workspace.
    pub fn copy_fixture(&self, name: &str) {
        self.create_file(&format!("search/{}", name), &fixture_text(name));
    }

    /// The `search/` directory of this workspace.
    pub fn search_dir(&self) -> PathBuf {
        self.root.join("search")
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
