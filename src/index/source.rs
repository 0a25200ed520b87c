//! Where shard payloads come from.
//!
//! The catalog only knows payload names (`all_11.js`); transport is up to the
//! integrator. Two sources ship with the crate: a directory on disk and an
//! in-memory map for bundled indexes.

use super::manifest::{CatalogManifest, MANIFEST_FILE};
use crate::error::SourceError;
use ahash::AHashMap;
use anyhow::Context;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use std::path::{Path, PathBuf};

/// Fetch capability for shard payloads, keyed by file name.
pub trait ShardSource: Send + Sync + 'static {
    fn fetch(&self, name: &str) -> BoxFuture<'static, Result<String, SourceError>>;
}

/// Reads payloads from a generated `search/` directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads and parses `searchdata.js` from the directory.
    pub async fn manifest(&self) -> crate::error::Result<CatalogManifest> {
        let path = self.root.join(MANIFEST_FILE);
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read search manifest at {}", path.display()))?;
        CatalogManifest::parse(&text)
            .with_context(|| format!("Failed to parse search manifest at {}", path.display()))
    }
}

impl ShardSource for DirectorySource {
    fn fetch(&self, name: &str) -> BoxFuture<'static, Result<String, SourceError>> {
        // Payload names are flat; anything else cannot come from the manifest
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return future::ready(Err(SourceError::Missing(name.to_string()))).boxed();
        }

        let path = self.root.join(name);
        let name = name.to_string();
        async move {
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => Ok(text),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(SourceError::Missing(name))
                }
                Err(e) => Err(SourceError::Io {
                    name,
                    reason: e.to_string(),
                }),
            }
        }
        .boxed()
    }
}

/// Payloads held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    payloads: AHashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, payload: impl Into<String>) -> Self {
        self.insert(name, payload);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, payload: impl Into<String>) {
        self.payloads.insert(name.into(), payload.into());
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

impl ShardSource for MemorySource {
    fn fetch(&self, name: &str) -> BoxFuture<'static, Result<String, SourceError>> {
        let result = self
            .payloads
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::Missing(name.to_string()));
        future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    #[tokio::test]
    async fn test_memory_source() {
        let source = MemorySource::new().with("all_0.js", "var searchData=[];");
        let_assert!(Ok(text) = source.fetch("all_0.js").await);
        check!(text == "var searchData=[];");
        let_assert!(Err(SourceError::Missing(name)) = source.fetch("all_1.js").await);
        check!(name == "all_1.js");
    }

    #[tokio::test]
    async fn test_directory_source_rejects_paths() {
        let source = DirectorySource::new("/nonexistent");
        let_assert!(Err(SourceError::Missing(_)) = source.fetch("../secret.js").await);
        let_assert!(Err(SourceError::Missing(_)) = source.fetch("all_0.js").await);
    }
}
