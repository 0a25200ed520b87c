//! Error handling types and utilities.

use std::path::PathBuf;

/// A specialized Result type for command-line level operations.
///
/// Library operations return the typed errors below; the binary wraps them
/// with `.context()` and `.with_context()`.
pub type Result<T> = anyhow::Result<T>;

/// Error returned when a shard cannot be loaded.
///
/// Cloneable so a single failed load can be handed to every caller awaiting
/// the same in-flight future.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The partition does not exist in the section, or its payload is missing.
    #[error("no partition '{partition}' in section '{section}'")]
    NotFound { section: String, partition: char },
    /// The payload was fetched but is not a valid search table.
    #[error("malformed payload for partition '{partition}' in section '{section}': {reason}")]
    Malformed {
        section: String,
        partition: char,
        reason: String,
    },
}

impl LoadError {
    /// The partition the failure belongs to.
    pub const fn partition(&self) -> char {
        match self {
            Self::NotFound { partition, .. } | Self::Malformed { partition, .. } => *partition,
        }
    }
}

/// Error returned for queries that cannot be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The query is empty after trimming. Callers treat this as a no-op.
    #[error("empty query")]
    EmptyQuery,
}

/// Error returned by a [`ShardSource`](crate::index::ShardSource).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The source has no payload under that name.
    #[error("payload '{0}' not found")]
    Missing(String),
    /// The payload exists but could not be read.
    #[error("failed to read '{name}': {reason}")]
    Io { name: String, reason: String },
}

/// Error returned when `searchdata.js` cannot be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    #[error("missing '{0}' table in search manifest")]
    MissingTable(&'static str),
    #[error("invalid search manifest: {0}")]
    Invalid(String),
    #[error("no section named '{0}'")]
    UnknownSection(String),
}

/// Error returned when loading configuration fails.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
