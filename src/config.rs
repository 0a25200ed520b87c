//! Search configuration, loaded from TOML.
//!
//! ```toml
//! max_results = 50
//! debounce_ms = 500
//! section = "all"
//! label_matching = "fallback"
//! cross_partition_max_len = 2
//! suggestions = 3
//! ```

use crate::error::ConfigError;
use crate::search::{DEFAULT_MAX_RESULTS, LabelMatchPolicy, MatchOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables for a search session. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Row cap of a result set.
    pub max_results: usize,
    /// Quiet time after a keystroke before the query runs.
    pub debounce_ms: u64,
    /// Section searched by a new session.
    pub section: String,
    pub label_matching: LabelMatchPolicy,
    pub cross_partition_max_len: usize,
    /// Number of "did you mean" labels offered when nothing matches.
    pub suggestions: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            debounce_ms: 500,
            section: "all".to_string(),
            label_matching: LabelMatchPolicy::default(),
            cross_partition_max_len: MatchOptions::default().cross_partition_max_len,
            suggestions: 3,
        }
    }
}

impl SearchConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads the user config file if there is one, defaults otherwise.
    pub fn discover() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!("Using config at {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/symbol-search/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("symbol-search").join("config.toml"))
    }

    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub const fn match_options(&self) -> MatchOptions {
        MatchOptions {
            label_matching: self.label_matching,
            cross_partition_max_len: self.cross_partition_max_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use std::io::Write as _;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        check!(config.max_results == 50);
        check!(config.debounce() == Duration::from_millis(500));
        check!(config.section == "all");
        check!(config.match_options() == MatchOptions::default());
    }

    #[test]
    fn test_partial_toml() {
        let_assert!(Ok(config) = SearchConfig::from_toml_str("max_results = 10\nlabel_matching = \"fallback\"\n"));
        check!(config.max_results == 10);
        check!(config.label_matching == LabelMatchPolicy::Fallback);
        check!(config.debounce_ms == 500);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let_assert!(Err(ConfigError::Parse(_)) = SearchConfig::from_toml_str("max_rows = 1"));
        let_assert!(Err(ConfigError::Parse(_)) = SearchConfig::from_toml_str("label_matching = \"sometimes\""));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "section = \"functions\"\ndebounce_ms = 0").unwrap();
        let_assert!(Ok(config) = SearchConfig::load(file.path()));
        check!(config.section == "functions");
        check!(config.debounce() == Duration::ZERO);

        let_assert!(Err(ConfigError::Read { .. }) = SearchConfig::load(Path::new("/nonexistent/config.toml")));
    }
}
