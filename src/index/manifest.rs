//! Section and partition layout of a generated search index.
//!
//! The generator writes one index per section (`all`, `functions`, `files`,
//! ...) and describes them in `search/searchdata.js`:
//!
//! ```text
//! var indexSectionsWithContent = { 0: "_abcdefghijklmnopqrstuvwxyz", 1: "rs" };
//! var indexSectionNames = { 0: "all", 1: "files" };
//! var indexSectionLabels = { 0: "All", 1: "Files" };
//! ```
//!
//! Each character of a section's content string is a partition; its shard
//! lives in `<name>_<position as hex>.js`.

use super::literal::parse_script;
use crate::error::ManifestError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// File name of the manifest inside the search directory.
pub const MANIFEST_FILE: &str = "searchdata.js";

/// One search scope and its partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: usize,
    pub name: String,
    pub label: String,
    partitions: Vec<char>,
}

impl Section {
    pub fn new(id: usize, name: impl Into<String>, label: impl Into<String>, partitions: &str) -> Self {
        let mut seen = Vec::new();
        for c in partitions.chars() {
            if !seen.contains(&c) {
                seen.push(c);
            }
        }
        Self {
            id,
            name: name.into(),
            label: label.into(),
            partitions: seen,
        }
    }

    /// Partitions in manifest order.
    pub fn partitions(&self) -> &[char] {
        &self.partitions
    }

    pub fn contains(&self, partition: char) -> bool {
        self.partitions.contains(&partition)
    }

    /// Name of the payload holding `partition`, or `None` if the section has no such partition.
    pub fn shard_file(&self, partition: char) -> Option<String> {
        let position = self.partitions.iter().position(|&c| c == partition)?;
        Some(format!("{}_{:x}.js", self.name, position))
    }
}

/// All sections of one generated index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogManifest {
    sections: Vec<Section>,
}

impl CatalogManifest {
    /// A manifest with a single section, for bundled or hand-built indexes.
    pub fn single(name: &str, label: &str, partitions: &str) -> Self {
        Self {
            sections: vec![Section::new(0, name, label, partitions)],
        }
    }

    pub fn from_sections(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    /// Parses the contents of `searchdata.js`.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let bindings =
            parse_script(text).map_err(|e| ManifestError::Invalid(e.to_string()))?;
        let table = |name: &'static str| {
            bindings
                .iter()
                .find(|(binding, _)| binding == name)
                .map(|(_, value)| value)
        };

        let contents = table("indexSectionsWithContent")
            .ok_or(ManifestError::MissingTable("indexSectionsWithContent"))
            .and_then(string_table)?;
        let names = table("indexSectionNames")
            .ok_or(ManifestError::MissingTable("indexSectionNames"))
            .and_then(string_table)?;
        let labels = match table("indexSectionLabels") {
            Some(value) => string_table(value)?,
            None => BTreeMap::new(),
        };

        let mut sections = Vec::with_capacity(contents.len());
        for (id, partitions) in &contents {
            let name = names.get(id).ok_or_else(|| {
                ManifestError::Invalid(format!("section {} has content but no name", id))
            })?;
            let label = labels.get(id).unwrap_or(name);
            sections.push(Section::new(*id, name.clone(), label.clone(), partitions));
        }

        tracing::debug!("Parsed search manifest with {} sections", sections.len());
        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Reads `{ 0: "...", 1: "..." }` into an id-ordered map.
fn string_table(value: &Value) -> Result<BTreeMap<usize, String>, ManifestError> {
    let object: &Map<String, Value> = value
        .as_object()
        .ok_or_else(|| ManifestError::Invalid("expected an object table".to_string()))?;

    object
        .iter()
        .map(|(key, value)| {
            let id = key
                .parse::<usize>()
                .map_err(|_| ManifestError::Invalid(format!("non-numeric section id '{}'", key)))?;
            let text = value.as_str().ok_or_else(|| {
                ManifestError::Invalid(format!("section {} entry is not a string", id))
            })?;
            Ok((id, text.to_string()))
        })
        .collect()
}
