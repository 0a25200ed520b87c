//! One partition of a section: parsing and loading.
//!
//! Payload records keep the generator's nesting, `[key, [label, occurrence...]]`.
//! An occurrence is either the generator's `[url, targetFlag, container]`
//! tuple or a `[container, url]` pair, and the occurrences may also come
//! wrapped in one list (`[key, [label, [occurrence, ...]]]`). Every shape
//! decodes to a [`SymbolEntry`] with a plain occurrence vector.

use super::entry::{Occurrence, SymbolEntry};
use super::literal::parse_script;
use super::manifest::Section;
use super::normalize::{decode_entities, partition_of};
use super::source::ShardSource;
use crate::error::{LoadError, SourceError};
use serde_json::Value;

/// Name of the table binding inside a payload script.
const TABLE_BINDING: &str = "searchData";

/// Entries of one partition, in ascending key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexShard {
    section: String,
    partition: char,
    entries: Vec<SymbolEntry>,
}

impl IndexShard {
    /// A shard with no entries.
    pub fn empty(section: impl Into<String>, partition: char) -> Self {
        Self {
            section: section.into(),
            partition,
            entries: Vec::new(),
        }
    }

    /// Fetches and parses the payload for `partition` of `section`.
    pub async fn load(
        source: &dyn ShardSource,
        section: &Section,
        partition: char,
    ) -> Result<Self, LoadError> {
        let not_found = || LoadError::NotFound {
            section: section.name.clone(),
            partition,
        };
        let file = section.shard_file(partition).ok_or_else(not_found)?;

        let text = source.fetch(&file).await.map_err(|e| match e {
            SourceError::Missing(_) => not_found(),
            SourceError::Io { reason, .. } => LoadError::Malformed {
                section: section.name.clone(),
                partition,
                reason,
            },
        })?;

        tracing::trace!("Fetched {} ({} bytes)", file, text.len());
        Self::parse(&section.name, partition, &text)
    }

    /// Parses a payload into a shard.
    pub fn parse(section: &str, partition: char, text: &str) -> Result<Self, LoadError> {
        let malformed = |reason: String| LoadError::Malformed {
            section: section.to_string(),
            partition,
            reason,
        };

        let mut bindings = parse_script(text).map_err(|e| malformed(e.to_string()))?;
        let table = if bindings.len() == 1 {
            bindings.swap_remove(0).1
        } else {
            bindings
                .into_iter()
                .find(|(name, _)| name == TABLE_BINDING)
                .map(|(_, value)| value)
                .ok_or_else(|| malformed(format!("no '{}' table", TABLE_BINDING)))?
        };

        let Value::Array(records) = table else {
            return Err(malformed("table is not an array".to_string()));
        };

        let entries = records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                decode_record(record).map_err(|e| malformed(format!("record {}: {}", i, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_entries(section, partition, entries)
    }

    /// Builds a shard from decoded entries, restoring key order and merging
    /// duplicate keys.
    pub fn from_entries(
        section: &str,
        partition: char,
        mut entries: Vec<SymbolEntry>,
    ) -> Result<Self, LoadError> {
        if let Some(stray) = entries
            .iter()
            .find(|e| partition_of(&e.key) != Some(partition))
        {
            return Err(LoadError::Malformed {
                section: section.to_string(),
                partition,
                reason: format!("key '{}' belongs to another partition", stray.key),
            });
        }

        if !entries.windows(2).all(|w| w[0].key < w[1].key) {
            tracing::warn!(
                "Partition '{}' of section '{}' is not in key order, sorting",
                partition,
                section
            );
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            entries.dedup_by(|later, earlier| {
                if later.key == earlier.key {
                    earlier.occurrences.append(&mut later.occurrences);
                    true
                } else {
                    false
                }
            });
        }

        for entry in &mut entries {
            dedup_occurrences(&mut entry.occurrences);
        }

        Ok(Self {
            section: section.to_string(),
            partition,
            entries,
        })
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub const fn partition(&self) -> char {
        self.partition
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an entry by normalized key.
    pub fn get(&self, key: &str) -> Option<&SymbolEntry> {
        self.entries
            .binary_search_by(|e| e.key.as_str().cmp(key))
            .ok()
            .map(|i| &self.entries[i])
    }
}

/// Drops exact repeats of the same link, keeping first-seen order.
fn dedup_occurrences(occurrences: &mut Vec<Occurrence>) {
    let mut seen: Vec<(String, String)> = Vec::with_capacity(occurrences.len());
    occurrences.retain(|o| {
        let pair = (o.container_label.clone(), o.anchor_url.clone());
        if seen.contains(&pair) {
            false
        } else {
            seen.push(pair);
            true
        }
    });
}

fn decode_record(record: &Value) -> Result<SymbolEntry, String> {
    let [key, body] = record
        .as_array()
        .map(Vec::as_slice)
        .ok_or("record is not an array")?
    else {
        return Err("record must be [key, [label, occurrences...]]".to_string());
    };

    let key = key.as_str().ok_or("key is not a string")?;
    if key.is_empty() {
        return Err("empty key".to_string());
    }

    let body = body.as_array().ok_or("record body is not an array")?;
    let (label, rest) = body.split_first().ok_or("record body is empty")?;
    let label = label.as_str().ok_or("label is not a string")?;

    let tuples: &[Value] = match rest {
        [Value::Array(list)] if list.first().is_some_and(Value::is_array) => list.as_slice(),
        _ => rest,
    };
    if tuples.is_empty() {
        return Err(format!("'{}' has no occurrences", key));
    }

    let occurrences = tuples
        .iter()
        .map(decode_occurrence)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SymbolEntry {
        key: key.to_string(),
        label: decode_entities(label).into_owned(),
        occurrences,
    })
}

fn decode_occurrence(tuple: &Value) -> Result<Occurrence, String> {
    let fields = tuple.as_array().ok_or("occurrence is not an array")?;
    let (container, url) = match fields.as_slice() {
        [Value::String(url), Value::Number(_) | Value::Bool(_), Value::String(container)] => {
            (container, url)
        }
        [Value::String(container), Value::String(url)] => (container, url),
        _ => return Err(format!("unrecognized occurrence shape {}", tuple)),
    };
    Ok(Occurrence::new(decode_entities(container), url.as_str()))
}
