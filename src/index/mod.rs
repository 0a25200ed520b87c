//! The partitioned symbol index: payload parsing, shards, and the lazy catalog.

mod catalog;
mod entry;
mod literal;
mod manifest;
mod normalize;
mod shard;
mod source;

pub use catalog::IndexCatalog;
pub use entry::{Occurrence, SymbolEntry, SymbolKind};
pub use manifest::{CatalogManifest, MANIFEST_FILE, Section};
pub use normalize::{
    decode_entities, find_ignore_ascii_case, key_contains, normalize_key, normalize_label, partition_of,
};
pub use shard::IndexShard;
pub use source::{DirectorySource, MemorySource, ShardSource};
