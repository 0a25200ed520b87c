pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod index;
pub mod search;
pub mod tracing;

pub use config::SearchConfig;
pub use error::{LoadError, QueryError, SourceError};
pub use index::{IndexCatalog, IndexShard, SymbolEntry};
pub use search::{QueryMatcher, RankedResultSet, SearchSession};
