//! Query matching, ranking, and the incremental search session.

// Module declarations
mod matcher;
mod ranking;
mod session;
mod suggest;

pub use matcher::{
    LabelMatchPolicy, MatchKind, MatchOptions, NormalizedQuery, QueryMatcher, SymbolMatch,
    classify, rank_order,
};
pub use ranking::{DEFAULT_MAX_RESULTS, DisplayRow, RankedResultSet};
pub use session::{QueryOutcome, SearchSession, SessionSnapshot, SessionState};
pub use suggest::suggest;
