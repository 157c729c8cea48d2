//! Filename search
//!
//! - [`normalize`] - The simplification applied to file names and queries alike
//! - [`engine`] - Incremental substring search with ranking and change detection

pub mod engine;
pub mod normalize;

pub use engine::{MAX_RESULTS, MIN_QUERY_LEN, MatchSource, ResultChange, SearchEngine, SearchOutcome};
pub use normalize::simplify;
