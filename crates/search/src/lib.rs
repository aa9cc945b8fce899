//! # LM Risk Search
//!
//! Finds lines whose entropy moves when a query is applied to the file.
//! Every file is scored twice by the search service (as-is and with the
//! query applied) and lines are compared pairwise:
//!
//! ```text
//! difference = (max(a, b) / min(a, b) - 1) * 100
//! match      = difference > threshold
//! ```

mod diff;
mod error;
mod index;

pub use diff::{difference_percent, match_lines, DEFAULT_THRESHOLD};
pub use error::{Result, SearchError};
pub use index::{MatchState, SearchEntry, SearchIndex, SearchOptions};
