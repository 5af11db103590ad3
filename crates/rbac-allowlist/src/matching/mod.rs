//! Matching dataset rows against stored exceptions.
//!
//! Matching is O(rows × exceptions) with no indexing; a row may be covered
//! by several exceptions and the first one in store order is reported.

mod filter;
mod matcher;

pub use filter::{filter, FilterMode, FilterOutcome, FilterPass, FilteredRow, MatchAnnotation};
pub use matcher::Matcher;
