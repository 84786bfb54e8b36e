//! Represents an aggregated label term.

use serde::{Deserialize, Serialize};

/// A label term together with how often it occurs across a collection.
///
/// Terms are case-folded and whitespace-trimmed before tallying; only terms
/// occurring more than once qualify for aggregation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LabelTerm {
    pub term: String,
    pub count: u64,
}
