//! Label aggregation across a media collection.
//!
//! Splits each record's comma-separated label string into terms, tallies
//! them, and reports the terms occurring more than once — lexicographically
//! ordered by default, shuffled for display variety on request.

use crate::catalog::{Catalog, OwnerScope};
use crate::errors::MediaResult;
use crate::models::LabelTerm;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

pub const DEFAULT_TERM_LIMIT: usize = 20;

/// Options for [`common_terms`].
pub struct TermOptions {
    /// Maximum number of terms returned, applied after filtering and
    /// ordering.
    pub limit: usize,
    /// Unstable shuffle instead of lexicographic order; re-querying may
    /// yield a different order among equal-weight terms.
    pub randomize: bool,
    /// Extra predicate a term must pass to qualify.
    pub filter: Option<Box<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl Default for TermOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_TERM_LIMIT,
            randomize: false,
            filter: None,
        }
    }
}

/// Tally terms across label strings.
///
/// Terms are trimmed and lowercased; only non-empty terms seen more than
/// once qualify, further restricted by the optional predicate.
pub fn common_terms(labels: &[String], opts: &TermOptions) -> Vec<LabelTerm> {
    let mut tally: BTreeMap<String, u64> = BTreeMap::new();
    for label in labels {
        for raw in label.split(',') {
            let term = raw.trim().to_lowercase();
            if term.is_empty() {
                continue;
            }
            *tally.entry(term).or_insert(0) += 1;
        }
    }

    // BTreeMap iteration gives the lexicographic default order for free.
    let mut terms: Vec<LabelTerm> = tally
        .into_iter()
        .filter(|(term, count)| {
            *count > 1
                && opts
                    .filter
                    .as_ref()
                    .map(|predicate| predicate(term))
                    .unwrap_or(true)
        })
        .map(|(term, count)| LabelTerm { term, count })
        .collect();

    if opts.randomize {
        terms.shuffle(&mut rand::thread_rng());
    }
    terms.truncate(opts.limit);
    terms
}

/// Aggregate label terms over the catalog records matching `scope`.
pub async fn media_labels(
    catalog: &dyn Catalog,
    scope: OwnerScope,
    opts: &TermOptions,
) -> MediaResult<Vec<LabelTerm>> {
    let records = catalog.find_by_owner(scope).await?;
    let labels: Vec<String> = records
        .into_iter()
        .filter_map(|record| record.labels)
        .collect();
    Ok(common_terms(&labels, opts))
}
