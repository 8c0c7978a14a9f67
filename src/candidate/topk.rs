//! Pre-NMS Top-K selection.

use crate::candidate::{scored_cmp_desc, sort_scored_desc, ScoredBox};
use crate::config::Budget;

/// Ranks candidates by score and keeps at most `budget` of them.
pub struct TopKSelector;

impl TopKSelector {
    /// Returns candidates in descending score order, truncated to `budget`.
    ///
    /// Equal scores keep ascending anchor order. With a bounded budget smaller
    /// than the input, only the retained head is fully sorted.
    pub fn select(mut candidates: Vec<ScoredBox>, budget: Budget) -> Vec<ScoredBox> {
        match budget.limit() {
            Some(k) if k < candidates.len() => {
                candidates.select_nth_unstable_by(k - 1, scored_cmp_desc);
                candidates.truncate(k);
            }
            _ => {}
        }
        sort_scored_desc(&mut candidates);
        candidates
    }
}
