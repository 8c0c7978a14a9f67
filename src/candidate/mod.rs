//! Candidate ranking and pruning.
//!
//! Includes pre-NMS Top-K selection and the suppression stage that wraps a
//! [`Suppressor`](crate::kernel::Suppressor).

pub(crate) mod nms;
pub(crate) mod topk;

use crate::geometry::BBox;
use std::cmp::Ordering;

/// Clamped box paired with its foreground score and originating anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredBox {
    /// Box in corner form, clamped to the image border.
    pub bbox: BBox,
    /// Foreground score used for ranking.
    pub score: f32,
    /// Index of the anchor this box was decoded from.
    pub anchor: usize,
}

/// Descending score, ties broken by ascending anchor index.
pub(crate) fn scored_cmp_desc(a: &ScoredBox, b: &ScoredBox) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.anchor.cmp(&b.anchor))
}

/// Sorts candidates by descending score with deterministic tie-breaking.
pub(crate) fn sort_scored_desc(candidates: &mut [ScoredBox]) {
    candidates.sort_by(scored_cmp_desc);
}
