//! Suppression stage: NMS through a [`Suppressor`] plus post-NMS truncation.

use crate::candidate::ScoredBox;
use crate::config::Budget;
use crate::geometry::BBox;
use crate::kernel::Suppressor;
use crate::util::{RoiGenError, RoiGenResult};

/// Runs a suppressor over ranked candidates and applies the post-NMS budget.
#[derive(Clone, Copy, Debug)]
pub struct SuppressionStage {
    threshold: f32,
    post_nms: Budget,
}

impl SuppressionStage {
    /// Creates a stage with an IoU threshold and a post-NMS budget.
    pub fn new(threshold: f32, post_nms: Budget) -> Self {
        Self {
            threshold,
            post_nms,
        }
    }

    /// Returns the surviving candidates in selection order.
    ///
    /// Suppressor errors are returned unchanged. Indices outside of the input
    /// are reported as [`RoiGenError::InvalidKeepIndex`].
    pub fn run<S>(&self, suppressor: &S, candidates: &[ScoredBox]) -> RoiGenResult<Vec<ScoredBox>>
    where
        S: Suppressor + ?Sized,
    {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let boxes: Vec<BBox> = candidates.iter().map(|c| c.bbox).collect();
        let scores: Vec<f32> = candidates.iter().map(|c| c.score).collect();
        let mut keep = suppressor.suppress(&boxes, &scores, self.threshold)?;
        if let Some(limit) = self.post_nms.limit() {
            keep.truncate(limit);
        }

        keep.into_iter()
            .map(|index| {
                candidates
                    .get(index)
                    .copied()
                    .ok_or(RoiGenError::InvalidKeepIndex {
                        index,
                        len: candidates.len(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::SuppressionStage;
    use crate::candidate::ScoredBox;
    use crate::config::Budget;
    use crate::geometry::BBox;
    use crate::kernel::scalar::GreedyNmsScalar;
    use crate::kernel::Suppressor;
    use crate::util::{RoiGenError, RoiGenResult};

    fn cand(anchor: usize, x: f32, score: f32) -> ScoredBox {
        ScoredBox {
            bbox: BBox::new(x, 0.0, x + 9.0, 9.0),
            score,
            anchor,
        }
    }

    struct OutOfRange;

    impl Suppressor for OutOfRange {
        fn suppress(&self, boxes: &[BBox], _: &[f32], _: f32) -> RoiGenResult<Vec<usize>> {
            Ok(vec![boxes.len()])
        }
    }

    #[test]
    fn truncates_to_post_nms_budget() {
        let cands = vec![cand(0, 0.0, 0.9), cand(1, 20.0, 0.8), cand(2, 40.0, 0.7)];
        let stage = SuppressionStage::new(0.7, Budget::at_most(2));
        let out = stage.run(&GreedyNmsScalar, &cands).unwrap();
        let anchors: Vec<_> = out.iter().map(|c| c.anchor).collect();
        assert_eq!(anchors, vec![0, 1]);
    }

    #[test]
    fn unbounded_budget_keeps_all_survivors() {
        let cands = vec![cand(0, 0.0, 0.9), cand(1, 1.0, 0.8), cand(2, 40.0, 0.7)];
        let stage = SuppressionStage::new(0.5, Budget::unbounded());
        let out = stage.run(&GreedyNmsScalar, &cands).unwrap();
        let anchors: Vec<_> = out.iter().map(|c| c.anchor).collect();
        assert_eq!(anchors, vec![0, 2]);
    }

    #[test]
    fn reports_indices_outside_the_input() {
        let cands = vec![cand(0, 0.0, 0.9)];
        let stage = SuppressionStage::new(0.5, Budget::unbounded());
        let err = stage.run(&OutOfRange, &cands).unwrap_err();
        assert_eq!(err, RoiGenError::InvalidKeepIndex { index: 1, len: 1 });
    }

    #[test]
    fn surfaces_suppressor_errors_unchanged() {
        let cands = vec![cand(0, 0.0, 0.9)];
        let stage = SuppressionStage::new(2.0, Budget::unbounded());
        let err = stage.run(&GreedyNmsScalar, &cands).unwrap_err();
        assert_eq!(err, RoiGenError::InvalidThreshold { threshold: 2.0 });
    }
}
