//! Scalar reference NMS kernel.

use crate::geometry::BBox;
use crate::kernel::{check_inputs, descending_order, Suppressor};
use crate::util::RoiGenResult;

/// Greedy NMS with a per-pair scalar IoU loop.
///
/// Worst case is quadratic in the number of boxes; the pre-NMS budget bounds it.
#[derive(Clone, Copy, Debug, Default)]
pub struct GreedyNmsScalar;

impl Suppressor for GreedyNmsScalar {
    fn suppress(
        &self,
        boxes: &[BBox],
        scores: &[f32],
        threshold: f32,
    ) -> RoiGenResult<Vec<usize>> {
        check_inputs(boxes, scores, threshold)?;

        let order = descending_order(scores);
        let mut suppressed = vec![false; boxes.len()];
        let mut keep = Vec::new();

        for (pos, &i) in order.iter().enumerate() {
            if suppressed[i] {
                continue;
            }
            keep.push(i);

            let kept = &boxes[i];
            for &j in &order[pos + 1..] {
                if !suppressed[j] && kept.iou(&boxes[j]) > threshold {
                    suppressed[j] = true;
                }
            }
        }

        Ok(keep)
    }
}
