//! Non-maximum suppression kernels.
//!
//! The pipeline only relies on the [`Suppressor`] contract; the overlap
//! computation behind it is interchangeable. A scalar reference kernel is always
//! available and a `wide`-based SIMD kernel is built with the `simd` feature.

use crate::geometry::BBox;
use crate::util::{RoiGenError, RoiGenResult};

/// Greedy NMS capability.
///
/// Implementations must:
/// - visit boxes in descending score order,
/// - suppress a box whose IoU with any previously kept box exceeds `threshold`,
/// - return kept indices (into `boxes`) in that selection order.
pub trait Suppressor: Send + Sync {
    /// Returns the indices of `boxes` that survive suppression.
    fn suppress(&self, boxes: &[BBox], scores: &[f32], threshold: f32)
        -> RoiGenResult<Vec<usize>>;
}

impl<S: Suppressor + ?Sized> Suppressor for Box<S> {
    fn suppress(
        &self,
        boxes: &[BBox],
        scores: &[f32],
        threshold: f32,
    ) -> RoiGenResult<Vec<usize>> {
        (**self).suppress(boxes, scores, threshold)
    }
}

/// Rejects thresholds that are not finite or fall outside `[0, 1]`.
pub fn check_threshold(threshold: f32) -> RoiGenResult<()> {
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(RoiGenError::InvalidThreshold { threshold });
    }
    Ok(())
}

fn check_inputs(boxes: &[BBox], scores: &[f32], threshold: f32) -> RoiGenResult<()> {
    check_threshold(threshold)?;
    if boxes.len() != scores.len() {
        return Err(RoiGenError::InputShapeMismatch {
            what: "suppression scores",
            expected: boxes.len(),
            got: scores.len(),
        });
    }
    Ok(())
}

/// Indices sorted by descending score; equal scores keep ascending index order.
pub(crate) fn descending_order(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then_with(|| a.cmp(&b)));
    order
}

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

/// Suppressor used when none is configured explicitly.
#[cfg(not(feature = "simd"))]
pub type DefaultSuppressor = scalar::GreedyNmsScalar;
/// Suppressor used when none is configured explicitly.
#[cfg(feature = "simd")]
pub type DefaultSuppressor = simd::GreedyNmsSimd;
