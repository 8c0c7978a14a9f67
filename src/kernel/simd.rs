//! SIMD NMS kernel using the `wide` crate.
//!
//! Boxes are gathered into structure-of-arrays form in score order, and each
//! kept box is tested against the remaining boxes eight at a time with
//! `f32x8`. For finite coordinates the IoU values match the scalar kernel bit
//! for bit, so both kernels keep the same indices.

use crate::geometry::BBox;
use crate::kernel::{check_inputs, descending_order, Suppressor};
use crate::util::RoiGenResult;
use wide::f32x8;

const LANES: usize = 8;

/// Loads up to 8 values starting at `start`, padding the tail with zeros.
#[inline]
fn load_f32x8(values: &[f32], start: usize) -> f32x8 {
    let mut lanes = [0.0f32; LANES];
    let end = (start + LANES).min(values.len());
    lanes[..end - start].copy_from_slice(&values[start..end]);
    f32x8::from(lanes)
}

struct SortedBoxes {
    x1: Vec<f32>,
    y1: Vec<f32>,
    x2: Vec<f32>,
    y2: Vec<f32>,
    area: Vec<f32>,
}

impl SortedBoxes {
    fn gather(boxes: &[BBox], order: &[usize]) -> Self {
        let n = order.len();
        let mut out = Self {
            x1: Vec::with_capacity(n),
            y1: Vec::with_capacity(n),
            x2: Vec::with_capacity(n),
            y2: Vec::with_capacity(n),
            area: Vec::with_capacity(n),
        };
        for &i in order {
            let b = &boxes[i];
            out.x1.push(b.x1);
            out.y1.push(b.y1);
            out.x2.push(b.x2);
            out.y2.push(b.y2);
            out.area.push(b.area());
        }
        out
    }
}

/// Greedy NMS with an 8-lane IoU kernel.
#[derive(Clone, Copy, Debug, Default)]
pub struct GreedyNmsSimd;

impl Suppressor for GreedyNmsSimd {
    fn suppress(
        &self,
        boxes: &[BBox],
        scores: &[f32],
        threshold: f32,
    ) -> RoiGenResult<Vec<usize>> {
        check_inputs(boxes, scores, threshold)?;

        let order = descending_order(scores);
        let sorted = SortedBoxes::gather(boxes, &order);
        let n = order.len();
        let mut suppressed = vec![false; n];
        let mut keep = Vec::new();
        let one = f32x8::splat(1.0);
        let zero = f32x8::ZERO;

        for pos in 0..n {
            if suppressed[pos] {
                continue;
            }
            keep.push(order[pos]);

            let kx1 = f32x8::splat(sorted.x1[pos]);
            let ky1 = f32x8::splat(sorted.y1[pos]);
            let kx2 = f32x8::splat(sorted.x2[pos]);
            let ky2 = f32x8::splat(sorted.y2[pos]);
            let karea = f32x8::splat(sorted.area[pos]);

            let mut start = pos + 1;
            while start < n {
                let x1 = load_f32x8(&sorted.x1, start);
                let y1 = load_f32x8(&sorted.y1, start);
                let x2 = load_f32x8(&sorted.x2, start);
                let y2 = load_f32x8(&sorted.y2, start);
                let area = load_f32x8(&sorted.area, start);

                let w = (kx2.min(x2) - kx1.max(x1) + one).max(zero);
                let h = (ky2.min(y2) - ky1.max(y1) + one).max(zero);
                let inter = w * h;
                let union = karea + area - inter;
                let iou = (inter / union).to_array();
                let union = union.to_array();

                let valid = (n - start).min(LANES);
                for lane in 0..valid {
                    let j = start + lane;
                    if !suppressed[j] && union[lane] > 0.0 && iou[lane] > threshold {
                        suppressed[j] = true;
                    }
                }
                start += LANES;
            }
        }

        Ok(keep)
    }
}
