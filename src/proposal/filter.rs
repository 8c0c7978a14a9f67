//! Border clamping and minimum-size filtering.

use crate::candidate::ScoredBox;
use crate::geometry::BBox;
use crate::input::ImageMeta;

/// Clamps boxes to one image's border and drops boxes below the size floor.
#[derive(Clone, Copy, Debug)]
pub struct ValidityFilter {
    max_x: f32,
    max_y: f32,
    min_extent: f32,
}

impl ValidityFilter {
    /// Builds the filter for an image; the floor is `image_scale * min_size`.
    pub fn new(meta: &ImageMeta, min_size: f32) -> Self {
        let (w, h) = meta.border_size;
        Self {
            max_x: w - 1.0,
            max_y: h - 1.0,
            min_extent: meta.image_scale * min_size,
        }
    }

    /// Smallest inclusive width and height a box may have.
    pub fn min_extent(&self) -> f32 {
        self.min_extent
    }

    /// Clamps each coordinate into `[0, border - 1]` on its axis.
    ///
    /// NaN coordinates pass through unchanged.
    #[inline]
    pub fn clamp(&self, b: BBox) -> BBox {
        BBox::new(
            clamp_axis(b.x1, self.max_x),
            clamp_axis(b.y1, self.max_y),
            clamp_axis(b.x2, self.max_x),
            clamp_axis(b.y2, self.max_y),
        )
    }

    /// Returns true when both inclusive extents reach the size floor.
    #[inline]
    pub fn accepts(&self, b: &BBox) -> bool {
        b.width() >= self.min_extent && b.height() >= self.min_extent
    }

    /// Clamps then filters decoded boxes, pairing survivors with their scores.
    ///
    /// Anchor indices of the survivors are their positions in `boxes`.
    pub fn apply<I>(&self, boxes: &[BBox], scores: I) -> Vec<ScoredBox>
    where
        I: IntoIterator<Item = f32>,
    {
        boxes
            .iter()
            .zip(scores)
            .enumerate()
            .filter_map(|(anchor, (b, score))| {
                let clamped = self.clamp(*b);
                self.accepts(&clamped).then_some(ScoredBox {
                    bbox: clamped,
                    score,
                    anchor,
                })
            })
            .collect()
    }
}

#[inline]
fn clamp_axis(v: f32, max: f32) -> f32 {
    if v < 0.0 {
        0.0
    } else if v > max {
        max
    } else {
        v
    }
}
