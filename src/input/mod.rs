//! Borrowed views over network outputs and per-image metadata.
//!
//! `PredictionBatch` wraps the flat `loc` (`[B x R x 4]`) and `score`
//! (`[B x R x 2]`) buffers produced by the proposal head. Both are row-major
//! with the anchor axis innermost, so image `i` occupies one contiguous block
//! of each buffer and per-image views are zero-copy slices.

use crate::util::{RoiGenError, RoiGenResult};

/// Number of regression values per anchor: `(dx, dy, dw, dh)`.
pub const LOC_DIM: usize = 4;
/// Number of score channels per anchor: `(background, foreground)`.
pub const SCORE_DIM: usize = 2;
/// Index of the foreground channel inside each score pair.
pub const FOREGROUND: usize = 1;

/// Borrowed predictions for a whole batch.
#[derive(Copy, Clone, Debug)]
pub struct PredictionBatch<'a> {
    loc: &'a [f32],
    score: &'a [f32],
    batch: usize,
    num_anchors: usize,
}

impl<'a> PredictionBatch<'a> {
    /// Creates a batch view, checking both buffers against `batch x num_anchors`.
    pub fn new(
        loc: &'a [f32],
        score: &'a [f32],
        batch: usize,
        num_anchors: usize,
    ) -> RoiGenResult<Self> {
        let loc_needed = required_len(batch, num_anchors, LOC_DIM)?;
        if loc.len() != loc_needed {
            return Err(RoiGenError::InputShapeMismatch {
                what: "loc values",
                expected: loc_needed,
                got: loc.len(),
            });
        }
        let score_needed = required_len(batch, num_anchors, SCORE_DIM)?;
        if score.len() != score_needed {
            return Err(RoiGenError::InputShapeMismatch {
                what: "score values",
                expected: score_needed,
                got: score.len(),
            });
        }
        Ok(Self {
            loc,
            score,
            batch,
            num_anchors,
        })
    }

    /// Number of images in the batch.
    pub fn len(&self) -> usize {
        self.batch
    }

    /// Returns true for a batch without images.
    pub fn is_empty(&self) -> bool {
        self.batch == 0
    }

    /// Number of anchors every image carries predictions for.
    pub fn num_anchors(&self) -> usize {
        self.num_anchors
    }

    /// Returns the predictions of image `index`.
    pub fn image(&self, index: usize) -> Option<ImagePredictions<'a>> {
        if index >= self.batch {
            return None;
        }
        let loc_block = self.num_anchors * LOC_DIM;
        let score_block = self.num_anchors * SCORE_DIM;
        Some(ImagePredictions {
            loc: self.loc.get(index * loc_block..(index + 1) * loc_block)?,
            score: self
                .score
                .get(index * score_block..(index + 1) * score_block)?,
        })
    }
}

fn required_len(batch: usize, num_anchors: usize, dim: usize) -> RoiGenResult<usize> {
    batch
        .checked_mul(num_anchors)
        .and_then(|v| v.checked_mul(dim))
        .ok_or(RoiGenError::InvalidConfig("batch x anchors overflows usize"))
}

/// Borrowed predictions for one image.
#[derive(Copy, Clone, Debug)]
pub struct ImagePredictions<'a> {
    loc: &'a [f32],
    score: &'a [f32],
}

impl<'a> ImagePredictions<'a> {
    /// Creates a single-image view; `loc` and `score` must agree on the anchor count.
    pub fn new(loc: &'a [f32], score: &'a [f32]) -> RoiGenResult<Self> {
        let num_anchors = loc.len() / LOC_DIM;
        PredictionBatch::new(loc, score, 1, num_anchors)?
            .image(0)
            .ok_or(RoiGenError::InvalidConfig("empty prediction view"))
    }

    /// Number of anchors covered by this view.
    pub fn len(&self) -> usize {
        self.loc.len() / LOC_DIM
    }

    /// Returns true when the view covers no anchors.
    pub fn is_empty(&self) -> bool {
        self.loc.is_empty()
    }

    /// Iterates `(dx, dy, dw, dh)` per anchor.
    pub fn offsets(&self) -> impl ExactSizeIterator<Item = [f32; 4]> + 'a {
        self.loc
            .chunks_exact(LOC_DIM)
            .map(|c| [c[0], c[1], c[2], c[3]])
    }

    /// Iterates the foreground score per anchor.
    pub fn foreground(&self) -> impl ExactSizeIterator<Item = f32> + 'a {
        self.score.chunks_exact(SCORE_DIM).map(|c| c[FOREGROUND])
    }
}

/// Per-image clamp bounds and resize factor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageMeta {
    /// `(width, height)` used to clamp x and y coordinates.
    pub border_size: (f32, f32),
    /// Resize factor applied to this image; scales the minimum box size.
    pub image_scale: f32,
}

impl ImageMeta {
    /// Creates metadata for one image.
    pub fn new(border_width: f32, border_height: f32, image_scale: f32) -> Self {
        Self {
            border_size: (border_width, border_height),
            image_scale,
        }
    }

    /// Checks that the metadata describes a usable clamp region.
    pub fn validate(&self, index: usize) -> RoiGenResult<()> {
        let (w, h) = self.border_size;
        if !w.is_finite() || !h.is_finite() {
            return Err(RoiGenError::InvalidImageMeta {
                index,
                reason: "border size must be finite",
            });
        }
        if w < 1.0 || h < 1.0 {
            return Err(RoiGenError::InvalidImageMeta {
                index,
                reason: "border size must be at least one pixel",
            });
        }
        if !self.image_scale.is_finite() || self.image_scale < 0.0 {
            return Err(RoiGenError::InvalidImageMeta {
                index,
                reason: "image scale must be finite and non-negative",
            });
        }
        Ok(())
    }
}
