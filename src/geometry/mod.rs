//! Box geometry shared by every pipeline stage.
//!
//! Anchors are stored in center form, decoded boxes in corner form. Widths,
//! heights and overlaps of corner boxes follow the inclusive pixel convention:
//! a box spanning `x1..=x2` is `x2 - x1 + 1` pixels wide.

pub mod anchors;

pub use anchors::{AnchorCache, AnchorGenerator, FeatureGeometry};

/// Reference box in center form `(cx, cy, w, h)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    /// Center x coordinate.
    pub cx: f32,
    /// Center y coordinate.
    pub cy: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

impl Anchor {
    /// Creates an anchor from center form.
    pub fn new(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self { cx, cy, w, h }
    }

    /// Creates an anchor from corner form `(x1, y1, x2, y2)`.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            cx: (x1 + x2) * 0.5,
            cy: (y1 + y2) * 0.5,
            w: x2 - x1,
            h: y2 - y1,
        }
    }
}

/// Axis-aligned box in corner form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    /// Left edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Right edge (inclusive).
    pub x2: f32,
    /// Bottom edge (inclusive).
    pub y2: f32,
}

impl BBox {
    /// Creates a box from its corners.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Inclusive width in pixels.
    #[inline]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1 + 1.0
    }

    /// Inclusive height in pixels.
    #[inline]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1 + 1.0
    }

    /// Inclusive area in square pixels.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection-over-union with `other`; zero when the union is empty.
    pub fn iou(&self, other: &BBox) -> f32 {
        let inter = self.intersection(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }

    /// Inclusive intersection area with `other`.
    #[inline]
    pub fn intersection(&self, other: &BBox) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1) + 1.0).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1) + 1.0).max(0.0);
        w * h
    }

    /// Returns `[x1, y1, x2, y2]`.
    pub fn to_array(self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}
