//! Anchor-relative box decoding.

use crate::geometry::{Anchor, BBox};
use crate::input::ImagePredictions;
use crate::util::{RoiGenError, RoiGenResult};

/// Converts anchor + offset pairs into corner-form boxes.
///
/// Width and height are scaled by `exp(dw)` and `exp(dh)` without clipping the
/// exponent; extreme offsets produce infinite or NaN coordinates that the
/// validity filter rejects or clamps downstream.
pub struct BoxDecoder;

impl BoxDecoder {
    /// Decodes a single anchor with offsets `(dx, dy, dw, dh)`.
    #[inline]
    pub fn decode(anchor: &Anchor, offsets: [f32; 4]) -> BBox {
        let [dx, dy, dw, dh] = offsets;
        let w = dw.exp() * anchor.w;
        let h = dh.exp() * anchor.h;
        let cx = dx * anchor.w + anchor.cx;
        let cy = dy * anchor.h + anchor.cy;
        BBox::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    /// Decodes every anchor of one image, in anchor order.
    pub fn decode_image(
        anchors: &[Anchor],
        predictions: ImagePredictions<'_>,
    ) -> RoiGenResult<Vec<BBox>> {
        if anchors.len() != predictions.len() {
            return Err(RoiGenError::InputShapeMismatch {
                what: "anchors",
                expected: predictions.len(),
                got: anchors.len(),
            });
        }
        Ok(anchors
            .iter()
            .zip(predictions.offsets())
            .map(|(anchor, offsets)| Self::decode(anchor, offsets))
            .collect())
    }
}
