//! Error types for roigen.

use thiserror::Error;

/// Result alias for roigen operations.
pub type RoiGenResult<T> = std::result::Result<T, RoiGenError>;

/// Errors that can occur while generating proposals.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RoiGenError {
    /// Two inputs that must describe the same number of items disagree.
    #[error("input shape mismatch for {what}: expected {expected}, got {got}")]
    InputShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    /// Per-image metadata cannot be used to clamp or filter boxes.
    #[error("invalid metadata for image {index}: {reason}")]
    InvalidImageMeta { index: usize, reason: &'static str },
    /// The IoU threshold handed to a suppressor is unusable.
    #[error("invalid IoU threshold {threshold}: must be finite and within [0, 1]")]
    InvalidThreshold { threshold: f32 },
    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    /// A suppressor returned an index outside of its input.
    #[error("suppressor returned index {index} for {len} candidates")]
    InvalidKeepIndex { index: usize, len: usize },
    /// A suppressor implementation failed for its own reasons.
    #[error("suppression failed: {reason}")]
    SuppressionFailed { reason: String },
}
