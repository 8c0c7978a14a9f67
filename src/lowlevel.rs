//! Stage-level building blocks for custom proposal pipelines.
//!
//! These expose the individual stages that [`ProposalGenerator`](crate::ProposalGenerator)
//! chains together. Most users should call `ProposalGenerator::propose`.

pub use crate::candidate::nms::SuppressionStage;
pub use crate::candidate::topk::TopKSelector;
pub use crate::candidate::ScoredBox;
pub use crate::kernel::check_threshold;
pub use crate::kernel::scalar::GreedyNmsScalar;
#[cfg(feature = "simd")]
pub use crate::kernel::simd::GreedyNmsSimd;
pub use crate::proposal::{BoxDecoder, ValidityFilter};
