//! roigen turns region-proposal-network outputs into region proposals.
//!
//! Given a shared anchor grid and per-image `(dx, dy, dw, dh)` offsets with
//! background/foreground scores, [`ProposalGenerator`] decodes boxes, clamps
//! them to each image, drops boxes below the size floor, keeps the best
//! scoring candidates, runs greedy NMS and returns every image's survivors in
//! one flat list with per-image counts. Image-level parallelism is available
//! through the `rayon` feature and a SIMD NMS kernel through `simd`.

pub mod batch;
mod candidate;
pub mod config;
pub mod geometry;
pub mod input;
pub mod kernel;
pub mod lowlevel;
pub mod proposal;
mod trace;
pub mod util;

pub use batch::{BatchAggregator, BatchResult, ImageOutcome, Proposal, ProposalGenerator, Stage};
pub use candidate::ScoredBox;
pub use config::{Budget, Phase, ProposalConfig, SelectionBudget};
pub use geometry::{Anchor, AnchorCache, AnchorGenerator, BBox, FeatureGeometry};
pub use input::{ImageMeta, ImagePredictions, PredictionBatch};
pub use kernel::{DefaultSuppressor, Suppressor};
pub use util::{RoiGenError, RoiGenResult};
