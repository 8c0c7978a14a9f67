//! Image-parallel batch execution (feature-gated).
//!
//! Images share only the read-only anchors and predictions, so each per-image
//! run is independent. Collecting the indexed parallel iterator keeps image
//! order, which makes the merged result identical to the sequential path.

use crate::batch::{ImageOutcome, ProposalGenerator};
use crate::config::SelectionBudget;
use crate::geometry::Anchor;
use crate::input::{ImageMeta, PredictionBatch};
use crate::kernel::Suppressor;
use crate::util::RoiGenResult;
use rayon::prelude::*;

pub(crate) fn run_images_par<S: Suppressor>(
    generator: &ProposalGenerator<S>,
    anchors: &[Anchor],
    batch: PredictionBatch<'_>,
    metas: &[ImageMeta],
    budget: SelectionBudget,
) -> RoiGenResult<Vec<ImageOutcome>> {
    (0..batch.len())
        .into_par_iter()
        .map(|index| generator.run_indexed(index, anchors, batch, metas, budget))
        .collect()
}
