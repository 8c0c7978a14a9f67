//! Batch-level proposal generation.
//!
//! Each image runs through decode → filter → top-k → suppression on its own.
//! An image that runs out of boxes stops in an explicit empty state and
//! contributes a zero count. Outcomes are then merged in image order into one
//! flat proposal list plus a per-image count vector.

#[cfg(feature = "rayon")]
mod rayon;

use crate::candidate::nms::SuppressionStage;
use crate::candidate::topk::TopKSelector;
use crate::candidate::ScoredBox;
use crate::config::{Phase, ProposalConfig, SelectionBudget};
use crate::geometry::{Anchor, AnchorCache, AnchorGenerator, BBox, FeatureGeometry};
use crate::input::{ImageMeta, ImagePredictions, PredictionBatch};
use crate::kernel::{DefaultSuppressor, Suppressor};
use crate::proposal::{BoxDecoder, ValidityFilter};
use crate::trace::{trace_event, trace_image, trace_span};
use crate::util::{RoiGenError, RoiGenResult};

/// Pipeline state of a single image run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Decoded,
    Filtered,
    Selected,
    Suppressed,
    Truncated,
}

impl Stage {
    /// Lower-case stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Decoded => "decoded",
            Stage::Filtered => "filtered",
            Stage::Selected => "selected",
            Stage::Suppressed => "suppressed",
            Stage::Truncated => "truncated",
        }
    }
}

/// Terminal state of a single image run.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageOutcome {
    /// No boxes left after `stage`; remaining stages were skipped.
    Empty { stage: Stage },
    /// Surviving candidates in selection order.
    Proposals(Vec<ScoredBox>),
}

impl ImageOutcome {
    /// Number of proposals this image contributes.
    pub fn len(&self) -> usize {
        match self {
            ImageOutcome::Empty { .. } => 0,
            ImageOutcome::Proposals(kept) => kept.len(),
        }
    }

    /// Returns true for the empty terminal state.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stage the run finished in.
    pub fn stage(&self) -> Stage {
        match self {
            ImageOutcome::Empty { stage } => *stage,
            ImageOutcome::Proposals(_) => Stage::Truncated,
        }
    }
}

/// A proposal tagged with the image it belongs to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Proposal {
    /// Position of the source image in the batch.
    pub image_index: usize,
    /// Clamped box in corner form.
    pub bbox: BBox,
    /// Foreground score.
    pub score: f32,
    /// Anchor the box was decoded from.
    pub anchor: usize,
}

impl Proposal {
    /// Returns `[image_index, x1, y1, x2, y2]`.
    pub fn to_row(&self) -> [f32; 5] {
        let b = self.bbox;
        [self.image_index as f32, b.x1, b.y1, b.x2, b.y2]
    }
}

/// Proposals of a whole batch with per-image counts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchResult {
    proposals: Vec<Proposal>,
    counts: Vec<usize>,
}

impl BatchResult {
    /// All proposals, grouped by image in image order.
    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    /// Proposal count per image; one entry per image of the batch.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Number of images the batch had.
    pub fn batch_size(&self) -> usize {
        self.counts.len()
    }

    /// Total number of proposals.
    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    /// Returns true when no image produced a proposal.
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// Proposals of image `index`.
    pub fn image(&self, index: usize) -> Option<&[Proposal]> {
        let count = *self.counts.get(index)?;
        let start: usize = self.counts[..index].iter().sum();
        self.proposals.get(start..start + count)
    }

    /// Rows of `[image_index, x1, y1, x2, y2]`.
    pub fn to_rows(&self) -> Vec<[f32; 5]> {
        self.proposals.iter().map(Proposal::to_row).collect()
    }

    /// Splits into proposals and counts.
    pub fn into_parts(self) -> (Vec<Proposal>, Vec<usize>) {
        (self.proposals, self.counts)
    }
}

/// Merges per-image outcomes, in image order, into a [`BatchResult`].
#[derive(Debug, Default)]
pub struct BatchAggregator {
    proposals: Vec<Proposal>,
    counts: Vec<usize>,
}

impl BatchAggregator {
    /// Creates an aggregator sized for `batch_size` images.
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            proposals: Vec::new(),
            counts: Vec::with_capacity(batch_size),
        }
    }

    /// Appends the outcome of the next image.
    pub fn push(&mut self, outcome: ImageOutcome) {
        let image_index = self.counts.len();
        self.counts.push(outcome.len());
        if let ImageOutcome::Proposals(kept) = outcome {
            self.proposals
                .extend(kept.into_iter().map(|c| Proposal {
                    image_index,
                    bbox: c.bbox,
                    score: c.score,
                    anchor: c.anchor,
                }));
        }
    }

    /// Finishes the batch.
    pub fn finish(self) -> BatchResult {
        BatchResult {
            proposals: self.proposals,
            counts: self.counts,
        }
    }
}

/// Turns proposal-head outputs into per-image region proposals.
pub struct ProposalGenerator<S = DefaultSuppressor> {
    cfg: ProposalConfig,
    suppressor: S,
    anchors: AnchorCache,
}

impl Default for ProposalGenerator<DefaultSuppressor> {
    fn default() -> Self {
        Self::new()
    }
}

impl ProposalGenerator<DefaultSuppressor> {
    /// Creates a generator with the default config and suppressor.
    pub fn new() -> Self {
        Self {
            cfg: ProposalConfig::default(),
            suppressor: DefaultSuppressor::default(),
            anchors: AnchorCache::new(),
        }
    }
}

impl<S: Suppressor> ProposalGenerator<S> {
    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: ProposalConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Replaces the NMS kernel.
    pub fn with_suppressor<T: Suppressor>(self, suppressor: T) -> ProposalGenerator<T> {
        ProposalGenerator {
            cfg: self.cfg,
            suppressor,
            anchors: self.anchors,
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ProposalConfig {
        &self.cfg
    }

    /// Returns the anchor cache used by [`Self::propose_for_geometry`].
    pub fn anchor_cache(&self) -> &AnchorCache {
        &self.anchors
    }

    /// Generates proposals for a batch using the budgets of `phase`.
    pub fn propose_phase(
        &self,
        anchors: &[Anchor],
        batch: PredictionBatch<'_>,
        metas: &[ImageMeta],
        phase: Phase,
    ) -> RoiGenResult<BatchResult> {
        self.propose(anchors, batch, metas, self.cfg.budget(phase))
    }

    /// Generates proposals for a batch.
    ///
    /// `anchors` are shared by every image. Fails with
    /// [`RoiGenError::InputShapeMismatch`] when the anchor or metadata counts
    /// disagree with `batch`; images without surviving boxes are not errors.
    pub fn propose(
        &self,
        anchors: &[Anchor],
        batch: PredictionBatch<'_>,
        metas: &[ImageMeta],
        budget: SelectionBudget,
    ) -> RoiGenResult<BatchResult> {
        let _span = trace_span!(
            "propose",
            images = batch.len(),
            anchors = anchors.len(),
            parallel = self.cfg.parallel
        )
        .entered();

        if anchors.len() != batch.num_anchors() {
            return Err(RoiGenError::InputShapeMismatch {
                what: "anchors",
                expected: batch.num_anchors(),
                got: anchors.len(),
            });
        }
        if metas.len() != batch.len() {
            return Err(RoiGenError::InputShapeMismatch {
                what: "image metadata",
                expected: batch.len(),
                got: metas.len(),
            });
        }
        for (index, meta) in metas.iter().enumerate() {
            meta.validate(index)?;
        }

        let outcomes = self.run_images(anchors, batch, metas, budget)?;
        let mut aggregator = BatchAggregator::with_batch_size(batch.len());
        for outcome in outcomes {
            aggregator.push(outcome);
        }
        let result = aggregator.finish();

        trace_event!(
            "batch_proposals",
            images = result.batch_size(),
            proposals = result.len()
        );
        Ok(result)
    }

    /// Generates proposals with anchors looked up (or generated once) for `geometry`.
    pub fn propose_for_geometry<G>(
        &self,
        geometry: &FeatureGeometry,
        generator: &G,
        batch: PredictionBatch<'_>,
        metas: &[ImageMeta],
        budget: SelectionBudget,
    ) -> RoiGenResult<BatchResult>
    where
        G: AnchorGenerator + ?Sized,
    {
        let anchors = self.anchors.get_or_generate(geometry, generator)?;
        self.propose(&anchors, batch, metas, budget)
    }

    /// Runs the per-image pipeline for one image.
    ///
    /// `meta` is expected to be valid; [`Self::propose`] checks it up front.
    pub fn run_image(
        &self,
        index: usize,
        anchors: &[Anchor],
        predictions: ImagePredictions<'_>,
        meta: &ImageMeta,
        budget: SelectionBudget,
    ) -> RoiGenResult<ImageOutcome> {
        let decoded = BoxDecoder::decode_image(anchors, predictions)?;
        if decoded.is_empty() {
            return Ok(empty_outcome(index, Stage::Decoded));
        }

        let filter = ValidityFilter::new(meta, self.cfg.min_size);
        let filtered = filter.apply(&decoded, predictions.foreground());
        if filtered.is_empty() {
            return Ok(empty_outcome(index, Stage::Filtered));
        }

        let selected = TopKSelector::select(filtered, budget.pre_nms);
        let stage = SuppressionStage::new(self.cfg.nms_threshold, budget.post_nms);
        let kept = stage.run(&self.suppressor, &selected)?;
        if kept.is_empty() {
            return Ok(empty_outcome(index, Stage::Suppressed));
        }

        trace_image!(
            "image_proposals",
            image = index,
            selected = selected.len(),
            kept = kept.len()
        );
        Ok(ImageOutcome::Proposals(kept))
    }

    fn run_indexed(
        &self,
        index: usize,
        anchors: &[Anchor],
        batch: PredictionBatch<'_>,
        metas: &[ImageMeta],
        budget: SelectionBudget,
    ) -> RoiGenResult<ImageOutcome> {
        let predictions = batch.image(index).ok_or(RoiGenError::InputShapeMismatch {
            what: "images",
            expected: index + 1,
            got: batch.len(),
        })?;
        let meta = metas.get(index).ok_or(RoiGenError::InputShapeMismatch {
            what: "image metadata",
            expected: index + 1,
            got: metas.len(),
        })?;
        self.run_image(index, anchors, predictions, meta, budget)
    }

    fn run_images_seq(
        &self,
        anchors: &[Anchor],
        batch: PredictionBatch<'_>,
        metas: &[ImageMeta],
        budget: SelectionBudget,
    ) -> RoiGenResult<Vec<ImageOutcome>> {
        (0..batch.len())
            .map(|index| self.run_indexed(index, anchors, batch, metas, budget))
            .collect()
    }

    #[cfg(feature = "rayon")]
    fn run_images(
        &self,
        anchors: &[Anchor],
        batch: PredictionBatch<'_>,
        metas: &[ImageMeta],
        budget: SelectionBudget,
    ) -> RoiGenResult<Vec<ImageOutcome>> {
        if self.cfg.parallel {
            return rayon::run_images_par(self, anchors, batch, metas, budget);
        }
        self.run_images_seq(anchors, batch, metas, budget)
    }

    #[cfg(not(feature = "rayon"))]
    fn run_images(
        &self,
        anchors: &[Anchor],
        batch: PredictionBatch<'_>,
        metas: &[ImageMeta],
        budget: SelectionBudget,
    ) -> RoiGenResult<Vec<ImageOutcome>> {
        self.run_images_seq(anchors, batch, metas, budget)
    }
}

fn empty_outcome(index: usize, stage: Stage) -> ImageOutcome {
    trace_image!("image_empty", image = index, stage = stage.as_str());
    ImageOutcome::Empty { stage }
}
