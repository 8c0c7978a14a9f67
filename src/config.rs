//! Proposal generation parameters.

use crate::kernel::check_threshold;
use crate::util::{RoiGenError, RoiGenResult};
use std::num::NonZeroUsize;

/// Upper bound on how many candidates a stage may keep.
///
/// A budget built from a non-positive count is unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Budget(Option<NonZeroUsize>);

impl Budget {
    /// Keeps every candidate.
    pub const fn unbounded() -> Self {
        Self(None)
    }

    /// Keeps at most `count` candidates; zero means unbounded.
    pub const fn at_most(count: usize) -> Self {
        Self(NonZeroUsize::new(count))
    }

    /// Builds a budget from a signed count where `<= 0` means unbounded.
    pub fn from_signed(count: i64) -> Self {
        if count <= 0 {
            return Self::unbounded();
        }
        Self::at_most(usize::try_from(count).unwrap_or(usize::MAX))
    }

    /// Returns the bound, if any.
    pub fn limit(&self) -> Option<usize> {
        self.0.map(NonZeroUsize::get)
    }

    /// Returns the bound as a signed count, `-1` when unbounded.
    pub fn to_signed(&self) -> i64 {
        self.limit()
            .map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<i64> for Budget {
    fn from(count: i64) -> Self {
        Self::from_signed(count)
    }
}

/// Pre- and post-NMS budgets applied to every image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionBudget {
    /// Candidates kept after score ranking, before NMS.
    pub pre_nms: Budget,
    /// Candidates kept after NMS.
    pub post_nms: Budget,
}

impl SelectionBudget {
    /// Creates budgets from signed counts (`<= 0` means unbounded).
    pub fn new(pre_nms: i64, post_nms: i64) -> Self {
        Self {
            pre_nms: Budget::from_signed(pre_nms),
            post_nms: Budget::from_signed(post_nms),
        }
    }

    /// No truncation before or after NMS.
    pub const fn unbounded() -> Self {
        Self {
            pre_nms: Budget::unbounded(),
            post_nms: Budget::unbounded(),
        }
    }
}

/// Whether proposals feed training or inference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Train,
    Test,
}

/// Configuration for the proposal pipeline.
#[derive(Clone, Debug)]
pub struct ProposalConfig {
    /// IoU above which a lower-scoring box is suppressed.
    pub nms_threshold: f32,
    /// Minimum box side in original-image pixels, scaled per image.
    pub min_size: f32,
    /// Budgets used while training.
    pub train: SelectionBudget,
    /// Budgets used at inference.
    pub test: SelectionBudget,
    /// Run images of a batch in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            nms_threshold: 0.7,
            min_size: 16.0,
            train: SelectionBudget::new(12000, 2000),
            test: SelectionBudget::new(6000, 300),
            parallel: false,
        }
    }
}

impl ProposalConfig {
    /// Returns the budgets for `phase`.
    pub fn budget(&self, phase: Phase) -> SelectionBudget {
        match phase {
            Phase::Train => self.train,
            Phase::Test => self.test,
        }
    }

    /// Checks the threshold and size floor.
    pub fn validate(&self) -> RoiGenResult<()> {
        check_threshold(self.nms_threshold)?;
        if !self.min_size.is_finite() || self.min_size < 0.0 {
            return Err(RoiGenError::InvalidConfig(
                "min_size must be finite and non-negative",
            ));
        }
        Ok(())
    }
}
