//! Anchor sets keyed by feature-map geometry.
//!
//! Anchor generation itself lives outside this crate and is reached through
//! [`AnchorGenerator`]. [`AnchorCache`] asks the generator at most once per
//! distinct geometry and hands out shared, read-only slices afterwards, so the
//! same anchors serve every image of a batch and every call with that geometry.

use crate::geometry::Anchor;
use crate::util::RoiGenResult;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Feature-map sizes and network input size that determine an anchor grid.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FeatureGeometry {
    /// `(width, height)` of each feature map, in pyramid order.
    pub feature_sizes: Vec<(usize, usize)>,
    /// `(width, height)` of the network input.
    pub input_size: (usize, usize),
}

impl FeatureGeometry {
    /// Creates a geometry key.
    pub fn new(feature_sizes: Vec<(usize, usize)>, input_size: (usize, usize)) -> Self {
        Self {
            feature_sizes,
            input_size,
        }
    }
}

/// Produces the anchor grid for a geometry.
pub trait AnchorGenerator {
    /// Returns one anchor per spatial location and base shape.
    fn generate(&self, geometry: &FeatureGeometry) -> RoiGenResult<Vec<Anchor>>;
}

impl<F> AnchorGenerator for F
where
    F: Fn(&FeatureGeometry) -> RoiGenResult<Vec<Anchor>>,
{
    fn generate(&self, geometry: &FeatureGeometry) -> RoiGenResult<Vec<Anchor>> {
        self(geometry)
    }
}

/// Lazily populated map from geometry to shared anchors.
#[derive(Default)]
pub struct AnchorCache {
    sets: RwLock<HashMap<FeatureGeometry, Arc<[Anchor]>>>,
}

impl AnchorCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the anchors for `geometry`, generating them on first use.
    ///
    /// Generator errors are returned unchanged and nothing is cached for that
    /// geometry.
    pub fn get_or_generate<G>(
        &self,
        geometry: &FeatureGeometry,
        generator: &G,
    ) -> RoiGenResult<Arc<[Anchor]>>
    where
        G: AnchorGenerator + ?Sized,
    {
        if let Some(anchors) = self.get(geometry) {
            return Ok(anchors);
        }

        let generated: Arc<[Anchor]> = generator.generate(geometry)?.into();
        let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);
        let anchors = sets
            .entry(geometry.clone())
            .or_insert_with(|| Arc::clone(&generated));
        Ok(Arc::clone(anchors))
    }

    /// Returns cached anchors for `geometry` without generating.
    pub fn get(&self, geometry: &FeatureGeometry) -> Option<Arc<[Anchor]>> {
        let sets = self.sets.read().unwrap_or_else(PoisonError::into_inner);
        sets.get(geometry).map(Arc::clone)
    }

    /// Number of cached geometries.
    pub fn len(&self) -> usize {
        self.sets.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true when nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached anchor set.
    pub fn clear(&self) {
        self.sets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
