//! Two identity spaces, one registry.

use std::collections::BTreeMap;

use tracing::debug;
use trellis_anchor::{ImageIdentity, PlacementSlotId};
use trellis_catalog::PoiId;
use trellis_sink::OutputSink;

use crate::visualizer::Visualizer;

/// Registry sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryCounts {
    pub images: usize,
    pub placements: usize,
    pub active: usize,
}

/// Live visualizers keyed by image identity or placement slot.
#[derive(Debug, Default)]
pub struct VisualizerRegistry {
    images: BTreeMap<ImageIdentity, Visualizer>,
    placements: BTreeMap<PlacementSlotId, Visualizer>,
    next_slot: u64,
}

impl VisualizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a fresh slot id. Ids are never reused, not even after a
    /// layer switch clears the placements.
    pub fn allocate_slot(&mut self) -> PlacementSlotId {
        let slot = PlacementSlotId::new(self.next_slot);
        self.next_slot += 1;
        slot
    }

    /// Active visualizers referencing `poi`, across both identity spaces.
    pub fn active_count(&self, poi: &PoiId) -> usize {
        self.all()
            .filter(|v| v.is_active() && &v.poi().id == poi)
            .count()
    }

    pub fn active_counts(&self) -> BTreeMap<PoiId, usize> {
        let mut counts = BTreeMap::new();
        for vis in self.all().filter(|v| v.is_active()) {
            *counts.entry(vis.poi().id.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn any_active(&self) -> bool {
        self.all().any(|v| v.is_active())
    }

    pub fn all(&self) -> impl Iterator<Item = &Visualizer> {
        self.images.values().chain(self.placements.values())
    }

    pub fn image(&self, identity: &ImageIdentity) -> Option<&Visualizer> {
        self.images.get(identity)
    }

    pub fn image_mut(&mut self, identity: &ImageIdentity) -> Option<&mut Visualizer> {
        self.images.get_mut(identity)
    }

    /// Register an image visualizer. Returns the one it replaced, if any.
    pub fn insert_image(&mut self, identity: ImageIdentity, visualizer: Visualizer) -> Option<Visualizer> {
        self.images.insert(identity, visualizer)
    }

    pub fn remove_image(&mut self, identity: &ImageIdentity) -> Option<Visualizer> {
        self.images.remove(identity)
    }

    pub fn images(&self) -> impl Iterator<Item = (&ImageIdentity, &Visualizer)> {
        self.images.iter()
    }

    pub fn images_mut(&mut self) -> impl Iterator<Item = (&ImageIdentity, &mut Visualizer)> {
        self.images.iter_mut()
    }

    pub fn insert_placement(&mut self, slot: PlacementSlotId, visualizer: Visualizer) {
        self.placements.insert(slot, visualizer);
    }

    pub fn placements(&self) -> impl Iterator<Item = (&PlacementSlotId, &Visualizer)> {
        self.placements.iter()
    }

    pub fn has_placements(&self) -> bool {
        !self.placements.is_empty()
    }

    /// Destroy every tap placement. Returns how many were destroyed.
    pub fn destroy_placements(&mut self, sink: &dyn OutputSink) -> usize {
        let placements = std::mem::take(&mut self.placements);
        let count = placements.len();
        for (slot, vis) in placements {
            debug!(slot = %slot, trigger = %vis.trigger(), "Destroying placement");
            vis.destroy(sink);
        }
        count
    }

    /// Destroy every image visualizer. Returns how many were destroyed.
    pub fn destroy_images(&mut self, sink: &dyn OutputSink) -> usize {
        let images = std::mem::take(&mut self.images);
        let count = images.len();
        for (identity, vis) in images {
            debug!(identity = %identity, trigger = %vis.trigger(), "Destroying image content");
            vis.destroy(sink);
        }
        count
    }

    /// Hide every image visualizer, keeping the entries. Returns how many changed.
    pub fn deactivate_images(&mut self, sink: &dyn OutputSink) -> usize {
        let mut changed = 0;
        for vis in self.images.values_mut() {
            if vis.deactivate(sink) {
                changed += 1;
            }
        }
        changed
    }

    pub fn counts(&self) -> RegistryCounts {
        RegistryCounts {
            images: self.images.len(),
            placements: self.placements.len(),
            active: self.all().filter(|v| v.is_active()).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use trellis_anchor::Pose;
    use trellis_catalog::{Poi, TriggerObject};
    use trellis_sink::RecordingSink;

    fn active_image(sink: &RecordingSink, name: &str, poi: &Poi) -> Visualizer {
        let trigger = TriggerObject::image(name, "l1", name, poi.id.clone());
        let mut vis = Visualizer::for_image(&trigger, poi, name.into(), Pose::IDENTITY, Instant::now());
        vis.ensure_content(sink).unwrap();
        vis.activate(sink, Instant::now());
        vis
    }

    fn active_placement(sink: &RecordingSink, registry: &mut VisualizerRegistry, poi: &Poi) {
        let trigger = TriggerObject::plane("plane", "l1", poi.id.clone());
        let slot = registry.allocate_slot();
        let mut vis = Visualizer::for_placement(&trigger, poi, slot, Pose::IDENTITY, Instant::now());
        vis.ensure_content(sink).unwrap();
        vis.activate(sink, Instant::now());
        registry.insert_placement(slot, vis);
    }

    #[test]
    fn test_slots_never_reused() {
        let sink = RecordingSink::new();
        let mut registry = VisualizerRegistry::new();
        let poi = Poi::new("p");

        active_placement(&sink, &mut registry, &poi);
        active_placement(&sink, &mut registry, &poi);
        assert_eq!(registry.destroy_placements(&sink), 2);

        let slot = registry.allocate_slot();
        assert_eq!(slot.value(), 2);
    }

    #[test]
    fn test_active_count_spans_both_spaces() {
        let sink = RecordingSink::new();
        let mut registry = VisualizerRegistry::new();
        let poi = Poi::new("shared").with_maximum_count(3);

        registry.insert_image("poster".into(), active_image(&sink, "poster", &poi));
        active_placement(&sink, &mut registry, &poi);

        assert_eq!(registry.active_count(&poi.id), 2);
        assert_eq!(registry.active_counts().get(&poi.id), Some(&2));
        assert!(registry.any_active());

        assert_eq!(registry.deactivate_images(&sink), 1);
        assert_eq!(registry.active_count(&poi.id), 1);
        assert_eq!(registry.counts().images, 1);
    }

    #[test]
    fn test_destroy_releases_content() {
        let sink = RecordingSink::new();
        let mut registry = VisualizerRegistry::new();
        let poi = Poi::new("p");

        registry.insert_image("a".into(), active_image(&sink, "a", &poi));
        registry.insert_image("b".into(), active_image(&sink, "b", &poi));
        active_placement(&sink, &mut registry, &poi);
        assert_eq!(sink.live_count(), 3);

        assert_eq!(registry.destroy_images(&sink), 2);
        assert_eq!(registry.destroy_placements(&sink), 1);
        assert_eq!(sink.live_count(), 0);
        assert_eq!(registry.counts(), RegistryCounts::default());
    }
}
