//! Layer-scoped catalog queries.

use std::collections::HashMap;

use crate::types::{DetectionMode, LayerId, Poi, PoiId, TriggerId, TriggerObject};

/// Text shown when no plane target has capacity left and no POI overrides it.
pub const DEFAULT_ALL_PLACED_MESSAGE: &str = "All augments placed.";

/// Trigger objects and POIs loaded for one layer.
///
/// Trigger order is catalog order and is significant: plane placement
/// cycles through eligible targets in this order. The catalog may also hold
/// triggers tagged with another layer (reference images registered for a
/// previous layer); every layer-scoped query ignores them.
#[derive(Debug, Clone)]
pub struct Catalog {
    layer: LayerId,
    pois: HashMap<PoiId, Poi>,
    triggers: Vec<TriggerObject>,
}

impl Catalog {
    pub fn new(
        layer: impl Into<LayerId>,
        pois: impl IntoIterator<Item = Poi>,
        triggers: impl IntoIterator<Item = TriggerObject>,
    ) -> Self {
        Self {
            layer: layer.into(),
            pois: pois.into_iter().map(|poi| (poi.id.clone(), poi)).collect(),
            triggers: triggers.into_iter().collect(),
        }
    }

    pub fn empty(layer: impl Into<LayerId>) -> Self {
        Self::new(layer, Vec::new(), Vec::new())
    }

    /// The layer this catalog was loaded for.
    pub fn layer(&self) -> &LayerId {
        &self.layer
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn triggers(&self) -> impl Iterator<Item = &TriggerObject> {
        self.triggers.iter()
    }

    /// Triggers belonging to the catalog's own layer, in catalog order.
    pub fn layer_triggers(&self) -> impl Iterator<Item = &TriggerObject> {
        self.triggers.iter().filter(move |t| t.layer == self.layer)
    }

    pub fn get(&self, id: &TriggerId) -> Option<&TriggerObject> {
        self.triggers.iter().find(|t| &t.id == id)
    }

    pub fn poi(&self, id: &PoiId) -> Option<&Poi> {
        self.pois.get(id)
    }

    pub fn resolve_poi(&self, trigger: &TriggerObject) -> Option<&Poi> {
        trigger.poi.as_ref().and_then(|id| self.pois.get(id))
    }

    /// First trigger (any layer) whose source image matches `name`.
    pub fn find_by_source_image(&self, name: &str) -> Option<&TriggerObject> {
        self.triggers
            .iter()
            .find(|t| t.source_image.as_deref() == Some(name))
    }

    /// True if the trigger exists, is active and belongs to this layer.
    pub fn is_live(&self, id: &TriggerId) -> bool {
        self.get(id)
            .map(|t| t.is_active && t.layer == self.layer)
            .unwrap_or(false)
    }

    /// Plane targets of this layer that have a resolved POI.
    pub fn plane_targets(&self) -> impl Iterator<Item = (&TriggerObject, &Poi)> {
        self.layer_triggers()
            .filter(|t| t.is_plane_target())
            .filter_map(|t| self.resolve_poi(t).map(|poi| (t, poi)))
    }

    pub fn has_plane_targets(&self) -> bool {
        self.plane_targets().next().is_some()
    }

    /// Plane targets whose POI still has capacity, in catalog order.
    ///
    /// `active_count` reports how many active visualizers currently
    /// reference a POI id.
    pub fn eligible_plane_targets<F>(&self, active_count: F) -> Vec<&TriggerObject>
    where
        F: Fn(&PoiId) -> usize,
    {
        self.plane_targets()
            .filter(|(_, poi)| match poi.capacity() {
                Some(max) => active_count(&poi.id) < max,
                None => true,
            })
            .map(|(t, _)| t)
            .collect()
    }

    /// First non-empty "all augments placed" override of the layer, else `fallback`.
    pub fn all_placed<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.layer_triggers()
            .filter_map(|t| self.resolve_poi(t))
            .filter_map(|poi| poi.all_augments_placed_message.as_deref())
            .find(|message| !message.is_empty())
            .unwrap_or(fallback)
    }

    /// First detection mode override of the layer, else [`DetectionMode::Both`].
    pub fn requested_detection_mode(&self) -> DetectionMode {
        self.layer_triggers()
            .filter_map(|t| self.resolve_poi(t))
            .find_map(|poi| poi.requested_detection_mode)
            .unwrap_or_default()
    }

    /// Mark every trigger inactive. Returns how many were active before.
    pub fn deactivate_all(&mut self) -> usize {
        let mut changed = 0;
        for trigger in self.triggers.iter_mut().filter(|t| t.is_active) {
            trigger.is_active = false;
            changed += 1;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_target_catalog() -> Catalog {
        Catalog::new(
            "l1",
            vec![Poi::new("a").with_maximum_count(1), Poi::new("b")],
            vec![
                TriggerObject::plane("ta", "l1", "a"),
                TriggerObject::plane("tb", "l1", "b"),
            ],
        )
    }

    #[test]
    fn test_eligible_in_catalog_order() {
        let catalog = two_target_catalog();
        let ids: Vec<_> = catalog
            .eligible_plane_targets(|_| 0)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["ta", "tb"]);
    }

    #[test]
    fn test_eligible_excludes_capped_poi() {
        let catalog = two_target_catalog();
        let counts = |poi: &PoiId| if poi.as_str() == "a" { 1 } else { 5 };
        let ids: Vec<_> = catalog
            .eligible_plane_targets(counts)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["tb"]);
    }

    #[test]
    fn test_eligible_skips_unresolved_and_foreign_layers() {
        let catalog = Catalog::new(
            "l1",
            vec![Poi::new("a")],
            vec![
                TriggerObject::plane("orphan", "l1", "missing"),
                TriggerObject::plane("other", "l2", "a"),
                TriggerObject::image("img", "l1", "poster", "a"),
                TriggerObject::plane("ta", "l1", "a"),
            ],
        );
        let ids: Vec<_> = catalog
            .eligible_plane_targets(|_| 0)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["ta"]);
    }

    #[test]
    fn test_all_placed_falls_back() {
        let catalog = two_target_catalog();
        assert_eq!(
            catalog.all_placed(DEFAULT_ALL_PLACED_MESSAGE),
            DEFAULT_ALL_PLACED_MESSAGE
        );
    }

    #[test]
    fn test_all_placed_uses_first_non_empty_override() {
        let catalog = Catalog::new(
            "l1",
            vec![
                Poi::new("a").with_all_placed_message(""),
                Poi::new("b").with_all_placed_message("Garden complete."),
            ],
            vec![
                TriggerObject::plane("ta", "l1", "a"),
                TriggerObject::plane("tb", "l1", "b"),
            ],
        );
        assert_eq!(catalog.all_placed("fallback"), "Garden complete.");
    }

    #[test]
    fn test_requested_detection_mode() {
        assert_eq!(two_target_catalog().requested_detection_mode(), DetectionMode::Both);

        let catalog = Catalog::new(
            "l1",
            vec![
                Poi::new("a"),
                Poi::new("b").with_detection_mode(DetectionMode::Vertical),
            ],
            vec![
                TriggerObject::plane("ta", "l1", "a"),
                TriggerObject::plane("tb", "l1", "b"),
            ],
        );
        assert_eq!(catalog.requested_detection_mode(), DetectionMode::Vertical);
    }

    #[test]
    fn test_is_live_requires_active_and_same_layer() {
        let mut catalog = Catalog::new(
            "l1",
            vec![Poi::new("a")],
            vec![
                TriggerObject::image("mine", "l1", "poster", "a"),
                TriggerObject::image("stale", "l0", "flyer", "a"),
            ],
        );
        assert!(catalog.is_live(&TriggerId::new("mine")));
        assert!(!catalog.is_live(&TriggerId::new("stale")));
        assert!(!catalog.is_live(&TriggerId::new("missing")));

        catalog.deactivate_all();
        assert!(!catalog.is_live(&TriggerId::new("mine")));
    }

    #[test]
    fn test_deactivate_all_counts_changes() {
        let mut catalog = two_target_catalog();
        assert_eq!(catalog.deactivate_all(), 2);
        assert_eq!(catalog.deactivate_all(), 0);
        assert!(catalog.triggers().all(|t| !t.is_active));
    }

    #[test]
    fn test_find_by_source_image_searches_all_layers() {
        let catalog = Catalog::new(
            "l1",
            vec![Poi::new("a")],
            vec![TriggerObject::image("stale", "l0", "flyer", "a")],
        );
        let found = catalog.find_by_source_image("flyer").unwrap();
        assert_eq!(found.id.as_str(), "stale");
        assert!(catalog.find_by_source_image("poster").is_none());
    }
}
