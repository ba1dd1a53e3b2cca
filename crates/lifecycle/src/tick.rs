//! Per-tick input and output.

use std::collections::BTreeMap;

use serde::Serialize;
use trellis_anchor::{PlacementSlotId, TouchSample};
use trellis_catalog::PoiId;

use crate::idle::IdlePhase;

/// Host state sampled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// First recognized touch, if any finger is down or just lifted.
    pub touch: Option<TouchSample>,
    /// The host's own hit test says the touch landed on existing content.
    pub touch_hits_content: bool,
    /// Layer selection UI is open.
    pub layer_panel_open: bool,
    /// The menu can be opened.
    pub menu_enabled: bool,
    /// The layer menu has at least one entry.
    pub layer_items_available: bool,
}

impl TickInput {
    pub fn with_touch(mut self, touch: TouchSample) -> Self {
        self.touch = Some(touch);
        self
    }

    /// Menu enabled with a non-empty layer list.
    pub fn with_menu(mut self) -> Self {
        self.menu_enabled = true;
        self.layer_items_available = true;
        self
    }

    pub fn with_layer_panel_open(mut self, open: bool) -> Self {
        self.layer_panel_open = open;
        self
    }

    pub fn countdown_enabled(&self) -> bool {
        self.menu_enabled && self.layer_items_available
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub layer_switched: bool,
    pub events_applied: usize,
    /// Duplicate image adds the queue rewrote to updates this tick.
    pub coerced_adds: u64,
    pub placements: Vec<PlacementSlotId>,
    pub expired: usize,
    pub errors: Vec<String>,
    pub overlay_visible: bool,
    pub idle: IdlePhase,
    pub idle_expired: bool,
    pub active_counts: BTreeMap<PoiId, usize>,
}

impl Default for TickReport {
    fn default() -> Self {
        Self {
            layer_switched: false,
            events_applied: 0,
            coerced_adds: 0,
            placements: Vec::new(),
            expired: 0,
            errors: Vec::new(),
            overlay_visible: false,
            idle: IdlePhase::Hidden,
            idle_expired: false,
            active_counts: BTreeMap::new(),
        }
    }
}
