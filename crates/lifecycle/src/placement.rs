//! Tap-driven plane placement.

use std::time::Instant;

use tracing::{debug, info};
use trellis_anchor::{Pose, TouchPhase};
use trellis_registry::Visualizer;

use crate::controller::LifecycleController;
use crate::error::LifecycleError;
use crate::tick::{TickInput, TickReport};

/// Informational line owned by placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Prompt {
    TapPrompt,
    AllPlaced,
}

/// Layer-scoped placement state.
#[derive(Debug, Default)]
pub(crate) struct PlacementState {
    /// Round-robin counter, advanced once per resolved tap.
    pub(crate) hit_counter: usize,
    /// A tap was consumed and the touch has not been released yet.
    pub(crate) tap_in_flight: bool,
    /// Prompt currently shown.
    pub(crate) prompt: Option<Prompt>,
    /// Re-emit the prompt even if it did not change.
    pub(crate) prompt_dirty: bool,
}

impl PlacementState {
    /// Start over for a new layer. The displayed prompt is kept so it is
    /// only re-emitted if the new layer needs a different one.
    pub(crate) fn reset(&mut self) {
        self.hit_counter = 0;
        self.tap_in_flight = false;
    }
}

impl LifecycleController {
    /// Consume the tick's touch sample.
    ///
    /// Only the first `Began` of a touch counts. The flag clears once the
    /// touch ends, is cancelled, or disappears from the input.
    pub(crate) fn handle_touch(&mut self, input: &TickInput, now: Instant, report: &mut TickReport) {
        let Some(touch) = input.touch else {
            self.placement.tap_in_flight = false;
            return;
        };

        match touch.phase {
            TouchPhase::Ended | TouchPhase::Canceled => {
                self.placement.tap_in_flight = false;
                return;
            }
            TouchPhase::Moved | TouchPhase::Stationary => return,
            TouchPhase::Began => {}
        }

        if self.placement.tap_in_flight {
            return;
        }
        self.placement.tap_in_flight = true;

        if input.touch_hits_content {
            debug!("Tap landed on existing content, ignoring");
            return;
        }

        let Some(planes) = self.plane_tracking.clone() else {
            return;
        };
        if !planes.is_enabled() {
            return;
        }

        let hits = planes.raycast(touch.position);
        match hits.first() {
            Some(hit) => self.place_at(hit.pose, now, report),
            None => debug!(x = touch.position[0], y = touch.position[1], "Raycast missed"),
        }
    }

    /// Place a plane tap delivered through the event queue.
    pub(crate) fn handle_plane_tap(&mut self, pose: Pose, now: Instant, report: &mut TickReport) {
        if self.placement.tap_in_flight {
            debug!("Placement already resolved this tick, ignoring tap");
            return;
        }
        self.placement.tap_in_flight = true;
        self.place_at(pose, now, report);
    }

    /// Pick the next eligible plane target round-robin and place it at `pose`.
    fn place_at(&mut self, pose: Pose, now: Instant, report: &mut TickReport) {
        let registry = &self.registry;
        let eligible = self
            .catalog
            .eligible_plane_targets(|poi| registry.active_count(poi));

        if eligible.is_empty() {
            let text = self
                .catalog
                .all_placed(&self.settings.default_all_placed_message);
            debug!(text, "No plane target has capacity left");
            self.sink.set_info_text(text);
            self.placement.prompt = Some(Prompt::AllPlaced);
            self.placement.prompt_dirty = false;
            return;
        }

        let eligible_count = eligible.len();
        let index = self.placement.hit_counter % eligible_count;
        self.placement.hit_counter += 1;
        let trigger = eligible[index].clone();

        let Some(poi) = self.catalog.resolve_poi(&trigger).cloned() else {
            self.surface(LifecycleError::MissingPoi { trigger: trigger.id }, report);
            return;
        };

        let slot = self.registry.allocate_slot();
        let mut visualizer = Visualizer::for_placement(&trigger, &poi, slot, pose, now);
        if let Err(e) = visualizer.ensure_content(self.sink.as_ref()) {
            self.surface(e.into(), report);
            return;
        }
        visualizer.activate(self.sink.as_ref(), now);

        info!(
            slot = %slot,
            trigger = %trigger.id,
            poi = %poi.id,
            index,
            eligible = eligible_count,
            "Placed content"
        );
        self.registry.insert_placement(slot, visualizer);
        report.placements.push(slot);
    }

    /// Show the tap prompt or the all-placed text when that state changes.
    pub(crate) fn update_prompt(&mut self) {
        let placement_possible = self
            .plane_tracking
            .as_ref()
            .map(|planes| planes.is_enabled())
            .unwrap_or(false)
            && self.catalog.has_plane_targets();

        let desired = if placement_possible {
            let registry = &self.registry;
            let exhausted = self
                .catalog
                .eligible_plane_targets(|poi| registry.active_count(poi))
                .is_empty();
            if exhausted {
                Some(Prompt::AllPlaced)
            } else if !self.registry.has_placements() {
                Some(Prompt::TapPrompt)
            } else {
                None
            }
        } else {
            None
        };

        if desired == self.placement.prompt && !self.placement.prompt_dirty {
            return;
        }
        let previous = self.placement.prompt;
        let dirty = std::mem::take(&mut self.placement.prompt_dirty);
        self.placement.prompt = desired;

        match desired {
            Some(Prompt::TapPrompt) => self.sink.set_info_text(&self.settings.tap_prompt),
            Some(Prompt::AllPlaced) => {
                let text = self
                    .catalog
                    .all_placed(&self.settings.default_all_placed_message);
                self.sink.set_info_text(text);
            }
            None if previous.is_some() || dirty => self.sink.set_info_text(""),
            None => {}
        }
    }
}
