//! Image trigger handling and the timeout sweep.

use std::time::Instant;

use tracing::{debug, info};
use trellis_anchor::{AnchorEvent, AnchorEventKind, ImageIdentity, ImageObservation, TrackingState};
use trellis_registry::Visualizer;

use crate::controller::LifecycleController;
use crate::error::LifecycleError;
use crate::tick::TickReport;

/// True for an add or update reporting full tracking.
pub(crate) fn is_fully_tracked(kind: &AnchorEventKind) -> bool {
    match kind {
        AnchorEventKind::ImageAdded(obs) | AnchorEventKind::ImageUpdated(obs) => obs.is_tracking(),
        _ => false,
    }
}

impl LifecycleController {
    /// Apply one drained event.
    ///
    /// `batch_tracking` is set when some image in the same batch is fully
    /// tracked; limited updates then do not keep content alive.
    pub(crate) fn apply_event(
        &mut self,
        event: AnchorEvent,
        batch_tracking: bool,
        now: Instant,
        report: &mut TickReport,
    ) -> Result<(), LifecycleError> {
        match event.kind {
            AnchorEventKind::ImageAdded(obs) | AnchorEventKind::ImageUpdated(obs) => {
                self.image_seen(obs, batch_tracking, now)
            }
            AnchorEventKind::ImageRemoved { identity } => {
                self.image_removed(&identity);
                Ok(())
            }
            AnchorEventKind::PlaneTapped { pose } => {
                self.handle_plane_tap(pose, now, report);
                Ok(())
            }
        }
    }

    fn image_seen(
        &mut self,
        obs: ImageObservation,
        batch_tracking: bool,
        now: Instant,
    ) -> Result<(), LifecycleError> {
        self.rebind_if_stale(&obs.identity);

        let Some(existing) = self.registry.image(&obs.identity) else {
            return self.bind_image(obs, now);
        };

        let live =
            existing.layer() == self.catalog.layer() && self.catalog.is_live(existing.trigger());
        let poi = existing.poi().clone();
        let was_active = existing.is_active();
        let room = poi
            .capacity()
            .map(|max| self.registry.active_count(&poi.id) < max)
            .unwrap_or(true);

        let sink = self.sink.as_ref();
        let Some(vis) = self.registry.image_mut(&obs.identity) else {
            return Ok(());
        };

        if !live {
            if vis.deactivate(sink) {
                debug!(identity = %obs.identity, trigger = %vis.trigger(), "Trigger inactive or off-layer, hiding content");
            }
            return Ok(());
        }

        let refresh = match obs.tracking_state {
            TrackingState::Tracking => true,
            TrackingState::Limited => poi.keep_last_known_pose && !batch_tracking,
            TrackingState::None => false,
        };
        if !refresh {
            return Ok(());
        }

        vis.touch(now);
        vis.update_pose(sink, obs.pose);
        if !was_active {
            if room {
                vis.activate(sink, now);
                debug!(identity = %obs.identity, poi = %poi.id, "Image content reactivated");
            } else {
                debug!(identity = %obs.identity, poi = %poi.id, "Poi at capacity, not reactivating");
            }
        }
        Ok(())
    }

    /// First sighting of an image: resolve its trigger and create content.
    fn bind_image(&mut self, obs: ImageObservation, now: Instant) -> Result<(), LifecycleError> {
        if !obs.is_tracking() {
            debug!(identity = %obs.identity, state = ?obs.tracking_state, "Untracked image, waiting");
            return Ok(());
        }

        let trigger = self
            .catalog
            .find_by_source_image(obs.identity.as_str())
            .ok_or_else(|| LifecycleError::Configuration {
                identity: obs.identity.clone(),
            })?;

        if !trigger.is_active || &trigger.layer != self.catalog.layer() {
            debug!(
                identity = %obs.identity,
                trigger = %trigger.id,
                active = trigger.is_active,
                layer = %trigger.layer,
                "Trigger not live, suppressing content"
            );
            return Ok(());
        }

        let poi = self
            .catalog
            .resolve_poi(trigger)
            .ok_or_else(|| LifecycleError::MissingPoi {
                trigger: trigger.id.clone(),
            })?;

        if let Some(max) = poi.capacity() {
            if self.registry.active_count(&poi.id) >= max {
                debug!(identity = %obs.identity, poi = %poi.id, max, "Poi at capacity, not binding image");
                return Ok(());
            }
        }

        let mut vis = Visualizer::for_image(trigger, poi, obs.identity.clone(), obs.pose, now);
        // not registered on failure, the next sighting binds again
        vis.ensure_content(self.sink.as_ref())?;
        vis.activate(self.sink.as_ref(), now);
        info!(identity = %obs.identity, trigger = %trigger.id, poi = %poi.id, "Image content created");
        self.registry.insert_image(obs.identity, vis);
        Ok(())
    }

    /// Drop a retained visualizer from an older layer when the identity
    /// resolves in the current one.
    fn rebind_if_stale(&mut self, identity: &ImageIdentity) {
        let Some(vis) = self.registry.image(identity) else {
            return;
        };
        let layer = self.catalog.layer();
        if vis.layer() == layer {
            return;
        }
        let resolves_here = self
            .catalog
            .find_by_source_image(identity.as_str())
            .map(|t| &t.layer == layer)
            .unwrap_or(false);
        if !resolves_here {
            return;
        }

        if let Some(stale) = self.registry.remove_image(identity) {
            debug!(
                identity = %identity,
                from = %stale.layer(),
                to = %layer,
                "Rebinding image to current layer"
            );
            stale.destroy(self.sink.as_ref());
        }
    }

    fn image_removed(&mut self, identity: &ImageIdentity) {
        let sink = self.sink.as_ref();
        let Some(vis) = self.registry.image_mut(identity) else {
            debug!(identity = %identity, "Removed image was never bound");
            return;
        };
        if vis.poi().tracking_timeout().is_some() {
            // expiry is left to the sweep
            return;
        }
        if vis.deactivate(sink) {
            debug!(identity = %identity, "Image lost, content hidden");
        }
    }

    /// Hide image content whose POI timeout elapsed. Returns how many were hidden.
    pub(crate) fn sweep_expired(&mut self, now: Instant) -> usize {
        let sink = self.sink.as_ref();
        let mut expired = 0;
        for (identity, vis) in self.registry.images_mut() {
            if vis.is_active() && vis.is_expired(now) {
                vis.deactivate(sink);
                expired += 1;
                debug!(
                    identity = %identity,
                    idle_ms = now.saturating_duration_since(vis.last_update_time()).as_millis() as u64,
                    "Image content expired"
                );
            }
        }
        expired
    }
}
