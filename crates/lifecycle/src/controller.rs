//! The lifecycle controller and its tick.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use trellis_anchor::{
    event_queue, AnchorEventQueue, AnchorEventSender, ImageTracking, PlaneTracking, Subscription,
};
use trellis_catalog::{Catalog, DetectionMode, LayerId};
use trellis_registry::VisualizerRegistry;
use trellis_sink::OutputSinkRef;

use crate::clock::{Clock, SystemClock};
use crate::error::LifecycleError;
use crate::idle::{IdleOverlay, IdlePhase};
use crate::placement::PlacementState;
use crate::settings::{ControllerSettings, ImageTeardown};
use crate::tick::{TickInput, TickReport};

/// Reconciles anchor events against the catalog, once per tick.
///
/// The controller is single-threaded. Sensors on other threads reach it
/// only through [`event_sender`](Self::event_sender); each tick drains what
/// they queued and applies it before any other policy runs.
pub struct LifecycleController {
    pub(crate) settings: ControllerSettings,
    pub(crate) catalog: Catalog,
    pub(crate) sink: OutputSinkRef,
    clock: Arc<dyn Clock>,
    pub(crate) image_tracking: Option<Arc<dyn ImageTracking>>,
    pub(crate) plane_tracking: Option<Arc<dyn PlaneTracking>>,
    sender: AnchorEventSender,
    queue: AnchorEventQueue,
    subscription: Option<Subscription>,
    plane_mode: Option<DetectionMode>,
    pub(crate) registry: VisualizerRegistry,
    pub(crate) placement: PlacementState,
    observed_layer: Option<LayerId>,
    catalog_reloaded: bool,
    idle: IdleOverlay,
    idle_phase: IdlePhase,
}

impl LifecycleController {
    pub fn new(settings: ControllerSettings, catalog: Catalog, sink: OutputSinkRef) -> Self {
        let (sender, queue) = event_queue();
        let idle = IdleOverlay::new(settings.idle_timeout());
        Self {
            settings,
            catalog,
            sink,
            clock: Arc::new(SystemClock),
            image_tracking: None,
            plane_tracking: None,
            sender,
            queue,
            subscription: None,
            plane_mode: None,
            registry: VisualizerRegistry::new(),
            placement: PlacementState::default(),
            observed_layer: None,
            catalog_reloaded: false,
            idle,
            idle_phase: IdlePhase::Hidden,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_image_tracking(mut self, tracking: Arc<dyn ImageTracking>) -> Self {
        self.image_tracking = Some(tracking);
        self
    }

    pub fn with_plane_tracking(mut self, tracking: Arc<dyn PlaneTracking>) -> Self {
        self.plane_tracking = Some(tracking);
        self
    }

    /// Producer handle for anchor events. Clone freely across threads.
    pub fn event_sender(&self) -> AnchorEventSender {
        self.sender.clone()
    }

    /// Replace the catalog. A different layer id triggers layer-switch
    /// reconciliation on the next tick; the same id only restarts the idle timer.
    pub fn set_catalog(&mut self, catalog: Catalog) {
        debug!(layer = %catalog.layer(), triggers = catalog.len(), "Catalog replaced");
        self.catalog = catalog;
        self.catalog_reloaded = true;
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn registry(&self) -> &VisualizerRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn hit_counter(&self) -> usize {
        self.placement.hit_counter
    }

    pub fn idle_phase(&self) -> IdlePhase {
        self.idle_phase
    }

    pub fn is_image_tracking_enabled(&self) -> bool {
        self.subscription.is_some()
    }

    /// Run one tick.
    pub fn tick(&mut self, input: &TickInput) -> TickReport {
        let now = self.clock.now();
        let mut report = TickReport {
            layer_switched: self.reconcile_layer(),
            ..TickReport::default()
        };

        self.drive_capabilities();
        self.apply_events(now, &mut report);
        self.handle_touch(input, now, &mut report);
        self.update_prompt();
        report.expired = self.sweep_expired(now);
        self.update_idle(input, now, &mut report);

        report.active_counts = self.registry.active_counts();
        report
    }

    /// Tear down layer-scoped state when the catalog's layer changed.
    fn reconcile_layer(&mut self) -> bool {
        let reloaded = std::mem::take(&mut self.catalog_reloaded);
        let layer = self.catalog.layer().clone();

        if self.observed_layer.as_ref() == Some(&layer) {
            if reloaded {
                debug!(layer = %layer, "Catalog reloaded, restarting idle timer");
                self.idle.reset();
            }
            return false;
        }

        let previous = self.observed_layer.replace(layer.clone());
        let sink = self.sink.as_ref();
        let placements = self.registry.destroy_placements(sink);
        self.placement.reset();
        self.plane_mode = None;

        let images = match self.settings.image_teardown {
            ImageTeardown::Destroy => {
                self.queue.reset_live_images();
                self.registry.destroy_images(sink)
            }
            ImageTeardown::Deactivate => self.registry.deactivate_images(sink),
        };
        self.idle.reset();

        match previous {
            Some(previous) => {
                info!(
                    from = %previous,
                    to = %layer,
                    placements,
                    images,
                    teardown = ?self.settings.image_teardown,
                    "Layer switched"
                );
                true
            }
            None => {
                debug!(layer = %layer, "Initial layer");
                false
            }
        }
    }

    /// Enable or disable the optional capabilities for the current catalog.
    fn drive_capabilities(&mut self) {
        if let Some(images) = self.image_tracking.clone() {
            let wanted = images.reference_image_count() > 0;
            if wanted && self.subscription.is_none() {
                images.set_enabled(true);
                self.subscription = Some(images.subscribe(self.sender.clone()));
                info!(
                    reference_images = images.reference_image_count(),
                    "Image tracking enabled"
                );
            } else if !wanted && self.subscription.is_some() {
                self.subscription = None;
                images.set_enabled(false);
                let hidden = self.registry.deactivate_images(self.sink.as_ref());
                self.queue.reset_live_images();
                info!(hidden, "Image tracking disabled");
            }
        }

        if let Some(planes) = self.plane_tracking.clone() {
            if self.catalog.has_plane_targets() {
                let mode = self.catalog.requested_detection_mode();
                if !planes.is_enabled() || self.plane_mode != Some(mode) {
                    planes.set_detection_mode(mode);
                    planes.set_enabled(true);
                    self.plane_mode = Some(mode);
                    info!(mode = ?mode, "Plane tracking enabled");
                }
            } else {
                if planes.is_enabled() {
                    planes.set_enabled(false);
                    info!("Plane tracking disabled");
                }
                self.plane_mode = None;
                if self.registry.has_placements() {
                    self.registry.destroy_placements(self.sink.as_ref());
                }
                self.placement.hit_counter = 0;
            }
        }
    }

    fn apply_events(&mut self, now: Instant, report: &mut TickReport) {
        let coerced_before = self.queue.coerced_adds();
        let events = self.queue.drain();
        report.coerced_adds = self.queue.coerced_adds() - coerced_before;
        if events.is_empty() {
            return;
        }

        let batch_tracking = events
            .iter()
            .any(|e| crate::images::is_fully_tracked(&e.kind));

        for event in events {
            let label = event.kind.label();
            let seq = event.seq;
            match self.apply_event(event, batch_tracking, now, report) {
                Ok(()) => report.events_applied += 1,
                Err(e) => {
                    warn!(seq, event = label, error = %e, "Event rejected");
                    self.surface(e, report);
                }
            }
        }
    }

    /// Show an error to the user and record it in the report.
    pub(crate) fn surface(&self, error: LifecycleError, report: &mut TickReport) {
        let message = error.to_string();
        self.sink.show_error(&message);
        report.errors.push(message);
    }

    fn update_idle(&mut self, input: &TickInput, now: Instant, report: &mut TickReport) {
        let visible = self.subscription.is_some()
            && !self.catalog.is_empty()
            && !self.registry.any_active()
            && !input.layer_panel_open;

        let outcome = self.idle.update(visible, input.countdown_enabled(), now);
        if outcome.visibility_changed {
            self.sink.set_scan_overlay(visible);
        }

        match outcome.phase {
            IdlePhase::CountingDown { remaining } => {
                self.sink
                    .set_info_text(&self.settings.countdown_text(remaining));
            }
            _ if matches!(self.idle_phase, IdlePhase::CountingDown { .. }) => {
                // countdown text is gone, put the prompt back
                self.placement.prompt_dirty = true;
            }
            _ => {}
        }

        if outcome.fired {
            let deactivated = self.catalog.deactivate_all();
            self.sink.request_menu_open();
            info!(
                layer = %self.catalog.layer(),
                deactivated,
                timeout_secs = self.idle.timeout().as_secs(),
                "Idle timeout reached, opening menu"
            );
            report.idle_expired = true;
        }

        self.idle_phase = outcome.phase;
        report.overlay_visible = visible;
        report.idle = outcome.phase;
    }
}
