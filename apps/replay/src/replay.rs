//! Replay loop.

use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use trellis_anchor::fake::{FakeImageTracking, FakePlaneTracking};
use trellis_anchor::{AnchorEventKind, ImageObservation, RaycastHit, TouchPhase, TouchSample};
use trellis_catalog::CatalogSource;
use trellis_lifecycle::{Clock, ControllerSettings, LifecycleController, ManualClock, TickInput};
use trellis_sink::{RecordingSink, SinkCommand};

use crate::producer::{Batch, Producer};
use crate::scenario::{Action, Scenario};

/// Totals over a whole replay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub ticks: usize,
    pub placements: usize,
    pub errors: usize,
    pub menu_requests: usize,
}

#[derive(Serialize)]
struct Line<'a> {
    t_ms: u64,
    #[serde(flatten)]
    command: &'a SinkCommand,
}

pub struct Replay {
    controller: LifecycleController,
    source: Box<dyn CatalogSource>,
    sink: Arc<RecordingSink>,
    clock: Arc<ManualClock>,
    images: Arc<FakeImageTracking>,
    planes: Arc<FakePlaneTracking>,
    producer: Producer,
    tick: Duration,
    input: TickInput,
}

impl Replay {
    pub fn new(
        settings: ControllerSettings,
        source: Box<dyn CatalogSource>,
        scenario: &Scenario,
        tick: Duration,
    ) -> anyhow::Result<Self> {
        let catalog = source
            .load(&scenario.layer)
            .with_context(|| format!("loading initial layer '{}'", scenario.layer))?;

        let reference_images = scenario
            .reference_images
            .unwrap_or_else(|| count_reference_images(source.as_ref()));
        tracing::debug!(reference_images, "Image library size");

        let sink = Arc::new(RecordingSink::new());
        let clock = Arc::new(ManualClock::new());
        let images = Arc::new(FakeImageTracking::new(reference_images));
        let planes = Arc::new(FakePlaneTracking::new());

        let mut controller = LifecycleController::new(settings, catalog, sink.clone())
            .with_clock(clock.clone())
            .with_image_tracking(images.clone())
            .with_plane_tracking(planes.clone());
        // startup frame: subscribes the tracker before the first scripted event
        controller.tick(&TickInput::default());
        let producer = Producer::spawn(images.clone())?;

        Ok(Self {
            controller,
            source,
            sink,
            clock,
            images,
            planes,
            producer,
            tick,
            input: TickInput::default(),
        })
    }

    /// Replay every step, writing sink commands as JSON lines to `out`.
    pub fn run(&mut self, scenario: &Scenario, out: &mut dyn Write) -> anyhow::Result<Summary> {
        let tick_ms = self.tick.as_millis() as u64;
        let end_ms = scenario.end_ms();
        let mut steps = scenario.steps.iter().peekable();
        let mut summary = Summary::default();
        let mut elapsed_ms = 0;

        loop {
            let mut batch = Batch::new();
            while let Some(step) = steps.next_if(|s| s.at_ms <= elapsed_ms) {
                self.apply(&step.action, &mut batch)?;
            }
            self.producer.deliver(batch)?;

            let input = self.take_input();
            let report = self.controller.tick(&input);
            summary.ticks += 1;
            summary.placements += report.placements.len();
            summary.errors += report.errors.len();
            if report.idle_expired {
                summary.menu_requests += 1;
            }
            if report.layer_switched {
                tracing::info!(t_ms = elapsed_ms, layer = %self.controller.catalog().layer(), "Layer active");
            }

            for command in self.sink.take_commands() {
                serde_json::to_writer(
                    &mut *out,
                    &Line {
                        t_ms: elapsed_ms,
                        command: &command,
                    },
                )?;
                writeln!(out)?;
            }

            if elapsed_ms >= end_ms {
                break;
            }
            elapsed_ms += tick_ms;
            self.clock.advance(self.tick);
        }

        Ok(summary)
    }

    fn apply(&mut self, action: &Action, batch: &mut Batch) -> anyhow::Result<()> {
        let now = self.clock.now();
        match action {
            Action::Layer { layer } => {
                let catalog = self
                    .source
                    .load(layer)
                    .with_context(|| format!("loading layer '{layer}'"))?;
                self.controller.set_catalog(catalog);
            }
            Action::ImageAdded { identity, pose } => batch.push((
                AnchorEventKind::ImageAdded(ImageObservation::tracking(identity.clone(), *pose)),
                now,
            )),
            Action::ImageUpdated {
                identity,
                pose,
                tracking_state,
            } => batch.push((
                AnchorEventKind::ImageUpdated(ImageObservation {
                    identity: identity.clone(),
                    pose: *pose,
                    tracking_state: *tracking_state,
                }),
                now,
            )),
            Action::ImageRemoved { identity } => batch.push((
                AnchorEventKind::ImageRemoved {
                    identity: identity.clone(),
                },
                now,
            )),
            Action::Tap {
                position,
                hit,
                on_content,
            } => {
                let hits = hit
                    .map(|pose| vec![RaycastHit::new(pose, 1.0)])
                    .unwrap_or_default();
                self.planes.set_hits(hits);
                self.input.touch = Some(TouchSample {
                    position: *position,
                    phase: TouchPhase::Began,
                });
                self.input.touch_hits_content = *on_content;
            }
            Action::TouchEnd => {
                self.input.touch = self.input.touch.map(|t| t.with_phase(TouchPhase::Ended));
            }
            Action::Menu {
                enabled,
                items_available,
            } => {
                self.input.menu_enabled = *enabled;
                self.input.layer_items_available = *items_available;
            }
            Action::LayerPanel { open } => self.input.layer_panel_open = *open,
            Action::ReferenceImages { count } => self.images.set_reference_image_count(*count),
        }
        Ok(())
    }

    /// Input for this tick; advances the touch to its next phase.
    fn take_input(&mut self) -> TickInput {
        let input = self.input;
        self.input.touch = match input.touch {
            Some(touch) if touch.phase == TouchPhase::Began => {
                Some(touch.with_phase(TouchPhase::Stationary))
            }
            Some(touch) if touch.phase.is_held() => Some(touch),
            _ => {
                self.input.touch_hits_content = false;
                None
            }
        };
        input
    }
}

/// Distinct source images across every layer the source can load.
fn count_reference_images(source: &dyn CatalogSource) -> usize {
    let mut names = BTreeSet::new();
    for layer in source.layers() {
        match source.load(&layer) {
            Ok(catalog) => names.extend(catalog.triggers().filter_map(|t| t.source_image.clone())),
            Err(e) => tracing::warn!(layer = %layer, error = %e, "Skipping layer"),
        }
    }
    names.len()
}
