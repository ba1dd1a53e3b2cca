//! In-process capability implementations for tests and replays.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::capability::{ImageTracking, PlaneTracking, RaycastHit, Subscription};
use crate::event::{AnchorEventKind, ImageIdentity, ImageObservation, TrackingState};
use crate::pose::Pose;
use crate::queue::AnchorEventSender;
use trellis_catalog::DetectionMode;

#[derive(Default)]
struct ImageTrackingState {
    subscriber: Mutex<Option<AnchorEventSender>>,
    subscribes: AtomicUsize,
    releases: AtomicUsize,
}

/// Image tracker driven by explicit `emit_*` calls.
pub struct FakeImageTracking {
    reference_images: AtomicUsize,
    enabled: AtomicBool,
    state: Arc<ImageTrackingState>,
}

impl FakeImageTracking {
    pub fn new(reference_images: usize) -> Self {
        Self {
            reference_images: AtomicUsize::new(reference_images),
            enabled: AtomicBool::new(false),
            state: Arc::new(ImageTrackingState::default()),
        }
    }

    pub fn set_reference_image_count(&self, count: usize) {
        self.reference_images.store(count, Ordering::SeqCst);
    }

    pub fn is_subscribed(&self) -> bool {
        self.state
            .subscriber
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub fn subscribe_count(&self) -> usize {
        self.state.subscribes.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.state.releases.load(Ordering::SeqCst)
    }

    /// Deliver an event to the current subscriber. Returns false if nobody listens.
    pub fn emit(&self, kind: AnchorEventKind, timestamp: Instant) -> bool {
        let subscriber = self
            .state
            .subscriber
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match subscriber {
            Some(sender) => sender.send(kind, timestamp),
            None => false,
        }
    }

    pub fn emit_added(&self, identity: &str, pose: Pose, timestamp: Instant) -> bool {
        self.emit(
            AnchorEventKind::ImageAdded(ImageObservation::tracking(identity, pose)),
            timestamp,
        )
    }

    pub fn emit_updated(
        &self,
        identity: &str,
        pose: Pose,
        state: TrackingState,
        timestamp: Instant,
    ) -> bool {
        self.emit(
            AnchorEventKind::ImageUpdated(ImageObservation::tracking(identity, pose).with_state(state)),
            timestamp,
        )
    }

    pub fn emit_removed(&self, identity: &str, timestamp: Instant) -> bool {
        self.emit(
            AnchorEventKind::ImageRemoved {
                identity: ImageIdentity::new(identity),
            },
            timestamp,
        )
    }
}

impl ImageTracking for FakeImageTracking {
    fn reference_image_count(&self) -> usize {
        self.reference_images.load(Ordering::SeqCst)
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn subscribe(&self, sender: AnchorEventSender) -> Subscription {
        self.state.subscribes.fetch_add(1, Ordering::SeqCst);
        *self
            .state
            .subscriber
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(sender);

        let state = self.state.clone();
        Subscription::new(move || {
            state.releases.fetch_add(1, Ordering::SeqCst);
            *state.subscriber.lock().unwrap_or_else(|e| e.into_inner()) = None;
        })
    }
}

/// Plane tracker whose raycast answer is set by the test.
pub struct FakePlaneTracking {
    enabled: AtomicBool,
    mode: Mutex<Option<DetectionMode>>,
    hits: Mutex<Vec<RaycastHit>>,
    raycasts: AtomicUsize,
}

impl Default for FakePlaneTracking {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePlaneTracking {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            mode: Mutex::new(None),
            hits: Mutex::new(Vec::new()),
            raycasts: AtomicUsize::new(0),
        }
    }

    /// Every subsequent raycast returns `hits`.
    pub fn set_hits(&self, hits: Vec<RaycastHit>) {
        *self.hits.lock().unwrap_or_else(|e| e.into_inner()) = hits;
    }

    /// Every subsequent raycast hits a plane at `pose`.
    pub fn hit_at(&self, pose: Pose) {
        self.set_hits(vec![RaycastHit::new(pose, 1.0)]);
    }

    pub fn miss(&self) {
        self.set_hits(Vec::new());
    }

    pub fn detection_mode(&self) -> Option<DetectionMode> {
        *self.mode.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn raycast_count(&self) -> usize {
        self.raycasts.load(Ordering::SeqCst)
    }
}

impl PlaneTracking for FakePlaneTracking {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn set_detection_mode(&self, mode: DetectionMode) {
        *self.mode.lock().unwrap_or_else(|e| e.into_inner()) = Some(mode);
    }

    fn raycast(&self, _screen_position: [f32; 2]) -> Vec<RaycastHit> {
        self.raycasts.fetch_add(1, Ordering::SeqCst);
        self.hits.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
