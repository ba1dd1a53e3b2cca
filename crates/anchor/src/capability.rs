//! Sensing capability traits.
//!
//! Devices differ in what they can sense. The controller holds each
//! capability as an independent `Option<Arc<dyn _>>` and drives whatever is
//! present the same way.

use serde::{Deserialize, Serialize};

use crate::pose::Pose;
use crate::queue::AnchorEventSender;
use trellis_catalog::DetectionMode;

/// Reference image tracking.
pub trait ImageTracking: Send + Sync {
    /// Number of reference images registered with the tracker.
    fn reference_image_count(&self) -> usize;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);

    /// Start delivering image events into `sender`.
    ///
    /// Delivery stops when the returned subscription is dropped.
    fn subscribe(&self, sender: AnchorEventSender) -> Subscription;
}

/// Plane detection plus raycasting against detected planes.
pub trait PlaneTracking: Send + Sync {
    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);

    fn set_detection_mode(&self, mode: DetectionMode);

    /// Cast a ray from a screen position. Hits are ordered nearest first.
    fn raycast(&self, screen_position: [f32; 2]) -> Vec<RaycastHit>;
}

/// One raycast intersection with a detected plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaycastHit {
    pub pose: Pose,
    #[serde(default)]
    pub distance: f32,
}

impl RaycastHit {
    pub fn new(pose: Pose, distance: f32) -> Self {
        Self { pose, distance }
    }
}

/// Handle for an active event subscription.
///
/// Runs its release hook exactly once, either on [`Subscription::release`]
/// or on drop.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("armed", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_subscription_releases_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(subscription);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_releases_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_noop_subscription() {
        let subscription = Subscription::noop();
        assert!(format!("{subscription:?}").contains("false"));
    }
}
