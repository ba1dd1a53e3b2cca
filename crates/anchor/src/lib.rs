//! Anchor events and sensing capabilities for trellis.
//!
//! Platform sensors (image tracking, plane detection, raycasting) live
//! outside this workspace. This crate defines the shapes they report in and
//! the traits the lifecycle controller drives them through:
//!
//! - [`AnchorEvent`] - normalized image/plane notifications
//! - [`AnchorEventSender`] / [`AnchorEventQueue`] - many producers, one consumer
//! - [`ImageTracking`] / [`PlaneTracking`] - independently optional capabilities
//! - [`TouchSample`] - one sampled touch per tick
//! - [`fake`] - scriptable capabilities for tests and replays
//!
//! # Example
//!
//! ```ignore
//! use trellis_anchor::{event_queue, AnchorEventKind, ImageObservation};
//!
//! let (sender, mut queue) = event_queue();
//! std::thread::spawn(move || {
//!     sender.send(AnchorEventKind::ImageAdded(observation), Instant::now());
//! });
//! for event in queue.drain() { /* apply policy */ }
//! ```

mod capability;
mod event;
pub mod fake;
mod pose;
mod queue;
mod touch;

pub use capability::{ImageTracking, PlaneTracking, RaycastHit, Subscription};
pub use event::{
    AnchorEvent, AnchorEventKind, ImageIdentity, ImageObservation, PlacementSlotId, TrackingState,
};
pub use pose::Pose;
pub use queue::{event_queue, AnchorEventQueue, AnchorEventSender};
pub use touch::{TouchPhase, TouchSample};

pub use trellis_catalog::DetectionMode;
