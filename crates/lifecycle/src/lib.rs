//! Trigger/visualizer lifecycle controller for trellis.
//!
//! The controller is ticked once per frame. Each tick runs, in order:
//!
//! 1. layer reconciliation (tear down placements, apply the image teardown policy)
//! 2. capability driving (image/plane tracking on or off for the catalog)
//! 3. event draining (image add/update/remove, queued plane taps)
//! 4. touch handling (raycast, round-robin placement)
//! 5. prompt update
//! 6. timeout sweep
//! 7. idle overlay
//!
//! Nothing inside a tick fails the tick. Per-event errors are surfaced
//! through [`OutputSink::show_error`](trellis_sink::OutputSink::show_error)
//! and listed in the [`TickReport`].
//!
//! # Example
//!
//! ```ignore
//! let mut controller = LifecycleController::new(settings, catalog, sink)
//!     .with_image_tracking(images)
//!     .with_plane_tracking(planes);
//!
//! loop {
//!     let report = controller.tick(&TickInput::default().with_menu());
//!     for error in &report.errors { /* already shown to the user */ }
//! }
//! ```

mod clock;
mod controller;
mod error;
mod idle;
mod images;
mod placement;
mod settings;
mod tick;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::LifecycleController;
pub use error::{LifecycleError, SettingsError};
pub use idle::{IdleOutcome, IdleOverlay, IdlePhase};
pub use settings::{ControllerSettings, ImageTeardown};
pub use tick::{TickInput, TickReport};
