//! Visualizer registry for trellis.
//!
//! A [`Visualizer`] binds one trigger object to one spatial anchor and owns
//! the sink handle of the content created for it. The registry keeps two
//! maps that never share keys:
//!
//! - image visualizers keyed by [`ImageIdentity`](trellis_anchor::ImageIdentity)
//! - tap placements keyed by [`PlacementSlotId`](trellis_anchor::PlacementSlotId)

mod registry;
mod visualizer;

pub use registry::{RegistryCounts, VisualizerRegistry};
pub use visualizer::{AnchorBinding, Visualizer};
