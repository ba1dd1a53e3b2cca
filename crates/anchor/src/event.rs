//! Normalized anchor events.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::pose::Pose;

/// Name of a reference image known to the image tracker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageIdentity(String);

impl ImageIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageIdentity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Key of one tap placement. Allocated from a monotonically increasing counter
/// and never reused, so two placements never share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementSlotId(u64);

impl PlacementSlotId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PlacementSlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// Tracking quality reported for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    /// Not tracked at all.
    #[default]
    None,
    /// Only the last known pose is available.
    Limited,
    /// Fully tracked this frame.
    Tracking,
}

/// An image sighting as reported by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageObservation {
    pub identity: ImageIdentity,
    #[serde(default)]
    pub pose: Pose,
    #[serde(default)]
    pub tracking_state: TrackingState,
}

impl ImageObservation {
    pub fn tracking(identity: impl Into<ImageIdentity>, pose: Pose) -> Self {
        Self {
            identity: identity.into(),
            pose,
            tracking_state: TrackingState::Tracking,
        }
    }

    pub fn with_state(mut self, tracking_state: TrackingState) -> Self {
        self.tracking_state = tracking_state;
        self
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking_state == TrackingState::Tracking
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnchorEventKind {
    ImageAdded(ImageObservation),
    ImageUpdated(ImageObservation),
    ImageRemoved { identity: ImageIdentity },
    /// A tap resolved to a raycast pose on a detected plane.
    PlaneTapped { pose: Pose },
}

impl AnchorEventKind {
    pub fn label(&self) -> &'static str {
        match self {
            AnchorEventKind::ImageAdded(_) => "image_added",
            AnchorEventKind::ImageUpdated(_) => "image_updated",
            AnchorEventKind::ImageRemoved { .. } => "image_removed",
            AnchorEventKind::PlaneTapped { .. } => "plane_tapped",
        }
    }

    /// Image identity the event refers to, if any.
    pub fn image_identity(&self) -> Option<&ImageIdentity> {
        match self {
            AnchorEventKind::ImageAdded(obs) | AnchorEventKind::ImageUpdated(obs) => {
                Some(&obs.identity)
            }
            AnchorEventKind::ImageRemoved { identity } => Some(identity),
            AnchorEventKind::PlaneTapped { .. } => None,
        }
    }
}

/// An anchor event stamped by the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorEvent {
    /// Monotonic sequence number across all producers.
    pub seq: u64,
    /// When the producer observed the change.
    pub timestamp: Instant,
    pub kind: AnchorEventKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_deserialize_minimal() {
        let json = r#"{"identity": "poster"}"#;
        let obs: ImageObservation = serde_json::from_str(json).unwrap();
        assert_eq!(obs.identity.as_str(), "poster");
        assert_eq!(obs.tracking_state, TrackingState::None);
        assert_eq!(obs.pose, Pose::IDENTITY);
    }

    #[test]
    fn test_slot_display() {
        assert_eq!(PlacementSlotId::new(7).to_string(), "slot-7");
    }

    #[test]
    fn test_identity_of_kinds() {
        let removed = AnchorEventKind::ImageRemoved {
            identity: "poster".into(),
        };
        assert_eq!(removed.image_identity().map(|i| i.as_str()), Some("poster"));

        let tap = AnchorEventKind::PlaneTapped { pose: Pose::IDENTITY };
        assert!(tap.image_identity().is_none());
        assert_eq!(tap.label(), "plane_tapped");
    }
}
