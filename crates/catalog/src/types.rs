//! Core types for placement definitions.

use serde::{Deserialize, Serialize};
use std::time::Duration;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a layer (usually the URL it was loaded from).
    LayerId
);

string_id!(
    /// Identifier of a placement definition.
    PoiId
);

string_id!(
    /// Identifier of a trigger object, unique within a catalog.
    TriggerId
);

/// Which plane orientations the plane sensor should detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    None,
    #[serde(alias = "horizontal_planes")]
    Horizontal,
    #[serde(alias = "vertical_planes")]
    Vertical,
    #[default]
    Both,
}

/// Placement definition shared by one or more trigger objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub id: PoiId,

    /// Cap on concurrently active instances sharing this id (0 = unlimited).
    #[serde(default)]
    pub maximum_count: u32,

    /// Milliseconds without an update before image content expires (<= 0 = never).
    #[serde(default)]
    pub tracking_timeout_ms: i64,

    #[serde(default)]
    pub requested_detection_mode: Option<DetectionMode>,

    /// Overrides the "all augments placed" text for the layer.
    #[serde(default)]
    pub all_augments_placed_message: Option<String>,

    /// Keep refreshing content while the image is only known by its last pose.
    #[serde(default)]
    pub keep_last_known_pose: bool,
}

impl Poi {
    pub fn new(id: impl Into<PoiId>) -> Self {
        Self {
            id: id.into(),
            maximum_count: 0,
            tracking_timeout_ms: 0,
            requested_detection_mode: None,
            all_augments_placed_message: None,
            keep_last_known_pose: false,
        }
    }

    pub fn with_maximum_count(mut self, maximum_count: u32) -> Self {
        self.maximum_count = maximum_count;
        self
    }

    pub fn with_tracking_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.tracking_timeout_ms = timeout_ms;
        self
    }

    pub fn with_detection_mode(mut self, mode: DetectionMode) -> Self {
        self.requested_detection_mode = Some(mode);
        self
    }

    pub fn with_all_placed_message(mut self, message: impl Into<String>) -> Self {
        self.all_augments_placed_message = Some(message.into());
        self
    }

    pub fn with_keep_last_known_pose(mut self, keep: bool) -> Self {
        self.keep_last_known_pose = keep;
        self
    }

    /// Maximum number of active instances, `None` when unlimited.
    pub fn capacity(&self) -> Option<usize> {
        (self.maximum_count > 0).then_some(self.maximum_count as usize)
    }

    /// Expiry window for image content, `None` when content never times out.
    pub fn tracking_timeout(&self) -> Option<Duration> {
        (self.tracking_timeout_ms > 0).then(|| Duration::from_millis(self.tracking_timeout_ms as u64))
    }
}

/// A rule binding a layer and an optional source image to a POI.
///
/// Trigger objects without a source image are plane targets and get placed
/// by tapping on a detected plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerObject {
    pub id: TriggerId,
    pub layer: LayerId,
    #[serde(default)]
    pub source_image: Option<String>,
    #[serde(default)]
    pub poi: Option<PoiId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl TriggerObject {
    /// Create a plane target.
    pub fn plane(id: impl Into<TriggerId>, layer: impl Into<LayerId>, poi: impl Into<PoiId>) -> Self {
        Self {
            id: id.into(),
            layer: layer.into(),
            source_image: None,
            poi: Some(poi.into()),
            is_active: true,
        }
    }

    /// Create an image trigger.
    pub fn image(
        id: impl Into<TriggerId>,
        layer: impl Into<LayerId>,
        source_image: impl Into<String>,
        poi: impl Into<PoiId>,
    ) -> Self {
        Self {
            id: id.into(),
            layer: layer.into(),
            source_image: Some(source_image.into()),
            poi: Some(poi.into()),
            is_active: true,
        }
    }

    pub fn is_plane_target(&self) -> bool {
        self.source_image.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_zero_is_unlimited() {
        assert_eq!(Poi::new("a").capacity(), None);
        assert_eq!(Poi::new("a").with_maximum_count(3).capacity(), Some(3));
    }

    #[test]
    fn test_non_positive_timeout_disables_expiry() {
        assert_eq!(Poi::new("a").with_tracking_timeout_ms(0).tracking_timeout(), None);
        assert_eq!(Poi::new("a").with_tracking_timeout_ms(-5).tracking_timeout(), None);
        assert_eq!(
            Poi::new("a").with_tracking_timeout_ms(500).tracking_timeout(),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_trigger_defaults_when_deserialized() {
        let json = r#"{"id": "t1", "layer": "l1"}"#;
        let trigger: TriggerObject = serde_json::from_str(json).unwrap();
        assert!(trigger.is_active);
        assert!(trigger.is_plane_target());
        assert_eq!(trigger.poi, None);
    }

    #[test]
    fn test_detection_mode_aliases() {
        let mode: DetectionMode = serde_json::from_str(r#""vertical_planes""#).unwrap();
        assert_eq!(mode, DetectionMode::Vertical);
    }
}
