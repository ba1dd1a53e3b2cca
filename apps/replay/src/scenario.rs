//! Scenario files.
//!
//! ```json
//! {
//!   "layer": "garden",
//!   "steps": [
//!     { "at_ms": 0,   "action": "menu", "enabled": true, "items_available": true },
//!     { "at_ms": 100, "action": "image_added", "identity": "sign.png" },
//!     { "at_ms": 500, "action": "tap", "hit": { "position": [0, 0, -1] } },
//!     { "at_ms": 550, "action": "touch_end" }
//!   ]
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use trellis_anchor::{ImageIdentity, Pose, TrackingState};
use trellis_catalog::LayerId;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Layer loaded before the first tick.
    pub layer: LayerId,
    /// Reference images known to the tracker. Defaults to every source
    /// image declared by the catalog directory.
    #[serde(default)]
    pub reference_images: Option<usize>,
    /// Keep ticking this long after the last step.
    #[serde(default = "default_tail_ms")]
    pub tail_ms: u64,
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_tail_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Switch (or reload) the active layer.
    Layer { layer: LayerId },
    ImageAdded {
        identity: ImageIdentity,
        #[serde(default)]
        pose: Pose,
    },
    ImageUpdated {
        identity: ImageIdentity,
        #[serde(default)]
        pose: Pose,
        #[serde(default = "default_tracking")]
        tracking_state: TrackingState,
    },
    ImageRemoved { identity: ImageIdentity },
    /// Finger down. `hit` is where the raycast lands; absent means a miss.
    Tap {
        #[serde(default = "default_screen_center")]
        position: [f32; 2],
        #[serde(default)]
        hit: Option<Pose>,
        #[serde(default)]
        on_content: bool,
    },
    TouchEnd,
    Menu {
        enabled: bool,
        #[serde(default = "default_true")]
        items_available: bool,
    },
    LayerPanel { open: bool },
    /// Change the reference image library size.
    ReferenceImages { count: usize },
}

fn default_tracking() -> TrackingState {
    TrackingState::Tracking
}

fn default_screen_center() -> [f32; 2] {
    [0.5, 0.5]
}

fn default_true() -> bool {
    true
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let mut scenario: Scenario = serde_json::from_str(content)?;
        scenario.steps.sort_by_key(|s| s.at_ms);
        Ok(scenario)
    }

    /// Time of the last tick the replay runs.
    pub fn end_ms(&self) -> u64 {
        self.steps.last().map(|s| s.at_ms).unwrap_or(0) + self.tail_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_orders_steps() {
        let scenario = Scenario::parse(
            r#"{
                "layer": "garden",
                "steps": [
                    { "at_ms": 300, "action": "touch_end" },
                    { "at_ms": 100, "action": "tap", "hit": { "position": [1, 0, 0] } },
                    { "at_ms": 200, "action": "image_updated", "identity": "sign.png", "tracking_state": "limited" }
                ]
            }"#,
        )
        .unwrap();

        let times: Vec<_> = scenario.steps.iter().map(|s| s.at_ms).collect();
        assert_eq!(times, vec![100, 200, 300]);
        assert_eq!(scenario.end_ms(), 400);

        match &scenario.steps[0].action {
            Action::Tap { position, hit, on_content } => {
                assert_eq!(*position, [0.5, 0.5]);
                assert_eq!(hit.map(|p| p.position), Some([1.0, 0.0, 0.0]));
                assert!(!on_content);
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert!(matches!(
            scenario.steps[1].action,
            Action::ImageUpdated {
                tracking_state: TrackingState::Limited,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result = Scenario::parse(
            r#"{ "layer": "garden", "steps": [{ "at_ms": 0, "action": "shake" }] }"#,
        );
        assert!(result.is_err());
    }
}
