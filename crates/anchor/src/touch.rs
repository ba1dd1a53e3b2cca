//! Touch input sampled once per tick.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchPhase {
    Began,
    Moved,
    Stationary,
    Ended,
    Canceled,
}

impl TouchPhase {
    /// True while the finger is still on the screen.
    pub fn is_held(&self) -> bool {
        matches!(self, TouchPhase::Began | TouchPhase::Moved | TouchPhase::Stationary)
    }
}

/// The first recognized touch of a tick, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchSample {
    pub position: [f32; 2],
    pub phase: TouchPhase,
}

impl TouchSample {
    pub fn began(x: f32, y: f32) -> Self {
        Self {
            position: [x, y],
            phase: TouchPhase::Began,
        }
    }

    pub fn with_phase(self, phase: TouchPhase) -> Self {
        Self { phase, ..self }
    }
}
