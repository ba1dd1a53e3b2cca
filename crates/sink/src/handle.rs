//! Handles exchanged with the sink.

use serde::{Deserialize, Serialize};

use trellis_catalog::{PoiId, TriggerId};

/// Opaque reference to one content instance owned by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHandle(u64);

impl ContentHandle {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What to create: the trigger being visualized and the POI it instantiates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefinitionHandle {
    pub trigger: TriggerId,
    pub poi: PoiId,
}

impl DefinitionHandle {
    pub fn new(trigger: impl Into<TriggerId>, poi: impl Into<PoiId>) -> Self {
        Self {
            trigger: trigger.into(),
            poi: poi.into(),
        }
    }
}
