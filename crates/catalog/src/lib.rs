//! Trigger catalog for trellis.
//!
//! A catalog holds the placement definitions (POIs) and trigger objects
//! loaded for one layer. The lifecycle controller reads it every tick and
//! may flip the `is_active` flag of a trigger, nothing else.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │ types.rs   - ids, Poi, TriggerObject, DetectionMode   │
//! │ catalog.rs - Catalog and its layer-scoped queries     │
//! └───────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌───────────────────────────────────────────────────────┐
//! │ source.rs  - CatalogSource trait, JSON + in-memory    │
//! └───────────────────────────────────────────────────────┘
//! ```

mod catalog;
mod error;
mod source;
mod types;

pub use catalog::{Catalog, DEFAULT_ALL_PLACED_MESSAGE};
pub use error::{CatalogError, CatalogResult};
pub use source::{
    layer_file_name, CatalogSource, InMemoryCatalogSource, JsonCatalogSource, LayerDefinition,
    TriggerDefinition,
};
pub use types::{DetectionMode, LayerId, Poi, PoiId, TriggerId, TriggerObject};
