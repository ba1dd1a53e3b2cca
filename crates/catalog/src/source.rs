//! Catalog sources: where layer definitions come from.
//!
//! Layer definitions are JSON documents:
//!
//! ```json
//! {
//!   "layer": "garden",
//!   "pois": [{ "id": "tree", "maximum_count": 1 }],
//!   "triggers": [{ "id": "oak", "poi": "tree" }]
//! }
//! ```
//!
//! A trigger without a `layer` field belongs to the document's layer.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{CatalogError, CatalogResult};
use crate::types::{LayerId, Poi, PoiId, TriggerId, TriggerObject};

/// Provider of layer-keyed catalogs.
pub trait CatalogSource: Send + Sync {
    /// Load the catalog for `layer`.
    fn load(&self, layer: &LayerId) -> CatalogResult<Catalog>;

    /// Layers this source can load, used to decide whether a layer menu has items.
    fn layers(&self) -> Vec<LayerId>;
}

/// Trigger entry of a layer definition document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerDefinition {
    pub id: TriggerId,
    #[serde(default)]
    pub layer: Option<LayerId>,
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

/// On-disk shape of one layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDefinition {
    pub layer: LayerId,
    #[serde(default)]
    pub pois: Vec<Poi>,
    #[serde(default)]
    pub triggers: Vec<TriggerDefinition>,
}

impl LayerDefinition {
    /// Validate and convert into a catalog.
    ///
    /// Duplicate POI or trigger ids are rejected. Triggers referencing an
    /// unknown POI are kept but never resolve, so they are never placed.
    pub fn into_catalog(self) -> CatalogResult<Catalog> {
        let mut poi_ids = HashSet::new();
        for poi in &self.pois {
            if !poi_ids.insert(poi.id.clone()) {
                return Err(CatalogError::Validation {
                    layer: self.layer.clone(),
                    message: format!("duplicate poi id '{}'", poi.id),
                });
            }
        }

        let mut trigger_ids = HashSet::new();
        for trigger in &self.triggers {
            if !trigger_ids.insert(trigger.id.clone()) {
                return Err(CatalogError::Validation {
                    layer: self.layer.clone(),
                    message: format!("duplicate trigger id '{}'", trigger.id),
                });
            }
            match &trigger.poi {
                Some(poi) if !poi_ids.contains(poi) => {
                    warn!(layer = %self.layer, trigger = %trigger.id, poi = %poi, "Trigger references unknown poi");
                }
                None => {
                    debug!(layer = %self.layer, trigger = %trigger.id, "Trigger has no poi");
                }
                _ => {}
            }
        }

        let layer = self.layer;
        let triggers: Vec<TriggerObject> = self
            .triggers
            .into_iter()
            .map(|t| TriggerObject {
                id: t.id,
                layer: t.layer.unwrap_or_else(|| layer.clone()),
                source_image: t.source_image,
                poi: t.poi,
                is_active: t.is_active,
            })
            .collect();

        Ok(Catalog::new(layer, self.pois, triggers))
    }
}

/// File name used for a layer inside a [`JsonCatalogSource`] directory.
///
/// Layer ids are often URLs, so anything outside `[A-Za-z0-9_-]` maps to `_`.
pub fn layer_file_name(layer: &LayerId) -> String {
    let stem: String = layer
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{stem}.json")
}

/// Loads `<dir>/<layer>.json` on demand.
pub struct JsonCatalogSource {
    dir: PathBuf,
}

impl JsonCatalogSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_definition(path: &Path) -> CatalogResult<LayerDefinition> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl CatalogSource for JsonCatalogSource {
    fn load(&self, layer: &LayerId) -> CatalogResult<Catalog> {
        let path = self.dir.join(layer_file_name(layer));
        if !path.exists() {
            return Err(CatalogError::UnknownLayer(layer.clone()));
        }

        let definition = Self::read_definition(&path)?;
        if &definition.layer != layer {
            return Err(CatalogError::Validation {
                layer: layer.clone(),
                message: format!(
                    "{} declares layer '{}'",
                    path.display(),
                    definition.layer
                ),
            });
        }

        let catalog = definition.into_catalog()?;
        info!(
            layer = %layer,
            triggers = catalog.len(),
            path = %path.display(),
            "Loaded layer catalog"
        );
        Ok(catalog)
    }

    fn layers(&self) -> Vec<LayerId> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.dir.display(), error = %e, "Failed to read catalog directory");
                return Vec::new();
            }
        };

        let mut layers: Vec<LayerId> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|p| match Self::read_definition(&p) {
                Ok(definition) => Some(definition.layer),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable layer definition");
                    None
                }
            })
            .collect();
        layers.sort();
        layers
    }
}

/// Holds prebuilt definitions in memory.
#[derive(Default)]
pub struct InMemoryCatalogSource {
    definitions: RwLock<HashMap<LayerId, LayerDefinition>>,
}

impl InMemoryCatalogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, definition: LayerDefinition) {
        self.definitions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(definition.layer.clone(), definition);
    }
}

impl CatalogSource for InMemoryCatalogSource {
    fn load(&self, layer: &LayerId) -> CatalogResult<Catalog> {
        let definition = self
            .definitions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(layer)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownLayer(layer.clone()))?;
        definition.into_catalog()
    }

    fn layers(&self) -> Vec<LayerId> {
        let mut layers: Vec<LayerId> = self
            .definitions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        layers.sort();
        layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const GARDEN: &str = r#"{
        "layer": "garden",
        "pois": [
            { "id": "tree", "maximum_count": 1 },
            { "id": "bench", "tracking_timeout_ms": 500, "keep_last_known_pose": true }
        ],
        "triggers": [
            { "id": "oak", "poi": "tree" },
            { "id": "sign", "source_image": "sign.png", "poi": "bench" },
            { "id": "ghost", "layer": "attic", "source_image": "ghost.png", "poi": "bench" }
        ]
    }"#;

    #[test]
    fn test_parse_layer_definition() {
        let definition: LayerDefinition = serde_json::from_str(GARDEN).unwrap();
        let catalog = definition.into_catalog().unwrap();

        assert_eq!(catalog.layer().as_str(), "garden");
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.layer_triggers().count(), 2);

        let ghost = catalog.get(&TriggerId::new("ghost")).unwrap();
        assert_eq!(ghost.layer.as_str(), "attic");

        let bench = catalog.poi(&PoiId::new("bench")).unwrap();
        assert!(bench.keep_last_known_pose);
        assert_eq!(bench.tracking_timeout_ms, 500);
    }

    #[test]
    fn test_duplicate_trigger_rejected() {
        let json = r#"{
            "layer": "l1",
            "triggers": [{ "id": "t" }, { "id": "t" }]
        }"#;
        let definition: LayerDefinition = serde_json::from_str(json).unwrap();
        let err = definition.into_catalog().unwrap_err();
        assert!(matches!(err, CatalogError::Validation { .. }));
        assert!(err.to_string().contains("duplicate trigger id"));
    }

    #[test]
    fn test_duplicate_poi_rejected() {
        let json = r#"{
            "layer": "l1",
            "pois": [{ "id": "p" }, { "id": "p" }]
        }"#;
        let definition: LayerDefinition = serde_json::from_str(json).unwrap();
        assert!(definition.into_catalog().is_err());
    }

    #[test]
    fn test_layer_file_name_sanitizes_urls() {
        let layer = LayerId::new("https://example.org/layers/garden?v=2");
        assert_eq!(
            layer_file_name(&layer),
            "https___example_org_layers_garden_v_2.json"
        );
    }

    #[test]
    fn test_json_source_loads_from_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("garden.json"), GARDEN).unwrap();

        let source = JsonCatalogSource::new(dir.path());
        let catalog = source.load(&LayerId::new("garden")).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(source.layers(), vec![LayerId::new("garden")]);
    }

    #[test]
    fn test_json_source_unknown_layer() {
        let dir = tempdir().unwrap();
        let source = JsonCatalogSource::new(dir.path());
        let err = source.load(&LayerId::new("missing")).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownLayer(_)));
    }

    #[test]
    fn test_json_source_parse_error_carries_path() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let source = JsonCatalogSource::new(dir.path());
        let err = source.load(&LayerId::new("broken")).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
        assert!(source.layers().is_empty());
    }

    #[test]
    fn test_json_source_rejects_mismatched_layer() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("other.json"), GARDEN).unwrap();

        let source = JsonCatalogSource::new(dir.path());
        let err = source.load(&LayerId::new("other")).unwrap_err();
        assert!(matches!(err, CatalogError::Validation { .. }));
    }

    #[test]
    fn test_in_memory_source() {
        let source = InMemoryCatalogSource::new();
        source.insert(serde_json::from_str(GARDEN).unwrap());

        assert!(source.load(&LayerId::new("garden")).is_ok());
        assert!(source.load(&LayerId::new("attic")).is_err());
        assert_eq!(source.layers().len(), 1);
    }
}
