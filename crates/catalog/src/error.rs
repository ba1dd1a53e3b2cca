//! Error types for catalog loading.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::LayerId;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while loading or validating a layer catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read a layer definition file.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Layer definition is not valid JSON for the expected schema.
    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Layer definition parsed but breaks a structural rule.
    #[error("Invalid layer '{layer}': {message}")]
    Validation { layer: LayerId, message: String },

    /// The source has no definition for the requested layer.
    #[error("Unknown layer '{0}'")]
    UnknownLayer(LayerId),
}
