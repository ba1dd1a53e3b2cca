use std::path::PathBuf;

use thiserror::Error;
use trellis_anchor::ImageIdentity;
use trellis_catalog::TriggerId;
use trellis_sink::SinkError;

/// Failures while applying one event or one tap.
///
/// None of these abort a tick. The controller surfaces the message and
/// moves on to the next event.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A tracked image has no trigger object in the catalog.
    #[error("No trigger object is configured for image '{identity}'")]
    Configuration { identity: ImageIdentity },

    /// The trigger's POI reference does not resolve.
    #[error("Trigger '{trigger}' has no placement definition")]
    MissingPoi { trigger: TriggerId },

    /// The output sink refused a content command.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Errors while loading controller settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file.
    #[error("Failed to read settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid JSON for the expected schema.
    #[error("Failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
