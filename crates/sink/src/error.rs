use thiserror::Error;

use crate::handle::ContentHandle;
use trellis_catalog::TriggerId;

/// Errors returned by an output sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Content for a trigger could not be created.
    #[error("failed to create content for '{trigger}': {reason}")]
    CreateFailed { trigger: TriggerId, reason: String },

    /// The handle was never created or is already destroyed.
    #[error("unknown content handle {0}")]
    UnknownHandle(ContentHandle),
}
