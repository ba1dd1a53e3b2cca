//! The sink trait.

use std::sync::Arc;

use crate::error::SinkError;
use crate::handle::{ContentHandle, DefinitionHandle};
use trellis_anchor::Pose;

/// Receiver of controller commands.
///
/// Calls are synchronous. The controller never calls back into the sink
/// from inside one of these methods.
pub trait OutputSink: Send + Sync {
    /// Allocate content for `definition` at `pose`. New content starts inactive.
    fn create(&self, definition: &DefinitionHandle, pose: &Pose) -> Result<ContentHandle, SinkError>;

    fn set_active(&self, handle: ContentHandle, active: bool) -> Result<(), SinkError>;

    fn set_pose(&self, handle: ContentHandle, pose: &Pose) -> Result<(), SinkError>;

    fn destroy(&self, handle: ContentHandle) -> Result<(), SinkError>;

    /// Informational text line (tap prompt, countdown, "all placed").
    fn set_info_text(&self, text: &str);

    /// User-visible error message.
    fn show_error(&self, text: &str);

    /// Show or hide the fit-to-scan overlay.
    fn set_scan_overlay(&self, visible: bool);

    fn request_menu_open(&self);
}

/// Type alias for shared sink reference.
pub type OutputSinkRef = Arc<dyn OutputSink>;

/// Sink that accepts and discards everything.
///
/// Handles are still unique so callers can tell instances apart.
#[derive(Default)]
pub struct NullSink {
    next: std::sync::atomic::AtomicU64,
}

impl OutputSink for NullSink {
    fn create(&self, _definition: &DefinitionHandle, _pose: &Pose) -> Result<ContentHandle, SinkError> {
        let id = self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(ContentHandle::new(id))
    }

    fn set_active(&self, _handle: ContentHandle, _active: bool) -> Result<(), SinkError> {
        Ok(())
    }

    fn set_pose(&self, _handle: ContentHandle, _pose: &Pose) -> Result<(), SinkError> {
        Ok(())
    }

    fn destroy(&self, _handle: ContentHandle) -> Result<(), SinkError> {
        Ok(())
    }

    fn set_info_text(&self, _text: &str) {}

    fn show_error(&self, _text: &str) {}

    fn set_scan_overlay(&self, _visible: bool) {}

    fn request_menu_open(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sink_hands_out_distinct_handles() {
        let sink = NullSink::default();
        let definition = DefinitionHandle::new("t", "p");
        let a = sink.create(&definition, &Pose::IDENTITY).unwrap();
        let b = sink.create(&definition, &Pose::IDENTITY).unwrap();
        assert_ne!(a, b);
        assert!(sink.destroy(a).is_ok());
    }
}
