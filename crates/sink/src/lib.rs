//! Output sink for trellis.
//!
//! The controller never allocates or draws content itself. It issues
//! commands to an [`OutputSink`]: create content for a definition, toggle
//! it, move it, destroy it, and a handful of UI signals (info text, error
//! text, scan overlay, menu request).
//!
//! [`RecordingSink`] captures every command and is what tests and the
//! replay tool use. [`NullSink`] discards everything.

mod error;
mod handle;
mod recording;
mod sink;

pub use error::SinkError;
pub use handle::{ContentHandle, DefinitionHandle};
pub use recording::{RecordingSink, SinkCommand};
pub use sink::{NullSink, OutputSink, OutputSinkRef};
