//! Sink that records every command.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::handle::{ContentHandle, DefinitionHandle};
use crate::sink::OutputSink;
use trellis_anchor::Pose;
use trellis_catalog::{PoiId, TriggerId};

/// A captured sink call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SinkCommand {
    Create {
        handle: ContentHandle,
        trigger: TriggerId,
        poi: PoiId,
        pose: Pose,
    },
    SetActive {
        handle: ContentHandle,
        active: bool,
    },
    SetPose {
        handle: ContentHandle,
        pose: Pose,
    },
    Destroy {
        handle: ContentHandle,
    },
    InfoText {
        text: String,
    },
    Error {
        text: String,
    },
    ScanOverlay {
        visible: bool,
    },
    MenuOpen,
}

#[derive(Default)]
struct RecordingState {
    commands: Vec<SinkCommand>,
    next_handle: u64,
    /// Live content and its active flag.
    live: HashMap<ContentHandle, bool>,
    failing: HashSet<TriggerId>,
}

/// In-memory sink for tests and replays.
///
/// Tracks which handles are alive and active so tests can assert on the
/// visible result instead of the command sequence.
#[derive(Default)]
pub struct RecordingSink {
    state: Mutex<RecordingState>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every later `create` for `trigger` fail.
    pub fn fail_creates_for(&self, trigger: impl Into<TriggerId>) {
        self.lock().failing.insert(trigger.into());
    }

    /// Undo [`fail_creates_for`](Self::fail_creates_for).
    pub fn allow_creates_for(&self, trigger: impl Into<TriggerId>) {
        self.lock().failing.remove(&trigger.into());
    }

    pub fn commands(&self) -> Vec<SinkCommand> {
        self.lock().commands.clone()
    }

    /// Remove and return the commands captured so far.
    pub fn take_commands(&self) -> Vec<SinkCommand> {
        std::mem::take(&mut self.lock().commands)
    }

    pub fn info_texts(&self) -> Vec<String> {
        self.lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                SinkCommand::InfoText { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_info_text(&self) -> Option<String> {
        self.info_texts().pop()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                SinkCommand::Error { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn menu_requests(&self) -> usize {
        self.lock()
            .commands
            .iter()
            .filter(|c| matches!(c, SinkCommand::MenuOpen))
            .count()
    }

    /// Handles created for `trigger`, in creation order.
    pub fn created_for(&self, trigger: &str) -> Vec<ContentHandle> {
        self.lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                SinkCommand::Create { handle, trigger: t, .. } if t.as_str() == trigger => {
                    Some(*handle)
                }
                _ => None,
            })
            .collect()
    }

    /// Triggers in the order their content was created.
    pub fn creation_order(&self) -> Vec<String> {
        self.lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                SinkCommand::Create { trigger, .. } => Some(trigger.to_string()),
                _ => None,
            })
            .collect()
    }

    pub fn is_active(&self, handle: ContentHandle) -> bool {
        self.lock().live.get(&handle).copied().unwrap_or(false)
    }

    pub fn is_live(&self, handle: ContentHandle) -> bool {
        self.lock().live.contains_key(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    pub fn active_count(&self) -> usize {
        self.lock().live.values().filter(|active| **active).count()
    }

    /// Clear the command log. Live content is kept.
    pub fn clear(&self) {
        self.lock().commands.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().commands.is_empty()
    }
}

impl OutputSink for RecordingSink {
    fn create(&self, definition: &DefinitionHandle, pose: &Pose) -> Result<ContentHandle, SinkError> {
        let mut state = self.lock();
        if state.failing.contains(&definition.trigger) {
            return Err(SinkError::CreateFailed {
                trigger: definition.trigger.clone(),
                reason: "content unavailable".to_string(),
            });
        }

        let handle = ContentHandle::new(state.next_handle);
        state.next_handle += 1;
        state.live.insert(handle, false);
        state.commands.push(SinkCommand::Create {
            handle,
            trigger: definition.trigger.clone(),
            poi: definition.poi.clone(),
            pose: *pose,
        });
        Ok(handle)
    }

    fn set_active(&self, handle: ContentHandle, active: bool) -> Result<(), SinkError> {
        let mut state = self.lock();
        let entry = state
            .live
            .get_mut(&handle)
            .ok_or(SinkError::UnknownHandle(handle))?;
        *entry = active;
        state.commands.push(SinkCommand::SetActive { handle, active });
        Ok(())
    }

    fn set_pose(&self, handle: ContentHandle, pose: &Pose) -> Result<(), SinkError> {
        let mut state = self.lock();
        if !state.live.contains_key(&handle) {
            return Err(SinkError::UnknownHandle(handle));
        }
        state.commands.push(SinkCommand::SetPose { handle, pose: *pose });
        Ok(())
    }

    fn destroy(&self, handle: ContentHandle) -> Result<(), SinkError> {
        let mut state = self.lock();
        state
            .live
            .remove(&handle)
            .ok_or(SinkError::UnknownHandle(handle))?;
        state.commands.push(SinkCommand::Destroy { handle });
        Ok(())
    }

    fn set_info_text(&self, text: &str) {
        self.lock().commands.push(SinkCommand::InfoText {
            text: text.to_string(),
        });
    }

    fn show_error(&self, text: &str) {
        tracing::debug!(text, "Sink error message");
        self.lock().commands.push(SinkCommand::Error {
            text: text.to_string(),
        });
    }

    fn set_scan_overlay(&self, visible: bool) {
        self.lock()
            .commands
            .push(SinkCommand::ScanOverlay { visible });
    }

    fn request_menu_open(&self) {
        self.lock().commands.push(SinkCommand::MenuOpen);
    }
}
