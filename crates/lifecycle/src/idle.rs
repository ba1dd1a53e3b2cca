//! Idle overlay timer.
//!
//! While nothing is shown the scan overlay is visible. If it stays visible
//! for the whole idle timeout, the controller gives up on the layer and
//! opens the menu.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Where the overlay timer stands after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum IdlePhase {
    /// Overlay hidden, timer unset.
    Hidden,
    /// Overlay visible but no countdown is shown (menu unavailable).
    Scanning,
    /// Overlay visible and the countdown is running.
    CountingDown { remaining: Duration },
    /// Timeout reached. Stays here until the overlay hides or the layer reloads.
    Expired,
}

/// Result of one [`IdleOverlay::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleOutcome {
    pub phase: IdlePhase,
    /// Visibility differs from the previous update (or this is the first one).
    pub visibility_changed: bool,
    /// The timeout was reached on this update.
    pub fired: bool,
}

/// Scan overlay state machine.
#[derive(Debug)]
pub struct IdleOverlay {
    timeout: Duration,
    visible_since: Option<Instant>,
    expired: bool,
    last_visible: Option<bool>,
}

impl IdleOverlay {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            visible_since: None,
            expired: false,
            last_visible: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Feed this tick's visibility.
    ///
    /// The timer runs only while visibility is continuous. `countdown_enabled`
    /// gates the countdown and the expiry, not the timer itself.
    pub fn update(&mut self, visible: bool, countdown_enabled: bool, now: Instant) -> IdleOutcome {
        let visibility_changed = self.last_visible != Some(visible);
        self.last_visible = Some(visible);

        let mut outcome = IdleOutcome {
            phase: IdlePhase::Hidden,
            visibility_changed,
            fired: false,
        };

        if !visible {
            self.visible_since = None;
            self.expired = false;
            return outcome;
        }

        if self.expired {
            outcome.phase = IdlePhase::Expired;
            return outcome;
        }

        let since = *self.visible_since.get_or_insert(now);
        if !countdown_enabled {
            outcome.phase = IdlePhase::Scanning;
            return outcome;
        }

        let elapsed = now.saturating_duration_since(since);
        if elapsed >= self.timeout {
            self.expired = true;
            self.visible_since = None;
            outcome.phase = IdlePhase::Expired;
            outcome.fired = true;
        } else {
            outcome.phase = IdlePhase::CountingDown {
                remaining: self.timeout - elapsed,
            };
        }
        outcome
    }

    /// Clear the timer and the expiry latch, e.g. after a layer reload.
    pub fn reset(&mut self) {
        self.visible_since = None;
        self.expired = false;
    }

    pub fn is_running(&self) -> bool {
        self.visible_since.is_some()
    }
}
