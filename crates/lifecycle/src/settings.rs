//! Controller settings.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use trellis_catalog::DEFAULT_ALL_PLACED_MESSAGE;

use crate::error::SettingsError;

/// What happens to image content when the active layer changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageTeardown {
    /// Destroy the content and forget the binding.
    #[default]
    Destroy,
    /// Hide the content and keep the binding until an event rebinds it.
    Deactivate,
}

/// Tunables for [`LifecycleController`](crate::LifecycleController).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Seconds the scan overlay may stay visible before the menu is opened.
    pub idle_timeout_secs: u64,
    /// Shown when no plane target has capacity left and no POI overrides it.
    pub default_all_placed_message: String,
    /// Shown while plane placement is possible and nothing has been placed.
    pub tap_prompt: String,
    /// Countdown text; `{seconds}` is replaced with the whole seconds left.
    pub countdown_template: String,
    pub image_teardown: ImageTeardown,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 20,
            default_all_placed_message: DEFAULT_ALL_PLACED_MESSAGE.to_string(),
            tap_prompt: "Please tap on a plane.".to_string(),
            countdown_template: "Timeout in {seconds} seconds.".to_string(),
            image_teardown: ImageTeardown::Destroy,
        }
    }
}

impl ControllerSettings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Countdown text for `remaining`, rounded up to whole seconds.
    pub fn countdown_text(&self, remaining: Duration) -> String {
        let seconds = remaining.as_millis().div_ceil(1000);
        self.countdown_template
            .replace("{seconds}", &seconds.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = ControllerSettings::default();
        assert_eq!(settings.idle_timeout(), Duration::from_secs(20));
        assert_eq!(settings.default_all_placed_message, "All augments placed.");
        assert_eq!(settings.image_teardown, ImageTeardown::Destroy);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "idle_timeout_secs": 5, "image_teardown": "deactivate" }"#).unwrap();

        let settings = ControllerSettings::load(&path).unwrap();
        assert_eq!(settings.idle_timeout_secs, 5);
        assert_eq!(settings.image_teardown, ImageTeardown::Deactivate);
        assert_eq!(settings.tap_prompt, "Please tap on a plane.");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            ControllerSettings::load(&missing),
            Err(SettingsError::Io { .. })
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "idle_timeout_secs = 5").unwrap();
        assert!(matches!(
            ControllerSettings::load(&broken),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_countdown_rounds_up() {
        let settings = ControllerSettings::default();
        assert_eq!(
            settings.countdown_text(Duration::from_secs(20)),
            "Timeout in 20 seconds."
        );
        assert_eq!(
            settings.countdown_text(Duration::from_millis(19_001)),
            "Timeout in 20 seconds."
        );
        assert_eq!(
            settings.countdown_text(Duration::from_millis(400)),
            "Timeout in 1 seconds."
        );
    }
}
