//! Coordinator configuration
//!
//! Timeouts and backend corrections used by [`crate::DragService`]. Every field
//! has a default so an empty JSON object is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::drag_drop::native::DisplayServer;
use crate::error::Result;

/// Configuration for one drag coordinator instance
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DragServiceConfig {
    /// Ceiling for the blocking wait on native drag data
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Sleep between native iterations while waiting for drag data
    #[serde(default = "default_fetch_poll_interval_ms")]
    pub fetch_poll_interval_ms: u64,
    /// Promised files must outlive the drop: the receiving application may
    /// read them after asking the user what to do with the data.
    #[serde(default = "default_temp_cleanup_delay_ms")]
    pub temp_cleanup_delay_ms: u64,
    #[serde(default = "default_motion_repeat_interval_ms")]
    pub motion_repeat_interval_ms: u64,
    /// Base directory for `dnd_file*` directories (OS temp dir if unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    /// Backend corrections; derived from the display server when unset
    #[serde(default)]
    pub quirks: Option<BackendQuirks>,
}

fn default_fetch_timeout_ms() -> u64 {
    1000
}

fn default_fetch_poll_interval_ms() -> u64 {
    10
}

fn default_temp_cleanup_delay_ms() -> u64 {
    5 * 60 * 1000
}

fn default_motion_repeat_interval_ms() -> u64 {
    350
}

impl Default for DragServiceConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
            fetch_poll_interval_ms: default_fetch_poll_interval_ms(),
            temp_cleanup_delay_ms: default_temp_cleanup_delay_ms(),
            motion_repeat_interval_ms: default_motion_repeat_interval_ms(),
            temp_dir: None,
            quirks: None,
        }
    }
}

impl DragServiceConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn fetch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.fetch_poll_interval_ms)
    }

    pub fn temp_cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.temp_cleanup_delay_ms)
    }

    pub fn motion_repeat_interval(&self) -> Duration {
        Duration::from_millis(self.motion_repeat_interval_ms)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Configured quirks, or the defaults for `display` when none are set
    pub fn quirks_for(&self, display: DisplayServer) -> BackendQuirks {
        self.quirks
            .clone()
            .unwrap_or_else(|| BackendQuirks::for_display_server(display))
    }
}

/// Backend specific corrections layered over the portable coordinator
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendQuirks {
    /// The allowed-action set lists every action; modifier keys only show in
    /// the separately reported selected action.
    #[serde(default)]
    pub prefer_selected_action: bool,
    /// Replying "copy" latches the selected action so releasing the modifier
    /// never switches back; reply "move" instead.
    #[serde(default)]
    pub substitute_move_for_copy: bool,
    /// Motion must be answered from inside the motion signal itself.
    #[serde(default)]
    pub reply_immediately_on_motion: bool,
    /// The direct save protocol (`XdndDirectSave0`) is available.
    #[serde(default)]
    pub direct_save_supported: bool,
    /// Failed drags report `Error` even when there was simply no target;
    /// tab drags must then be treated as dropped on nothing.
    #[serde(default)]
    pub error_result_as_no_target_for_tab_drops: bool,
    /// The context's destination window is reported for foreign windows too,
    /// so external drops must be told apart through the window registry.
    #[serde(default)]
    pub dest_window_identifies_external: bool,
    /// The window a drag starts from must know its drag context.
    #[serde(default)]
    pub track_source_window: bool,
}

impl BackendQuirks {
    pub fn for_display_server(display: DisplayServer) -> Self {
        match display {
            DisplayServer::Wayland => Self {
                prefer_selected_action: true,
                substitute_move_for_copy: true,
                reply_immediately_on_motion: true,
                error_result_as_no_target_for_tab_drops: true,
                track_source_window: true,
                ..Self::default()
            },
            DisplayServer::X11 => Self {
                direct_save_supported: true,
                dest_window_identifies_external: true,
                ..Self::default()
            },
            DisplayServer::XWayland => Self {
                dest_window_identifies_external: true,
                track_source_window: true,
                ..Self::default()
            },
            DisplayServer::Unknown => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = DragServiceConfig::from_json("{}").unwrap();
        assert_eq!(config.fetch_timeout(), Duration::from_secs(1));
        assert_eq!(config.fetch_poll_interval(), Duration::from_millis(10));
        assert_eq!(config.temp_cleanup_delay(), Duration::from_secs(300));
        assert_eq!(config.motion_repeat_interval(), Duration::from_millis(350));
        assert!(config.quirks.is_none());
    }

    #[test]
    fn test_partial_json() {
        let config = DragServiceConfig::from_json(
            r#"{"fetch_timeout_ms": 250, "quirks": {"substitute_move_for_copy": true}}"#,
        )
        .unwrap();
        assert_eq!(config.fetch_timeout_ms, 250);
        let quirks = config.quirks_for(DisplayServer::X11);
        assert!(quirks.substitute_move_for_copy);
        assert!(!quirks.direct_save_supported);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(DragServiceConfig::from_json("{").is_err());
    }

    #[test]
    fn test_display_server_quirks() {
        let wayland = BackendQuirks::for_display_server(DisplayServer::Wayland);
        assert!(wayland.prefer_selected_action);
        assert!(wayland.reply_immediately_on_motion);
        assert!(!wayland.direct_save_supported);

        let x11 = BackendQuirks::for_display_server(DisplayServer::X11);
        assert!(x11.direct_save_supported);
        assert!(!x11.substitute_move_for_copy);

        let xwayland = BackendQuirks::for_display_server(DisplayServer::XWayland);
        assert!(!xwayland.direct_save_supported);
        assert!(xwayland.track_source_window);
        assert!(!x11.track_source_window);
    }
}
