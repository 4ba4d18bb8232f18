use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::input::InputMode;
use crate::log::LogConfig;
use crate::overlay::OverlayMode;

/// Top-level configuration for Overglass.
///
/// Loaded from `~/.config/overglass/config.toml`. Missing sections
/// fall back to defaults thanks to `#[serde(default)]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target process to attach to.
    pub target: TargetConfig,
    /// Overlay window behaviour.
    pub overlay: OverlayConfig,
    /// Border highlight appearance.
    pub border: BorderConfig,
    /// Global keybindings.
    pub keybindings: Vec<Keybinding>,
    /// File logging.
    pub logging: LogConfig,
}

/// Which process/window the overlay attaches to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Process image name (e.g. "notepad.exe"). Empty = don't filter.
    pub process: String,
    /// Window title, exact or substring. Empty = don't filter.
    pub title: String,
    /// Background poll interval for target resolution, in milliseconds.
    pub poll_interval_ms: u64,
    /// Keep the overlay aligned with the target window as it moves.
    pub follow_window: bool,
    /// Exit when the target process disappears.
    pub exit_when_closed: bool,
}

/// Overlay window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Overlay opacity when visible (0.0–1.0).
    pub opacity: f32,
    /// Interaction mode at startup.
    pub initial_mode: OverlayMode,
    /// Input routing mode at startup.
    pub routing: InputMode,
    /// Show the overlay immediately on startup.
    pub show_on_startup: bool,
    /// Opacity fade duration in milliseconds.
    pub fade_ms: u64,
    /// Standalone width before a target is attached.
    pub width: i32,
    /// Standalone height before a target is attached.
    pub height: i32,
}

/// Border highlight settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    /// Border color as a hex string (e.g. "#00b4d8").
    pub color: String,
    /// Border thickness in pixels.
    pub width: i32,
    /// Cursor distance to an edge (pixels) that lights the border.
    pub edge_threshold: i32,
    /// Border fade duration in milliseconds.
    pub fade_ms: u64,
}

/// A user-configured keybinding that maps a key combination to an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keybinding {
    /// The action to trigger.
    pub action: Action,
    /// Key name (e.g. "B", "F1", "Space").
    pub key: String,
    /// Modifier keys (e.g. ["alt", "shift"]).
    pub modifiers: Vec<Modifier>,
}

/// Actions a hotkey can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Fade the overlay in or out.
    ToggleVisibility,
    /// Switch between interactive and click-through.
    ToggleMode,
    /// Shut the overlay down.
    Quit,
}

/// Keyboard modifier keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Alt,
    Shift,
    Ctrl,
    Win,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            overlay: OverlayConfig::default(),
            border: BorderConfig::default(),
            keybindings: default_keybindings(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            process: String::new(),
            title: String::new(),
            poll_interval_ms: 500,
            follow_window: true,
            exit_when_closed: false,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            opacity: 0.9,
            initial_mode: OverlayMode::ClickThrough,
            routing: InputMode::GameFocused,
            show_on_startup: true,
            fade_ms: 300,
            width: 800,
            height: 600,
        }
    }
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            color: "#00b4d8".into(),
            width: 2,
            edge_threshold: 10,
            fade_ms: 200,
        }
    }
}

/// Default keybindings: Alt+B visibility, Alt+I mode, Alt+Q quit.
fn default_keybindings() -> Vec<Keybinding> {
    vec![
        Keybinding {
            action: Action::ToggleVisibility,
            key: "B".into(),
            modifiers: vec![Modifier::Alt],
        },
        Keybinding {
            action: Action::ToggleMode,
            key: "I".into(),
            modifiers: vec![Modifier::Alt],
        },
        Keybinding {
            action: Action::Quit,
            key: "Q".into(),
            modifiers: vec![Modifier::Alt],
        },
    ]
}

/// Returns the config directory: `~/.config/overglass/`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".config").join("overglass"))
}

/// Returns the config file path: `~/.config/overglass/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Loads the configuration from disk, falling back to defaults.
///
/// If the file doesn't exist, returns defaults silently.
/// If the file exists but can't be parsed, logs a warning and returns
/// defaults.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };

    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) => return Config::default(),
    };

    match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: failed to parse {}: {e}", path.display());
            Config::default()
        }
    }
}

/// The commented config template written by `overglass init`.
pub fn template() -> String {
    r##"# Overglass configuration

[target]
# Process image name to attach to, e.g. "notepad.exe". Empty = any.
process = ""
# Window title to attach to, exact or substring. Empty = any.
title = ""
# How often the target is re-resolved, in milliseconds.
poll_interval_ms = 500
# Keep the overlay aligned with the target window as it moves.
follow_window = true
# Exit when the target process disappears.
exit_when_closed = false

[overlay]
# Opacity when visible (0.0-1.0).
opacity = 0.9
# Interaction mode at startup: "interactive" or "click-through".
initial_mode = "click-through"
# Input routing at startup: "normal", "passthrough", "blocked",
# "game-focused", or "overlay-focused".
routing = "game-focused"
show_on_startup = true
# Opacity fade duration in milliseconds.
fade_ms = 300
# Standalone size before a target is attached.
width = 800
height = 600

[border]
color = "#00b4d8"
width = 2
# Cursor distance to an edge (pixels) that lights the border.
edge_threshold = 10
fade_ms = 200

[[keybindings]]
action = "toggle_visibility"
key = "B"
modifiers = ["alt"]

[[keybindings]]
action = "toggle_mode"
key = "I"
modifiers = ["alt"]

[[keybindings]]
action = "quit"
key = "Q"
modifiers = ["alt"]

[logging]
enabled = false
level = "info"
max_file_mb = 10
"##
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.target.poll_interval_ms, 500);
        assert!((config.overlay.opacity - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.overlay.fade_ms, 300);
        assert_eq!(config.border.width, 2);
        assert_eq!(config.keybindings.len(), 3);
    }

    #[test]
    fn template_parses_to_defaults() {
        let parsed: Config = toml::from_str(&template()).expect("template must parse");
        let defaults = Config::default();
        assert_eq!(parsed.target.poll_interval_ms, defaults.target.poll_interval_ms);
        assert_eq!(parsed.overlay.initial_mode, defaults.overlay.initial_mode);
        assert_eq!(parsed.overlay.routing, defaults.overlay.routing);
        assert_eq!(parsed.border.color, defaults.border.color);
        assert_eq!(parsed.keybindings.len(), defaults.keybindings.len());
    }

    #[test]
    fn partial_config_fills_missing_sections() {
        let parsed: Config = toml::from_str(
            r#"
            [target]
            process = "game.exe"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.target.process, "game.exe");
        assert_eq!(parsed.target.poll_interval_ms, 500);
        assert!((parsed.overlay.opacity - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn mode_names_round_trip() {
        let parsed: Config = toml::from_str(
            r#"
            [overlay]
            initial_mode = "interactive"
            routing = "overlay-focused"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.overlay.initial_mode, OverlayMode::Interactive);
        assert_eq!(parsed.overlay.routing, InputMode::OverlayFocused);
    }
}
