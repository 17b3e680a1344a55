//! Display defaults: a small JSON file under the XDG config dir,
//! $XDG_CONFIG_HOME/pgtop/config.json (fallback ~/.config/pgtop/config.json).
//! Command-line flags override whatever is loaded here.

use pgtop_engine::FullCmd;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between refreshes.
    pub delay_secs: f64,
    /// Name of the initial sort order.
    pub order: String,
    pub show_idle: bool,
    pub full_cmd: FullCmd,
    /// Only show sessions of this user; empty means everyone.
    pub user: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            delay_secs: 2.0,
            order: "cpu".into(),
            show_idle: true,
            full_cmd: FullCmd::default(),
            user: String::new(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("pgtop")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pgtop")
    }
}

pub fn settings_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Missing file means defaults; a malformed one is reported and ignored.
pub fn load_settings() -> Settings {
    let path = settings_path();
    match fs::read_to_string(&path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring malformed settings");
            Settings::default()
        }),
        Err(_) => Settings::default(),
    }
}
