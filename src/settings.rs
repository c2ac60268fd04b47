use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::layout::{DEFAULT_PADDING, DEFAULT_RESIZE_DELAY};
use crate::render::reorder::DEFAULT_ANIMATION;
use crate::state::dataset::{DEFAULT_MAX_OFFSET, DEFAULT_MIN_OFFSET};
use crate::state::palette::DEFAULT_PALETTE;
use crate::state::theme::Theme;

/// Environment variable naming an explicit settings file.
pub const SETTINGS_ENV: &str = "STARPLOT_SETTINGS";
/// Settings file looked up in the working directory.
pub const SETTINGS_FILE: &str = "starplot.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tunables read at startup. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub min_offset: f64,
    pub max_offset: f64,
    pub axis_padding: f64,
    pub resize_delay_ms: u64,
    pub animation_ms: u64,
    /// Pointer distance in pixels for grabbing axes and hovering points.
    pub hover_radius: f64,
    pub theme: Theme,
    /// RGBA colors assigned to classes in order.
    pub palette: Vec<[u8; 4]>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_offset: DEFAULT_MIN_OFFSET,
            max_offset: DEFAULT_MAX_OFFSET,
            axis_padding: DEFAULT_PADDING,
            resize_delay_ms: DEFAULT_RESIZE_DELAY.as_millis() as u64,
            animation_ms: DEFAULT_ANIMATION.as_millis() as u64,
            hover_radius: 5.0,
            theme: Theme::default(),
            palette: DEFAULT_PALETTE.to_vec(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Path from `STARPLOT_SETTINGS`, else `starplot.json` if it exists.
    pub fn locate() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(SETTINGS_ENV) {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(SETTINGS_FILE);
        local.exists().then_some(local)
    }

    /// Load from the located file, falling back to defaults with a warning.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::locate() else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(settings) => {
                tracing::info!(path = %path.display(), "settings loaded");
                settings
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "using default settings");
                Self::default()
            }
        }
    }

    pub fn resize_delay(&self) -> Duration {
        Duration::from_millis(self.resize_delay_ms)
    }

    pub fn animation(&self) -> Duration {
        Duration::from_millis(self.animation_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.min_offset, 0.1);
        assert_eq!(s.axis_padding, 30.0);
        assert_eq!(s.resize_delay(), Duration::from_millis(150));
        assert_eq!(s.animation(), Duration::from_millis(600));
        assert_eq!(s.palette.len(), 8);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("starplot.json");
        std::fs::write(&path, r#"{ "animation_ms": 250, "theme": "Dark" }"#).unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.animation_ms, 250);
        assert_eq!(s.theme, Theme::Dark);
        assert_eq!(s.hover_radius, Settings::default().hover_radius);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(SettingsError::Json(_))));
        assert!(matches!(
            Settings::load(&dir.path().join("missing.json")),
            Err(SettingsError::Io(_))
        ));
    }
}
