// SPDX-License-Identifier: GPL-3.0-only

//! Capture session configuration

use crate::constants::capture;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where frames come from: a live device or a recorded video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceSelector {
    /// Live camera by device index
    Camera(i32),
    /// Recorded video file
    File(PathBuf),
}

impl Default for SourceSelector {
    fn default() -> Self {
        SourceSelector::Camera(0)
    }
}

impl std::fmt::Display for SourceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceSelector::Camera(index) => write!(f, "camera {}", index),
            SourceSelector::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

/// Configuration for one capture session
///
/// Resolution and frame rate are requests only; the device negotiates the
/// actual values, which the session reads back after opening. Immutable
/// once the session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Frame source to open
    pub source: SourceSelector,
    /// Requested frame width
    #[serde(default = "default_width")]
    pub width: u32,
    /// Requested frame height
    #[serde(default = "default_height")]
    pub height: u32,
    /// Requested frame rate
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

fn default_width() -> u32 {
    capture::DEFAULT_WIDTH
}

fn default_height() -> u32 {
    capture::DEFAULT_HEIGHT
}

fn default_frame_rate() -> u32 {
    capture::DEFAULT_FRAME_RATE
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: SourceSelector::default(),
            width: capture::DEFAULT_WIDTH,
            height: capture::DEFAULT_HEIGHT,
            frame_rate: capture::DEFAULT_FRAME_RATE,
        }
    }
}

impl CaptureConfig {
    /// Create a configuration for a live camera with default format requests
    pub fn camera(index: i32) -> Self {
        Self {
            source: SourceSelector::Camera(index),
            ..Self::default()
        }
    }

    /// Create a configuration for a recorded video file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: SourceSelector::File(path.into()),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(std::io::Error::other)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let contents = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_requests_full_hd() {
        let config = CaptureConfig::default();
        assert_eq!(config.width, 1920);
        assert_eq!(config.height, 1080);
        assert_eq!(config.frame_rate, 30);
        assert_eq!(config.source, SourceSelector::Camera(0));
    }

    #[test]
    fn json_round_trip() {
        let config = CaptureConfig::file("/tmp/clip.avi");
        let json = serde_json::to_string(&config).unwrap();
        let back: CaptureConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn missing_format_fields_fall_back_to_defaults() {
        let json = r#"{"source":{"Camera":1}}"#;
        let config: CaptureConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.source, SourceSelector::Camera(1));
        assert_eq!(config.width, 1920);
        assert_eq!(config.frame_rate, 30);
    }
}
