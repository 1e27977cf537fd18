// SPDX-License-Identifier: GPL-3.0-only

//! Storage locations and session file naming
//!
//! Each recording session produces two artifacts under the base storage
//! directory: a cover snapshot and the video file, both named from the same
//! timestamp-derived session identifier.

use crate::errors::CaptureError;
use chrono::Local;
use std::path::PathBuf;
use tracing::debug;

use crate::constants::storage as layout;

/// Resolves output paths for recording sessions
#[derive(Debug, Clone)]
pub struct VideoStorage {
    base_dir: PathBuf,
}

impl VideoStorage {
    /// Use an explicit base directory, creating it if needed
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Use the default location under the user's videos directory
    pub fn default_location() -> Result<Self, CaptureError> {
        let videos = dirs::video_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Videos")))
            .ok_or_else(|| CaptureError::Storage("no videos directory available".into()))?;
        let base = videos.join(layout::APP_DIR);
        debug!(path = %base.display(), "Using default storage directory");
        Self::new(base)
    }

    /// The base storage directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Generate a collision-resistant session identifier from the local time
    pub fn new_session_name(&self) -> String {
        Local::now().format(layout::SESSION_NAME_FORMAT).to_string()
    }

    /// Fully-qualified path for a session artifact with the given extension
    pub fn session_file(&self, name: &str, extension: &str) -> PathBuf {
        self.base_dir.join(format!("{}.{}", name, extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vigil-storage-{}-{}", tag, std::process::id()))
    }

    #[test]
    fn creates_base_directory() {
        let dir = scratch_dir("create");
        let storage = VideoStorage::new(&dir).unwrap();
        assert!(storage.base_dir().is_dir());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn session_file_joins_name_and_extension() {
        let dir = scratch_dir("join");
        let storage = VideoStorage::new(&dir).unwrap();
        let path = storage.session_file("2026-01-01_12-00-00.000", "avi");
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "2026-01-01_12-00-00.000.avi"
        );
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn session_names_do_not_collide() {
        let dir = scratch_dir("names");
        let storage = VideoStorage::new(&dir).unwrap();
        let first = storage.new_session_name();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = storage.new_session_name();
        assert_ne!(first, second);
        std::fs::remove_dir_all(dir).unwrap();
    }
}
