// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources: live cameras and recorded video files
//!
//! The configured resolution and frame rate are requests only; devices
//! negotiate what they actually deliver, so the real values are read back
//! after opening. Live devices get bounded retries for transient open and
//! read failures plus a read timeout; file sources terminate on the first
//! failed read, which is their normal end of stream.

use super::convert::bgr_mat_to_frame;
use super::frame::Frame;
use crate::config::{CaptureConfig, SourceSelector};
use crate::constants::capture as tuning;
use crate::errors::CaptureError;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Ordered, possibly-infinite sequence of raw frames
pub trait FrameSource: Send {
    /// Negotiated frame dimensions
    fn dimensions(&self) -> (u32, u32);

    /// Negotiated frame rate, zero when the backend does not report one
    fn frame_rate(&self) -> f64;

    /// Pull the next frame; `Ok(None)` is end of stream, not an error
    fn read(&mut self) -> Result<Option<Frame>, CaptureError>;
}

/// Open the source described by a [`CaptureConfig`]
pub fn open_source(config: &CaptureConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    match &config.source {
        SourceSelector::Camera(index) => Ok(Box::new(CameraSource::open(*index, config)?)),
        SourceSelector::File(path) => Ok(Box::new(FileSource::open(path)?)),
    }
}

fn negotiated_dimensions(capture: &VideoCapture) -> Result<(u32, u32), CaptureError> {
    let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
    let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
    Ok((width, height))
}

/// Live camera device
pub struct CameraSource {
    capture: VideoCapture,
    width: u32,
    height: u32,
    frame_rate: f64,
}

impl CameraSource {
    /// Open a camera by device index, with bounded retries for transient
    /// failures
    pub fn open(index: i32, config: &CaptureConfig) -> Result<Self, CaptureError> {
        let mut last_error = String::from("device did not open");
        for attempt in 1..=tuning::OPEN_ATTEMPTS {
            match Self::try_open(index, config) {
                Ok(source) => return Ok(source),
                Err(err) => {
                    warn!(index, attempt, error = %err, "Camera open attempt failed");
                    last_error = err.to_string();
                    thread::sleep(Duration::from_millis(tuning::OPEN_RETRY_DELAY_MS));
                }
            }
        }
        Err(CaptureError::DeviceOpenFailed(format!(
            "device {} after {} attempts: {}",
            index,
            tuning::OPEN_ATTEMPTS,
            last_error
        )))
    }

    fn try_open(index: i32, config: &CaptureConfig) -> Result<Self, CaptureError> {
        let mut capture = VideoCapture::new(index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(CaptureError::DeviceOpenFailed(format!("device {}", index)));
        }

        // Requests are advisory; the device may negotiate something else
        capture.set(videoio::CAP_PROP_FPS, config.frame_rate as f64)?;
        capture.set(videoio::CAP_PROP_FRAME_WIDTH, config.width as f64)?;
        capture.set(videoio::CAP_PROP_FRAME_HEIGHT, config.height as f64)?;
        // Not every backend honors the timeout; a false return is fine
        let _ = capture.set(
            videoio::CAP_PROP_READ_TIMEOUT_MSEC,
            tuning::READ_TIMEOUT_MS as f64,
        );

        let (width, height) = negotiated_dimensions(&capture)?;
        let frame_rate = capture.get(videoio::CAP_PROP_FPS)?;
        info!(index, width, height, frame_rate, "Opened camera device");

        Ok(Self {
            capture,
            width,
            height,
            frame_rate,
        })
    }
}

impl FrameSource for CameraSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn read(&mut self) -> Result<Option<Frame>, CaptureError> {
        let mut mat = Mat::default();
        for attempt in 1..=tuning::READ_ATTEMPTS {
            let grabbed = self.capture.read(&mut mat)?;
            if grabbed && !mat.empty() {
                return Ok(Some(bgr_mat_to_frame(&mat)?));
            }
            debug!(attempt, "Camera read returned no frame");
        }
        // A live device that stops delivering frames is a stall, not a
        // clean end of stream
        Err(CaptureError::SourceStalled)
    }
}

/// Recorded video file
pub struct FileSource {
    capture: VideoCapture,
    width: u32,
    height: u32,
    frame_rate: f64,
}

impl FileSource {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| CaptureError::FileOpenFailed(format!("{:?}", path)))?;
        let capture = VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(CaptureError::FileOpenFailed(path.display().to_string()));
        }

        let (width, height) = negotiated_dimensions(&capture)?;
        let frame_rate = capture.get(videoio::CAP_PROP_FPS)?;
        info!(path = %path.display(), width, height, frame_rate, "Opened video file");

        Ok(Self {
            capture,
            width,
            height,
            frame_rate,
        })
    }
}

impl FrameSource for FileSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn read(&mut self) -> Result<Option<Frame>, CaptureError> {
        let mut mat = Mat::default();
        let grabbed = self.capture.read(&mut mat)?;
        if !grabbed || mat.empty() {
            // First failed read on a file is end of stream, never retried
            return Ok(None);
        }
        Ok(Some(bgr_mat_to_frame(&mat)?))
    }
}
