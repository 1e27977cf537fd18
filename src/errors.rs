// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture pipeline

use std::fmt;

/// Errors raised while opening or reading a frame source
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// The camera device could not be opened
    DeviceOpenFailed(String),
    /// The video file could not be opened
    FileOpenFailed(String),
    /// A live source stopped delivering frames within the read timeout
    SourceStalled,
    /// Underlying OpenCV call failed
    Backend(String),
    /// Storage/filesystem errors
    Storage(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::DeviceOpenFailed(msg) => {
                write!(f, "Failed to open camera device: {}", msg)
            }
            CaptureError::FileOpenFailed(msg) => write!(f, "Failed to open video file: {}", msg),
            CaptureError::SourceStalled => write!(f, "Frame source stalled"),
            CaptureError::Backend(msg) => write!(f, "Capture backend error: {}", msg),
            CaptureError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Errors raised by the video recorder
#[derive(Debug, Clone)]
pub enum RecordingError {
    /// The video encoder could not be opened
    EncoderOpenFailed(String),
    /// Appending a frame to the open encoder failed
    WriteFailed(String),
    /// Writing the cover snapshot failed
    CoverImageFailed(String),
    /// Storage/filesystem errors
    Storage(String),
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::EncoderOpenFailed(msg) => {
                write!(f, "Failed to open video encoder: {}", msg)
            }
            RecordingError::WriteFailed(msg) => write!(f, "Failed to write frame: {}", msg),
            RecordingError::CoverImageFailed(msg) => {
                write!(f, "Failed to write cover image: {}", msg)
            }
            RecordingError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for RecordingError {}

/// Errors raised by the motion detector
#[derive(Debug, Clone)]
pub enum MotionError {
    /// The background model could not be created
    ModelUnavailable(String),
    /// Underlying OpenCV call failed
    Backend(String),
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionError::ModelUnavailable(msg) => {
                write!(f, "Background model unavailable: {}", msg)
            }
            MotionError::Backend(msg) => write!(f, "Motion backend error: {}", msg),
        }
    }
}

impl std::error::Error for MotionError {}

impl From<opencv::Error> for CaptureError {
    fn from(err: opencv::Error) -> Self {
        CaptureError::Backend(err.to_string())
    }
}

impl From<opencv::Error> for RecordingError {
    fn from(err: opencv::Error) -> Self {
        RecordingError::WriteFailed(err.to_string())
    }
}

impl From<opencv::Error> for MotionError {
    fn from(err: opencv::Error) -> Self {
        MotionError::Backend(err.to_string())
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for RecordingError {
    fn from(err: std::io::Error) -> Self {
        RecordingError::Storage(err.to_string())
    }
}
