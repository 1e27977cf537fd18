// SPDX-License-Identifier: GPL-3.0-only

//! Recording state machine and video encoding
//!
//! Recording advances strictly through
//! `Stopped → Starting → Started → Stopping → Stopped`. Entering `Starting`
//! creates the session artifacts (cover snapshot plus encoder); leaving
//! `Stopping` destroys them. At most one session exists at a time.
//!
//! An encoder that fails to open returns the machine to `Stopped` instead
//! of leaving a dangling writer behind.

use super::convert::frame_to_mat;
use super::frame::Frame;
use crate::constants::recording as tuning;
use crate::errors::RecordingError;
use crate::storage::VideoStorage;
use opencv::core;
use opencv::prelude::*;
use opencv::videoio::VideoWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Recording state, reported to observers on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingStatus {
    #[default]
    Stopped,
    Starting,
    Started,
    Stopping,
}

impl std::fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordingStatus::Stopped => write!(f, "stopped"),
            RecordingStatus::Starting => write!(f, "starting"),
            RecordingStatus::Started => write!(f, "started"),
            RecordingStatus::Stopping => write!(f, "stopping"),
        }
    }
}

/// Parameters for opening an encoder
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderRequest {
    pub path: PathBuf,
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
}

/// Sink for encoded video frames
pub trait VideoEncoder: Send {
    /// Append one frame to the open output
    fn append(&mut self, frame: &Frame) -> Result<(), RecordingError>;

    /// Flush and close the output
    fn finish(&mut self) -> Result<(), RecordingError>;
}

/// Factory opening an encoder for a new session
pub type EncoderFactory =
    Box<dyn FnMut(&EncoderRequest) -> Result<Box<dyn VideoEncoder>, RecordingError> + Send>;

/// The production [`EncoderFactory`], backed by [`MjpgEncoder`]
pub fn mjpg_encoder_factory() -> EncoderFactory {
    Box::new(|request| Ok(Box::new(MjpgEncoder::open(request)?) as Box<dyn VideoEncoder>))
}

/// Motion-JPEG encoder writing `.avi` containers
pub struct MjpgEncoder {
    writer: VideoWriter,
}

impl MjpgEncoder {
    pub fn open(request: &EncoderRequest) -> Result<Self, RecordingError> {
        let path_str = request
            .path
            .to_str()
            .ok_or_else(|| RecordingError::EncoderOpenFailed(format!("{:?}", request.path)))?;
        let fourcc = VideoWriter::fourcc('M', 'J', 'P', 'G')
            .map_err(|e| RecordingError::EncoderOpenFailed(e.to_string()))?;
        let writer = VideoWriter::new(
            path_str,
            fourcc,
            request.frame_rate,
            core::Size::new(request.width as i32, request.height as i32),
            true,
        )
        .map_err(|e| RecordingError::EncoderOpenFailed(e.to_string()))?;
        if !writer
            .is_opened()
            .map_err(|e| RecordingError::EncoderOpenFailed(e.to_string()))?
        {
            return Err(RecordingError::EncoderOpenFailed(format!(
                "writer rejected {}",
                request.path.display()
            )));
        }
        Ok(Self { writer })
    }
}

impl VideoEncoder for MjpgEncoder {
    fn append(&mut self, frame: &Frame) -> Result<(), RecordingError> {
        let mat = frame_to_mat(frame)?;
        self.writer.write(&mat)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RecordingError> {
        self.writer
            .release()
            .map_err(|e| RecordingError::WriteFailed(e.to_string()))
    }
}

/// One open recording: output paths plus the live encoder
struct RecordingSession {
    video_path: PathBuf,
    encoder: Box<dyn VideoEncoder>,
}

/// Owns encoder lifecycle and session artifacts for the capture worker
pub struct Recorder {
    storage: VideoStorage,
    open_encoder: EncoderFactory,
    session: Option<RecordingSession>,
}

impl Recorder {
    pub fn new(storage: VideoStorage, open_encoder: EncoderFactory) -> Self {
        Self {
            storage,
            open_encoder,
            session: None,
        }
    }

    /// Whether a session is currently open
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Begin a new session from the current frame
    ///
    /// Writes the cover snapshot, then opens the encoder at the frame's
    /// dimensions and the given rate. Returns the output video path. On
    /// failure no session is left behind.
    pub fn start(&mut self, frame: &Frame, frame_rate: f64) -> Result<PathBuf, RecordingError> {
        let name = self.storage.new_session_name();
        let cover_path = self.storage.session_file(&name, tuning::COVER_EXTENSION);
        let video_path = self.storage.session_file(&name, tuning::VIDEO_EXTENSION);

        write_cover_image(frame, &cover_path)?;
        debug!(path = %cover_path.display(), "Wrote cover snapshot");

        let request = EncoderRequest {
            path: video_path.clone(),
            frame_rate,
            width: frame.width,
            height: frame.height,
        };
        let encoder = (self.open_encoder)(&request)?;

        info!(path = %video_path.display(), frame_rate, "Recording started");
        self.session = Some(RecordingSession {
            video_path: video_path.clone(),
            encoder,
        });
        Ok(video_path)
    }

    /// Append the current frame to the open session
    pub fn append(&mut self, frame: &Frame) -> Result<(), RecordingError> {
        match self.session.as_mut() {
            Some(session) => session.encoder.append(frame),
            None => Err(RecordingError::WriteFailed("no open session".into())),
        }
    }

    /// Close the open session, returning its output path
    pub fn finish(&mut self) -> Option<PathBuf> {
        let mut session = self.session.take()?;
        if let Err(err) = session.encoder.finish() {
            debug!(error = %err, "Encoder close reported an error");
        }
        info!(path = %session.video_path.display(), "Recording stopped");
        Some(session.video_path)
    }
}

/// Encode the session's cover snapshot as JPEG
fn write_cover_image(frame: &Frame, path: &Path) -> Result<(), RecordingError> {
    let mut rgb = frame.clone();
    if rgb.format == super::frame::PixelFormat::Bgr {
        rgb.swap_red_blue();
    }
    let Some(buffer) = image::RgbImage::from_raw(rgb.width, rgb.height, rgb.data) else {
        return Err(RecordingError::CoverImageFailed(
            "frame buffer does not match its dimensions".into(),
        ));
    };
    buffer
        .save(path)
        .map_err(|e| RecordingError::CoverImageFailed(e.to_string()))
}
