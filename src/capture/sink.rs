// SPDX-License-Identifier: GPL-3.0-only

//! Outward notification surface of a capture session

use super::frame::Frame;
use super::recorder::RecordingStatus;
use std::path::Path;

/// Consumer of the worker's observable events
///
/// All methods are invoked from the worker thread and default to no-ops, so
/// implementations override only the events they care about. Frame
/// references are valid for the duration of the call; implementations must
/// copy any data they retain, since the underlying buffers are reused.
pub trait FrameSink: Send + Sync {
    /// A processed, display-ready frame was published
    fn frame_ready(&self, _frame: &Frame) {}

    /// A foreground mask was published (motion monitoring active)
    fn mask_ready(&self, _mask: &Frame) {}

    /// A background estimate was published (motion monitoring active)
    fn background_ready(&self, _image: &Frame) {}

    /// A throughput measurement window completed
    fn fps_measured(&self, _rate: f32, _width: u32, _height: u32) {}

    /// The recording state machine transitioned
    ///
    /// `path` carries the output video path once a session has one; it is
    /// `None` for `Starting` and for failed starts.
    fn recording_status_changed(&self, _status: RecordingStatus, _path: Option<&Path>) {}

    /// The capture loop finished and released its source
    fn session_ended(&self, _success: bool) {}
}

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {}
