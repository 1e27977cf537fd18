// SPDX-License-Identifier: GPL-3.0-only

//! Capture sessions: worker thread, control protocol and analysis pipeline
//!
//! A [`CaptureSession`] owns one worker thread running the capture loop and
//! exposes the narrow command surface the controller is allowed to use.
//! Everything else - the encoder, the background model, the source - is
//! owned exclusively by the worker and reached only through the flag
//! protocol.

mod controls;
mod convert;
mod fps;
mod frame;
mod motion;
mod recorder;
mod sink;
mod source;
mod worker;

pub use controls::{IterationFlags, SharedControls};
pub use fps::FpsSampler;
pub use frame::{Frame, PixelFormat, Region};
pub use motion::{
    MotionFilter, MotionFilterFactory, MotionUpdate, Mog2MotionFilter, mog2_filter_factory,
};
pub use recorder::{
    EncoderFactory, EncoderRequest, MjpgEncoder, Recorder, RecordingStatus, VideoEncoder,
    mjpg_encoder_factory,
};
pub use sink::{FrameSink, NullSink};
pub use source::{CameraSource, FileSource, FrameSource, open_source};

use crate::config::CaptureConfig;
use crate::errors::CaptureError;
use crate::storage::VideoStorage;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};
use worker::WorkerContext;

/// One live capture session and its worker thread
pub struct CaptureSession {
    controls: Arc<SharedControls>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureSession {
    /// Open the configured source and start capturing
    ///
    /// The source is opened on the calling thread, so an unopenable device
    /// or file is reported here and no worker is ever spawned. Recordings
    /// land in the default storage location.
    pub fn open(
        config: &CaptureConfig,
        sink: Arc<dyn FrameSink>,
    ) -> Result<Self, CaptureError> {
        let source = open_source(config)?;
        let storage = VideoStorage::default_location()?;
        Ok(Self::spawn(
            source,
            sink,
            storage,
            mjpg_encoder_factory(),
            mog2_filter_factory(),
        ))
    }

    /// Like [`CaptureSession::open`], recording into an explicit directory
    pub fn open_with_storage(
        config: &CaptureConfig,
        sink: Arc<dyn FrameSink>,
        storage: VideoStorage,
    ) -> Result<Self, CaptureError> {
        let source = open_source(config)?;
        Ok(Self::spawn(
            source,
            sink,
            storage,
            mjpg_encoder_factory(),
            mog2_filter_factory(),
        ))
    }

    /// Start a session over explicit collaborators
    ///
    /// This is the seam for alternate sources, encoders and motion
    /// backends; `open` wires up the production set.
    pub fn spawn(
        source: Box<dyn FrameSource>,
        sink: Arc<dyn FrameSink>,
        storage: VideoStorage,
        encoder_factory: EncoderFactory,
        motion_factory: MotionFilterFactory,
    ) -> Self {
        let controls = SharedControls::new();
        controls.set_running(true);

        let ctx = WorkerContext {
            source,
            sink,
            controls: Arc::clone(&controls),
            recorder: Recorder::new(storage, encoder_factory),
            motion_factory,
        };
        let worker = thread::Builder::new()
            .name("vigil-capture".into())
            .spawn(move || worker::run(ctx))
            .expect("failed to spawn capture worker");

        Self {
            controls,
            worker: Some(worker),
        }
    }

    /// Whether the worker is still looping
    pub fn is_running(&self) -> bool {
        self.controls.is_running()
    }

    /// Request a cooperative stop; observed at the next iteration boundary
    pub fn stop(&self) {
        debug!("Requesting session stop");
        self.controls.set_running(false);
    }

    /// Stop and wait for the worker to finish its cleanup
    pub fn stop_and_join(&mut self) {
        self.stop();
        self.join();
    }

    /// Wait for the worker without requesting a stop
    pub fn join(&mut self) {
        if let Some(worker) = self.worker.take()
            && let Err(err) = worker.join()
        {
            warn!("Capture worker panicked: {:?}", err);
        }
    }

    /// Suspend frame acquisition without ending the session
    pub fn pause(&self) {
        self.controls.set_paused(true);
    }

    /// Resume acquisition with the next live frame
    pub fn resume(&self) {
        self.controls.set_paused(false);
    }

    pub fn is_paused(&self) -> bool {
        self.controls.is_paused()
    }

    /// Toggle horizontal mirroring of captured frames
    pub fn set_mirror(&self, mirror: bool) {
        self.controls.set_mirror(mirror);
    }

    pub fn is_mirror(&self) -> bool {
        self.controls.is_mirror()
    }

    /// Toggle motion monitoring; enabling always starts a fresh background
    /// model
    pub fn set_monitoring(&self, monitoring: bool) {
        self.controls.set_monitoring(monitoring);
    }

    pub fn is_monitoring(&self) -> bool {
        self.controls.is_monitoring()
    }

    /// Arm a throughput measurement window; re-arming restarts the window
    pub fn measure_fps(&self) {
        self.controls.arm_fps_measurement();
    }

    pub fn is_measuring_fps(&self) -> bool {
        self.controls.is_fps_calculating()
    }

    /// Manually request a recording start; ignored unless stopped
    pub fn start_recording(&self) -> bool {
        self.controls.request_recording_start()
    }

    /// Manually request a recording stop; ignored unless started
    pub fn stop_recording(&self) -> bool {
        self.controls.request_recording_stop()
    }

    pub fn recording_status(&self) -> RecordingStatus {
        self.controls.recording_status()
    }

    /// Most recent throughput measurement, if any window has completed
    pub fn measured_fps(&self) -> Option<f32> {
        self.controls.measured_fps()
    }

    /// Negotiated frame dimensions
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.controls.frame_size()
    }

    /// Latest published display frame
    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.controls.latest_frame()
    }

    /// Latest published foreground mask
    pub fn latest_mask(&self) -> Option<Arc<Frame>> {
        self.controls.latest_mask()
    }

    /// Latest published background estimate
    pub fn latest_background(&self) -> Option<Arc<Frame>> {
        self.controls.latest_background()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.worker.is_some() {
            debug!("CaptureSession dropped; stopping worker");
            self.stop_and_join();
        }
    }
}
