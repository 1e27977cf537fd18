// SPDX-License-Identifier: GPL-3.0-only

//! Shared control state between the controller and the capture worker
//!
//! All flags live behind one mutex. The worker never reads them piecemeal:
//! it takes a single [`IterationFlags`] snapshot at the top of each loop
//! iteration, so a flag cannot flip between two checks inside one
//! iteration. Pausing is a condition-variable wait, not a spin.

use super::frame::Frame;
use super::recorder::RecordingStatus;
use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug, Default)]
struct ControlFlags {
    running: bool,
    paused: bool,
    mirror: bool,
    fps_calculating: bool,
    /// Bumped on every arm request so the worker restarts a fresh window
    /// even when the sampler is already armed
    fps_generation: u64,
    monitoring: bool,
    recording: RecordingStatus,
    measured_fps: Option<f32>,
    frame_size: Option<(u32, u32)>,
}

/// Most recently published frames, last-write-wins
///
/// Consumers see at most the latest frame; there is no queue and no
/// backpressure toward the worker.
#[derive(Debug, Default)]
struct Published {
    frame: Option<Arc<Frame>>,
    mask: Option<Arc<Frame>>,
    background: Option<Arc<Frame>>,
}

/// Consistent per-iteration view of the control flags
#[derive(Debug, Clone, Copy)]
pub struct IterationFlags {
    pub running: bool,
    pub mirror: bool,
    pub fps_calculating: bool,
    pub fps_generation: u64,
    pub monitoring: bool,
    pub recording: RecordingStatus,
    pub measured_fps: Option<f32>,
}

/// Coarse-locked state shared by the controller and the worker
#[derive(Debug, Default)]
pub struct SharedControls {
    state: Mutex<ControlFlags>,
    pause_cond: Condvar,
    published: Mutex<Published>,
}

impl SharedControls {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot every flag the worker needs for one iteration
    pub fn snapshot(&self) -> IterationFlags {
        let state = self.state.lock().unwrap();
        IterationFlags {
            running: state.running,
            mirror: state.mirror,
            fps_calculating: state.fps_calculating,
            fps_generation: state.fps_generation,
            monitoring: state.monitoring,
            recording: state.recording,
            measured_fps: state.measured_fps,
        }
    }

    /// Block while paused; returns once unpaused or no longer running
    pub fn wait_while_paused(&self) {
        let mut state = self.state.lock().unwrap();
        while state.paused && state.running {
            state = self.pause_cond.wait(state).unwrap();
        }
    }

    pub fn set_running(&self, running: bool) {
        let mut state = self.state.lock().unwrap();
        state.running = running;
        drop(state);
        // A paused worker must wake to observe the stop request
        self.pause_cond.notify_all();
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    pub fn set_paused(&self, paused: bool) {
        let mut state = self.state.lock().unwrap();
        state.paused = paused;
        drop(state);
        self.pause_cond.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    pub fn set_mirror(&self, mirror: bool) {
        self.state.lock().unwrap().mirror = mirror;
    }

    pub fn is_mirror(&self) -> bool {
        self.state.lock().unwrap().mirror
    }

    /// Arm the throughput sampler; always restarts a fresh window
    pub fn arm_fps_measurement(&self) {
        let mut state = self.state.lock().unwrap();
        state.fps_calculating = true;
        state.fps_generation += 1;
    }

    /// Disarm after a completed window
    pub fn disarm_fps_measurement(&self) {
        self.state.lock().unwrap().fps_calculating = false;
    }

    pub fn is_fps_calculating(&self) -> bool {
        self.state.lock().unwrap().fps_calculating
    }

    pub fn set_monitoring(&self, monitoring: bool) {
        self.state.lock().unwrap().monitoring = monitoring;
    }

    pub fn is_monitoring(&self) -> bool {
        self.state.lock().unwrap().monitoring
    }

    pub fn set_measured_fps(&self, fps: f32) {
        self.state.lock().unwrap().measured_fps = Some(fps);
    }

    pub fn measured_fps(&self) -> Option<f32> {
        self.state.lock().unwrap().measured_fps
    }

    pub fn set_frame_size(&self, width: u32, height: u32) {
        self.state.lock().unwrap().frame_size = Some((width, height));
    }

    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.state.lock().unwrap().frame_size
    }

    pub fn recording_status(&self) -> RecordingStatus {
        self.state.lock().unwrap().recording
    }

    /// Unconditionally store a new recording status (worker-side transitions)
    pub fn set_recording_status(&self, status: RecordingStatus) {
        self.state.lock().unwrap().recording = status;
    }

    /// Request a recording start; only honored from `Stopped`
    ///
    /// Returns true if the request moved the machine to `Starting`.
    pub fn request_recording_start(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.recording == RecordingStatus::Stopped {
            state.recording = RecordingStatus::Starting;
            true
        } else {
            false
        }
    }

    /// Request a recording stop; only honored from `Started`
    pub fn request_recording_stop(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.recording == RecordingStatus::Started {
            state.recording = RecordingStatus::Stopping;
            true
        } else {
            false
        }
    }

    /// Store the latest display frame; the previous one is dropped
    pub fn publish_frame(&self, frame: Arc<Frame>) {
        self.published.lock().unwrap().frame = Some(frame);
    }

    pub fn publish_mask(&self, mask: Arc<Frame>) {
        self.published.lock().unwrap().mask = Some(mask);
    }

    pub fn publish_background(&self, background: Arc<Frame>) {
        self.published.lock().unwrap().background = Some(background);
    }

    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.published.lock().unwrap().frame.clone()
    }

    pub fn latest_mask(&self) -> Option<Arc<Frame>> {
        self.published.lock().unwrap().mask.clone()
    }

    pub fn latest_background(&self) -> Option<Arc<Frame>> {
        self.published.lock().unwrap().background.clone()
    }
}
