// SPDX-License-Identifier: GPL-3.0-only

//! The capture worker loop
//!
//! One worker drives a whole capture session: it pulls frames from the
//! source, applies the per-iteration pipeline (mirror, motion analysis,
//! throughput sampling, recording, display conversion) and publishes the
//! result. Control flags are read once per iteration as a single snapshot;
//! pausing blocks on a condition variable instead of spinning.

use super::controls::SharedControls;
use super::fps::FpsSampler;
use super::frame::Frame;
use super::motion::{MotionFilter, MotionFilterFactory};
use super::recorder::{Recorder, RecordingStatus};
use super::sink::FrameSink;
use super::source::FrameSource;
use crate::constants::{fps as fps_tuning, recording as rec_tuning};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Everything a worker needs for one session
pub(super) struct WorkerContext {
    pub source: Box<dyn FrameSource>,
    pub sink: Arc<dyn FrameSink>,
    pub controls: Arc<SharedControls>,
    pub recorder: Recorder,
    pub motion_factory: MotionFilterFactory,
}

/// Rectangle color for the motion overlay (red)
const MOTION_OVERLAY_COLOR: [u8; 3] = [255, 0, 0];
const MOTION_OVERLAY_THICKNESS: u32 = 2;

/// Run one capture session to completion
pub(super) fn run(mut ctx: WorkerContext) {
    let (width, height) = ctx.source.dimensions();
    ctx.controls.set_frame_size(width, height);
    info!(width, height, source_fps = ctx.source.frame_rate(), "Capture loop started");

    let mut sampler = FpsSampler::new(fps_tuning::WINDOW_SIZE);
    let mut sampler_generation = 0u64;
    let mut motion_filter: Option<Box<dyn MotionFilter>> = None;
    let mut motion_active = false;
    let mut monitoring_seen = false;

    loop {
        // Pausing stops acquisition before the next frame is read; resume
        // continues with the next live frame, never a buffered one
        ctx.controls.wait_while_paused();

        let flags = ctx.controls.snapshot();
        if !flags.running {
            debug!("Stop requested");
            break;
        }

        let mut frame = match ctx.source.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("End of stream");
                break;
            }
            Err(err) => {
                error!(error = %err, "Frame acquisition failed");
                break;
            }
        };

        if flags.mirror {
            frame.mirror_horizontal();
        }

        // Motion monitoring: the model is created fresh on every off->on
        // toggle, so accumulated history never leaks across activations
        if flags.monitoring {
            monitoring_seen = true;
            if motion_filter.is_none() {
                match (ctx.motion_factory)() {
                    Ok(filter) => {
                        motion_active = false;
                        motion_filter = Some(filter);
                    }
                    Err(err) => {
                        warn!(error = %err, "Motion filter unavailable; disabling monitoring");
                        ctx.controls.set_monitoring(false);
                    }
                }
            }
            if let Some(filter) = motion_filter.as_mut() {
                match filter.process(&frame) {
                    Ok(update) => {
                        // Edge-triggered recording control: one frame of
                        // segmentation flicker starts or stops a recording
                        if update.active && !motion_active {
                            ctx.controls.request_recording_start();
                        } else if !update.active && motion_active {
                            ctx.controls.request_recording_stop();
                        }
                        motion_active = update.active;

                        if let Some(region) = update.largest_region {
                            frame.draw_rect(
                                region,
                                MOTION_OVERLAY_COLOR,
                                MOTION_OVERLAY_THICKNESS,
                            );
                        }

                        let mask = Arc::new(update.mask);
                        ctx.controls.publish_mask(Arc::clone(&mask));
                        ctx.sink.mask_ready(&mask);

                        let mut background = update.background;
                        background.swap_red_blue();
                        let background = Arc::new(background);
                        ctx.controls.publish_background(Arc::clone(&background));
                        ctx.sink.background_ready(&background);
                    }
                    Err(err) => {
                        warn!(error = %err, "Motion analysis failed for this frame");
                    }
                }
            }
        } else if motion_filter.is_some() {
            debug!("Monitoring disabled; discarding background model");
            motion_filter = None;
            motion_active = false;
        }

        if flags.fps_calculating {
            if flags.fps_generation != sampler_generation {
                // Re-armed mid-window: the partial count is discarded
                sampler.reset();
                sampler_generation = flags.fps_generation;
            }
            if let Some(rate) = sampler.tick(Instant::now()) {
                ctx.controls.set_measured_fps(rate);
                ctx.controls.disarm_fps_measurement();
                info!(rate, width, height, "Throughput measured");
                ctx.sink.fps_measured(rate, width, height);
            }
        }

        // Read the status fresh rather than from the snapshot: the motion
        // step above may have just requested a transition, and the recorder
        // must act on it this tick (the cover image comes from the frame
        // that triggered it)
        let status = ctx.controls.recording_status();
        let measured_fps = ctx.controls.measured_fps();
        drive_recorder(&mut ctx, status, measured_fps, &frame);

        // Convert to the display layout, then publish; the slot keeps the
        // latest frame alive for pull-style consumers while the sink gets a
        // borrowed reference it may copy
        frame.swap_red_blue();
        let frame = Arc::new(frame);
        ctx.controls.publish_frame(Arc::clone(&frame));
        ctx.sink.frame_ready(&frame);
    }

    shutdown(ctx, width, height, monitoring_seen);
}

/// Advance the recording state machine by one tick
fn drive_recorder(
    ctx: &mut WorkerContext,
    status: RecordingStatus,
    measured_fps: Option<f32>,
    frame: &Frame,
) {
    match status {
        RecordingStatus::Stopped => {}
        RecordingStatus::Starting => {
            ctx.sink.recording_status_changed(RecordingStatus::Starting, None);
            let rate = measured_fps
                .map(f64::from)
                .unwrap_or(rec_tuning::DEFAULT_FRAME_RATE);
            match ctx.recorder.start(frame, rate) {
                Ok(path) => {
                    ctx.controls.set_recording_status(RecordingStatus::Started);
                    ctx.sink
                        .recording_status_changed(RecordingStatus::Started, Some(&path));
                }
                Err(err) => {
                    // Recoverable: the machine returns to Stopped instead of
                    // keeping a dangling encoder around
                    error!(error = %err, "Failed to start recording");
                    ctx.controls.set_recording_status(RecordingStatus::Stopped);
                    ctx.sink.recording_status_changed(RecordingStatus::Stopped, None);
                }
            }
        }
        RecordingStatus::Started => {
            if let Err(err) = ctx.recorder.append(frame) {
                // Writes are never retried; close the session out
                error!(error = %err, "Failed to append frame; stopping recording");
                stop_recording(ctx);
            }
        }
        RecordingStatus::Stopping => stop_recording(ctx),
    }
}

/// Complete the `Stopping -> Stopped` transition
fn stop_recording(ctx: &mut WorkerContext) {
    ctx.sink.recording_status_changed(RecordingStatus::Stopping, None);
    let path = ctx.recorder.finish();
    ctx.controls.set_recording_status(RecordingStatus::Stopped);
    ctx.sink
        .recording_status_changed(RecordingStatus::Stopped, path.as_deref());
}

/// End-of-session protocol: close any open recording, publish blanks so the
/// consumer can clear stale visuals, release the source, signal completion
fn shutdown(mut ctx: WorkerContext, width: u32, height: u32, monitoring_seen: bool) {
    match ctx.controls.recording_status() {
        RecordingStatus::Stopped => {}
        RecordingStatus::Starting => {
            // Requested but never opened; nothing to close
            ctx.controls.set_recording_status(RecordingStatus::Stopped);
            ctx.sink.recording_status_changed(RecordingStatus::Stopped, None);
        }
        RecordingStatus::Started | RecordingStatus::Stopping => stop_recording(&mut ctx),
    }

    let blank = Arc::new(Frame::blank(width, height));
    ctx.controls.publish_frame(Arc::clone(&blank));
    ctx.sink.frame_ready(&blank);
    if monitoring_seen {
        ctx.controls.publish_mask(Arc::clone(&blank));
        ctx.sink.mask_ready(&blank);
        ctx.controls.publish_background(Arc::clone(&blank));
        ctx.sink.background_ready(&blank);
    }

    // Release the capture device before signaling completion
    drop(ctx.source);

    ctx.controls.set_running(false);
    info!("Capture loop finished");
    // Completion is always reported as success; the cause of termination is
    // only distinguished in the logs
    ctx.sink.session_ended(true);
}
