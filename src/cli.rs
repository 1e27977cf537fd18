// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for capture sessions
//!
//! The `run` command drives a full session headless: frames are pulled and
//! analysed on the worker thread while this thread waits for Ctrl-C, an
//! optional duration limit, or the end of the input file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;
use tracing::info;
use vigil::capture::{FrameSink, RecordingStatus};
use vigil::storage::VideoStorage;
use vigil::{CaptureConfig, CaptureSession, SourceSelector};

/// Sink that reports session events on the console
struct ConsoleSink {
    done: mpsc::Sender<()>,
}

impl FrameSink for ConsoleSink {
    fn fps_measured(&self, rate: f32, width: u32, height: u32) {
        println!("measured {:.2} fps at {}x{}", rate, width, height);
    }

    fn recording_status_changed(&self, status: RecordingStatus, path: Option<&Path>) {
        match path {
            Some(path) => println!("recording {} ({})", status, path.display()),
            None => println!("recording {}", status),
        }
    }

    fn session_ended(&self, _success: bool) {
        println!("session ended");
        let _ = self.done.send(());
    }
}

/// Options for the `run` command
pub struct RunOptions {
    pub config: CaptureConfig,
    pub mirror: bool,
    pub monitor: bool,
    pub measure_fps: bool,
    pub record: bool,
    pub duration: Option<u64>,
    pub output_dir: Option<PathBuf>,
}

/// Run one capture session until Ctrl-C, the duration limit, or end of
/// stream
pub fn run_session(options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    println!("opening {}", options.config.source);

    let (done_tx, done_rx) = mpsc::channel();
    let sink = Arc::new(ConsoleSink { done: done_tx });

    let storage = match &options.output_dir {
        Some(dir) => VideoStorage::new(dir)?,
        None => VideoStorage::default_location()?,
    };
    println!("recordings go to {}", storage.base_dir().display());

    let mut session = CaptureSession::open_with_storage(&options.config, sink, storage)?;
    if let Some((width, height)) = session.frame_size() {
        println!("negotiated {}x{}", width, height);
    }

    session.set_mirror(options.mirror);
    session.set_monitoring(options.monitor);
    if options.measure_fps {
        session.measure_fps();
    }
    if options.record {
        session.start_recording();
    }

    // Ctrl-C requests a cooperative stop; the worker finishes its cleanup
    {
        let (interrupt_tx, interrupt_rx) = mpsc::channel();
        ctrlc::set_handler(move || {
            let _ = interrupt_tx.send(());
        })?;

        let deadline = options.duration.map(Duration::from_secs);
        wait_for_end(&done_rx, &interrupt_rx, deadline);
    }

    info!("Shutting down session");
    session.stop_and_join();
    Ok(())
}

fn wait_for_end(
    done: &mpsc::Receiver<()>,
    interrupt: &mpsc::Receiver<()>,
    deadline: Option<Duration>,
) {
    let started = std::time::Instant::now();
    loop {
        if done.try_recv().is_ok() || interrupt.try_recv().is_ok() {
            return;
        }
        if let Some(limit) = deadline
            && started.elapsed() >= limit
        {
            println!("duration limit reached");
            return;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Print the storage directory used for recordings
pub fn show_storage_dir() -> Result<(), Box<dyn std::error::Error>> {
    let storage = VideoStorage::default_location()?;
    println!("{}", storage.base_dir().display());
    Ok(())
}

/// Build the capture configuration for the `run` command flags
pub fn build_config(
    device: Option<i32>,
    file: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<CaptureConfig, Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => CaptureConfig::load(&path)?,
        None => CaptureConfig::default(),
    };
    if let Some(path) = file {
        config.source = SourceSelector::File(path);
    } else if let Some(index) = device {
        config.source = SourceSelector::Camera(index);
    }
    Ok(config)
}
