// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end capture session tests over scripted collaborators
//!
//! These drive the real worker loop with a scripted frame source, a
//! scripted motion filter and a counting encoder, so every observable
//! contract of the session (event ordering, state machine legality,
//! pause semantics, throughput reporting) is checked without a camera.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use vigil::capture::{
    CaptureSession, EncoderFactory, Frame, FrameSink, FrameSource, MotionFilter,
    MotionFilterFactory, MotionUpdate, PixelFormat, RecordingStatus, VideoEncoder,
};
use vigil::errors::{CaptureError, MotionError, RecordingError};
use vigil::storage::VideoStorage;

const WIDTH: u32 = 16;
const HEIGHT: u32 = 8;

fn test_frame(seq: u8) -> Frame {
    Frame::filled(WIDTH, HEIGHT, PixelFormat::Bgr, seq)
}

/// Source yielding a fixed number of frames, optionally paced and
/// optionally gated so a test can set session flags before frames flow
struct ScriptedSource {
    total: usize,
    yielded: Arc<AtomicUsize>,
    cadence: Option<Duration>,
    gate: Option<Arc<AtomicBool>>,
}

impl ScriptedSource {
    fn new(total: usize) -> Self {
        Self {
            total,
            yielded: Arc::new(AtomicUsize::new(0)),
            cadence: None,
            gate: None,
        }
    }

    fn paced(total: usize, cadence: Duration) -> Self {
        Self {
            cadence: Some(cadence),
            ..Self::new(total)
        }
    }

    /// The first read blocks until the returned gate is released
    fn gated(mut self) -> (Self, Arc<AtomicBool>) {
        let gate = Arc::new(AtomicBool::new(false));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.yielded)
    }
}

impl FrameSource for ScriptedSource {
    fn dimensions(&self) -> (u32, u32) {
        (WIDTH, HEIGHT)
    }

    fn frame_rate(&self) -> f64 {
        30.0
    }

    fn read(&mut self) -> Result<Option<Frame>, CaptureError> {
        if let Some(gate) = &self.gate {
            while !gate.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        if let Some(cadence) = self.cadence {
            std::thread::sleep(cadence);
        }
        let index = self.yielded.fetch_add(1, Ordering::SeqCst);
        if index >= self.total {
            return Ok(None);
        }
        Ok(Some(test_frame(index as u8)))
    }
}

/// Everything the sink observed, in order
#[derive(Debug, Clone, PartialEq)]
enum Event {
    Frame { blank: bool },
    Mask,
    Background,
    Fps(f32),
    Recording(RecordingStatus, Option<PathBuf>),
    Ended(bool),
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn recording_transitions(&self) -> Vec<RecordingStatus> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Recording(status, _) => Some(status),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl FrameSink for RecordingSink {
    fn frame_ready(&self, frame: &Frame) {
        self.push(Event::Frame {
            blank: frame.format == PixelFormat::Gray8,
        });
    }

    fn mask_ready(&self, _mask: &Frame) {
        self.push(Event::Mask);
    }

    fn background_ready(&self, _image: &Frame) {
        self.push(Event::Background);
    }

    fn fps_measured(&self, rate: f32, _width: u32, _height: u32) {
        self.push(Event::Fps(rate));
    }

    fn recording_status_changed(&self, status: RecordingStatus, path: Option<&Path>) {
        self.push(Event::Recording(status, path.map(Path::to_path_buf)));
    }

    fn session_ended(&self, success: bool) {
        self.push(Event::Ended(success));
    }
}

/// Motion filter scripted by frame index: active on listed frames
struct ScriptedMotion {
    active_frames: Vec<bool>,
    index: usize,
}

impl MotionFilter for ScriptedMotion {
    fn process(&mut self, frame: &Frame) -> Result<MotionUpdate, MotionError> {
        let active = self.active_frames.get(self.index).copied().unwrap_or(false);
        self.index += 1;
        Ok(MotionUpdate {
            active,
            largest_region: None,
            mask: Frame::filled(frame.width, frame.height, PixelFormat::Gray8, 0),
            background: Frame::filled(frame.width, frame.height, PixelFormat::Bgr, 0),
        })
    }
}

fn scripted_motion_factory(active_frames: Vec<bool>) -> MotionFilterFactory {
    let script = Mutex::new(Some(active_frames));
    Box::new(move || {
        let active_frames = script
            .lock()
            .unwrap()
            .take()
            .expect("motion filter created once per activation in these tests");
        Ok(Box::new(ScriptedMotion {
            active_frames,
            index: 0,
        }) as Box<dyn MotionFilter>)
    })
}

struct CountingEncoder {
    appended: Arc<AtomicUsize>,
}

impl VideoEncoder for CountingEncoder {
    fn append(&mut self, _frame: &Frame) -> Result<(), RecordingError> {
        self.appended.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RecordingError> {
        Ok(())
    }
}

fn counting_encoder_factory(appended: Arc<AtomicUsize>) -> EncoderFactory {
    Box::new(move |_request| {
        Ok(Box::new(CountingEncoder {
            appended: Arc::clone(&appended),
        }) as Box<dyn VideoEncoder>)
    })
}

fn scratch_storage(tag: &str) -> (VideoStorage, PathBuf) {
    let dir = std::env::temp_dir().join(format!(
        "vigil-session-{}-{}-{:?}",
        tag,
        std::process::id(),
        std::thread::current().id()
    ));
    (VideoStorage::new(&dir).unwrap(), dir)
}

fn idle_motion_factory() -> MotionFilterFactory {
    scripted_motion_factory(Vec::new())
}

fn wait_until_ended(sink: &RecordingSink, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if sink
            .events()
            .iter()
            .any(|event| matches!(event, Event::Ended(_)))
        {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("session did not end within {:?}", timeout);
}

#[test]
fn end_of_stream_publishes_one_blank_frame_and_one_completion() {
    let (storage, dir) = scratch_storage("eos");
    let sink = Arc::new(RecordingSink::default());
    let mut session = CaptureSession::spawn(
        Box::new(ScriptedSource::new(5)),
        Arc::clone(&sink) as Arc<dyn FrameSink>,
        storage,
        counting_encoder_factory(Arc::new(AtomicUsize::new(0))),
        idle_motion_factory(),
    );

    session.join();
    assert!(!session.is_running());

    let events = sink.events();
    let live_frames = events
        .iter()
        .filter(|event| matches!(event, Event::Frame { blank: false }))
        .count();
    let blank_frames = events
        .iter()
        .filter(|event| matches!(event, Event::Frame { blank: true }))
        .count();
    let completions = events
        .iter()
        .filter(|event| matches!(event, Event::Ended(_)))
        .count();

    assert_eq!(live_frames, 5);
    assert_eq!(blank_frames, 1, "exactly one blank frame after EOS");
    assert_eq!(completions, 1, "exactly one session_ended notification");
    assert_eq!(*events.last().unwrap(), Event::Ended(true));

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn frames_arrive_in_acquisition_order_before_the_blank() {
    let (storage, dir) = scratch_storage("order");
    let sink = Arc::new(RecordingSink::default());
    let mut session = CaptureSession::spawn(
        Box::new(ScriptedSource::new(10)),
        Arc::clone(&sink) as Arc<dyn FrameSink>,
        storage,
        counting_encoder_factory(Arc::new(AtomicUsize::new(0))),
        idle_motion_factory(),
    );
    session.join();

    let events = sink.events();
    let last_frame_position = events
        .iter()
        .rposition(|event| matches!(event, Event::Frame { blank: false }))
        .unwrap();
    let blank_position = events
        .iter()
        .position(|event| matches!(event, Event::Frame { blank: true }))
        .unwrap();
    assert!(blank_position > last_frame_position);

    std::fs::remove_dir_all(dir).unwrap();
}

// The motion edge trigger has no debounce: a single frame of segmentation
// flicker starts or stops a recording. Whether that sensitivity is
// intentional is an open question; this pins the literal behavior (every
// false->true edge starts, every true->false edge stops) rather than
// smoothing it over.
#[test]
fn motion_edges_start_and_stop_recording_exactly_once() {
    // Frames 0-4 idle, 5-9 active, 10+ idle: one contiguous motion run
    let mut script = vec![false; 5];
    script.extend(vec![true; 5]);
    script.extend(vec![false; 5]);

    let (storage, dir) = scratch_storage("motion");
    let appended = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(RecordingSink::default());
    let (source, gate) = ScriptedSource::new(15).gated();
    let session = CaptureSession::spawn(
        Box::new(source),
        Arc::clone(&sink) as Arc<dyn FrameSink>,
        storage,
        counting_encoder_factory(Arc::clone(&appended)),
        scripted_motion_factory(script),
    );
    // Monitoring must be on before the first frame flows, so the scripted
    // activity lines up with the frame indices
    session.set_monitoring(true);
    gate.store(true, Ordering::SeqCst);

    wait_until_ended(&sink, Duration::from_secs(5));
    drop(session);

    let transitions = sink.recording_transitions();
    assert_eq!(
        transitions,
        vec![
            RecordingStatus::Starting,
            RecordingStatus::Started,
            RecordingStatus::Stopping,
            RecordingStatus::Stopped,
        ],
        "one Starting and one Stopping for one contiguous motion run"
    );
    assert!(appended.load(Ordering::SeqCst) >= 1);

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn recording_status_never_skips_states() {
    let (storage, dir) = scratch_storage("legal");
    let sink = Arc::new(RecordingSink::default());
    let session = CaptureSession::spawn(
        Box::new(ScriptedSource::paced(50, Duration::from_millis(10))),
        Arc::clone(&sink) as Arc<dyn FrameSink>,
        storage,
        counting_encoder_factory(Arc::new(AtomicUsize::new(0))),
        idle_motion_factory(),
    );

    assert!(session.start_recording());
    std::thread::sleep(Duration::from_millis(150));
    assert!(session.stop_recording());
    wait_until_ended(&sink, Duration::from_secs(5));
    drop(session);

    let transitions = sink.recording_transitions();
    assert!(!transitions.is_empty());
    let mut previous = RecordingStatus::Stopped;
    for status in transitions {
        let legal = matches!(
            (previous, status),
            (RecordingStatus::Stopped, RecordingStatus::Starting)
                | (RecordingStatus::Starting, RecordingStatus::Started)
                | (RecordingStatus::Started, RecordingStatus::Stopping)
                | (RecordingStatus::Stopping, RecordingStatus::Stopped)
        );
        assert!(legal, "illegal transition {:?} -> {:?}", previous, status);
        previous = status;
    }

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn recording_in_progress_is_stopped_cleanly_at_end_of_stream() {
    let (storage, dir) = scratch_storage("eosrec");
    let appended = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(RecordingSink::default());
    let session = CaptureSession::spawn(
        Box::new(ScriptedSource::paced(20, Duration::from_millis(10))),
        Arc::clone(&sink) as Arc<dyn FrameSink>,
        storage,
        counting_encoder_factory(Arc::clone(&appended)),
        idle_motion_factory(),
    );

    assert!(session.start_recording());
    wait_until_ended(&sink, Duration::from_secs(5));
    drop(session);

    let transitions = sink.recording_transitions();
    assert_eq!(
        transitions.last(),
        Some(&RecordingStatus::Stopped),
        "recording must be forced through Stopping to Stopped at EOS"
    );
    let events = sink.events();
    let stopped_position = events
        .iter()
        .position(|event| matches!(event, Event::Recording(RecordingStatus::Stopped, _)))
        .unwrap();
    let ended_position = events
        .iter()
        .position(|event| matches!(event, Event::Ended(_)))
        .unwrap();
    assert!(stopped_position < ended_position);

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn encoder_open_failure_returns_recorder_to_stopped() {
    let (storage, dir) = scratch_storage("encfail");
    let sink = Arc::new(RecordingSink::default());
    let failing_factory: EncoderFactory =
        Box::new(|_request| Err(RecordingError::EncoderOpenFailed("no codec".into())));
    let session = CaptureSession::spawn(
        Box::new(ScriptedSource::paced(30, Duration::from_millis(10))),
        Arc::clone(&sink) as Arc<dyn FrameSink>,
        storage,
        failing_factory,
        idle_motion_factory(),
    );

    assert!(session.start_recording());
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(session.recording_status(), RecordingStatus::Stopped);
    wait_until_ended(&sink, Duration::from_secs(5));
    drop(session);

    let transitions = sink.recording_transitions();
    assert_eq!(
        transitions,
        vec![RecordingStatus::Starting, RecordingStatus::Stopped],
        "failed start must fall back to Stopped without reaching Started"
    );

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn fps_window_reports_the_source_cadence() {
    let (storage, dir) = scratch_storage("fps");
    let sink = Arc::new(RecordingSink::default());
    // 100ms cadence over the 30-frame window: expect ~10 fps
    let (source, gate) = ScriptedSource::paced(35, Duration::from_millis(100)).gated();
    let session = CaptureSession::spawn(
        Box::new(source),
        Arc::clone(&sink) as Arc<dyn FrameSink>,
        storage,
        counting_encoder_factory(Arc::new(AtomicUsize::new(0))),
        idle_motion_factory(),
    );

    session.measure_fps();
    gate.store(true, Ordering::SeqCst);
    wait_until_ended(&sink, Duration::from_secs(15));
    drop(session);

    let rates: Vec<f32> = sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            Event::Fps(rate) => Some(rate),
            _ => None,
        })
        .collect();
    assert_eq!(rates.len(), 1, "one armed window reports exactly once");
    assert!(
        (rates[0] - 10.0).abs() < 1.5,
        "expected ~10 fps, got {}",
        rates[0]
    );

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn pause_stops_acquisition_and_resume_continues_with_the_next_frame() {
    let (storage, dir) = scratch_storage("pause");
    let source = ScriptedSource::paced(1000, Duration::from_millis(5));
    let reads = source.read_counter();
    let sink = Arc::new(RecordingSink::default());
    let mut session = CaptureSession::spawn(
        Box::new(source),
        Arc::clone(&sink) as Arc<dyn FrameSink>,
        storage,
        counting_encoder_factory(Arc::new(AtomicUsize::new(0))),
        idle_motion_factory(),
    );

    std::thread::sleep(Duration::from_millis(100));
    session.pause();
    // Allow an in-flight read to complete; afterwards the count must hold
    std::thread::sleep(Duration::from_millis(50));
    let paused_at = reads.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(200));
    let still_paused_at = reads.load(Ordering::SeqCst);
    assert_eq!(
        paused_at, still_paused_at,
        "no frames may be read while paused"
    );

    session.resume();
    std::thread::sleep(Duration::from_millis(100));
    let resumed_at = reads.load(Ordering::SeqCst);
    assert!(
        resumed_at > still_paused_at,
        "acquisition must continue after resume"
    );

    session.stop_and_join();

    // The frame stream is contiguous: published live frames match the
    // number of source reads that yielded a frame (nothing replayed or
    // dropped around the pause)
    let live_frames = sink
        .events()
        .iter()
        .filter(|event| matches!(event, Event::Frame { blank: false }))
        .count();
    assert_eq!(live_frames, reads.load(Ordering::SeqCst));

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn stop_request_ends_a_paused_session() {
    let (storage, dir) = scratch_storage("pausestop");
    let sink = Arc::new(RecordingSink::default());
    let mut session = CaptureSession::spawn(
        Box::new(ScriptedSource::paced(1000, Duration::from_millis(5))),
        Arc::clone(&sink) as Arc<dyn FrameSink>,
        storage,
        counting_encoder_factory(Arc::new(AtomicUsize::new(0))),
        idle_motion_factory(),
    );

    std::thread::sleep(Duration::from_millis(50));
    session.pause();
    std::thread::sleep(Duration::from_millis(50));
    session.stop_and_join();

    assert!(!session.is_running());
    assert_eq!(*sink.events().last().unwrap(), Event::Ended(true));

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn monitoring_publishes_masks_and_backgrounds() {
    let (storage, dir) = scratch_storage("monitor");
    let sink = Arc::new(RecordingSink::default());
    let (source, gate) = ScriptedSource::paced(30, Duration::from_millis(10)).gated();
    let session = CaptureSession::spawn(
        Box::new(source),
        Arc::clone(&sink) as Arc<dyn FrameSink>,
        storage,
        counting_encoder_factory(Arc::new(AtomicUsize::new(0))),
        scripted_motion_factory(vec![false; 40]),
    );
    session.set_monitoring(true);
    gate.store(true, Ordering::SeqCst);

    wait_until_ended(&sink, Duration::from_secs(5));
    drop(session);

    let events = sink.events();
    assert!(events.iter().any(|event| matches!(event, Event::Mask)));
    assert!(
        events
            .iter()
            .any(|event| matches!(event, Event::Background))
    );

    std::fs::remove_dir_all(dir).unwrap();
}
