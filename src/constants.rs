// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Capture defaults
pub mod capture {
    /// Requested frame width when none is configured
    pub const DEFAULT_WIDTH: u32 = 1920;

    /// Requested frame height when none is configured
    pub const DEFAULT_HEIGHT: u32 = 1080;

    /// Requested frame rate when none is configured
    pub const DEFAULT_FRAME_RATE: u32 = 30;

    /// Attempts to open a live camera device before giving up
    pub const OPEN_ATTEMPTS: u32 = 3;

    /// Delay between open attempts
    pub const OPEN_RETRY_DELAY_MS: u64 = 200;

    /// Consecutive failed reads tolerated on a live device before the
    /// source is considered stalled. File sources terminate on the first
    /// failed read.
    pub const READ_ATTEMPTS: u32 = 3;

    /// Read timeout hint passed to the capture backend, where supported
    pub const READ_TIMEOUT_MS: u64 = 5_000;
}

/// Throughput measurement
pub mod fps {
    /// Frames counted per measurement window
    pub const WINDOW_SIZE: u32 = 30;
}

/// Motion detection tunables
///
/// History/variance values follow the common MOG2 defaults; the mask
/// threshold and morphology sizes are tuned for indoor webcam footage.
pub mod motion {
    /// Background model history length in frames
    pub const MODEL_HISTORY: i32 = 500;

    /// Squared Mahalanobis distance threshold for the background model
    pub const VARIANCE_THRESHOLD: f64 = 16.0;

    /// Classify and mark shadow pixels in the foreground mask
    pub const DETECT_SHADOWS: bool = true;

    /// Binarization threshold applied to the raw foreground mask (0-255)
    pub const MASK_THRESHOLD: f64 = 25.0;

    /// Side length of the square structuring element for noise suppression
    pub const MORPH_KERNEL_SIZE: i32 = 9;

    /// Erosion passes applied before dilation
    pub const ERODE_ITERATIONS: i32 = 1;

    /// Dilation passes applied after erosion
    pub const DILATE_ITERATIONS: i32 = 3;
}

/// Recording output
pub mod recording {
    /// Frame rate used by the encoder when no throughput has been measured
    pub const DEFAULT_FRAME_RATE: f64 = 30.0;

    /// Container extension for recorded videos
    pub const VIDEO_EXTENSION: &str = "avi";

    /// Extension for the per-session cover snapshot
    pub const COVER_EXTENSION: &str = "jpg";
}

/// Storage layout
pub mod storage {
    /// Subdirectory created under the user's videos directory
    pub const APP_DIR: &str = "vigil";

    /// Session name timestamp format (millisecond precision keeps names
    /// collision-resistant for back-to-back recordings)
    pub const SESSION_NAME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S%.3f";
}
