// SPDX-License-Identifier: GPL-3.0-only

//! Rolling-window throughput estimation
//!
//! The sampler is armed on demand. The first sampled frame starts the
//! window timer; each subsequent frame is counted until the window size is
//! reached, at which point the rate is computed and the window resets. A
//! window is never partially reported.

use std::time::Instant;

/// Fixed-window frame rate sampler
#[derive(Debug)]
pub struct FpsSampler {
    window: u32,
    started: Option<Instant>,
    counted: u32,
}

impl FpsSampler {
    pub fn new(window: u32) -> Self {
        debug_assert!(window > 0);
        Self {
            window,
            started: None,
            counted: 0,
        }
    }

    /// Discard any partial window
    pub fn reset(&mut self) {
        self.started = None;
        self.counted = 0;
    }

    /// Account for one frame observed at `now`
    ///
    /// Returns the measured rate once exactly `window` frames have been
    /// counted after the starting frame; the sampler resets itself when it
    /// reports.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        match self.started {
            None => {
                self.started = Some(now);
                self.counted = 0;
                None
            }
            Some(start) => {
                self.counted += 1;
                if self.counted < self.window {
                    return None;
                }
                let elapsed = now.duration_since(start).as_secs_f32();
                let rate = if elapsed > 0.0 {
                    self.counted as f32 / elapsed
                } else {
                    0.0
                };
                self.reset();
                Some(rate)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn emits_only_after_full_window() {
        let mut sampler = FpsSampler::new(30);
        let start = Instant::now();
        // Starting frame plus 29 counted frames: no report yet
        for i in 0..30 {
            let at = start + Duration::from_millis(100 * i);
            assert_eq!(sampler.tick(at), None, "tick {} reported early", i);
        }
        // 30th counted frame completes the window
        let rate = sampler
            .tick(start + Duration::from_millis(3000))
            .expect("window must complete");
        assert!((rate - 10.0).abs() < 0.5, "expected ~10 fps, got {}", rate);
    }

    #[test]
    fn resets_after_reporting() {
        let mut sampler = FpsSampler::new(2);
        let start = Instant::now();
        sampler.tick(start);
        sampler.tick(start + Duration::from_millis(50));
        assert!(
            sampler
                .tick(start + Duration::from_millis(100))
                .is_some()
        );
        // Next tick starts a brand-new window
        assert_eq!(sampler.tick(start + Duration::from_millis(150)), None);
    }

    #[test]
    fn reset_discards_partial_window() {
        let mut sampler = FpsSampler::new(3);
        let start = Instant::now();
        sampler.tick(start);
        sampler.tick(start + Duration::from_millis(10));
        sampler.reset();
        // The two pre-reset ticks must not count toward this window
        assert_eq!(sampler.tick(start + Duration::from_millis(20)), None);
        assert_eq!(sampler.tick(start + Duration::from_millis(30)), None);
        assert_eq!(sampler.tick(start + Duration::from_millis(40)), None);
        assert!(
            sampler
                .tick(start + Duration::from_millis(50))
                .is_some()
        );
    }

    #[test]
    fn rate_matches_cadence() {
        let mut sampler = FpsSampler::new(30);
        let start = Instant::now();
        let mut reported = None;
        for i in 0..=30u64 {
            if let Some(rate) = sampler.tick(start + Duration::from_millis(100 * i)) {
                reported = Some(rate);
            }
        }
        let rate = reported.expect("one report per 31 ticks");
        assert!((rate - 10.0).abs() < 0.01);
    }
}
