//! Frame clock.
//!
//! [`Time`] turns wall-clock frames into the `(elapsed, delta)` pair the
//! scene consumes. Scene time is accumulated from clamped deltas rather than
//! read from the wall clock, so a stalled frame (window drag, debugger break)
//! advances the morph by at most [`Time::DEFAULT_MAX_DELTA`] instead of
//! teleporting every group to its target.
//!
//! # Example
//!
//! ```ignore
//! use morph_tree::time::Time;
//!
//! let mut time = Time::new();
//!
//! // once per frame:
//! let (elapsed, delta) = time.update();
//! scene.tick(delta, elapsed, &switch);
//! ```

use std::time::{Duration, Instant};

/// Scene clock with pause, time scale, fixed delta and a max-delta clamp.
#[derive(Debug)]
pub struct Time {
    /// When the last frame occurred.
    last_frame: Instant,
    /// Scene seconds, sum of every applied delta.
    elapsed_secs: f32,
    /// Delta applied by the last frame.
    delta_secs: f32,
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    paused: bool,
    /// Replaces the measured delta when set.
    fixed_delta: Option<f32>,
    /// Upper bound on a single frame's raw delta.
    max_delta: f32,
    time_scale: f32,
}

impl Time {
    /// Longest frame the clock will report, in seconds.
    pub const DEFAULT_MAX_DELTA: f32 = 0.1;

    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
            fixed_delta: None,
            max_delta: Self::DEFAULT_MAX_DELTA,
            time_scale: 1.0,
        }
    }

    /// Measure the wall-clock frame and advance. Call once per frame.
    ///
    /// Returns `(elapsed, delta)` in scene seconds.
    pub fn update(&mut self) -> (f32, f32) {
        let now = Instant::now();
        let raw = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let result = self.advance(raw);

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        result
    }

    /// Advance by a raw delta of `raw` seconds without touching the wall clock.
    ///
    /// Negative or non-finite deltas count as zero. The raw delta (or the fixed
    /// delta) is clamped to the max delta before the time scale applies.
    pub fn advance(&mut self, raw: f32) -> (f32, f32) {
        if self.paused {
            self.delta_secs = 0.0;
            return (self.elapsed_secs, self.delta_secs);
        }

        let raw = if raw.is_finite() { raw.max(0.0) } else { 0.0 };
        let step = self.fixed_delta.unwrap_or(raw).min(self.max_delta);
        if raw > self.max_delta && self.fixed_delta.is_none() {
            log::debug!("clamped frame delta {raw:.3}s to {:.3}s", self.max_delta);
        }

        self.delta_secs = step * self.time_scale;
        self.elapsed_secs += self.delta_secs;
        self.frame_count += 1;

        (self.elapsed_secs, self.delta_secs)
    }

    /// Scene seconds since start.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Scene seconds applied by the last frame.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second, refreshed twice a second by [`update`](Self::update).
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    #[inline]
    pub fn max_delta(&self) -> f32 {
        self.max_delta
    }

    /// While paused, `delta()` is 0 and `elapsed()` stops increasing.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            // The paused span must not show up as one huge frame.
            self.last_frame = Instant::now();
            self.paused = false;
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Use `Some(dt)` for deterministic steps, `None` for real frame timing.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta.filter(|d| d.is_finite()).map(|d| d.max(0.0));
    }

    /// Clamp for a single frame. Non-positive values disable stepping.
    pub fn set_max_delta(&mut self, max_delta: f32) {
        self.max_delta = if max_delta.is_finite() { max_delta.max(0.0) } else { Self::DEFAULT_MAX_DELTA };
    }

    /// `1.0` is normal speed, `0.5` slow motion.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn reset(&mut self) {
        let now = Instant::now();
        self.last_frame = now;
        self.elapsed_secs = 0.0;
        self.delta_secs = 0.0;
        self.frame_count = 0;
        self.fps = 0.0;
        self.fps_frame_count = 0;
        self.fps_update_time = now;
        self.paused = false;
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_time_new() {
        let time = Time::new();
        assert_eq!(time.frame(), 0);
        assert!(!time.is_paused());
        assert_eq!(time.time_scale(), 1.0);
        assert_eq!(time.max_delta(), Time::DEFAULT_MAX_DELTA);
    }

    #[test]
    fn test_time_update() {
        let mut time = Time::new();
        thread::sleep(Duration::from_millis(10));
        let (elapsed, delta) = time.update();

        assert!(elapsed > 0.0);
        assert!(delta > 0.0);
        assert_eq!(time.frame(), 1);
    }

    #[test]
    fn test_stalled_frame_is_clamped() {
        let mut time = Time::new();
        let (elapsed, delta) = time.advance(3.0);
        assert_eq!(delta, 0.1);
        assert_eq!(elapsed, 0.1);
    }

    #[test]
    fn test_bad_delta_counts_as_zero() {
        let mut time = Time::new();
        assert_eq!(time.advance(-1.0).1, 0.0);
        assert_eq!(time.advance(f32::NAN).1, 0.0);
        assert_eq!(time.elapsed(), 0.0);
        assert_eq!(time.frame(), 2);
    }

    #[test]
    fn test_time_pause() {
        let mut time = Time::new();
        time.advance(0.016);

        time.pause();
        assert!(time.is_paused());

        let elapsed_before = time.elapsed();
        time.advance(0.016);

        assert_eq!(time.elapsed(), elapsed_before);
        assert_eq!(time.delta(), 0.0);

        time.resume();
        time.advance(0.016);
        assert!(time.elapsed() > elapsed_before);
    }

    #[test]
    fn test_time_scale() {
        let mut time = Time::new();
        time.set_time_scale(2.0);
        assert_eq!(time.time_scale(), 2.0);
        let (_, delta) = time.advance(0.05);
        assert!((delta - 0.1).abs() < 1e-6);

        time.set_time_scale(-1.0);
        assert_eq!(time.time_scale(), 0.0);
    }

    #[test]
    fn test_fixed_delta() {
        let mut time = Time::new();
        time.set_fixed_delta(Some(1.0 / 60.0));

        thread::sleep(Duration::from_millis(20));
        time.update();

        let expected = 1.0 / 60.0;
        assert!((time.delta() - expected).abs() < 0.0001);
    }
}
