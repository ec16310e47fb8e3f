//! crates/analista_core/src/teleprompter.rs
//!
//! Timing model for the teleprompter's linear scroll animation.

pub const MIN_SPEED: u8 = 1;
pub const MAX_SPEED: u8 = 50;

/// Clamps any requested speed (including large wheel or drag deltas) into
/// `[MIN_SPEED, MAX_SPEED]`.
pub fn clamp_speed(speed: i64) -> u8 {
    speed.clamp(i64::from(MIN_SPEED), i64::from(MAX_SPEED)) as u8
}

/// Total scroll duration for a script of `content_length` characters.
///
/// Higher speeds give shorter durations. The speed is clamped first, so the
/// result is always finite.
pub fn duration_seconds(content_length: usize, speed: i64) -> f64 {
    let speed = f64::from(clamp_speed(speed));
    (content_length as f64 / 10.0) / (speed * 0.1)
}

/// Play/pause/restart state of an open teleprompter.
#[derive(Debug, Clone, PartialEq)]
pub struct Teleprompter {
    content_length: usize,
    speed: u8,
    playing: bool,
    /// Fraction of the animation already scrolled, in `[0, 1]`.
    progress: f64,
}

impl Teleprompter {
    /// Opens a paused teleprompter at the top of the script.
    pub fn new(content_length: usize, speed: i64) -> Self {
        Self {
            content_length,
            speed: clamp_speed(speed),
            playing: false,
            progress: 0.0,
        }
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn duration_seconds(&self) -> f64 {
        duration_seconds(self.content_length, i64::from(self.speed))
    }

    /// Applies a relative speed change from the wheel or a touch drag.
    pub fn adjust_speed(&mut self, delta: i64) -> u8 {
        self.speed = clamp_speed(i64::from(self.speed).saturating_add(delta));
        self.speed
    }

    /// Applies an absolute speed from the slider.
    pub fn set_speed(&mut self, speed: i64) -> u8 {
        self.speed = clamp_speed(speed);
        self.speed
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle(&mut self) -> bool {
        self.playing = !self.playing;
        self.playing
    }

    /// Rewinds to the top without touching the speed or play state.
    pub fn restart(&mut self) {
        self.progress = 0.0;
    }

    /// Advances the animation by `elapsed_secs` of wall time. No-op while paused.
    pub fn advance(&mut self, elapsed_secs: f64) {
        if !self.playing || elapsed_secs <= 0.0 {
            return;
        }
        let duration = self.duration_seconds();
        self.progress = if duration <= 0.0 {
            1.0
        } else {
            (self.progress + elapsed_secs / duration).min(1.0)
        };
        if self.progress >= 1.0 {
            self.playing = false;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.progress >= 1.0
    }
}
