//! Animated robot eyes
//!
//! [`EyeRenderer`] is a per-frame state machine that eases eye geometry
//! toward targets set by moods, gaze and timers, and draws each eye into its
//! own frame buffer. [`RoboEyesDual`] pairs it with two [`EyeDisplay`]s and
//! runs the blocking mood loops.
//!
//! [`EyeDisplay`]: crate::display::EyeDisplay

mod dual;
mod geometry;
mod mood;
mod renderer;
mod timers;

pub use dual::{RoboEyesDual, StopSignal};
pub use geometry::{Eye, EyeBox, Eyelids, Tween};
pub use mood::{Animation, BlinkTarget, Mood, Position};
pub use renderer::{EyeRenderer, MoodProfile};
pub use timers::{Flicker, IntervalTimer, MAX_DELAY, OneShot, deadline};

use std::time::Duration;

/// Highest supported frame rate; SSD1306 panels over I2C top out well below it
pub const MAX_FPS: u32 = 120;

/// Eye geometry and timing
#[derive(Debug, Clone, PartialEq)]
pub struct EyesConfig {
    /// Eye width in pixels
    pub width: u32,
    /// Eye height in pixels when fully open
    pub height: u32,
    /// Corner radius
    pub border_radius: u32,
    /// Frame rate cap, `1..=MAX_FPS`
    pub fps: u32,
    pub blink_interval: Duration,
    pub blink_variation: Duration,
    /// Wander to random positions in the default mood
    pub idle: bool,
    pub idle_interval: Duration,
    pub idle_variation: Duration,
    /// Grow the outer eye when looking to the side
    pub curious: bool,
    /// Mood applied at start
    pub mood: Mood,
}

impl Default for EyesConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 44,
            border_radius: 12,
            fps: 30,
            blink_interval: Duration::from_secs(3),
            blink_variation: Duration::from_secs(2),
            idle: true,
            idle_interval: Duration::from_secs(2),
            idle_variation: Duration::from_secs(2),
            curious: false,
            mood: Mood::Default,
        }
    }
}

impl EyesConfig {
    /// Time between frames at the configured rate
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.fps.clamp(1, MAX_FPS)))
    }
}
