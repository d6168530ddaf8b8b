//! Frame-driven timers
//!
//! Nothing here reads the clock; every call takes the frame's `Instant`.

use std::time::{Duration, Instant};

use rand::Rng;

/// Longest delay a timer schedules; larger intervals are capped
pub const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// `now + delay`, capped at [`MAX_DELAY`] so huge intervals can't overflow
#[must_use]
pub fn deadline(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay.min(MAX_DELAY)).unwrap_or(now)
}

/// Random delay in `0..=max`, millisecond resolution
pub fn jitter<R: Rng + ?Sized>(rng: &mut R, max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.gen_range(0..=max_ms))
}

/// Fires every `interval + rand(0..=variation)`
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    enabled: bool,
    interval: Duration,
    variation: Duration,
    due: Instant,
}

impl IntervalTimer {
    /// Enabled timer whose first tick is one `interval` after `now`
    #[must_use]
    pub fn new(interval: Duration, variation: Duration, now: Instant) -> Self {
        Self {
            enabled: true,
            interval,
            variation,
            due: deadline(now, interval),
        }
    }

    #[must_use]
    pub fn disabled(now: Instant) -> Self {
        Self {
            enabled: false,
            interval: Duration::ZERO,
            variation: Duration::ZERO,
            due: now,
        }
    }

    /// Reconfigure; an enabled timer restarts from `now`
    pub fn set(&mut self, enabled: bool, interval: Duration, variation: Duration, now: Instant) {
        self.enabled = enabled;
        self.interval = interval;
        self.variation = variation;
        self.due = deadline(now, interval);
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// True once per period; reschedules itself when it fires
    pub fn poll<R: Rng + ?Sized>(&mut self, now: Instant, rng: &mut R) -> bool {
        if !self.enabled || now < self.due {
            return false;
        }
        self.due = deadline(now, self.interval.saturating_add(jitter(rng, self.variation)));
        true
    }
}

/// Alternating offset applied to the eyes every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct Flicker {
    enabled: bool,
    amplitude: i32,
    alternate: bool,
}

impl Flicker {
    pub const fn set(&mut self, enabled: bool, amplitude: i32) {
        self.enabled = enabled;
        self.amplitude = amplitude;
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Offset for this frame: `+amplitude`, `-amplitude`, ... or 0 when off
    pub const fn offset(&mut self) -> i32 {
        if !self.enabled {
            return 0;
        }
        self.alternate = !self.alternate;
        if self.alternate {
            self.amplitude
        } else {
            -self.amplitude
        }
    }
}

/// Deadline for a one-shot animation
#[derive(Debug, Clone, Copy, Default)]
pub struct OneShot {
    until: Option<Instant>,
}

impl OneShot {
    pub fn start(&mut self, now: Instant, duration: Duration) {
        self.until = Some(deadline(now, duration));
    }

    #[must_use]
    pub const fn active(&self) -> bool {
        self.until.is_some()
    }

    /// True exactly once, on the first frame at or past the deadline
    pub fn expired(&mut self, now: Instant) -> bool {
        match self.until {
            Some(until) if now >= until => {
                self.until = None;
                true
            }
            _ => false,
        }
    }
}
