//! Per-frame eye state machine
//!
//! `render(now)` advances timers and tweens by one frame and redraws both
//! eyes. The renderer owns no displays and never reads the clock, so a
//! seeded renderer driven with synthetic instants is fully deterministic.

use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::geometry::{Eye, EyeBox, Eyelids};
use super::mood::{Animation, BlinkTarget, Mood, Position};
use super::timers::{Flicker, IntervalTimer, OneShot};
use super::{EyesConfig, MAX_FPS};
use crate::display::FrameBuffer;
use crate::{Error, Result};

/// Heart pulse period in the love mood
const LOVE_PULSE: Duration = Duration::from_millis(800);

/// Heart size swing in the love mood
const LOVE_PULSE_AMOUNT: f32 = 0.15;

/// Scan line sweep period in the qr mood
const QR_SWEEP: Duration = Duration::from_millis(1200);

/// Corner bracket thickness in the qr mood
const QR_BRACKET: i32 = 3;

const LAUGH_AMPLITUDE: i32 = 5;
const CONFUSED_AMPLITUDE: i32 = 20;
const ONE_SHOT_DURATION: Duration = Duration::from_millis(500);

/// Extra height the outer eye gains in curious mode
const CURIOUS_OFFSET: i32 = 8;

/// How close to the panel edge the gaze must be for curious mode to kick in
const CURIOUS_MARGIN: i32 = 10;

/// Timer behaviour attached to a mood
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoodProfile {
    /// Autoblink `(interval, variation)`, `None` disables blinking
    pub blink: Option<(Duration, Duration)>,
    /// Idle wander `(interval, variation)`
    pub idle: Option<(Duration, Duration)>,
    pub position: Position,
    /// Played once when the mood is entered
    pub on_enter: Option<Animation>,
}

impl MoodProfile {
    /// Profile for `mood`; the default mood takes its timers from `config`
    #[must_use]
    pub const fn for_mood(mood: Mood, config: &EyesConfig) -> Self {
        const fn secs(s: u64) -> Duration {
            Duration::from_secs(s)
        }

        match mood {
            Mood::Default => Self {
                blink: Some((config.blink_interval, config.blink_variation)),
                idle: if config.idle {
                    Some((config.idle_interval, config.idle_variation))
                } else {
                    None
                },
                position: Position::Center,
                on_enter: None,
            },
            Mood::Happy => Self {
                blink: Some((secs(3), secs(2))),
                idle: None,
                position: Position::Center,
                on_enter: Some(Animation::Laugh),
            },
            Mood::Tired => Self {
                blink: Some((secs(5), secs(3))),
                idle: None,
                position: Position::S,
                on_enter: None,
            },
            Mood::Angry => Self {
                blink: Some((secs(4), secs(2))),
                idle: None,
                position: Position::Center,
                on_enter: None,
            },
            Mood::Love => Self {
                blink: Some((secs(3), secs(2))),
                idle: None,
                position: Position::Center,
                on_enter: None,
            },
            Mood::Qr => Self {
                blink: None,
                idle: None,
                position: Position::Center,
                on_enter: None,
            },
        }
    }
}

/// Which panel an eye is drawn on; decides which corners are "outer"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Eye animation state for a pair of panels
pub struct EyeRenderer {
    config: EyesConfig,
    screen_width: i32,
    screen_height: i32,
    default_width: i32,
    default_height: i32,
    left: Eye,
    right: Eye,
    lids: Eyelids,
    target: (i32, i32),
    mood: Mood,
    mood_since: Instant,
    position: Position,
    curious: bool,
    autoblink: IntervalTimer,
    idle: IntervalTimer,
    hflicker: Flicker,
    vflicker: Flicker,
    laugh: OneShot,
    confused: OneShot,
    frame_interval: Duration,
    last_frame: Option<Instant>,
    frames: u64,
    rng: StdRng,
    left_frame: FrameBuffer,
    right_frame: FrameBuffer,
    left_box: EyeBox,
    right_box: EyeBox,
}

impl std::fmt::Debug for EyeRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EyeRenderer")
            .field("mood", &self.mood)
            .field("position", &self.position)
            .field("curious", &self.curious)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl EyeRenderer {
    /// Create a renderer for two `width x height` panels
    ///
    /// # Errors
    ///
    /// Returns error if the eye does not fit the panel or fps is out of range
    pub fn new(config: EyesConfig, width: u32, height: u32, now: Instant) -> Result<Self> {
        Self::build(config, width, height, now, StdRng::from_entropy())
    }

    /// Like [`EyeRenderer::new`] with a fixed random seed
    ///
    /// # Errors
    ///
    /// Returns error if the eye does not fit the panel or fps is out of range
    pub fn with_seed(
        config: EyesConfig,
        width: u32,
        height: u32,
        now: Instant,
        seed: u64,
    ) -> Result<Self> {
        Self::build(config, width, height, now, StdRng::seed_from_u64(seed))
    }

    fn build(
        config: EyesConfig,
        width: u32,
        height: u32,
        now: Instant,
        rng: StdRng,
    ) -> Result<Self> {
        let dim = |v: u32, what: &str| {
            i32::try_from(v).map_err(|_| Error::Eyes(format!("{what} {v} is out of range")))
        };
        let screen_width = dim(width, "panel width")?;
        let screen_height = dim(height, "panel height")?;
        let eye_width = dim(config.width, "eye width")?;
        let eye_height = dim(config.height, "eye height")?;
        let radius = dim(config.border_radius, "border radius")?;

        if config.fps == 0 || config.fps > MAX_FPS {
            return Err(Error::Eyes(format!(
                "fps {} is outside 1..={MAX_FPS}",
                config.fps
            )));
        }
        if eye_width < 2 || eye_height < 2 {
            return Err(Error::Eyes(format!(
                "eye {eye_width}x{eye_height} is too small"
            )));
        }
        if eye_width > screen_width || eye_height > screen_height {
            return Err(Error::Eyes(format!(
                "eye {eye_width}x{eye_height} does not fit a {screen_width}x{screen_height} panel"
            )));
        }

        let (x, y) = Position::Center.coordinates(screen_width - eye_width, screen_height - eye_height);
        let eye = Eye::new(eye_width, eye_height, radius, x, y);
        let frame_interval = config.frame_interval();
        let start_mood = config.mood;

        let mut renderer = Self {
            screen_width,
            screen_height,
            default_width: eye_width,
            default_height: eye_height,
            left: eye.clone(),
            right: eye,
            lids: Eyelids::default(),
            target: (x, y),
            mood: Mood::Default,
            mood_since: now,
            position: Position::Center,
            curious: config.curious,
            autoblink: IntervalTimer::disabled(now),
            idle: IntervalTimer::disabled(now),
            hflicker: Flicker::default(),
            vflicker: Flicker::default(),
            laugh: OneShot::default(),
            confused: OneShot::default(),
            frame_interval,
            last_frame: None,
            frames: 0,
            rng,
            left_frame: FrameBuffer::new(width, height),
            right_frame: FrameBuffer::new(width, height),
            left_box: EyeBox::default(),
            right_box: EyeBox::default(),
            config,
        };
        renderer.set_mood(start_mood, now);
        Ok(renderer)
    }

    /// Largest x the eye box can take
    #[must_use]
    pub const fn max_x(&self) -> i32 {
        self.screen_width - self.default_width
    }

    /// Largest y the eye box can take
    #[must_use]
    pub const fn max_y(&self) -> i32 {
        self.screen_height - self.default_height
    }

    /// Switch mood and apply its timer profile
    pub fn set_mood(&mut self, mood: Mood, now: Instant) {
        let profile = MoodProfile::for_mood(mood, &self.config);
        self.mood = mood;
        self.mood_since = now;

        match profile.blink {
            Some((interval, variation)) => self.set_autoblinker(true, interval, variation, now),
            None => self.set_autoblinker(false, Duration::ZERO, Duration::ZERO, now),
        }
        match profile.idle {
            Some((interval, variation)) => self.set_idle_mode(true, interval, variation, now),
            None => self.set_idle_mode(false, Duration::ZERO, Duration::ZERO, now),
        }
        self.set_position(profile.position);
        if let Some(animation) = profile.on_enter {
            self.animate(animation, now);
        }

        tracing::debug!(mood = %mood, "eyes mood set");
    }

    #[must_use]
    pub const fn mood(&self) -> Mood {
        self.mood
    }

    /// Point both eyes at a compass position
    pub const fn set_position(&mut self, position: Position) {
        self.position = position;
        let target = position.coordinates(self.max_x(), self.max_y());
        self.look_at(target);
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Current shared gaze target (top-left of the eye box)
    #[must_use]
    pub const fn target(&self) -> (i32, i32) {
        self.target
    }

    const fn look_at(&mut self, (x, y): (i32, i32)) {
        self.target = (x, y);
        self.left.x.target = x;
        self.left.y.target = y;
        self.right.x.target = x;
        self.right.y.target = y;
    }

    pub const fn set_curious(&mut self, curious: bool) {
        self.curious = curious;
    }

    #[must_use]
    pub const fn curious(&self) -> bool {
        self.curious
    }

    pub fn set_autoblinker(
        &mut self,
        enabled: bool,
        interval: Duration,
        variation: Duration,
        now: Instant,
    ) {
        self.autoblink.set(enabled, interval, variation, now);
    }

    pub fn set_idle_mode(
        &mut self,
        enabled: bool,
        interval: Duration,
        variation: Duration,
        now: Instant,
    ) {
        self.idle.set(enabled, interval, variation, now);
    }

    #[must_use]
    pub const fn autoblink_enabled(&self) -> bool {
        self.autoblink.enabled()
    }

    #[must_use]
    pub const fn idle_enabled(&self) -> bool {
        self.idle.enabled()
    }

    pub const fn set_hflicker(&mut self, enabled: bool, amplitude: i32) {
        self.hflicker.set(enabled, amplitude);
    }

    pub const fn set_vflicker(&mut self, enabled: bool, amplitude: i32) {
        self.vflicker.set(enabled, amplitude);
    }

    pub const fn blink(&mut self, target: BlinkTarget) {
        if target.left() {
            self.left.blink();
        }
        if target.right() {
            self.right.blink();
        }
    }

    pub const fn close(&mut self, target: BlinkTarget) {
        if target.left() {
            self.left.close();
        }
        if target.right() {
            self.right.close();
        }
    }

    pub const fn open(&mut self, target: BlinkTarget) {
        if target.left() {
            self.left.open();
        }
        if target.right() {
            self.right.open();
        }
    }

    /// Start a one-shot animation; it stops itself after half a second
    pub fn animate(&mut self, animation: Animation, now: Instant) {
        match animation {
            Animation::Laugh => {
                self.set_vflicker(true, LAUGH_AMPLITUDE);
                self.laugh.start(now, ONE_SHOT_DURATION);
            }
            Animation::Confused => {
                self.set_hflicker(true, CONFUSED_AMPLITUDE);
                self.confused.start(now, ONE_SHOT_DURATION);
            }
        }
    }

    #[must_use]
    pub const fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Whether a frame interval has passed since the last rendered frame
    #[must_use]
    pub fn frame_due(&self, now: Instant) -> bool {
        self.last_frame
            .is_none_or(|last| now.saturating_duration_since(last) >= self.frame_interval)
    }

    /// Time left until the next frame is due
    #[must_use]
    pub fn until_next_frame(&self, now: Instant) -> Duration {
        self.last_frame.map_or(Duration::ZERO, |last| {
            (last + self.frame_interval).saturating_duration_since(now)
        })
    }

    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub const fn left_frame(&self) -> &FrameBuffer {
        &self.left_frame
    }

    #[must_use]
    pub const fn right_frame(&self) -> &FrameBuffer {
        &self.right_frame
    }

    /// Box the left eye was last drawn into
    #[must_use]
    pub const fn left_box(&self) -> EyeBox {
        self.left_box
    }

    /// Box the right eye was last drawn into
    #[must_use]
    pub const fn right_box(&self) -> EyeBox {
        self.right_box
    }

    /// Tired, angry and happy eyelid amounts currently drawn
    #[must_use]
    pub const fn eyelids(&self) -> (i32, i32, i32) {
        (
            self.lids.tired.current,
            self.lids.angry.current,
            self.lids.happy.current,
        )
    }

    /// Advance one frame and redraw both eyes
    pub fn render(&mut self, now: Instant) {
        self.advance(now);
        self.draw(now);
        self.frames += 1;
        self.last_frame = Some(now);
    }

    fn advance(&mut self, now: Instant) {
        if self.laugh.expired(now) {
            self.vflicker.set(false, 0);
        }
        if self.confused.expired(now) {
            self.hflicker.set(false, 0);
        }

        if self.autoblink.poll(now, &mut self.rng) {
            self.blink(BlinkTarget::Both);
        }
        if self.idle.poll(now, &mut self.rng) {
            let (max_x, max_y) = (self.max_x(), self.max_y());
            let x = self.rng.gen_range(0..=max_x);
            let y = self.rng.gen_range(0..=max_y);
            self.look_at((x, y));
        }

        let (target_x, _) = self.target;
        self.left.height_offset = if self.curious && target_x <= CURIOUS_MARGIN {
            CURIOUS_OFFSET
        } else {
            0
        };
        self.right.height_offset = if self.curious && target_x >= self.max_x() - CURIOUS_MARGIN {
            CURIOUS_OFFSET
        } else {
            0
        };

        self.left.step(self.default_height);
        self.right.step(self.default_height);

        let half = self.left.height.current / 2;
        let (tired, angry, happy) = match self.mood {
            Mood::Tired => (half, 0, 0),
            Mood::Angry => (0, half, 0),
            Mood::Happy => (0, 0, half),
            Mood::Default | Mood::Love | Mood::Qr => (0, 0, 0),
        };
        self.lids.tired.target = tired;
        self.lids.angry.target = angry;
        self.lids.happy.target = happy;
        self.lids.step();

        let dx = self.hflicker.offset();
        let dy = self.vflicker.offset();
        for eye in [&mut self.left, &mut self.right] {
            eye.x.current += dx;
            eye.y.current += dy;
        }
    }

    fn draw(&mut self, now: Instant) {
        self.left_box = self.left.draw_box(self.default_height);
        self.right_box = self.right.draw_box(self.default_height);

        let elapsed = now.saturating_duration_since(self.mood_since);
        let mut left = std::mem::replace(&mut self.left_frame, FrameBuffer::new(0, 0));
        let mut right = std::mem::replace(&mut self.right_frame, FrameBuffer::new(0, 0));
        self.draw_eye(&mut left, self.left_box, Side::Left, elapsed);
        self.draw_eye(&mut right, self.right_box, Side::Right, elapsed);
        self.left_frame = left;
        self.right_frame = right;
    }

    fn draw_eye(&self, fb: &mut FrameBuffer, eye: EyeBox, side: Side, elapsed: Duration) {
        fb.clear();
        match self.mood {
            Mood::Love => self.draw_heart(fb, eye, elapsed),
            Mood::Qr => draw_scanner(fb, eye, elapsed),
            Mood::Default | Mood::Tired | Mood::Angry | Mood::Happy => {
                fb.fill_round_rect(eye.x, eye.y, eye.width, eye.height, eye.radius, true);
                self.draw_eyelids(fb, eye, side);
            }
        }
    }

    fn draw_eyelids(&self, fb: &mut FrameBuffer, eye: EyeBox, side: Side) {
        let EyeBox {
            x,
            y,
            width: w,
            height: h,
            radius,
        } = eye;
        let top = y - 1;

        let tired = self.lids.tired.current;
        if tired > 0 {
            let corner = match side {
                Side::Left => x,
                Side::Right => x + w,
            };
            fb.fill_triangle(x, top, x + w, top, corner, y + tired - 1, false);
        }

        let angry = self.lids.angry.current;
        if angry > 0 {
            let corner = match side {
                Side::Left => x + w,
                Side::Right => x,
            };
            fb.fill_triangle(x, top, x + w, top, corner, y + angry - 1, false);
        }

        let happy = self.lids.happy.current;
        if happy > 0 {
            fb.fill_round_rect(
                x - 1,
                y + h - happy + 1,
                w + 2,
                self.default_height,
                radius,
                false,
            );
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_lossless
    )]
    fn draw_heart(&self, fb: &mut FrameBuffer, eye: EyeBox, elapsed: Duration) {
        let phase = cycle_phase(elapsed, LOVE_PULSE);
        let pulse = LOVE_PULSE_AMOUNT.mul_add((phase * TAU).sin(), 1.0);
        // a heart is 7/8 as tall as it is wide
        let base = eye.width.min(eye.height * 8 / 7);
        let size = (base as f32 * pulse).round() as i32;
        let (cx, cy) = eye.center();
        fb.fill_heart(cx, cy, size.max(1), true);
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn draw_scanner(fb: &mut FrameBuffer, eye: EyeBox, elapsed: Duration) {
    let EyeBox {
        x,
        y,
        width: w,
        height: h,
        ..
    } = eye;
    let t = QR_BRACKET;
    let len = (w.min(h) / 4).max(t);

    // corner brackets
    fb.fill_rect(x, y, len, t, true);
    fb.fill_rect(x, y, t, len, true);
    fb.fill_rect(x + w - len, y, len, t, true);
    fb.fill_rect(x + w - t, y, t, len, true);
    fb.fill_rect(x, y + h - t, len, t, true);
    fb.fill_rect(x, y + h - len, t, len, true);
    fb.fill_rect(x + w - len, y + h - t, len, t, true);
    fb.fill_rect(x + w - t, y + h - len, t, len, true);

    let travel = h - 2 * t - 2;
    if travel > 0 {
        let phase = cycle_phase(elapsed, QR_SWEEP);
        let line_y = y + t + (phase * travel as f32) as i32;
        fb.fill_rect(x + t + 2, line_y, w - 2 * t - 4, 2, true);
    }
}

/// Position within a repeating cycle, `0.0..1.0`
#[allow(clippy::cast_precision_loss)]
fn cycle_phase(elapsed: Duration, period: Duration) -> f32 {
    let period_ms = period.as_millis().max(1);
    (elapsed.as_millis() % period_ms) as f32 / period_ms as f32
}
