//! Two panels, one pair of eyes

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use super::timers::deadline;
use super::mood::Mood;
use super::renderer::EyeRenderer;
use super::EyesConfig;
use crate::display::EyeDisplay;
use crate::{Error, Result};

/// Cloneable flag that ends a running mood loop
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Arm the signal again for the next loop
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Eye renderer driving a left and a right display
pub struct RoboEyesDual {
    renderer: EyeRenderer,
    left: Box<dyn EyeDisplay>,
    right: Box<dyn EyeDisplay>,
}

impl std::fmt::Debug for RoboEyesDual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoboEyesDual")
            .field("renderer", &self.renderer)
            .field("size", &self.left.size())
            .finish_non_exhaustive()
    }
}

impl RoboEyesDual {
    /// Pair two displays of the same size
    ///
    /// # Errors
    ///
    /// Returns error if the displays differ in size or the eye config does
    /// not fit them
    pub fn new(
        left: impl EyeDisplay + 'static,
        right: impl EyeDisplay + 'static,
        config: EyesConfig,
    ) -> Result<Self> {
        let (width, height) = check_pair(&left, &right)?;
        let renderer = EyeRenderer::new(config, width, height, Instant::now())?;
        Ok(Self::from_parts(renderer, left, right))
    }

    /// Like [`RoboEyesDual::new`] with a fixed random seed
    ///
    /// # Errors
    ///
    /// Returns error if the displays differ in size or the eye config does
    /// not fit them
    pub fn with_seed(
        left: impl EyeDisplay + 'static,
        right: impl EyeDisplay + 'static,
        config: EyesConfig,
        seed: u64,
    ) -> Result<Self> {
        let (width, height) = check_pair(&left, &right)?;
        let renderer = EyeRenderer::with_seed(config, width, height, Instant::now(), seed)?;
        Ok(Self::from_parts(renderer, left, right))
    }

    fn from_parts(
        renderer: EyeRenderer,
        left: impl EyeDisplay + 'static,
        right: impl EyeDisplay + 'static,
    ) -> Self {
        Self {
            renderer,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Blank both panels before the first frame
    ///
    /// # Errors
    ///
    /// Returns error if either display fails
    pub fn begin(&mut self) -> Result<()> {
        self.clear()?;
        tracing::debug!(
            mood = %self.renderer.mood(),
            interval_ms = self.renderer.frame_interval().as_millis(),
            "eyes started"
        );
        Ok(())
    }

    #[must_use]
    pub const fn renderer(&self) -> &EyeRenderer {
        &self.renderer
    }

    pub const fn renderer_mut(&mut self) -> &mut EyeRenderer {
        &mut self.renderer
    }

    /// Render and flush if a frame is due; returns whether it drew
    ///
    /// # Errors
    ///
    /// Returns error if either display fails
    pub fn update(&mut self, now: Instant) -> Result<bool> {
        if !self.renderer.frame_due(now) {
            return Ok(false);
        }
        self.draw_frame(now)?;
        Ok(true)
    }

    /// Render and flush unconditionally
    ///
    /// # Errors
    ///
    /// Returns error if either display fails
    pub fn draw_frame(&mut self, now: Instant) -> Result<()> {
        self.renderer.render(now);
        self.left.show(self.renderer.left_frame())?;
        self.right.show(self.renderer.right_frame())?;
        Ok(())
    }

    /// Blank both panels
    ///
    /// # Errors
    ///
    /// Returns error if either display fails
    pub fn clear(&mut self) -> Result<()> {
        self.left.clear()?;
        self.right.clear()
    }

    /// Switch to `mood` and animate until `stop` fires
    ///
    /// # Errors
    ///
    /// Returns error if a display fails
    pub fn run_mood(&mut self, mood: Mood, stop: &StopSignal) -> Result<()> {
        self.renderer.set_mood(mood, Instant::now());
        self.run_until(stop, None)
    }

    /// Switch to `mood` and animate for at most `duration`
    ///
    /// # Errors
    ///
    /// Returns error if a display fails
    pub fn run_mood_for(&mut self, mood: Mood, duration: Duration, stop: &StopSignal) -> Result<()> {
        let now = Instant::now();
        self.renderer.set_mood(mood, now);
        self.run_until(stop, Some(deadline(now, duration)))
    }

    fn run_until(&mut self, stop: &StopSignal, deadline: Option<Instant>) -> Result<()> {
        let mood = self.renderer.mood();
        tracing::debug!(mood = %mood, "mood loop started");

        while !stop.is_stopped() {
            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                break;
            }
            self.update(now)?;
            let mut wait = self.renderer.until_next_frame(Instant::now());
            if let Some(deadline) = deadline {
                wait = wait.min(deadline.saturating_duration_since(Instant::now()));
            }
            if !wait.is_zero() {
                thread::sleep(wait);
            }
        }

        tracing::debug!(mood = %mood, frames = self.renderer.frames(), "mood loop ended");
        Ok(())
    }

    /// Happy eyes until `stop` fires
    ///
    /// # Errors
    ///
    /// Returns error if a display fails
    pub fn happy(&mut self, stop: &StopSignal) -> Result<()> {
        self.run_mood(Mood::Happy, stop)
    }

    /// Tired eyes until `stop` fires
    ///
    /// # Errors
    ///
    /// Returns error if a display fails
    pub fn tired(&mut self, stop: &StopSignal) -> Result<()> {
        self.run_mood(Mood::Tired, stop)
    }

    /// Angry eyes until `stop` fires
    ///
    /// # Errors
    ///
    /// Returns error if a display fails
    pub fn angry(&mut self, stop: &StopSignal) -> Result<()> {
        self.run_mood(Mood::Angry, stop)
    }

    /// Heart eyes until `stop` fires
    ///
    /// # Errors
    ///
    /// Returns error if a display fails
    pub fn love(&mut self, stop: &StopSignal) -> Result<()> {
        self.run_mood(Mood::Love, stop)
    }

    /// Scanner eyes until `stop` fires
    ///
    /// # Errors
    ///
    /// Returns error if a display fails
    pub fn qr(&mut self, stop: &StopSignal) -> Result<()> {
        self.run_mood(Mood::Qr, stop)
    }

    /// Neutral eyes until `stop` fires
    ///
    /// # Errors
    ///
    /// Returns error if a display fails
    pub fn default_mood(&mut self, stop: &StopSignal) -> Result<()> {
        self.run_mood(Mood::Default, stop)
    }
}

fn check_pair(left: &dyn EyeDisplay, right: &dyn EyeDisplay) -> Result<(u32, u32)> {
    let size = left.size();
    if right.size() != size {
        return Err(Error::Display(format!(
            "left panel is {}x{}, right panel is {}x{}",
            size.0,
            size.1,
            right.size().0,
            right.size().1
        )));
    }
    Ok(size)
}
