//! Render and servo threads
//!
//! The eyes and the arms each run on a dedicated OS thread that owns the
//! hardware. Everything else talks to them through cloneable handles:
//! commands go in over a channel, eye status comes back over a watch channel.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;

use crate::arms::{Arms, Gesture, ServoDriver};
use crate::display::FrameBuffer;
use crate::eyes::{Animation, BlinkTarget, Mood, Position, RoboEyesDual};
use crate::{Error, Result};

/// Give up after this many display failures in a row
const MAX_DISPLAY_FAILURES: u32 = 50;

/// Servo update period while a gesture plays
const GESTURE_STEP: Duration = Duration::from_millis(20);

/// Commands for the eyes thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EyeCommand {
    SetMood(Mood),
    Look(Position),
    Blink(BlinkTarget),
    Animate(Animation),
    SetCurious(bool),
    Shutdown,
}

/// Snapshot published after every frame
#[derive(Debug, Clone, Serialize)]
pub struct EyesStatus {
    pub mood: Mood,
    pub position: Position,
    pub curious: bool,
    pub frames: u64,
    #[serde(skip)]
    pub left: FrameBuffer,
    #[serde(skip)]
    pub right: FrameBuffer,
}

impl EyesStatus {
    fn snapshot(eyes: &RoboEyesDual) -> Self {
        let r = eyes.renderer();
        Self {
            mood: r.mood(),
            position: r.position(),
            curious: r.curious(),
            frames: r.frames(),
            left: r.left_frame().clone(),
            right: r.right_frame().clone(),
        }
    }
}

/// Cloneable handle to the eyes thread
#[derive(Debug, Clone)]
pub struct EyesHandle {
    tx: mpsc::Sender<EyeCommand>,
    status: watch::Receiver<EyesStatus>,
}

impl EyesHandle {
    /// Queue a command
    ///
    /// # Errors
    ///
    /// Returns error if the eyes thread has stopped
    pub fn send(&self, command: EyeCommand) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| Error::Controller("eyes controller is not running".to_string()))
    }

    /// # Errors
    ///
    /// Returns error if the eyes thread has stopped
    pub fn set_mood(&self, mood: Mood) -> Result<()> {
        self.send(EyeCommand::SetMood(mood))
    }

    /// # Errors
    ///
    /// Returns error if the eyes thread has stopped
    pub fn look(&self, position: Position) -> Result<()> {
        self.send(EyeCommand::Look(position))
    }

    /// # Errors
    ///
    /// Returns error if the eyes thread has stopped
    pub fn blink(&self, target: BlinkTarget) -> Result<()> {
        self.send(EyeCommand::Blink(target))
    }

    /// # Errors
    ///
    /// Returns error if the eyes thread has stopped
    pub fn animate(&self, animation: Animation) -> Result<()> {
        self.send(EyeCommand::Animate(animation))
    }

    /// # Errors
    ///
    /// Returns error if the eyes thread has stopped
    pub fn set_curious(&self, curious: bool) -> Result<()> {
        self.send(EyeCommand::SetCurious(curious))
    }

    /// Latest published status
    #[must_use]
    pub fn status(&self) -> EyesStatus {
        self.status.borrow().clone()
    }

    /// Receiver that wakes on every published frame
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<EyesStatus> {
        self.status.clone()
    }

    /// Whether the eyes thread is still alive
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status.has_changed().is_ok()
    }
}

/// Owner of the eyes thread
#[derive(Debug)]
pub struct EyesController {
    handle: EyesHandle,
    thread: Option<JoinHandle<Result<()>>>,
}

impl EyesController {
    /// Move the eyes onto their own thread and start animating
    ///
    /// # Errors
    ///
    /// Returns error if the thread cannot be spawned
    pub fn spawn(eyes: RoboEyesDual) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let (status_tx, status_rx) = watch::channel(EyesStatus::snapshot(&eyes));

        let thread = thread::Builder::new()
            .name("pebo-eyes".to_string())
            .spawn(move || run_eyes(eyes, &rx, &status_tx))?;

        Ok(Self {
            handle: EyesHandle {
                tx,
                status: status_rx,
            },
            thread: Some(thread),
        })
    }

    #[must_use]
    pub fn handle(&self) -> EyesHandle {
        self.handle.clone()
    }

    /// Stop the thread, blank the panels and wait for it to exit
    ///
    /// # Errors
    ///
    /// Returns the error that ended the thread, if any
    pub fn shutdown(mut self) -> Result<()> {
        // the thread may already be gone after a display failure
        let _ = self.handle.send(EyeCommand::Shutdown);
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| Error::Controller("eyes thread panicked".to_string()))?,
            None => Ok(()),
        }
    }
}

fn run_eyes(
    mut eyes: RoboEyesDual,
    rx: &mpsc::Receiver<EyeCommand>,
    status: &watch::Sender<EyesStatus>,
) -> Result<()> {
    eyes.begin()?;
    tracing::info!(mood = %eyes.renderer().mood(), "eyes running");

    let mut failures = 0u32;
    loop {
        match eyes.update(Instant::now()) {
            Ok(true) => {
                failures = 0;
                status.send_replace(EyesStatus::snapshot(&eyes));
            }
            Ok(false) => {}
            Err(e) => {
                failures += 1;
                tracing::warn!(error = %e, failures, "eye frame failed");
                if failures >= MAX_DISPLAY_FAILURES {
                    tracing::error!("too many display failures, stopping eyes");
                    return Err(e);
                }
            }
        }

        let wait = eyes.renderer().until_next_frame(Instant::now());
        match rx.recv_timeout(wait) {
            Ok(EyeCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(command) => apply(&mut eyes, command),
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    eyes.clear()?;
    tracing::info!(frames = eyes.renderer().frames(), "eyes stopped");
    Ok(())
}

fn apply(eyes: &mut RoboEyesDual, command: EyeCommand) {
    tracing::debug!(?command, "eye command");
    let now = Instant::now();
    let r = eyes.renderer_mut();
    match command {
        EyeCommand::SetMood(mood) => r.set_mood(mood, now),
        EyeCommand::Look(position) => r.set_position(position),
        EyeCommand::Blink(target) => r.blink(target),
        EyeCommand::Animate(animation) => r.animate(animation, now),
        EyeCommand::SetCurious(curious) => r.set_curious(curious),
        EyeCommand::Shutdown => {}
    }
}

/// Commands for the arms thread
#[derive(Debug, Clone, PartialEq)]
pub enum ArmsCommand {
    /// Play the gesture for a mood
    Gesture(Mood),
    /// Move straight to logical angles
    Set { left: f32, right: f32 },
    Rest,
    Shutdown,
}

/// Cloneable handle to the arms thread
#[derive(Debug, Clone)]
pub struct ArmsHandle {
    tx: mpsc::Sender<ArmsCommand>,
}

impl ArmsHandle {
    /// Queue a command; it interrupts any gesture in progress
    ///
    /// # Errors
    ///
    /// Returns error if the arms thread has stopped
    pub fn send(&self, command: ArmsCommand) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| Error::Controller("arms controller is not running".to_string()))
    }

    /// # Errors
    ///
    /// Returns error if the arms thread has stopped
    pub fn gesture(&self, mood: Mood) -> Result<()> {
        self.send(ArmsCommand::Gesture(mood))
    }

    /// # Errors
    ///
    /// Returns error if the arms thread has stopped
    pub fn set(&self, left: f32, right: f32) -> Result<()> {
        self.send(ArmsCommand::Set { left, right })
    }

    /// # Errors
    ///
    /// Returns error if the arms thread has stopped
    pub fn rest(&self) -> Result<()> {
        self.send(ArmsCommand::Rest)
    }
}

/// Owner of the arms thread
#[derive(Debug)]
pub struct ArmsController {
    handle: ArmsHandle,
    thread: Option<JoinHandle<Result<()>>>,
}

impl ArmsController {
    /// Move the arms onto their own thread, starting at rest
    ///
    /// # Errors
    ///
    /// Returns error if the thread cannot be spawned
    pub fn spawn<D: ServoDriver + 'static>(arms: Arms<D>) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("pebo-arms".to_string())
            .spawn(move || run_arms(arms, &rx))?;
        Ok(Self {
            handle: ArmsHandle { tx },
            thread: Some(thread),
        })
    }

    #[must_use]
    pub fn handle(&self) -> ArmsHandle {
        self.handle.clone()
    }

    /// Rest the arms and wait for the thread to exit
    ///
    /// # Errors
    ///
    /// Returns the error that ended the thread, if any
    pub fn shutdown(mut self) -> Result<()> {
        let _ = self.handle.send(ArmsCommand::Shutdown);
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| Error::Controller("arms thread panicked".to_string()))?,
            None => Ok(()),
        }
    }
}

fn run_arms<D: ServoDriver>(mut arms: Arms<D>, rx: &mpsc::Receiver<ArmsCommand>) -> Result<()> {
    arms.rest()?;
    tracing::info!("arms running");

    let mut playing: Option<(Gesture, Instant)> = None;
    loop {
        let received = if playing.is_some() {
            rx.recv_timeout(GESTURE_STEP)
        } else {
            rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        };

        match received {
            Ok(ArmsCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(ArmsCommand::Gesture(mood)) => {
                let gesture = Gesture::for_mood(mood);
                tracing::debug!(gesture = gesture.name(), "gesture started");
                playing = Some((gesture, Instant::now()));
            }
            Ok(ArmsCommand::Set { left, right }) => {
                playing = None;
                if let Err(e) = arms.set_angles(left, right) {
                    tracing::warn!(error = %e, "failed to move arms");
                }
            }
            Ok(ArmsCommand::Rest) => {
                playing = None;
                if let Err(e) = arms.rest() {
                    tracing::warn!(error = %e, "failed to rest arms");
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        if let Some((gesture, started)) = &playing {
            let t = started.elapsed();
            let (left, right) = gesture.sample(t);
            if let Err(e) = arms.set_angles(left, right) {
                tracing::warn!(error = %e, "gesture step failed");
            }
            if t >= gesture.duration() {
                tracing::debug!(gesture = gesture.name(), "gesture finished");
                playing = None;
            }
        }
    }

    arms.rest()?;
    tracing::info!("arms stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arms::{ArmsConfig, MemoryServos, ServoCalibration};
    use crate::display::MemoryDisplay;
    use crate::eyes::EyesConfig;

    fn wait_for(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn eyes_follow_commands() {
        let (left, view) = MemoryDisplay::with_inspector(128, 64);
        let eyes = RoboEyesDual::with_seed(left, MemoryDisplay::new(128, 64), EyesConfig::default(), 3)
            .unwrap();
        let controller = EyesController::spawn(eyes).unwrap();
        let handle = controller.handle();

        handle.set_mood(Mood::Angry).unwrap();
        handle.look(Position::NW).unwrap();
        handle.set_curious(true).unwrap();
        wait_for(|| {
            let s = handle.status();
            s.mood == Mood::Angry && s.position == Position::NW && s.curious
        });
        wait_for(|| view.flushes() > 3);

        assert!(handle.is_running());
        controller.shutdown().unwrap();
        assert_eq!(view.last_frame().unwrap().lit_pixels(), 0);
        assert!(handle.set_mood(Mood::Happy).is_err());
        assert!(!handle.is_running());
    }

    #[test]
    fn arms_play_gestures_and_rest_on_shutdown() {
        let servos = MemoryServos::new();
        let arms = Arms::new(servos.clone(), ArmsConfig::default()).unwrap();
        let controller = ArmsController::spawn(arms).unwrap();
        let handle = controller.handle();

        handle.set(90.0, 90.0).unwrap();
        wait_for(|| servos.last_pulse(0) == Some(1500));

        handle.gesture(Mood::Qr).unwrap();
        // right arm ends raised to 170, mirrored on the servo
        let raised = ServoCalibration::default().pulse_for(180.0 - 170.0);
        wait_for(|| servos.last_pulse(1) == Some(raised));

        controller.shutdown().unwrap();
        assert_eq!(servos.last_pulse(0), Some(500));
        assert_eq!(servos.last_pulse(1), Some(2500));
    }
}
