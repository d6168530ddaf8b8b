//! Servo-driven arms
//!
//! Two hobby servos on a PCA9685 board. [`Arms`] maps logical angles to
//! pulse widths; [`Gesture`]s play mood-specific keyframes.

mod gesture;
mod pca9685;

pub use gesture::{Gesture, Keyframe};
#[cfg(target_os = "linux")]
pub use pca9685::open_pca9685;
pub use pca9685::{CHANNELS, Pca9685, prescale_for};

use std::sync::{Arc, Mutex};

use crate::{Error, Result};

/// Something that can drive servo pulses
pub trait ServoDriver: Send {
    /// Output a pulse of `pulse_us` microseconds on `channel`
    ///
    /// # Errors
    ///
    /// Returns error if the channel is invalid or the bus fails
    fn set_pulse_us(&mut self, channel: u8, pulse_us: u16) -> Result<()>;

    /// Stop driving `channel` so the servo goes limp
    ///
    /// # Errors
    ///
    /// Returns error if the channel is invalid or the bus fails
    fn disable(&mut self, channel: u8) -> Result<()> {
        let _ = channel;
        Ok(())
    }
}

impl<D: ServoDriver + ?Sized> ServoDriver for Box<D> {
    fn set_pulse_us(&mut self, channel: u8, pulse_us: u16) -> Result<()> {
        (**self).set_pulse_us(channel, pulse_us)
    }

    fn disable(&mut self, channel: u8) -> Result<()> {
        (**self).disable(channel)
    }
}

/// Pulse range a servo sweeps 0..=180° over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoCalibration {
    pub min_pulse_us: u16,
    pub max_pulse_us: u16,
}

impl Default for ServoCalibration {
    fn default() -> Self {
        Self {
            min_pulse_us: 500,
            max_pulse_us: 2500,
        }
    }
}

impl ServoCalibration {
    /// Pulse width for `angle` degrees, clamped to 0..=180
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pulse_for(&self, angle: f32) -> u16 {
        let angle = if angle.is_nan() { 0.0 } else { angle.clamp(0.0, 180.0) };
        let span = f32::from(self.max_pulse_us) - f32::from(self.min_pulse_us);
        (f32::from(self.min_pulse_us) + span * angle / 180.0).round() as u16
    }
}

/// Arm wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmsConfig {
    pub left_channel: u8,
    pub right_channel: u8,
    pub calibration: ServoCalibration,
    /// The right servo is mounted mirrored
    pub mirror_right: bool,
}

impl Default for ArmsConfig {
    fn default() -> Self {
        Self {
            left_channel: 0,
            right_channel: 1,
            calibration: ServoCalibration::default(),
            mirror_right: true,
        }
    }
}

/// Left and right arm servos
pub struct Arms<D> {
    driver: D,
    config: ArmsConfig,
    angles: (f32, f32),
}

impl<D: ServoDriver> Arms<D> {
    /// # Errors
    ///
    /// Returns error if a channel is out of range or both arms share one
    pub fn new(driver: D, config: ArmsConfig) -> Result<Self> {
        for channel in [config.left_channel, config.right_channel] {
            if channel >= CHANNELS {
                return Err(Error::Servo(format!("no pwm channel {channel}")));
            }
        }
        if config.left_channel == config.right_channel {
            return Err(Error::Servo(format!(
                "both arms are on channel {}",
                config.left_channel
            )));
        }
        Ok(Self {
            driver,
            config,
            angles: (0.0, 0.0),
        })
    }

    /// Move both arms to logical angles (0° down, 180° up)
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails
    pub fn set_angles(&mut self, left: f32, right: f32) -> Result<()> {
        let cal = self.config.calibration;
        let left = left.clamp(0.0, 180.0);
        let right = right.clamp(0.0, 180.0);
        let right_servo = if self.config.mirror_right { 180.0 - right } else { right };

        self.driver
            .set_pulse_us(self.config.left_channel, cal.pulse_for(left))?;
        self.driver
            .set_pulse_us(self.config.right_channel, cal.pulse_for(right_servo))?;
        self.angles = (left, right);
        Ok(())
    }

    /// Arms down
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails
    pub fn rest(&mut self) -> Result<()> {
        self.set_angles(0.0, 0.0)
    }

    /// Let both servos go limp
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails
    pub fn release(&mut self) -> Result<()> {
        self.driver.disable(self.config.left_channel)?;
        self.driver.disable(self.config.right_channel)
    }

    /// Last commanded logical angles
    #[must_use]
    pub const fn angles(&self) -> (f32, f32) {
        self.angles
    }

    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }
}

/// Servo driver that only records pulses
#[derive(Debug, Clone, Default)]
pub struct MemoryServos {
    pulses: Arc<Mutex<Vec<(u8, u16)>>>,
}

impl MemoryServos {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pulse written, in order
    #[must_use]
    pub fn pulses(&self) -> Vec<(u8, u16)> {
        self.pulses.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Most recent pulse on `channel`
    #[must_use]
    pub fn last_pulse(&self, channel: u8) -> Option<u16> {
        self.pulses().iter().rev().find(|(c, _)| *c == channel).map(|(_, us)| *us)
    }
}

impl ServoDriver for MemoryServos {
    fn set_pulse_us(&mut self, channel: u8, pulse_us: u16) -> Result<()> {
        if channel >= CHANNELS {
            return Err(Error::Servo(format!("no pwm channel {channel}")));
        }
        if let Ok(mut pulses) = self.pulses.lock() {
            pulses.push((channel, pulse_us));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibration_maps_and_clamps() {
        let cal = ServoCalibration::default();
        assert_eq!(cal.pulse_for(0.0), 500);
        assert_eq!(cal.pulse_for(90.0), 1500);
        assert_eq!(cal.pulse_for(180.0), 2500);
        assert_eq!(cal.pulse_for(-20.0), 500);
        assert_eq!(cal.pulse_for(400.0), 2500);
        assert_eq!(cal.pulse_for(f32::NAN), 500);
    }

    #[test]
    fn right_arm_is_mirrored() {
        let servos = MemoryServos::new();
        let mut arms = Arms::new(servos.clone(), ArmsConfig::default()).unwrap();
        arms.set_angles(180.0, 180.0).unwrap();
        assert_eq!(servos.last_pulse(0), Some(2500));
        assert_eq!(servos.last_pulse(1), Some(500));

        arms.rest().unwrap();
        assert_eq!(servos.last_pulse(0), Some(500));
        assert_eq!(servos.last_pulse(1), Some(2500));
        assert_eq!(arms.angles(), (0.0, 0.0));
    }

    #[test]
    fn rejects_bad_wiring() {
        let shared = ArmsConfig {
            right_channel: 0,
            ..ArmsConfig::default()
        };
        assert!(Arms::new(MemoryServos::new(), shared).is_err());

        let missing = ArmsConfig {
            left_channel: 16,
            ..ArmsConfig::default()
        };
        assert!(matches!(
            Arms::new(MemoryServos::new(), missing),
            Err(Error::Servo(_))
        ));
    }
}
