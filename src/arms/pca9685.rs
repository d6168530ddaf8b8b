//! PCA9685 16-channel PWM driver

use std::thread;
use std::time::Duration;

use embedded_hal::i2c::I2c;

use super::ServoDriver;
use crate::{Error, Result};

/// Internal oscillator frequency
const OSCILLATOR_HZ: u32 = 25_000_000;

/// PWM resolution
const STEPS: u32 = 4096;

pub const CHANNELS: u8 = 16;

mod reg {
    pub const MODE1: u8 = 0x00;
    pub const LED0_ON_L: u8 = 0x06;
    pub const PRESCALE: u8 = 0xFE;
}

mod mode1 {
    pub const RESTART: u8 = 0x80;
    pub const AUTO_INCREMENT: u8 = 0x20;
    pub const SLEEP: u8 = 0x10;
}

/// Prescale register value for a PWM frequency
///
/// # Errors
///
/// Returns error if the frequency is outside what the chip can generate
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn prescale_for(frequency_hz: u32) -> Result<u8> {
    if frequency_hz == 0 {
        return Err(Error::Servo("pwm frequency must be non-zero".to_string()));
    }
    let exact = f64::from(OSCILLATOR_HZ) / (f64::from(STEPS) * f64::from(frequency_hz));
    let prescale = exact.round() - 1.0;
    if !(3.0..=255.0).contains(&prescale) {
        return Err(Error::Servo(format!(
            "pwm frequency {frequency_hz} Hz is out of range"
        )));
    }
    Ok(prescale as u8)
}

/// PCA9685 on an I2C bus
pub struct Pca9685<I2C> {
    i2c: I2C,
    address: u8,
    frequency_hz: u32,
}

impl<I2C: I2c> Pca9685<I2C> {
    #[must_use]
    pub const fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            frequency_hz: 50,
        }
    }

    /// Program the PWM frequency and wake the chip
    ///
    /// # Errors
    ///
    /// Returns error for unsupported frequencies or bus failures
    pub fn init(&mut self, frequency_hz: u32) -> Result<()> {
        let prescale = prescale_for(frequency_hz)?;

        // prescale can only be written while asleep
        self.write(&[reg::MODE1, mode1::SLEEP])?;
        self.write(&[reg::PRESCALE, prescale])?;
        self.write(&[reg::MODE1, mode1::AUTO_INCREMENT])?;
        thread::sleep(Duration::from_micros(500));
        self.write(&[reg::MODE1, mode1::AUTO_INCREMENT | mode1::RESTART])?;

        self.frequency_hz = frequency_hz;
        tracing::debug!(
            address = %format!("{:#04x}", self.address),
            frequency_hz,
            prescale,
            "pca9685 initialized"
        );
        Ok(())
    }

    #[must_use]
    pub const fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    /// Ticks out of 4096 for a pulse width at the current frequency
    #[must_use]
    pub fn ticks_for(&self, pulse_us: u16) -> u16 {
        let ticks = u64::from(pulse_us) * u64::from(self.frequency_hz) * u64::from(STEPS) / 1_000_000;
        u16::try_from(ticks.min(u64::from(STEPS - 1))).unwrap_or(4095)
    }

    /// Raw on/off tick counts for a channel
    ///
    /// # Errors
    ///
    /// Returns error for channels above 15 or bus failures
    pub fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<()> {
        if channel >= CHANNELS {
            return Err(Error::Servo(format!("no pwm channel {channel}")));
        }
        let [on_l, on_h] = on.to_le_bytes();
        let [off_l, off_h] = off.to_le_bytes();
        self.write(&[reg::LED0_ON_L + 4 * channel, on_l, on_h, off_l, off_h])
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.i2c
            .write(self.address, bytes)
            .map_err(|e| Error::I2c(format!("write to {:#04x} failed: {e:?}", self.address)))
    }
}

impl<I2C: I2c + Send> ServoDriver for Pca9685<I2C> {
    fn set_pulse_us(&mut self, channel: u8, pulse_us: u16) -> Result<()> {
        let off = self.ticks_for(pulse_us);
        self.set_pwm(channel, 0, off)
    }

    fn disable(&mut self, channel: u8) -> Result<()> {
        // full-off bit
        self.set_pwm(channel, 0, 0x1000)
    }
}

/// Open `/dev/i2c-<bus>` and initialise the PCA9685 at `address`
///
/// # Errors
///
/// Returns error if the bus cannot be opened or the chip does not answer
#[cfg(target_os = "linux")]
pub fn open_pca9685(
    bus: u8,
    address: u8,
    frequency_hz: u32,
) -> Result<Pca9685<linux_embedded_hal::I2cdev>> {
    let path = format!("/dev/i2c-{bus}");
    let dev = linux_embedded_hal::I2cdev::new(&path)
        .map_err(|e| Error::I2c(format!("failed to open {path}: {e:?}")))?;
    let mut pca = Pca9685::new(dev, address);
    pca.init(frequency_hz)?;
    tracing::info!(bus = %path, address = %format!("{address:#04x}"), "servo driver ready");
    Ok(pca)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::test_bus::RecordingBus;

    #[test]
    fn prescale_values() {
        assert_eq!(prescale_for(50).unwrap(), 121);
        assert_eq!(prescale_for(60).unwrap(), 101);
        assert!(prescale_for(0).is_err());
        assert!(prescale_for(5000).is_err());
        assert!(prescale_for(10).is_err());
    }

    #[test]
    fn init_sleeps_sets_prescale_and_wakes() {
        let bus = RecordingBus::default();
        let mut pca = Pca9685::new(bus.clone(), 0x40);
        pca.init(50).unwrap();

        let writes = bus.writes.lock().unwrap();
        let bytes: Vec<Vec<u8>> = writes.iter().map(|(_, b)| b.clone()).collect();
        assert_eq!(
            bytes,
            vec![
                vec![reg::MODE1, mode1::SLEEP],
                vec![reg::PRESCALE, 121],
                vec![reg::MODE1, mode1::AUTO_INCREMENT],
                vec![reg::MODE1, mode1::AUTO_INCREMENT | mode1::RESTART],
            ]
        );
        assert!(writes.iter().all(|(addr, _)| *addr == 0x40));
    }

    #[test]
    fn pulse_writes_channel_registers() {
        let bus = RecordingBus::default();
        let mut pca = Pca9685::new(bus.clone(), 0x40);
        pca.set_pulse_us(2, 1500).unwrap();

        // 1500us at 50 Hz = 307 ticks
        let writes = bus.writes.lock().unwrap();
        assert_eq!(writes[0].1, vec![0x06 + 8, 0, 0, 0x33, 0x01]);
    }

    #[test]
    fn ticks_saturate() {
        let pca = Pca9685::new(RecordingBus::default(), 0x40);
        assert_eq!(pca.ticks_for(0), 0);
        assert_eq!(pca.ticks_for(u16::MAX), 4095);
    }

    #[test]
    fn rejects_bad_channel() {
        let mut pca = Pca9685::new(RecordingBus::default(), 0x40);
        assert!(matches!(pca.set_pulse_us(16, 1500), Err(Error::Servo(_))));
    }

    #[test]
    fn disable_sets_full_off() {
        let bus = RecordingBus::default();
        let mut pca = Pca9685::new(bus.clone(), 0x40);
        pca.disable(0).unwrap();
        assert_eq!(bus.writes.lock().unwrap()[0].1, vec![0x06, 0, 0, 0x00, 0x10]);
    }
}
