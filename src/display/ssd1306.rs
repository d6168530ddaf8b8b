//! SSD1306 OLED driver over I2C
//!
//! Generic over [`embedded_hal::i2c::I2c`] so the same driver runs on the Pi
//! (`linux-embedded-hal`) and against a recording bus in tests.

use embedded_hal::i2c::I2c;

use super::{EyeDisplay, FrameBuffer, check_frame_size};
use crate::{Error, Result};

/// Control byte for a command stream
const CONTROL_COMMAND: u8 = 0x00;

/// Control byte for a data stream
const CONTROL_DATA: u8 = 0x40;

/// Max data bytes per I2C write
const DATA_CHUNK: usize = 32;

mod cmd {
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const SET_CLOCK_DIV: u8 = 0xD5;
    pub const SET_MULTIPLEX: u8 = 0xA8;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_START_LINE: u8 = 0x40;
    pub const CHARGE_PUMP: u8 = 0x8D;
    pub const MEMORY_MODE: u8 = 0x20;
    pub const SEG_REMAP_NORMAL: u8 = 0xA0;
    pub const SEG_REMAP_FLIPPED: u8 = 0xA1;
    pub const COM_SCAN_INC: u8 = 0xC0;
    pub const COM_SCAN_DEC: u8 = 0xC8;
    pub const SET_COM_PINS: u8 = 0xDA;
    pub const SET_CONTRAST: u8 = 0x81;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_VCOM_DETECT: u8 = 0xDB;
    pub const RESUME_RAM: u8 = 0xA4;
    pub const NORMAL_DISPLAY: u8 = 0xA6;
    pub const DEACTIVATE_SCROLL: u8 = 0x2E;
    pub const COLUMN_ADDR: u8 = 0x21;
    pub const PAGE_ADDR: u8 = 0x22;
}

/// Panel settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ssd1306Config {
    /// 7-bit I2C address (0x3C or 0x3D)
    pub address: u8,
    /// Panel width in pixels
    pub width: u32,
    /// Panel height in pixels (32 or 64)
    pub height: u32,
    /// Mount the panel upside down
    pub rotate_180: bool,
    /// Contrast 0..=255
    pub contrast: u8,
}

impl Default for Ssd1306Config {
    fn default() -> Self {
        Self {
            address: 0x3C,
            width: 128,
            height: 64,
            rotate_180: false,
            contrast: 0xCF,
        }
    }
}

/// SSD1306 panel on an I2C bus
pub struct Ssd1306<I2C> {
    i2c: I2C,
    config: Ssd1306Config,
}

impl<I2C: I2c> Ssd1306<I2C> {
    /// Wrap a bus; call [`Ssd1306::init`] before showing frames
    ///
    /// # Errors
    ///
    /// Returns error for unsupported panel heights
    pub fn new(i2c: I2C, config: Ssd1306Config) -> Result<Self> {
        if config.height != 32 && config.height != 64 {
            return Err(Error::Display(format!(
                "unsupported SSD1306 height {}",
                config.height
            )));
        }
        if config.width == 0 || config.width > 128 {
            return Err(Error::Display(format!(
                "unsupported SSD1306 width {}",
                config.width
            )));
        }
        Ok(Self { i2c, config })
    }

    /// Send the power-on sequence
    ///
    /// # Errors
    ///
    /// Returns error if the bus write fails
    #[allow(clippy::cast_possible_truncation)]
    pub fn init(&mut self) -> Result<()> {
        let (seg_remap, com_scan) = if self.config.rotate_180 {
            (cmd::SEG_REMAP_NORMAL, cmd::COM_SCAN_INC)
        } else {
            (cmd::SEG_REMAP_FLIPPED, cmd::COM_SCAN_DEC)
        };
        let com_pins = if self.config.height == 32 { 0x02 } else { 0x12 };

        self.commands(&[
            cmd::DISPLAY_OFF,
            cmd::SET_CLOCK_DIV,
            0x80,
            cmd::SET_MULTIPLEX,
            (self.config.height - 1) as u8,
            cmd::SET_DISPLAY_OFFSET,
            0x00,
            cmd::SET_START_LINE,
            cmd::CHARGE_PUMP,
            0x14,
            cmd::MEMORY_MODE,
            0x00,
            seg_remap,
            com_scan,
            cmd::SET_COM_PINS,
            com_pins,
            cmd::SET_CONTRAST,
            self.config.contrast,
            cmd::SET_PRECHARGE,
            0xF1,
            cmd::SET_VCOM_DETECT,
            0x40,
            cmd::RESUME_RAM,
            cmd::NORMAL_DISPLAY,
            cmd::DEACTIVATE_SCROLL,
            cmd::DISPLAY_ON,
        ])?;

        tracing::debug!(
            address = %format!("{:#04x}", self.config.address),
            width = self.config.width,
            height = self.config.height,
            "ssd1306 initialized"
        );
        Ok(())
    }

    /// Set panel contrast
    ///
    /// # Errors
    ///
    /// Returns error if the bus write fails
    pub fn set_contrast(&mut self, contrast: u8) -> Result<()> {
        self.config.contrast = contrast;
        self.commands(&[cmd::SET_CONTRAST, contrast])
    }

    /// Switch the panel on or off (RAM is kept)
    ///
    /// # Errors
    ///
    /// Returns error if the bus write fails
    pub fn set_display_on(&mut self, on: bool) -> Result<()> {
        self.commands(&[if on { cmd::DISPLAY_ON } else { cmd::DISPLAY_OFF }])
    }

    /// Release the bus
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn commands(&mut self, commands: &[u8]) -> Result<()> {
        let mut buf = Vec::with_capacity(commands.len() + 1);
        buf.push(CONTROL_COMMAND);
        buf.extend_from_slice(commands);
        self.write(&buf)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.i2c
            .write(self.config.address, bytes)
            .map_err(|e| Error::I2c(format!("write to {:#04x} failed: {e:?}", self.config.address)))
    }
}

impl<I2C: I2c + Send> EyeDisplay for Ssd1306<I2C> {
    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn show(&mut self, frame: &FrameBuffer) -> Result<()> {
        check_frame_size(frame, self.size())?;

        let last_column = (self.config.width - 1) as u8;
        let last_page = (self.config.height / 8 - 1) as u8;
        self.commands(&[cmd::COLUMN_ADDR, 0, last_column, cmd::PAGE_ADDR, 0, last_page])?;

        let mut buf = [0u8; DATA_CHUNK + 1];
        buf[0] = CONTROL_DATA;
        for chunk in frame.as_bytes().chunks(DATA_CHUNK) {
            buf[1..=chunk.len()].copy_from_slice(chunk);
            let len = chunk.len() + 1;
            self.i2c
                .write(self.config.address, &buf[..len])
                .map_err(|e| {
                    Error::I2c(format!(
                        "data write to {:#04x} failed: {e:?}",
                        self.config.address
                    ))
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::test_bus::RecordingBus;

    #[test]
    fn init_sends_command_stream() {
        let bus = RecordingBus::default();
        let mut display = Ssd1306::new(bus.clone(), Ssd1306Config::default()).unwrap();
        display.init().unwrap();

        let writes = bus.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        let (addr, bytes) = &writes[0];
        assert_eq!(*addr, 0x3C);
        assert_eq!(bytes[0], CONTROL_COMMAND);
        assert_eq!(bytes[1], cmd::DISPLAY_OFF);
        assert_eq!(*bytes.last().unwrap(), cmd::DISPLAY_ON);
        // multiplex ratio = height - 1
        let mux = bytes.iter().position(|&b| b == cmd::SET_MULTIPLEX).unwrap();
        assert_eq!(bytes[mux + 1], 63);
    }

    #[test]
    fn rotation_flips_scan_direction() {
        let bus = RecordingBus::default();
        let config = Ssd1306Config {
            rotate_180: true,
            ..Ssd1306Config::default()
        };
        let mut display = Ssd1306::new(bus.clone(), config).unwrap();
        display.init().unwrap();

        let writes = bus.writes.lock().unwrap();
        assert!(writes[0].1.contains(&cmd::COM_SCAN_INC));
        assert!(!writes[0].1.contains(&cmd::COM_SCAN_DEC));
    }

    #[test]
    fn show_streams_full_frame() {
        let bus = RecordingBus::default();
        let mut display = Ssd1306::new(
            bus.clone(),
            Ssd1306Config {
                address: 0x3D,
                ..Ssd1306Config::default()
            },
        )
        .unwrap();

        let mut frame = FrameBuffer::new(128, 64);
        frame.set_pixel(0, 0, true);
        display.show(&frame).unwrap();

        let writes = bus.writes.lock().unwrap();
        // window + 1024 / 32 data chunks
        assert_eq!(writes.len(), 1 + 32);
        assert_eq!(
            writes[0].1,
            vec![CONTROL_COMMAND, cmd::COLUMN_ADDR, 0, 127, cmd::PAGE_ADDR, 0, 7]
        );
        assert!(writes.iter().all(|(addr, _)| *addr == 0x3D));
        assert_eq!(writes[1].1[0], CONTROL_DATA);
        assert_eq!(writes[1].1[1], 0x01);
        let data: usize = writes[1..].iter().map(|(_, b)| b.len() - 1).sum();
        assert_eq!(data, 1024);
    }

    #[test]
    fn rejects_bad_panels_and_frames() {
        let bus = RecordingBus::default();
        let bad = Ssd1306Config {
            height: 48,
            ..Ssd1306Config::default()
        };
        assert!(Ssd1306::new(bus.clone(), bad).is_err());

        let mut display = Ssd1306::new(bus, Ssd1306Config::default()).unwrap();
        assert!(display.show(&FrameBuffer::new(64, 64)).is_err());
    }

    #[test]
    fn contrast_and_power() {
        let bus = RecordingBus::default();
        let mut display = Ssd1306::new(bus.clone(), Ssd1306Config::default()).unwrap();
        display.set_contrast(0x10).unwrap();
        display.set_display_on(false).unwrap();

        let writes = bus.writes.lock().unwrap();
        assert_eq!(writes[0].1, vec![CONTROL_COMMAND, cmd::SET_CONTRAST, 0x10]);
        assert_eq!(writes[1].1, vec![CONTROL_COMMAND, cmd::DISPLAY_OFF]);
    }

    #[test]
    fn bus_failure_is_reported() {
        let bus = RecordingBus {
            fail: true,
            ..RecordingBus::default()
        };
        let mut display = Ssd1306::new(bus, Ssd1306Config::default()).unwrap();
        let err = display.init().unwrap_err();
        assert!(matches!(err, Error::I2c(_)));
    }
}
