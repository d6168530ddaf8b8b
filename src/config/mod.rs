//! Configuration management for PEBO
//!
//! Values are resolved env > TOML file > defaults.

pub mod file;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::arms::{ArmsConfig, ServoCalibration};
use crate::eyes::{EyesConfig, MAX_FPS, Mood};
use crate::{Error, Result};

use self::file::PeboConfigFile;

/// Default HTTP API port
pub const DEFAULT_PORT: u16 = 18_800;

/// PEBO configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// OLED panels
    pub display: DisplayConfig,

    /// Eye geometry and animation timers
    pub eyes: EyesConfig,

    /// Arm servos
    pub arms: ArmsSettings,

    /// HTTP control API
    pub server: ServerConfig,

    /// Path to data directory (preview frames, etc)
    pub data_dir: PathBuf,
}

/// Where eye frames go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayBackend {
    /// Two SSD1306 panels on I2C
    #[default]
    Ssd1306,
    /// In-memory only (headless)
    Memory,
    /// Numbered PNG files
    Png,
}

impl FromStr for DisplayBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ssd1306" | "oled" | "i2c" => Ok(Self::Ssd1306),
            "memory" | "headless" | "none" => Ok(Self::Memory),
            "png" => Ok(Self::Png),
            other => Err(Error::Config(format!("unknown display backend: {other}"))),
        }
    }
}

impl std::fmt::Display for DisplayBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Ssd1306 => "ssd1306",
            Self::Memory => "memory",
            Self::Png => "png",
        })
    }
}

/// OLED panel configuration
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub backend: DisplayBackend,

    /// I2C bus number (`/dev/i2c-N`)
    pub i2c_bus: u8,

    /// Left panel address
    pub left_address: u8,

    /// Right panel address
    pub right_address: u8,

    pub width: u32,
    pub height: u32,
    pub rotate_180: bool,
    pub contrast: u8,

    /// Output directory for the png backend
    pub png_dir: PathBuf,
}

/// Arm servo configuration
#[derive(Debug, Clone)]
pub struct ArmsSettings {
    /// Drive the arms at all
    pub enabled: bool,

    /// I2C bus number of the PCA9685
    pub i2c_bus: u8,

    /// PCA9685 address
    pub address: u8,

    /// Servo PWM frequency
    pub frequency_hz: u32,

    /// Channel wiring and pulse range
    pub wiring: ArmsConfig,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Serve the control API
    pub enabled: bool,

    /// Port to listen on
    pub port: u16,

    /// API key for mutating endpoints (from `PEBO_API_KEY` env)
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::resolve(PeboConfigFile::default(), |_| None)
    }
}

impl Config {
    /// Load configuration from env and the config file
    #[must_use]
    pub fn load() -> Self {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with env lookups (env wins)
    #[must_use]
    pub fn resolve(fc: PeboConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        // Determine data directory (~/.local/share/pebo on Linux)
        let data_dir = directories::BaseDirs::new()
            .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("pebo"));

        let display = DisplayConfig {
            backend: env("PEBO_DISPLAY_BACKEND")
                .or(fc.display.backend)
                .and_then(|s| parse_or_warn("display backend", &s))
                .unwrap_or_default(),
            i2c_bus: env("PEBO_I2C_BUS")
                .and_then(|s| s.parse().ok())
                .or(fc.display.i2c_bus)
                .unwrap_or(1),
            left_address: env("PEBO_LEFT_ADDRESS")
                .and_then(|s| parse_address(&s))
                .or(fc.display.left_address)
                .unwrap_or(0x3C),
            right_address: env("PEBO_RIGHT_ADDRESS")
                .and_then(|s| parse_address(&s))
                .or(fc.display.right_address)
                .unwrap_or(0x3D),
            width: fc.display.width.unwrap_or(128),
            height: fc.display.height.unwrap_or(64),
            rotate_180: fc.display.rotate_180.unwrap_or(false),
            contrast: fc.display.contrast.unwrap_or(0xCF),
            png_dir: env("PEBO_PNG_DIR")
                .or(fc.display.png_dir)
                .map_or_else(|| data_dir.join("frames"), PathBuf::from),
        };

        let defaults = EyesConfig::default();
        let secs = |what: &str, value: Option<f64>, default: Duration| {
            let Some(value) = value else {
                return default;
            };
            Duration::try_from_secs_f64(value).unwrap_or_else(|e| {
                tracing::warn!(value, error = %e, "invalid {what} in config, using default");
                default
            })
        };
        let eyes = EyesConfig {
            width: fc.eyes.width.unwrap_or(defaults.width),
            height: fc.eyes.height.unwrap_or(defaults.height),
            border_radius: fc.eyes.border_radius.unwrap_or(defaults.border_radius),
            fps: env("PEBO_FPS")
                .and_then(|s| s.parse().ok())
                .or(fc.eyes.fps)
                .filter(|fps| {
                    let ok = (1..=MAX_FPS).contains(fps);
                    if !ok {
                        tracing::warn!(fps = *fps, max = MAX_FPS, "fps out of range in config, using default");
                    }
                    ok
                })
                .unwrap_or(defaults.fps),
            blink_interval: secs("blink_interval", fc.eyes.blink_interval, defaults.blink_interval),
            blink_variation: secs("blink_variation", fc.eyes.blink_variation, defaults.blink_variation),
            idle: fc.eyes.idle.unwrap_or(defaults.idle),
            idle_interval: secs("idle_interval", fc.eyes.idle_interval, defaults.idle_interval),
            idle_variation: secs("idle_variation", fc.eyes.idle_variation, defaults.idle_variation),
            curious: fc.eyes.curious.unwrap_or(defaults.curious),
            mood: env("PEBO_MOOD")
                .or(fc.eyes.mood)
                .and_then(|s| parse_or_warn::<Mood>("mood", &s))
                .unwrap_or(defaults.mood),
        };

        let wiring_defaults = ArmsConfig::default();
        let arms = ArmsSettings {
            enabled: env("PEBO_ARMS_ENABLED")
                .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
                .or(fc.arms.enabled)
                .unwrap_or(false),
            i2c_bus: fc.arms.i2c_bus.unwrap_or(display.i2c_bus),
            address: fc.arms.address.unwrap_or(0x40),
            frequency_hz: fc.arms.frequency_hz.unwrap_or(50),
            wiring: ArmsConfig {
                left_channel: fc.arms.left_channel.unwrap_or(wiring_defaults.left_channel),
                right_channel: fc.arms.right_channel.unwrap_or(wiring_defaults.right_channel),
                calibration: ServoCalibration {
                    min_pulse_us: fc
                        .arms
                        .min_pulse_us
                        .unwrap_or(wiring_defaults.calibration.min_pulse_us),
                    max_pulse_us: fc
                        .arms
                        .max_pulse_us
                        .unwrap_or(wiring_defaults.calibration.max_pulse_us),
                },
                mirror_right: fc.arms.mirror_right.unwrap_or(wiring_defaults.mirror_right),
            },
        };

        // API server config (env > toml > default)
        let server = ServerConfig {
            enabled: fc.server.enabled.unwrap_or(true),
            port: env("PEBO_PORT")
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
            api_key: env("PEBO_API_KEY")
                .or(fc.server.api_key)
                .filter(|k| !k.is_empty()),
        };

        Self {
            display,
            eyes,
            arms,
            server,
            data_dir,
        }
    }

    /// Check values that can't be fixed up silently
    ///
    /// # Errors
    ///
    /// Returns error if the panels share an address or the eye does not fit
    pub fn validate(&self) -> Result<()> {
        if self.display.backend == DisplayBackend::Ssd1306
            && self.display.left_address == self.display.right_address
        {
            return Err(Error::Config(format!(
                "both panels are at address {:#04x}",
                self.display.left_address
            )));
        }
        if self.eyes.width > self.display.width || self.eyes.height > self.display.height {
            return Err(Error::Config(format!(
                "eye {}x{} does not fit a {}x{} panel",
                self.eyes.width, self.eyes.height, self.display.width, self.display.height
            )));
        }
        if self.eyes.fps == 0 || self.eyes.fps > MAX_FPS {
            return Err(Error::Config(format!(
                "fps {} is outside 1..={MAX_FPS}",
                self.eyes.fps
            )));
        }
        if self.arms.wiring.calibration.min_pulse_us >= self.arms.wiring.calibration.max_pulse_us {
            return Err(Error::Config("servo min pulse must be below max pulse".to_string()));
        }
        Ok(())
    }
}

/// Parse an I2C address written as hex (`0x3c`) or decimal (`60`)
#[must_use]
pub fn parse_address(s: &str) -> Option<u8> {
    let s = s.trim();
    let parsed = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .map_or_else(|| s.parse().ok(), |hex| u8::from_str_radix(hex, 16).ok());
    parsed.filter(|addr| *addr <= 0x7F)
}

fn parse_or_warn<T: FromStr>(what: &str, value: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match value.parse() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(value, error = %e, "invalid {what} in config, using default");
            None
        }
    }
}
