//! TOML configuration file loading
//!
//! Supports `~/.config/pebo/config.toml` as a persistent config source.
//! Every field is optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct PeboConfigFile {
    #[serde(default)]
    pub display: DisplayFileConfig,

    #[serde(default)]
    pub eyes: EyesFileConfig,

    #[serde(default)]
    pub arms: ArmsFileConfig,

    #[serde(default)]
    pub server: ServerFileConfig,
}

/// OLED panels
#[derive(Debug, Default, Deserialize)]
pub struct DisplayFileConfig {
    /// "ssd1306", "memory" or "png"
    pub backend: Option<String>,
    pub i2c_bus: Option<u8>,
    pub left_address: Option<u8>,
    pub right_address: Option<u8>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub rotate_180: Option<bool>,
    pub contrast: Option<u8>,
    /// Output directory for the png backend
    pub png_dir: Option<String>,
}

/// Eye geometry and timers; durations in seconds
#[derive(Debug, Default, Deserialize)]
pub struct EyesFileConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub border_radius: Option<u32>,
    pub fps: Option<u32>,
    pub blink_interval: Option<f64>,
    pub blink_variation: Option<f64>,
    pub idle: Option<bool>,
    pub idle_interval: Option<f64>,
    pub idle_variation: Option<f64>,
    pub curious: Option<bool>,
    pub mood: Option<String>,
}

/// Arm servos on a PCA9685
#[derive(Debug, Default, Deserialize)]
pub struct ArmsFileConfig {
    pub enabled: Option<bool>,
    pub i2c_bus: Option<u8>,
    pub address: Option<u8>,
    pub frequency_hz: Option<u32>,
    pub left_channel: Option<u8>,
    pub right_channel: Option<u8>,
    pub min_pulse_us: Option<u16>,
    pub max_pulse_us: Option<u16>,
    pub mirror_right: Option<bool>,
}

/// HTTP control API
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub enabled: Option<bool>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `PeboConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> PeboConfigFile {
    config_file_path().map_or_else(PeboConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_config_file_from(path: &Path) -> PeboConfigFile {
    if !path.exists() {
        return PeboConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                PeboConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            PeboConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/pebo/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("pebo").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let fc: PeboConfigFile = toml::from_str(
            r#"
            [display]
            backend = "memory"
            left_address = 0x3c

            [eyes]
            fps = 24
            blink_interval = 2.5
            mood = "happy"
            "#,
        )
        .unwrap();

        assert_eq!(fc.display.backend.as_deref(), Some("memory"));
        assert_eq!(fc.display.left_address, Some(0x3C));
        assert_eq!(fc.display.right_address, None);
        assert_eq!(fc.eyes.fps, Some(24));
        assert_eq!(fc.eyes.blink_interval, Some(2.5));
        assert!(fc.arms.enabled.is_none());
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[display\nbackend = ").unwrap();
        let fc = load_config_file_from(&path);
        assert!(fc.display.backend.is_none());
    }

    #[test]
    fn missing_file_is_default() {
        let fc = load_config_file_from(Path::new("/nonexistent/pebo.toml"));
        assert!(fc.server.port.is_none());
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 9000\napi_key = \"k\"\n").unwrap();
        let fc = load_config_file_from(&path);
        assert_eq!(fc.server.port, Some(9000));
        assert_eq!(fc.server.api_key.as_deref(), Some("k"));
    }
}
