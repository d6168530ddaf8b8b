//! Error types for PEBO

use thiserror::Error;

/// Result type alias for PEBO operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in PEBO
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Display error (size mismatch, unsupported panel)
    #[error("display error: {0}")]
    Display(String),

    /// I2C bus error
    #[error("i2c error: {0}")]
    I2c(String),

    /// Servo / PWM driver error
    #[error("servo error: {0}")]
    Servo(String),

    /// Eyes renderer error
    #[error("eyes error: {0}")]
    Eyes(String),

    /// Unknown mood name
    #[error("invalid mood: {0}")]
    InvalidMood(String),

    /// Unknown gaze position
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// Render or servo thread is gone
    #[error("controller error: {0}")]
    Controller(String),

    /// HTTP API error
    #[error("api error: {0}")]
    Api(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Image encoding error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}
