//! PEBO - desk companion robot runtime
//!
//! This library provides the core functionality for PEBO:
//! - Animated eyes on two SSD1306 OLED panels
//! - Servo arms on a PCA9685 board, with mood gestures
//! - A local HTTP API so other processes can change moods
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │        HTTP API  (voice assistant, reminders)        │
//! └────────────────────┬────────────────────────────────┘
//!                      │ EyesHandle / ArmsHandle
//! ┌────────────────────▼────────────────────────────────┐
//! │   Eyes thread (RoboEyesDual)  │  Arms thread        │
//! └────────────────────┬────────────────────────────────┘
//!                      │ EyeDisplay / ServoDriver
//! ┌────────────────────▼────────────────────────────────┐
//! │     SSD1306 x2 (I2C)  │  PCA9685 (I2C)  │  PNG       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod arms;
pub mod config;
pub mod controller;
pub mod daemon;
pub mod display;
pub mod error;
pub mod eyes;
pub mod lifecycle;
pub mod preview;

pub use config::Config;
pub use controller::{ArmsController, ArmsHandle, EyesController, EyesHandle};
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use eyes::{Mood, Position, RoboEyesDual};
