//! PEBO daemon - owns the panels, the servo board and the API server

use tokio::sync::mpsc;

use crate::api::ApiServerBuilder;
use crate::arms::{Arms, ServoDriver};
use crate::config::{ArmsSettings, DisplayBackend, DisplayConfig};
use crate::controller::{ArmsController, EyesController};
use crate::display::{EyeDisplay, MemoryDisplay, PngDisplay};
use crate::eyes::RoboEyesDual;
use crate::{Config, Error, Result};

/// Left and right panels, boxed so backends can be mixed at runtime
pub type DisplayPair = (Box<dyn EyeDisplay>, Box<dyn EyeDisplay>);

/// The main PEBO daemon
pub struct Daemon {
    config: Config,
}

impl Daemon {
    /// Create a new daemon instance
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is inconsistent
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Run the daemon until ctrl-c
    ///
    /// # Errors
    ///
    /// Returns error if the panels cannot be opened or a worker fails
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            backend = %self.config.display.backend,
            mood = %self.config.eyes.mood,
            "daemon starting"
        );

        let (left, right) = open_displays(&self.config.display)?;
        let eyes = RoboEyesDual::new(left, right, self.config.eyes.clone())?;
        let eyes = EyesController::spawn(eyes)?;

        let arms = match open_arms(&self.config.arms) {
            Some(arms) => Some(ArmsController::spawn(arms)?),
            None => None,
        };

        // Set up shutdown signal
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        let api = if self.config.server.enabled {
            let server = ApiServerBuilder::new(eyes.handle(), self.config.server.port)
                .api_key(self.config.server.api_key.clone())
                .arms(arms.as_ref().map(ArmsController::handle))
                .build();
            Some(server.spawn())
        } else {
            tracing::info!("API server disabled");
            None
        };

        let outcome = match api {
            Some(mut api) => {
                let finished = tokio::select! {
                    _ = shutdown_rx.recv() => None,
                    joined = &mut api => Some(joined),
                };
                match finished {
                    None => {
                        tracing::info!("shutdown requested");
                        api.abort();
                        Ok(())
                    }
                    Some(Ok(result)) => result,
                    Some(Err(e)) => Err(Error::Api(format!("API task failed: {e}"))),
                }
            }
            None => {
                shutdown_rx.recv().await;
                tracing::info!("shutdown requested");
                Ok(())
            }
        };

        // joining the worker threads blocks
        let stopped = tokio::task::spawn_blocking(move || {
            let eyes = eyes.shutdown();
            let arms = arms.map_or(Ok(()), ArmsController::shutdown);
            eyes.and(arms)
        })
        .await
        .map_err(|e| Error::Controller(format!("shutdown task failed: {e}")))?;

        tracing::info!("daemon stopped");
        outcome.and(stopped)
    }
}

/// Open the left and right panels for the configured backend
///
/// # Errors
///
/// Returns error if a panel cannot be opened
pub fn open_displays(config: &DisplayConfig) -> Result<DisplayPair> {
    match config.backend {
        DisplayBackend::Memory => Ok((
            Box::new(MemoryDisplay::new(config.width, config.height)),
            Box::new(MemoryDisplay::new(config.width, config.height)),
        )),
        DisplayBackend::Png => Ok((
            Box::new(PngDisplay::new(
                &config.png_dir,
                "left",
                config.width,
                config.height,
            )?),
            Box::new(PngDisplay::new(
                &config.png_dir,
                "right",
                config.width,
                config.height,
            )?),
        )),
        DisplayBackend::Ssd1306 => open_oled_pair(config),
    }
}

#[cfg(target_os = "linux")]
fn open_oled_pair(config: &DisplayConfig) -> Result<DisplayPair> {
    use crate::display::{Ssd1306Config, open_i2c_display};

    let panel = |address| Ssd1306Config {
        address,
        width: config.width,
        height: config.height,
        rotate_180: config.rotate_180,
        contrast: config.contrast,
    };
    let left = open_i2c_display(config.i2c_bus, panel(config.left_address))?;
    let right = open_i2c_display(config.i2c_bus, panel(config.right_address))?;
    Ok((Box::new(left), Box::new(right)))
}

#[cfg(not(target_os = "linux"))]
fn open_oled_pair(_config: &DisplayConfig) -> Result<DisplayPair> {
    Err(Error::Display(
        "ssd1306 panels need linux i2c; use --backend png or memory".to_string(),
    ))
}

/// Open the servo board; a missing board only disables the arms
#[must_use]
pub fn open_arms(settings: &ArmsSettings) -> Option<Arms<Box<dyn ServoDriver>>> {
    if !settings.enabled {
        return None;
    }

    match open_servo_driver(settings).and_then(|driver| Arms::new(driver, settings.wiring)) {
        Ok(arms) => Some(arms),
        Err(e) => {
            tracing::warn!(error = %e, "arms unavailable, continuing without them");
            None
        }
    }
}

#[cfg(target_os = "linux")]
fn open_servo_driver(settings: &ArmsSettings) -> Result<Box<dyn ServoDriver>> {
    let pca = crate::arms::open_pca9685(settings.i2c_bus, settings.address, settings.frequency_hz)?;
    Ok(Box::new(pca))
}

#[cfg(not(target_os = "linux"))]
fn open_servo_driver(_settings: &ArmsSettings) -> Result<Box<dyn ServoDriver>> {
    Err(Error::Servo("pca9685 needs linux i2c".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headless() -> Config {
        let mut config = Config::default();
        config.display.backend = DisplayBackend::Memory;
        config
    }

    #[test]
    fn memory_backend_opens_matching_pair() {
        let (left, right) = open_displays(&headless().display).unwrap();
        assert_eq!(left.size(), (128, 64));
        assert_eq!(left.size(), right.size());
    }

    #[test]
    fn png_backend_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = headless();
        config.display.backend = DisplayBackend::Png;
        config.display.png_dir = dir.path().join("frames");

        open_displays(&config.display).unwrap();
        assert!(config.display.png_dir.is_dir());
    }

    #[test]
    fn disabled_arms_are_skipped() {
        assert!(open_arms(&headless().arms).is_none());
    }

    #[test]
    fn new_rejects_invalid_config() {
        let mut config = headless();
        config.eyes.width = 200;
        assert!(Daemon::new(config).is_err());
        assert!(Daemon::new(headless()).is_ok());
    }
}
