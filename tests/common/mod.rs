//! Shared test utilities

#![allow(dead_code)]

use std::time::Duration;

use pebo::api::ApiServerBuilder;
use pebo::arms::{Arms, ArmsConfig, MemoryServos};
use pebo::display::{MemoryDisplay, MemoryDisplayInspector};
use pebo::eyes::EyesConfig;
use pebo::{ArmsController, EyesController, RoboEyesDual};

pub const TEST_API_KEY: &str = "test-api-key";

/// Eyes without idle wandering so positions stay put
#[must_use]
pub fn quiet_eyes_config() -> EyesConfig {
    EyesConfig {
        idle: false,
        ..EyesConfig::default()
    }
}

/// Spawn an eyes controller on two in-memory panels
pub fn spawn_eyes() -> (EyesController, MemoryDisplayInspector, MemoryDisplayInspector) {
    let (left, left_view) = MemoryDisplay::with_inspector(128, 64);
    let (right, right_view) = MemoryDisplay::with_inspector(128, 64);
    let eyes = RoboEyesDual::with_seed(left, right, quiet_eyes_config(), 42)
        .expect("failed to create eyes");
    let controller = EyesController::spawn(eyes).expect("failed to spawn eyes");
    (controller, left_view, right_view)
}

/// Spawn an arms controller on recording servos
pub fn spawn_arms() -> (ArmsController, MemoryServos) {
    let servos = MemoryServos::new();
    let arms = Arms::new(servos.clone(), ArmsConfig::default()).expect("failed to create arms");
    let controller = ArmsController::spawn(arms).expect("failed to spawn arms");
    (controller, servos)
}

/// Build the API router around running controllers
pub fn build_router(
    eyes: &EyesController,
    arms: Option<&ArmsController>,
    api_key: Option<&str>,
) -> axum::Router {
    ApiServerBuilder::new(eyes.handle(), 0)
        .api_key(api_key.map(ToString::to_string))
        .arms(arms.map(ArmsController::handle))
        .build()
        .router()
}

/// Poll `condition` for up to two seconds
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
