//! Mood loops on in-memory panels

use std::thread;
use std::time::{Duration, Instant};

use pebo::display::MemoryDisplay;
use pebo::eyes::{EyesConfig, Mood, RoboEyesDual, StopSignal};

mod common;
use common::quiet_eyes_config;

#[test]
fn test_run_mood_for_stops_at_deadline() {
    let (left, left_view) = MemoryDisplay::with_inspector(128, 64);
    let (right, right_view) = MemoryDisplay::with_inspector(128, 64);
    let mut eyes = RoboEyesDual::with_seed(left, right, quiet_eyes_config(), 1).unwrap();

    let started = Instant::now();
    eyes.run_mood_for(Mood::Happy, Duration::from_millis(300), &StopSignal::new())
        .unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_secs(2));
    assert_eq!(eyes.renderer().mood(), Mood::Happy);
    assert!(left_view.flushes() > 2);
    assert_eq!(left_view.flushes(), right_view.flushes());
    assert!(left_view.last_frame().unwrap().lit_pixels() > 0);
}

#[test]
fn test_stop_signal_ends_run_mood() {
    let left = MemoryDisplay::new(128, 64);
    let right = MemoryDisplay::new(128, 64);
    let mut eyes = RoboEyesDual::with_seed(left, right, EyesConfig::default(), 2).unwrap();

    let stop = StopSignal::new();
    let remote = stop.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        remote.stop();
    });

    eyes.tired(&stop).unwrap();
    stopper.join().unwrap();

    assert!(stop.is_stopped());
    assert_eq!(eyes.renderer().mood(), Mood::Tired);
    assert!(eyes.renderer().frames() > 0);
}

#[test]
fn test_every_mood_draws_both_eyes() {
    for mood in Mood::ALL {
        let left = MemoryDisplay::new(128, 64);
        let right = MemoryDisplay::new(128, 64);
        let mut eyes = RoboEyesDual::with_seed(left, right, quiet_eyes_config(), 5).unwrap();
        eyes.begin().unwrap();

        let start = Instant::now();
        eyes.renderer_mut().set_mood(mood, start);
        for i in 0..20u32 {
            eyes.draw_frame(start + Duration::from_millis(33) * i).unwrap();
        }

        let r = eyes.renderer();
        assert!(r.left_frame().lit_pixels() > 0, "{mood} left eye is blank");
        assert!(r.right_frame().lit_pixels() > 0, "{mood} right eye is blank");
    }
}

#[test]
fn test_mismatched_panels_are_rejected() {
    let left = MemoryDisplay::new(128, 64);
    let right = MemoryDisplay::new(128, 32);
    assert!(RoboEyesDual::new(left, right, EyesConfig::default()).is_err());
}
