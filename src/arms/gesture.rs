//! Keyframed arm gestures
//!
//! Angles are logical: 0° is the arm hanging down, 180° pointing up, for
//! both arms. Mirroring of the right servo happens in [`super::Arms`].

use std::time::Duration;

use crate::eyes::Mood;

/// Arm pose at a point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub at: Duration,
    pub left: f32,
    pub right: f32,
}

const fn key(ms: u64, left: f32, right: f32) -> Keyframe {
    Keyframe {
        at: Duration::from_millis(ms),
        left,
        right,
    }
}

/// A sequence of poses played back with linear interpolation
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    name: &'static str,
    keyframes: Vec<Keyframe>,
}

impl Gesture {
    /// Build a gesture; keyframes are sorted by time
    #[must_use]
    pub fn new(name: &'static str, mut keyframes: Vec<Keyframe>) -> Self {
        keyframes.sort_by_key(|k| k.at);
        Self { name, keyframes }
    }

    /// Gesture that accompanies a mood
    #[must_use]
    pub fn for_mood(mood: Mood) -> Self {
        match mood {
            Mood::Default => Self::new("rest", vec![key(0, 0.0, 0.0)]),
            Mood::Happy => Self::new(
                "wave",
                vec![
                    key(0, 0.0, 0.0),
                    key(300, 0.0, 150.0),
                    key(600, 0.0, 110.0),
                    key(900, 0.0, 150.0),
                    key(1200, 0.0, 110.0),
                    key(1500, 0.0, 0.0),
                ],
            ),
            Mood::Love => Self::new(
                "hug",
                vec![
                    key(0, 0.0, 0.0),
                    key(500, 90.0, 90.0),
                    key(1500, 90.0, 90.0),
                    key(2000, 0.0, 0.0),
                ],
            ),
            Mood::Angry => Self::new(
                "shake",
                vec![
                    key(0, 0.0, 0.0),
                    key(250, 60.0, 60.0),
                    key(400, 30.0, 30.0),
                    key(550, 60.0, 60.0),
                    key(700, 30.0, 30.0),
                    key(1000, 0.0, 0.0),
                ],
            ),
            Mood::Tired => Self::new(
                "droop",
                vec![key(0, 30.0, 30.0), key(1500, 0.0, 0.0)],
            ),
            Mood::Qr => Self::new("raise", vec![key(0, 0.0, 0.0), key(400, 0.0, 170.0)]),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Time of the last keyframe
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.keyframes.last().map_or(Duration::ZERO, |k| k.at)
    }

    /// Pose at `t`, holding the first and last keyframes outside the range
    #[must_use]
    pub fn sample(&self, t: Duration) -> (f32, f32) {
        let Some(first) = self.keyframes.first() else {
            return (0.0, 0.0);
        };
        if t <= first.at {
            return (first.left, first.right);
        }
        for pair in self.keyframes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.at {
                let span = (b.at - a.at).as_secs_f32();
                if span <= f32::EPSILON {
                    return (b.left, b.right);
                }
                let f = (t - a.at).as_secs_f32() / span;
                return (lerp(a.left, b.left, f), lerp(a.right, b.right, f));
            }
        }
        self.keyframes
            .last()
            .map_or((0.0, 0.0), |k| (k.left, k.right))
    }
}

fn lerp(a: f32, b: f32, f: f32) -> f32 {
    (b - a).mul_add(f, a)
}
