//! Eye geometry and per-frame blending

/// A scalar that eases toward its target one frame at a time
///
/// Each step moves `current` halfway to the target and snaps once the
/// remaining distance is a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tween {
    pub current: i32,
    pub target: i32,
}

impl Tween {
    /// Start at rest on `value`
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self {
            current: value,
            target: value,
        }
    }

    /// Start at `current`, easing toward `target`
    #[must_use]
    pub const fn from_to(current: i32, target: i32) -> Self {
        Self { current, target }
    }

    /// Set both current and target
    pub const fn jump(&mut self, value: i32) {
        self.current = value;
        self.target = value;
    }

    /// Advance one frame
    pub const fn step(&mut self) -> i32 {
        self.step_offset(0)
    }

    /// Advance one frame toward `target + offset`
    pub const fn step_offset(&mut self, offset: i32) -> i32 {
        let goal = self.target + offset;
        if (goal - self.current).abs() <= 1 {
            self.current = goal;
        } else {
            self.current = (self.current + goal) / 2;
        }
        self.current
    }

    #[must_use]
    pub const fn settled(&self) -> bool {
        self.current == self.target
    }
}

/// The box an eye is drawn into, in panel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EyeBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub radius: i32,
}

impl EyeBox {
    #[must_use]
    pub const fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Animated state of one eye
#[derive(Debug, Clone)]
pub struct Eye {
    pub width: Tween,
    pub height: Tween,
    pub radius: Tween,
    pub x: Tween,
    pub y: Tween,
    /// Extra height while curious
    pub height_offset: i32,
    /// Cleared by `close`, set by `open`; an open eye re-opens after a blink
    pub open: bool,
}

impl Eye {
    /// Create an eye at `(x, y)` that starts shut and opens on the first frames
    #[must_use]
    pub const fn new(width: i32, height: i32, radius: i32, x: i32, y: i32) -> Self {
        Self {
            width: Tween::new(width),
            height: Tween::from_to(1, height),
            radius: Tween::new(radius),
            x: Tween::new(x),
            y: Tween::new(y),
            height_offset: 0,
            open: true,
        }
    }

    /// Start closing the eye
    pub const fn close(&mut self) {
        self.height.target = 1;
        self.open = false;
    }

    /// Let the eye open again
    pub const fn open(&mut self) {
        self.open = true;
    }

    /// Close and immediately re-open
    pub const fn blink(&mut self) {
        self.close();
        self.open();
    }

    /// Advance geometry one frame
    pub const fn step(&mut self, default_height: i32) {
        self.height.step_offset(self.height_offset);
        if self.open && self.height.current <= 1 + self.height_offset {
            self.height.target = default_height;
        }
        self.width.step();
        self.radius.step();
        self.x.step();
        self.y.step();
    }

    /// Box to draw this frame; shrinking heights close toward the centre line
    #[must_use]
    pub const fn draw_box(&self, default_height: i32) -> EyeBox {
        let height = if self.height.current < 1 {
            1
        } else {
            self.height.current
        };
        let y = self.y.current + (default_height - height) / 2 - self.height_offset / 2;
        EyeBox {
            x: self.x.current,
            y,
            width: self.width.current,
            height,
            radius: self.radius.current,
        }
    }
}

/// Eyelid overlays shared by both eyes
#[derive(Debug, Clone, Copy)]
pub struct Eyelids {
    /// Outer corners drooping
    pub tired: Tween,
    /// Inner corners pulled down
    pub angry: Tween,
    /// Lower lid pushed up
    pub happy: Tween,
}

impl Default for Eyelids {
    fn default() -> Self {
        Self {
            tired: Tween::new(0),
            angry: Tween::new(0),
            happy: Tween::new(0),
        }
    }
}

impl Eyelids {
    pub const fn step(&mut self) {
        self.tired.step();
        self.angry.step();
        self.happy.step();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tween_halves_then_snaps() {
        let mut t = Tween::from_to(0, 40);
        assert_eq!(t.step(), 20);
        assert_eq!(t.step(), 30);
        assert_eq!(t.step(), 35);
        assert_eq!(t.step(), 37);
        assert_eq!(t.step(), 38);
        assert_eq!(t.step(), 39);
        assert_eq!(t.step(), 40);
        assert!(t.settled());
    }

    #[test]
    fn tween_downward() {
        let mut t = Tween::from_to(44, 1);
        let mut frames = 0;
        while !t.settled() {
            t.step();
            frames += 1;
            assert!(frames < 10);
        }
        assert_eq!(t.current, 1);
    }

    #[test]
    fn blink_closes_then_reopens() {
        let mut eye = Eye::new(64, 44, 12, 32, 10);
        for _ in 0..12 {
            eye.step(44);
        }
        assert_eq!(eye.height.current, 44);

        eye.blink();
        let mut min = i32::MAX;
        for _ in 0..24 {
            eye.step(44);
            min = min.min(eye.height.current);
        }
        assert_eq!(min, 1);
        assert_eq!(eye.height.current, 44);
    }

    #[test]
    fn closed_eye_stays_closed() {
        let mut eye = Eye::new(64, 44, 12, 32, 10);
        for _ in 0..12 {
            eye.step(44);
        }
        eye.close();
        for _ in 0..24 {
            eye.step(44);
        }
        assert_eq!(eye.height.current, 1);

        eye.open();
        for _ in 0..12 {
            eye.step(44);
        }
        assert_eq!(eye.height.current, 44);
    }

    #[test]
    fn draw_box_centres_closing_eye() {
        let mut eye = Eye::new(64, 44, 12, 32, 10);
        eye.height.jump(20);
        let b = eye.draw_box(44);
        assert_eq!(b.y, 10 + 12);
        assert_eq!(b.height, 20);
    }
}
