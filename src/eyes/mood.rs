//! Moods, gaze positions and one-shot animations

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Eye expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Default,
    Tired,
    Angry,
    Happy,
    Love,
    /// Scanning look shown while reading a provisioning QR code
    Qr,
}

impl Mood {
    /// Every mood, in display order
    pub const ALL: [Self; 6] = [
        Self::Default,
        Self::Tired,
        Self::Angry,
        Self::Happy,
        Self::Love,
        Self::Qr,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Tired => "tired",
            Self::Angry => "angry",
            Self::Happy => "happy",
            Self::Love => "love",
            Self::Qr => "qr",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" | "neutral" | "normal" => Ok(Self::Default),
            "tired" | "sleepy" => Ok(Self::Tired),
            "angry" => Ok(Self::Angry),
            "happy" => Ok(Self::Happy),
            "love" => Ok(Self::Love),
            "qr" => Ok(Self::Qr),
            other => Err(Error::InvalidMood(other.to_string())),
        }
    }
}

/// Where both eyes look, as a compass direction on the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Center,
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Position {
    /// Top-left corner of the eye box for this position, given the
    /// constraint box `(max_x, max_y)`
    #[must_use]
    pub const fn coordinates(self, max_x: i32, max_y: i32) -> (i32, i32) {
        match self {
            Self::Center => (max_x / 2, max_y / 2),
            Self::N => (max_x / 2, 0),
            Self::NE => (max_x, 0),
            Self::E => (max_x, max_y / 2),
            Self::SE => (max_x, max_y),
            Self::S => (max_x / 2, max_y),
            Self::SW => (0, max_y),
            Self::W => (0, max_y / 2),
            Self::NW => (0, 0),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::N => "n",
            Self::NE => "ne",
            Self::E => "e",
            Self::SE => "se",
            Self::S => "s",
            Self::SW => "sw",
            Self::W => "w",
            Self::NW => "nw",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "center" | "centre" | "default" => Ok(Self::Center),
            "n" | "north" | "up" => Ok(Self::N),
            "ne" | "northeast" => Ok(Self::NE),
            "e" | "east" | "right" => Ok(Self::E),
            "se" | "southeast" => Ok(Self::SE),
            "s" | "south" | "down" => Ok(Self::S),
            "sw" | "southwest" => Ok(Self::SW),
            "w" | "west" | "left" => Ok(Self::W),
            "nw" | "northwest" => Ok(Self::NW),
            other => Err(Error::InvalidPosition(other.to_string())),
        }
    }
}

/// Short one-shot animations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Animation {
    /// Eyes bounce vertically
    Laugh,
    /// Eyes shake horizontally
    Confused,
}

impl FromStr for Animation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "laugh" => Ok(Self::Laugh),
            "confused" => Ok(Self::Confused),
            other => Err(Error::Eyes(format!("unknown animation: {other}"))),
        }
    }
}

/// Which eye(s) a blink applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlinkTarget {
    #[default]
    Both,
    Left,
    Right,
}

impl BlinkTarget {
    #[must_use]
    pub const fn left(self) -> bool {
        matches!(self, Self::Both | Self::Left)
    }

    #[must_use]
    pub const fn right(self) -> bool {
        matches!(self, Self::Both | Self::Right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_parsing() {
        assert_eq!("Happy".parse::<Mood>().unwrap(), Mood::Happy);
        assert_eq!(" QR ".parse::<Mood>().unwrap(), Mood::Qr);
        assert_eq!("neutral".parse::<Mood>().unwrap(), Mood::Default);
        assert!(matches!(
            "grumpy".parse::<Mood>(),
            Err(Error::InvalidMood(m)) if m == "grumpy"
        ));
    }

    #[test]
    fn mood_round_trips_through_display() {
        for mood in Mood::ALL {
            assert_eq!(mood.to_string().parse::<Mood>().unwrap(), mood);
        }
    }

    #[test]
    fn mood_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Mood::Love).unwrap(), "\"love\"");
        let mood: Mood = serde_json::from_str("\"qr\"").unwrap();
        assert_eq!(mood, Mood::Qr);
    }

    #[test]
    fn position_coordinates() {
        assert_eq!(Position::Center.coordinates(64, 16), (32, 8));
        assert_eq!(Position::NE.coordinates(64, 16), (64, 0));
        assert_eq!(Position::SW.coordinates(64, 16), (0, 16));
        assert_eq!(Position::S.coordinates(64, 16), (32, 16));
    }

    #[test]
    fn position_aliases() {
        assert_eq!("left".parse::<Position>().unwrap(), Position::W);
        assert_eq!("NE".parse::<Position>().unwrap(), Position::NE);
        assert!("sideways".parse::<Position>().is_err());
    }

    #[test]
    fn blink_targets() {
        assert!(BlinkTarget::Both.left() && BlinkTarget::Both.right());
        assert!(BlinkTarget::Left.left() && !BlinkTarget::Left.right());
    }
}
