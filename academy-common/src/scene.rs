//! The board's in-memory scene graph.
//!
//! Token positions are stored as percentages of the field container so a
//! scene renders the same at any resolution. Stroke points stay in the pixel
//! space they were drawn in.

use crate::{
    field_support::{FIELD_MAX_PERCENT, FIELD_MIN_PERCENT},
    side::Side,
};
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Sequence)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    TeamA,
    TeamB,
    Ball,
    Cone,
    Goal,
}

impl TokenKind {
    pub fn side(self) -> Option<Side> {
        match self {
            Self::TeamA => Some(Side::TeamA),
            Self::TeamB => Some(Side::TeamB),
            Self::Ball | Self::Cone | Self::Goal => None,
        }
    }

    /// Label given to tokens that aren't numbered per side
    pub fn fixed_label(self) -> Option<&'static str> {
        match self {
            Self::TeamA | Self::TeamB => None,
            Self::Ball | Self::Cone => Some(""),
            Self::Goal => Some("GOAL"),
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Self::TeamA => 'A',
            Self::TeamB => 'B',
            Self::Ball => 'o',
            Self::Cone => '^',
            Self::Goal => '#',
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TeamA => write!(f, "team-a"),
            Self::TeamB => write!(f, "team-b"),
            Self::Ball => write!(f, "ball"),
            Self::Cone => write!(f, "cone"),
            Self::Goal => write!(f, "goal"),
        }
    }
}

impl std::str::FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        enum_iterator::all::<TokenKind>()
            .find(|kind| kind.to_string() == s)
            .ok_or_else(|| format!("Unknown token type: {s}"))
    }
}

/// Clamps a coordinate to the field, mapping NaN to the near edge
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        FIELD_MIN_PERCENT
    } else {
        value.clamp(FIELD_MIN_PERCENT, FIELD_MAX_PERCENT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub label: String,
    x: f64,
    y: f64,
    pub rotation: Option<f64>,
}

impl Token {
    pub fn new(id: String, kind: TokenKind, label: String, x: f64, y: f64) -> Self {
        Self {
            id,
            kind,
            label,
            x: clamp_percent(x),
            y: clamp_percent(y),
            rotation: None,
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = clamp_percent(x);
        self.y = clamp_percent(y);
    }

    /// Re-applies the field bounds, used on tokens that came off the wire
    pub(crate) fn clamped(mut self) -> Self {
        self.set_position(self.x, self.y);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: String,
    pub points: Vec<Point>,
}

impl Stroke {
    pub fn new(color: String, start: Point) -> Self {
        Self {
            color,
            points: vec![start],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A point-in-time copy of the whole scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub tokens: Vec<Token>,
    pub strokes: Vec<Stroke>,
    pub current_stroke: Option<Stroke>,
}

/// The still scene a saved board opens with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub tokens: Vec<Token>,
    pub strokes: Vec<Stroke>,
}
