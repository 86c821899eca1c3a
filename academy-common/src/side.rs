use derivative::Derivative;
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};

/// One of the two squads that can be placed on the board.
#[derive(Derivative, Serialize, Deserialize, Sequence)]
#[derivative(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Side {
    #[derivative(Default)]
    #[serde(rename = "team-a")]
    TeamA,
    #[serde(rename = "team-b")]
    TeamB,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Self::TeamA => Self::TeamB,
            Self::TeamB => Self::TeamA,
        }
    }
}

impl core::fmt::Display for Side {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Self::TeamA => write!(f, "Team A"),
            Self::TeamB => write!(f, "Team B"),
        }
    }
}
