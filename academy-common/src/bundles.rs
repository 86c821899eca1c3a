use crate::side::Side;
use core::ops::{Index, IndexMut};
use derivative::Derivative;
use enum_iterator::all;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A pair of values, one per squad.
#[derive(Derivative, Serialize, Deserialize)]
#[derivative(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideBundle<T> {
    pub team_a: T,
    pub team_b: T,
}

impl<T> SideBundle<T> {
    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        all::<Side>().map(move |side| (side, &self[side]))
    }
}

impl<T> Index<Side> for SideBundle<T> {
    type Output = T;

    fn index(&self, side: Side) -> &Self::Output {
        match side {
            Side::TeamA => &self.team_a,
            Side::TeamB => &self.team_b,
        }
    }
}

impl<T> IndexMut<Side> for SideBundle<T> {
    fn index_mut(&mut self, side: Side) -> &mut Self::Output {
        match side {
            Side::TeamA => &mut self.team_a,
            Side::TeamB => &mut self.team_b,
        }
    }
}

impl<T: Display> Display for SideBundle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Team A: {}, Team B: {}", self.team_a, self.team_b)
    }
}

impl<T: Default> FromIterator<(Side, T)> for SideBundle<T> {
    fn from_iter<I: IntoIterator<Item = (Side, T)>>(iter: I) -> Self {
        let mut bundle = SideBundle::default();
        for (side, value) in iter {
            bundle[side] = value;
        }
        bundle
    }
}
