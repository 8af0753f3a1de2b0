//! The enumerated vote set.

use std::{fmt, str::FromStr};

use crate::error::ProcessError;

/// A vote a member may cast. Values outside this set are rejected.
///
/// "No vote in the current round" is represented as `None` wherever a
/// member's vote is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VoteValue {
    /// "0"
    Zero,
    /// "1"
    One,
    /// "2"
    Two,
    /// "3"
    Three,
    /// "5"
    Five,
    /// "8"
    Eight,
}

impl VoteValue {
    /// Every accepted value, in ascending order.
    pub const ALL: [Self; 6] =
        [Self::Zero, Self::One, Self::Two, Self::Three, Self::Five, Self::Eight];

    /// Numeric value of the vote.
    pub const fn points(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Five => 5,
            Self::Eight => 8,
        }
    }
}

impl FromStr for VoteValue {
    type Err = ProcessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Self::Zero),
            "1" => Ok(Self::One),
            "2" => Ok(Self::Two),
            "3" => Ok(Self::Three),
            "5" => Ok(Self::Five),
            "8" => Ok(Self::Eight),
            other => Err(ProcessError::InvalidVoteValue(other.to_owned())),
        }
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.points())
    }
}
