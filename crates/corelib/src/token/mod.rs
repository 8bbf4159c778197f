//! Token abstraction module for consistent hashing.
//!
//! Tokens are positions on the hash ring: signed 64-bit integers covering
//! `i64::MIN..=i64::MAX`, wrapping from the maximum back to the minimum.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of distinct positions on the ring, as a float (2^64).
pub const RING_SIZE: f64 = 18_446_744_073_709_551_616.0;

/// Position on the token ring.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Token(pub i64);

impl Token {
    /// Start of the ring.
    pub const MIN: Token = Token(i64::MIN);
    /// End of the ring; its clockwise successor is [`Token::MIN`].
    pub const MAX: Token = Token(i64::MAX);

    #[inline]
    pub fn value(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn is_min(self) -> bool {
        self == Self::MIN
    }

    #[inline]
    pub fn is_max(self) -> bool {
        self == Self::MAX
    }

    /// Clockwise distance from `self` to `other`.
    ///
    /// A distance of zero means the two tokens are equal; the full circle
    /// (2^64) cannot be represented and callers that need it handle the
    /// single-token case themselves.
    #[inline]
    pub fn distance_to(self, other: Token) -> u64 {
        (other.0 as u64).wrapping_sub(self.0 as u64)
    }

    /// Fraction of the ring covered by the range `(self, other]`.
    ///
    /// Equal tokens describe the whole ring.
    pub fn range_fraction(self, other: Token) -> f64 {
        if self == other {
            1.0
        } else {
            self.distance_to(other) as f64 / RING_SIZE
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Token {
    fn from(value: i64) -> Self {
        Token(value)
    }
}

impl FromStr for Token {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Token)
    }
}
