//! Move representation.

use crate::Square;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A Xiangqi move.
///
/// Encoded compactly: 7 bits from, 7 bits to. Xiangqi has no promotions,
/// castling or en passant, so no flag bits are needed.
///
/// Serializes as its ICCS string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Move(u16);

impl Move {
    /// Creates a new move.
    #[inline]
    pub const fn new(from: Square, to: Square) -> Self {
        Move((from.index() as u16) | ((to.index() as u16) << 7))
    }

    /// Returns the source square.
    #[inline]
    pub const fn from(self) -> Square {
        Square::from_index_unchecked((self.0 & 0x7F) as u8)
    }

    /// Returns the destination square.
    #[inline]
    pub const fn to(self) -> Square {
        Square::from_index_unchecked(((self.0 >> 7) & 0x7F) as u8)
    }

    /// Returns the ICCS notation for this move (e.g., "h2e2").
    pub fn to_iccs(self) -> String {
        format!("{}{}", self.from(), self.to())
    }

    /// Parses a move from ICCS notation.
    ///
    /// Only the coordinates are checked; whether a piece can make the move is
    /// decided against a position by the engine.
    pub fn from_iccs(s: &str) -> Option<Self> {
        if s.len() != 4 || !s.is_ascii() {
            return None;
        }
        let from = Square::from_algebraic(&s[0..2])?;
        let to = Square::from_algebraic(&s[2..4])?;
        if from == to {
            return None;
        }
        Some(Move::new(from, to))
    }

    /// A null move (used as placeholder, not a legal move).
    pub const NULL: Move = Move(0);
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({})", self.to_iccs())
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_iccs())
    }
}

impl TryFrom<String> for Move {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Move::from_iccs(&s).ok_or_else(|| format!("invalid ICCS move: {s}"))
    }
}

impl From<Move> for String {
    fn from(m: Move) -> String {
        m.to_iccs()
    }
}
