//! Player color representation.

use serde::{Deserialize, Serialize};

/// The two sides in Xiangqi. Red moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Color {
    Red = 0,
    Black = 1,
}

impl Color {
    /// Both colors, Red first.
    pub const ALL: [Color; 2] = [Color::Red, Color::Black];

    /// Returns the opposite color.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Color::Red => Color::Black,
            Color::Black => Color::Red,
        }
    }

    /// Returns the index (0 for Red, 1 for Black).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the rank direction this side advances in (+1 for Red, -1 for Black).
    #[inline]
    pub const fn forward(self) -> i8 {
        match self {
            Color::Red => 1,
            Color::Black => -1,
        }
    }

    /// Returns the back rank for this color (0 for Red, 9 for Black).
    #[inline]
    pub const fn back_rank(self) -> u8 {
        match self {
            Color::Red => 0,
            Color::Black => 9,
        }
    }

    /// Returns the FEN side-to-move character. Red uses `w` by convention.
    #[inline]
    pub const fn to_fen_char(self) -> char {
        match self {
            Color::Red => 'w',
            Color::Black => 'b',
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Red => write!(f, "Red"),
            Color::Black => write!(f, "Black"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_color() {
        assert_eq!(Color::Red.opposite(), Color::Black);
        assert_eq!(Color::Black.opposite(), Color::Red);
    }

    #[test]
    fn forward_and_back_rank() {
        assert_eq!(Color::Red.forward(), 1);
        assert_eq!(Color::Black.forward(), -1);
        assert_eq!(Color::Red.back_rank(), 0);
        assert_eq!(Color::Black.back_rank(), 9);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Color::Red), "Red");
        assert_eq!(format!("{}", Color::Black), "Black");
    }
}
