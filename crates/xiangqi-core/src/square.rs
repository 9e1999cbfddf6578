//! Board square representation.

use crate::Color;
use std::fmt;

/// A file (column) on the Xiangqi board, from A to I as seen from Red's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum File {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
    E = 4,
    F = 5,
    G = 6,
    H = 7,
    I = 8,
}

impl File {
    /// Number of files on the board.
    pub const COUNT: u8 = 9;

    /// All files in order.
    pub const ALL: [File; 9] = [
        File::A,
        File::B,
        File::C,
        File::D,
        File::E,
        File::F,
        File::G,
        File::H,
        File::I,
    ];

    /// Creates a file from index (0-8).
    #[inline]
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index as usize])
        } else {
            None
        }
    }

    /// Creates a file from a character ('a'-'i' or 'A'-'I').
    #[inline]
    pub const fn from_char(c: char) -> Option<Self> {
        let lower = c.to_ascii_lowercase();
        if lower >= 'a' && lower <= 'i' {
            Self::from_index(lower as u8 - b'a')
        } else {
            None
        }
    }

    /// Returns the index (0-8).
    #[inline]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Returns the character representation.
    #[inline]
    pub const fn to_char(self) -> char {
        (b'a' + self as u8) as char
    }

    /// Returns the file number (1-9) as counted from the given side's right hand.
    ///
    /// Red counts from file I, Black from file A.
    #[inline]
    pub const fn number_for(self, color: Color) -> u8 {
        match color {
            Color::Red => Self::COUNT - self as u8,
            Color::Black => self as u8 + 1,
        }
    }

    /// Inverse of [`number_for`](Self::number_for).
    #[inline]
    pub const fn from_number(number: u8, color: Color) -> Option<Self> {
        if number == 0 || number > Self::COUNT {
            return None;
        }
        match color {
            Color::Red => Self::from_index(Self::COUNT - number),
            Color::Black => Self::from_index(number - 1),
        }
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// A rank (row) on the Xiangqi board, from 0 (Red's back rank) to 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Rank {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
}

impl Rank {
    /// Number of ranks on the board.
    pub const COUNT: u8 = 10;

    /// All ranks in order.
    pub const ALL: [Rank; 10] = [
        Rank::R0,
        Rank::R1,
        Rank::R2,
        Rank::R3,
        Rank::R4,
        Rank::R5,
        Rank::R6,
        Rank::R7,
        Rank::R8,
        Rank::R9,
    ];

    /// Creates a rank from index (0-9).
    #[inline]
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index as usize])
        } else {
            None
        }
    }

    /// Creates a rank from a character ('0'-'9').
    #[inline]
    pub const fn from_char(c: char) -> Option<Self> {
        if c.is_ascii_digit() {
            Self::from_index(c as u8 - b'0')
        } else {
            None
        }
    }

    /// Returns the index (0-9).
    #[inline]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Returns the character representation.
    #[inline]
    pub const fn to_char(self) -> char {
        (b'0' + self as u8) as char
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// A square on the Xiangqi board, indexed 0-89.
///
/// Squares are indexed rank by rank from Red's back rank:
/// - a0 = 0, b0 = 1, ..., i0 = 8
/// - a1 = 9, ..., i9 = 89
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    /// Number of squares on the board.
    pub const COUNT: usize = 90;

    /// Creates a square from file and rank.
    #[inline]
    pub const fn new(file: File, rank: Rank) -> Self {
        Square(rank.index() * File::COUNT + file.index())
    }

    /// Creates a square from index (0-89).
    #[inline]
    pub const fn from_index(index: u8) -> Option<Self> {
        if (index as usize) < Self::COUNT {
            Some(Square(index))
        } else {
            None
        }
    }

    /// Creates a square from an index already known to be in range.
    #[inline]
    pub(crate) const fn from_index_unchecked(index: u8) -> Self {
        debug_assert!((index as usize) < Self::COUNT);
        Square(index)
    }

    /// Parses a square from ICCS notation (e.g., "e0").
    pub const fn from_algebraic(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = match File::from_char(bytes[0] as char) {
            Some(f) => f,
            None => return None,
        };
        let rank = match Rank::from_char(bytes[1] as char) {
            Some(r) => r,
            None => return None,
        };
        Some(Square::new(file, rank))
    }

    /// Returns the index (0-89).
    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Returns the file of this square.
    #[inline]
    pub const fn file(self) -> File {
        File::ALL[(self.0 % File::COUNT) as usize]
    }

    /// Returns the rank of this square.
    #[inline]
    pub const fn rank(self) -> Rank {
        Rank::ALL[(self.0 / File::COUNT) as usize]
    }

    /// Returns the square displaced by the given file and rank deltas, if it
    /// is still on the board.
    #[inline]
    pub const fn offset(self, file_delta: i8, rank_delta: i8) -> Option<Self> {
        let file = self.file().index() as i8 + file_delta;
        let rank = self.rank().index() as i8 + rank_delta;
        if file < 0 || file >= File::COUNT as i8 || rank < 0 || rank >= Rank::COUNT as i8 {
            return None;
        }
        Some(Square(rank as u8 * File::COUNT + file as u8))
    }

    /// Returns true if the square lies inside the given side's palace.
    #[inline]
    pub const fn in_palace(self, color: Color) -> bool {
        let file = self.file().index();
        let rank = self.rank().index();
        if file < 3 || file > 5 {
            return false;
        }
        match color {
            Color::Red => rank <= 2,
            Color::Black => rank >= 7,
        }
    }

    /// Returns true if the square lies on the given side's half of the river.
    #[inline]
    pub const fn on_home_side(self, color: Color) -> bool {
        let rank = self.rank().index();
        match color {
            Color::Red => rank <= 4,
            Color::Black => rank >= 5,
        }
    }

    /// Returns the ICCS notation for this square.
    pub fn to_algebraic(self) -> String {
        format!("{}{}", self.file(), self.rank())
    }

    /// Iterates over all squares from a0 to i9.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..Self::COUNT as u8).map(Square)
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Square({})", self.to_algebraic())
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_algebraic())
    }
}
