//! Xiangqi piece representation.

use crate::Color;
use serde::{Deserialize, Serialize};

/// The seven types of Xiangqi pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Piece {
    General = 0,
    Advisor = 1,
    Elephant = 2,
    Horse = 3,
    Chariot = 4,
    Cannon = 5,
    Soldier = 6,
}

impl Piece {
    /// Number of piece types.
    pub const COUNT: usize = 7;

    /// All piece types in order.
    pub const ALL: [Piece; Piece::COUNT] = [
        Piece::General,
        Piece::Advisor,
        Piece::Elephant,
        Piece::Horse,
        Piece::Chariot,
        Piece::Cannon,
        Piece::Soldier,
    ];

    /// Returns the index of this piece type (0-6).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the FEN character for this piece with the given color.
    pub const fn to_fen_char(self, color: Color) -> char {
        let c = match self {
            Piece::General => 'k',
            Piece::Advisor => 'a',
            Piece::Elephant => 'b',
            Piece::Horse => 'n',
            Piece::Chariot => 'r',
            Piece::Cannon => 'c',
            Piece::Soldier => 'p',
        };
        match color {
            Color::Red => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    /// Parses a FEN character into a piece and color.
    ///
    /// Both the `b`/`n` and the `e`/`h` spellings of elephant and horse are
    /// accepted.
    pub const fn from_fen_char(c: char) -> Option<(Piece, Color)> {
        let color = if c.is_ascii_uppercase() {
            Color::Red
        } else {
            Color::Black
        };
        let piece = match c.to_ascii_lowercase() {
            'k' => Piece::General,
            'a' => Piece::Advisor,
            'b' | 'e' => Piece::Elephant,
            'n' | 'h' => Piece::Horse,
            'r' => Piece::Chariot,
            'c' => Piece::Cannon,
            'p' => Piece::Soldier,
            _ => return None,
        };
        Some((piece, color))
    }

    /// Returns the WXF letter for this piece.
    pub const fn wxf_char(self) -> char {
        match self {
            Piece::General => 'K',
            Piece::Advisor => 'A',
            Piece::Elephant => 'E',
            Piece::Horse => 'H',
            Piece::Chariot => 'R',
            Piece::Cannon => 'C',
            Piece::Soldier => 'P',
        }
    }

    /// Parses a WXF letter (`B` and `N` are accepted as aliases).
    pub const fn from_wxf_char(c: char) -> Option<Piece> {
        match c.to_ascii_uppercase() {
            'K' => Some(Piece::General),
            'A' => Some(Piece::Advisor),
            'E' | 'B' => Some(Piece::Elephant),
            'H' | 'N' => Some(Piece::Horse),
            'R' => Some(Piece::Chariot),
            'C' => Some(Piece::Cannon),
            'P' => Some(Piece::Soldier),
            _ => None,
        }
    }

    /// Returns the simplified Chinese character used in game records.
    pub const fn chinese_char(self, color: Color) -> char {
        match (self, color) {
            (Piece::General, Color::Red) => '帅',
            (Piece::General, Color::Black) => '将',
            (Piece::Advisor, Color::Red) => '仕',
            (Piece::Advisor, Color::Black) => '士',
            (Piece::Elephant, Color::Red) => '相',
            (Piece::Elephant, Color::Black) => '象',
            (Piece::Horse, _) => '马',
            (Piece::Chariot, _) => '车',
            (Piece::Cannon, _) => '炮',
            (Piece::Soldier, Color::Red) => '兵',
            (Piece::Soldier, Color::Black) => '卒',
        }
    }

    /// Parses a Chinese piece character, simplified or traditional, of either side.
    pub const fn from_chinese_char(c: char) -> Option<Piece> {
        match c {
            '帅' | '帥' | '将' | '將' => Some(Piece::General),
            '仕' | '士' => Some(Piece::Advisor),
            '相' | '象' => Some(Piece::Elephant),
            '马' | '馬' | '傌' => Some(Piece::Horse),
            '车' | '車' | '俥' => Some(Piece::Chariot),
            '炮' | '砲' | '包' => Some(Piece::Cannon),
            '兵' | '卒' => Some(Piece::Soldier),
            _ => None,
        }
    }

    /// How many pieces of this type each side starts with.
    #[inline]
    pub const fn starting_count(self) -> usize {
        match self {
            Piece::General => 1,
            Piece::Soldier => 5,
            _ => 2,
        }
    }

    /// Returns true if this piece moves along ranks and files, so that
    /// "advance" and "retreat" are counted in steps rather than target files.
    #[inline]
    pub const fn is_straight_mover(self) -> bool {
        matches!(
            self,
            Piece::General | Piece::Chariot | Piece::Cannon | Piece::Soldier
        )
    }
}

impl std::fmt::Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Piece::General => "General",
            Piece::Advisor => "Advisor",
            Piece::Elephant => "Elephant",
            Piece::Horse => "Horse",
            Piece::Chariot => "Chariot",
            Piece::Cannon => "Cannon",
            Piece::Soldier => "Soldier",
        };
        write!(f, "{}", name)
    }
}
