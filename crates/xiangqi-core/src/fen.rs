//! FEN (Forsyth-Edwards Notation) parsing and serialization for the 10x9 board.
//!
//! Xiangqi FEN keeps the chess layout for compatibility with common tools:
//! `<placement> <side> - - <halfmove> <fullmove>`. The castling and en passant
//! fields are always `-`. Only the placement is mandatory here, so the bare
//! board strings produced by board-recognition front ends parse as well.

use crate::Piece;
use thiserror::Error;

/// Errors that can occur when parsing FEN strings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("invalid FEN: expected 1 to 6 parts, got {0}")]
    InvalidPartCount(usize),

    #[error("invalid piece placement: {0}")]
    InvalidPiecePlacement(String),

    #[error("invalid active color: expected 'w', 'r' or 'b', got '{0}'")]
    InvalidActiveColor(String),

    #[error("invalid placeholder field: expected '-', got '{0}'")]
    InvalidPlaceholder(String),

    #[error("invalid halfmove clock: {0}")]
    InvalidHalfmoveClock(String),

    #[error("invalid fullmove number: {0}")]
    InvalidFullmoveNumber(String),
}

/// Parsed FEN data.
///
/// This struct holds the raw parsed FEN components. The engine is
/// responsible for converting this into its position representation and for
/// semantic checks such as the number of generals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenParser {
    /// Piece placement string, rank 9 first (e.g., "rnbakabnr/9/1c5c1/...").
    pub piece_placement: String,
    /// Active color ('w' for Red or 'b' for Black).
    pub active_color: char,
    /// Halfmove clock (plies since the last capture).
    pub halfmove_clock: u32,
    /// Fullmove number.
    pub fullmove_number: u32,
}

impl FenParser {
    /// The standard starting position FEN.
    pub const STARTPOS: &'static str =
        "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w - - 0 1";

    /// Parses a FEN string.
    pub fn parse(fen: &str) -> Result<Self, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();

        if parts.is_empty() || parts.len() > 6 {
            return Err(FenError::InvalidPartCount(parts.len()));
        }

        let piece_placement = parts[0];
        Self::validate_piece_placement(piece_placement)?;

        let active_color = match parts.get(1).copied() {
            None | Some("w") | Some("r") => 'w',
            Some("b") => 'b',
            Some(other) => return Err(FenError::InvalidActiveColor(other.to_string())),
        };

        for placeholder in parts.iter().skip(2).take(2) {
            if *placeholder != "-" {
                return Err(FenError::InvalidPlaceholder(placeholder.to_string()));
            }
        }

        let halfmove_clock = match parts.get(4) {
            Some(s) => s
                .parse::<u32>()
                .map_err(|_| FenError::InvalidHalfmoveClock(s.to_string()))?,
            None => 0,
        };

        let fullmove_number = match parts.get(5) {
            Some(s) => s
                .parse::<u32>()
                .map_err(|_| FenError::InvalidFullmoveNumber(s.to_string()))?,
            None => 1,
        };

        Ok(FenParser {
            piece_placement: piece_placement.to_string(),
            active_color,
            halfmove_clock,
            fullmove_number,
        })
    }

    fn validate_piece_placement(placement: &str) -> Result<(), FenError> {
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 10 {
            return Err(FenError::InvalidPiecePlacement(format!(
                "expected 10 ranks, got {}",
                ranks.len()
            )));
        }

        for (i, rank) in ranks.iter().enumerate() {
            let mut squares = 0;
            for c in rank.chars() {
                if let Some(run) = c.to_digit(10) {
                    squares += run;
                } else if Piece::from_fen_char(c).is_some() {
                    squares += 1;
                } else {
                    return Err(FenError::InvalidPiecePlacement(format!(
                        "invalid character '{}' in rank {}",
                        c,
                        9 - i
                    )));
                }
            }
            if squares != 9 {
                return Err(FenError::InvalidPiecePlacement(format!(
                    "rank {} has {} squares, expected 9",
                    9 - i,
                    squares
                )));
            }
        }

        Ok(())
    }

    /// Converts the parsed FEN back to a FEN string.
    pub fn to_fen(&self) -> String {
        format!(
            "{} {} - - {} {}",
            self.piece_placement, self.active_color, self.halfmove_clock, self.fullmove_number
        )
    }
}

impl Default for FenParser {
    fn default() -> Self {
        Self::parse(Self::STARTPOS).expect("STARTPOS is valid")
    }
}
