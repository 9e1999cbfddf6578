//! Xiangqi position representation.

use thiserror::Error;
use xiangqi_core::{Color, FenError, FenParser, File, Piece, Rank, Square};

use crate::zobrist::ZOBRIST;

/// Errors that make a board unusable for play.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PositionError {
    /// The FEN string itself is malformed.
    #[error(transparent)]
    Fen(#[from] FenError),
    /// A side has no general on the board.
    #[error("{0} has no general")]
    MissingGeneral(Color),
    /// A side has more than one general on the board.
    #[error("{0} has more than one general")]
    ExtraGeneral(Color),
    /// A general stands outside its palace.
    #[error("{0} general is outside the palace")]
    GeneralOutsidePalace(Color),
    /// A side has more pieces of one type than the starting set holds.
    #[error("{color} has {count} {piece} pieces")]
    TooManyPieces {
        color: Color,
        piece: Piece,
        count: usize,
    },
}

/// A position the game passed through before the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Zobrist hash of the earlier position.
    pub hash: u64,
    /// Side to move in the earlier position.
    pub side: Color,
    /// Whether the move played from that position gave check.
    pub gave_check: bool,
}

/// Complete Xiangqi position state.
///
/// Positions are values: [`with_piece`](Position::with_piece),
/// [`play`](Position::play) and friends return new positions and never
/// mutate the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Mailbox board indexed by [`Square::index`].
    board: [Option<(Piece, Color)>; Square::COUNT],

    /// The side to move.
    side_to_move: Color,

    /// Plies since the last capture.
    halfmove_clock: u32,

    /// Fullmove number (starts at 1, increments after Black's move).
    fullmove_number: u32,

    /// Zobrist hash of board and side to move.
    hash: u64,

    /// Earlier positions of the game, oldest first.
    history: Vec<HistoryEntry>,
}

impl Position {
    /// Creates an empty board with Red to move.
    ///
    /// An empty board is not playable until both generals are placed; see
    /// [`validate`](Position::validate).
    pub fn empty() -> Self {
        Position {
            board: [None; Square::COUNT],
            side_to_move: Color::Red,
            halfmove_clock: 0,
            fullmove_number: 1,
            hash: 0,
            history: Vec::new(),
        }
    }

    /// Returns the standard starting position.
    pub fn startpos() -> Self {
        Self::from_fen(FenParser::STARTPOS).expect("STARTPOS is valid")
    }

    /// Parses a position from FEN and checks that it is playable.
    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let position = Self::from_fen_unchecked(fen)?;
        position.validate()?;
        Ok(position)
    }

    /// Parses a position from FEN without checking the generals.
    ///
    /// Useful for connectors that receive partial boards; callers must run
    /// [`validate`](Position::validate) before playing on the result.
    pub fn from_fen_unchecked(fen: &str) -> Result<Self, FenError> {
        let parsed = FenParser::parse(fen)?;
        let mut position = Position::empty();

        for (row, rank_str) in parsed.piece_placement.split('/').enumerate() {
            let rank = 9 - row as u8;
            let mut file = 0u8;
            for c in rank_str.chars() {
                if let Some(run) = c.to_digit(10) {
                    file += run as u8;
                } else if let Some((piece, color)) = Piece::from_fen_char(c) {
                    let sq = square_at(file, rank);
                    position.board[sq.index() as usize] = Some((piece, color));
                    file += 1;
                }
            }
        }

        position.side_to_move = if parsed.active_color == 'b' {
            Color::Black
        } else {
            Color::Red
        };
        position.halfmove_clock = parsed.halfmove_clock;
        position.fullmove_number = parsed.fullmove_number;
        position.hash = position.compute_hash();
        Ok(position)
    }

    /// Serializes the position as FEN.
    pub fn to_fen(&self) -> String {
        let mut placement = String::new();
        for rank in Rank::ALL.iter().rev() {
            let mut empty = 0;
            for file in File::ALL {
                match self.piece_at(Square::new(file, *rank)) {
                    Some((piece, color)) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(piece.to_fen_char(color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
            if *rank != Rank::R0 {
                placement.push('/');
            }
        }

        FenParser {
            piece_placement: placement,
            active_color: self.side_to_move.to_fen_char(),
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        }
        .to_fen()
    }

    /// Returns a copy of this position with `piece` placed on `sq`.
    pub fn with_piece(mut self, sq: Square, piece: Piece, color: Color) -> Self {
        self.board[sq.index() as usize] = Some((piece, color));
        self.hash = self.compute_hash();
        self
    }

    /// Returns a copy of this position with `sq` emptied.
    pub fn without_piece(mut self, sq: Square) -> Self {
        self.board[sq.index() as usize] = None;
        self.hash = self.compute_hash();
        self
    }

    /// Returns a copy of this position with the given side to move.
    pub fn with_side_to_move(mut self, color: Color) -> Self {
        self.side_to_move = color;
        self.hash = self.compute_hash();
        self
    }

    /// Checks that each side has exactly one general inside its palace and
    /// no more pieces of any type than it starts with.
    pub fn validate(&self) -> Result<(), PositionError> {
        for color in Color::ALL {
            let mut counts = [0usize; Piece::COUNT];
            for (_, piece) in self.squares_of(color) {
                counts[piece.index()] += 1;
            }
            for piece in Piece::ALL {
                let count = counts[piece.index()];
                if piece != Piece::General && count > piece.starting_count() {
                    return Err(PositionError::TooManyPieces {
                        color,
                        piece,
                        count,
                    });
                }
            }

            let mut generals = self
                .squares_of(color)
                .filter(|(_, piece)| *piece == Piece::General);
            let (sq, _) = generals
                .next()
                .ok_or(PositionError::MissingGeneral(color))?;
            if generals.next().is_some() {
                return Err(PositionError::ExtraGeneral(color));
            }
            if !sq.in_palace(color) {
                return Err(PositionError::GeneralOutsidePalace(color));
            }
        }
        Ok(())
    }

    /// Returns the piece on a square, if any.
    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<(Piece, Color)> {
        self.board[sq.index() as usize]
    }

    /// Returns the side to move.
    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Returns the number of plies since the last capture.
    #[inline]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    /// Returns the fullmove number.
    #[inline]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Returns the Zobrist hash of board and side to move.
    #[inline]
    pub fn zobrist_hash(&self) -> u64 {
        self.hash
    }

    /// Returns the earlier positions of the game, oldest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Returns the square of the given side's general, if present.
    pub fn general_square(&self, color: Color) -> Option<Square> {
        self.squares_of(color)
            .find(|(_, piece)| *piece == Piece::General)
            .map(|(sq, _)| sq)
    }

    /// Iterates over the squares and piece types of one side.
    pub fn squares_of(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| match self.piece_at(sq) {
            Some((piece, c)) if c == color => Some((sq, piece)),
            _ => None,
        })
    }

    /// Iterates over the squares holding the given piece of one side.
    pub fn pieces_of(&self, piece: Piece, color: Color) -> impl Iterator<Item = Square> + '_ {
        self.squares_of(color)
            .filter(move |(_, p)| *p == piece)
            .map(|(sq, _)| sq)
    }

    /// Plays a move, recording the current position in the history.
    ///
    /// No legality check is made; use a rule engine first.
    pub fn play(&self, m: xiangqi_core::Move) -> Position {
        let mover = self.side_to_move;
        let mut next = crate::movegen::make_move(self, m);
        let gave_check = crate::movegen::is_general_attacked(&next, mover.opposite());
        next.history.push(HistoryEntry {
            hash: self.hash,
            side: mover,
            gave_check,
        });
        next
    }

    /// Returns a copy without the game history, for search trees where
    /// repetition is not tracked.
    pub(crate) fn without_history(&self) -> Position {
        Position {
            history: Vec::new(),
            ..self.clone()
        }
    }

    /// Moves a piece without touching the history. Used by the move generator.
    pub(crate) fn apply_raw(&mut self, m: xiangqi_core::Move) {
        let from = m.from();
        let to = m.to();
        let Some((piece, color)) = self.piece_at(from) else {
            return;
        };

        let captured = self.piece_at(to);
        if let Some((cap_piece, cap_color)) = captured {
            self.hash ^= ZOBRIST.piece_key(cap_piece, cap_color, to);
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        self.hash ^= ZOBRIST.piece_key(piece, color, from);
        self.hash ^= ZOBRIST.piece_key(piece, color, to);
        self.board[from.index() as usize] = None;
        self.board[to.index() as usize] = Some((piece, color));

        if self.side_to_move == Color::Black {
            self.fullmove_number += 1;
        }
        self.side_to_move = self.side_to_move.opposite();
        self.hash ^= ZOBRIST.black_to_move;
    }

    fn compute_hash(&self) -> u64 {
        let mut hash = 0;
        for sq in Square::all() {
            if let Some((piece, color)) = self.piece_at(sq) {
                hash ^= ZOBRIST.piece_key(piece, color, sq);
            }
        }
        if self.side_to_move == Color::Black {
            hash ^= ZOBRIST.black_to_move;
        }
        hash
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

fn square_at(file: u8, rank: u8) -> Square {
    Square::new(File::ALL[file as usize], Rank::ALL[rank as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use xiangqi_core::Move;

    #[test]
    fn startpos_fen_roundtrip() {
        let pos = Position::startpos();
        assert_eq!(pos.to_fen(), FenParser::STARTPOS);
    }

    #[test]
    fn custom_fen_roundtrip() {
        let fen = "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C2C4/9/RNBAKABNR b - - 1 1";
        let pos = Position::from_fen(fen).unwrap();
        assert_eq!(pos.to_fen(), fen);
        assert_eq!(pos.side_to_move(), Color::Black);
    }

    #[test]
    fn piece_at() {
        let pos = Position::startpos();
        assert_eq!(
            pos.piece_at(Square::from_algebraic("e0").unwrap()),
            Some((Piece::General, Color::Red))
        );
        assert_eq!(
            pos.piece_at(Square::from_algebraic("h7").unwrap()),
            Some((Piece::Cannon, Color::Black))
        );
        assert_eq!(pos.piece_at(Square::from_algebraic("e4").unwrap()), None);
    }

    #[test]
    fn general_squares() {
        let pos = Position::startpos();
        assert_eq!(
            pos.general_square(Color::Red),
            Square::from_algebraic("e0")
        );
        assert_eq!(
            pos.general_square(Color::Black),
            Square::from_algebraic("e9")
        );
        assert_eq!(pos.pieces_of(Piece::Soldier, Color::Red).count(), 5);
    }

    #[test]
    fn missing_general_is_rejected() {
        let err = Position::from_fen("3a5/9/9/9/9/9/9/9/9/4K4 w").unwrap_err();
        assert_eq!(err, PositionError::MissingGeneral(Color::Black));
    }

    #[test]
    fn extra_general_is_rejected() {
        let err = Position::from_fen("3kk4/9/9/9/9/9/9/9/9/4K4 w").unwrap_err();
        assert_eq!(err, PositionError::ExtraGeneral(Color::Black));
    }

    #[test]
    fn general_outside_palace_is_rejected() {
        let err = Position::from_fen("4k4/9/9/9/9/9/9/9/9/K8 w").unwrap_err();
        assert_eq!(err, PositionError::GeneralOutsidePalace(Color::Red));
    }

    #[test]
    fn surplus_pieces_are_rejected() {
        let err = Position::from_fen(
            "1N1NkN1N1/N1N1N1N1N/1N1N1N1N1/N1N1N1N1N/1N1N1N1N1/N1N1N1N1N/1N1N1N1N1/N1N1N1N1N/1N1N1N1N1/N1N1K1N1N w",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PositionError::TooManyPieces {
                color: Color::Red,
                piece: Piece::Horse,
                ..
            }
        ));

        let err = Position::from_fen("4k4/9/9/9/PPPPPP3/9/9/9/9/4K4 w").unwrap_err();
        assert_eq!(
            err,
            PositionError::TooManyPieces {
                color: Color::Red,
                piece: Piece::Soldier,
                count: 6,
            }
        );

        // Fewer pieces than the starting set are fine.
        assert!(Position::from_fen("4k4/9/9/9/PPPPP4/9/9/9/9/4K4 w").is_ok());
    }

    #[test]
    fn builder_produces_new_values() {
        let e0 = Square::from_algebraic("e0").unwrap();
        let e9 = Square::from_algebraic("e9").unwrap();
        let base = Position::empty();
        let built = base
            .clone()
            .with_piece(e0, Piece::General, Color::Red)
            .with_piece(e9, Piece::General, Color::Black);
        assert!(base.validate().is_err());
        assert!(built.validate().is_ok());
        assert_eq!(built.to_fen(), "4k4/9/9/9/9/9/9/9/9/4K4 w - - 0 1");
        assert!(built.without_piece(e9).validate().is_err());
    }

    #[test]
    fn play_records_history_and_hash() {
        let pos = Position::startpos();
        let m = Move::from_iccs("h2e2").unwrap();
        let next = pos.play(m);

        assert_eq!(next.side_to_move(), Color::Black);
        assert_eq!(next.history().len(), 1);
        assert_eq!(next.history()[0].hash, pos.zobrist_hash());
        assert_eq!(next.history()[0].side, Color::Red);
        assert!(!next.history()[0].gave_check);
        assert_ne!(next.zobrist_hash(), pos.zobrist_hash());
        // The original is untouched.
        assert!(pos.history().is_empty());
    }

    #[test]
    fn incremental_hash_matches_fresh_hash() {
        let pos = Position::startpos()
            .play(Move::from_iccs("h2e2").unwrap())
            .play(Move::from_iccs("h9g7").unwrap())
            .play(Move::from_iccs("e2e6").unwrap());
        let fresh = Position::from_fen(&pos.to_fen()).unwrap();
        assert_eq!(pos.zobrist_hash(), fresh.zobrist_hash());
    }

    #[test]
    fn capture_resets_halfmove_clock() {
        let pos = Position::startpos()
            .play(Move::from_iccs("h2e2").unwrap())
            .play(Move::from_iccs("h9g7").unwrap());
        assert_eq!(pos.halfmove_clock(), 2);
        assert_eq!(pos.fullmove_number(), 2);

        let after_capture = pos.play(Move::from_iccs("e2e6").unwrap());
        assert_eq!(after_capture.halfmove_clock(), 0);
    }
}
