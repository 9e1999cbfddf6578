//! Move generation.
//!
//! The board is a 90-square mailbox, so generation walks each piece of the
//! side to move and asks [`attacks`] for its targets. Legal generation then
//! filters out moves that leave the mover's general attacked, which also
//! covers the two generals facing each other on an open file.

mod attacks;
pub mod perft;

use crate::Position;
use xiangqi_core::{Color, Move, Piece};

pub use attacks::piece_targets;

/// A list of moves with a fixed maximum capacity.
///
/// Xiangqi positions stay well below 128 pseudo-legal moves, so a fixed
/// array avoids heap allocations during search.
#[derive(Clone)]
pub struct MoveList {
    moves: [Move; Self::MAX_MOVES],
    len: usize,
}

impl MoveList {
    /// Maximum number of moves the list can hold.
    pub const MAX_MOVES: usize = 160;

    /// Creates an empty move list.
    #[inline]
    pub const fn new() -> Self {
        MoveList {
            moves: [Move::NULL; Self::MAX_MOVES],
            len: 0,
        }
    }

    /// Adds a move to the list.
    #[inline]
    pub fn push(&mut self, m: Move) {
        debug_assert!(self.len < Self::MAX_MOVES);
        self.moves[self.len] = m;
        self.len += 1;
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[Move] {
        &self.moves[..self.len]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Move] {
        &mut self.moves[..self.len]
    }

    /// Returns true if the list holds `m`.
    pub fn contains(&self, m: Move) -> bool {
        self.as_slice().contains(&m)
    }

    /// Retains only moves for which the predicate returns true.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&Move) -> bool,
    {
        let mut write = 0;
        for read in 0..self.len {
            if f(&self.moves[read]) {
                self.moves[write] = self.moves[read];
                write += 1;
            }
        }
        self.len = write;
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<usize> for MoveList {
    type Output = Move;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        debug_assert!(index < self.len);
        &self.moves[index]
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl std::fmt::Debug for MoveList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// Piece-movement rules that differ between rule variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    /// Soldiers across the river may step straight back.
    pub soldier_retreat: bool,
}

impl Geometry {
    /// Classical movement.
    pub const STANDARD: Geometry = Geometry {
        soldier_retreat: false,
    };

    /// Classical movement plus soldier retreats across the river.
    pub const RELAXED: Geometry = Geometry {
        soldier_retreat: true,
    };
}

/// Generates pseudo-legal moves for the side to move.
pub fn generate_pseudo_moves(position: &Position, geometry: Geometry) -> MoveList {
    let us = position.side_to_move();
    let mut moves = MoveList::new();
    for (from, piece) in position.squares_of(us) {
        piece_targets(position, from, piece, us, geometry, &mut moves);
    }
    moves
}

/// Generates legal moves with classical geometry.
pub fn generate_moves(position: &Position) -> MoveList {
    generate_legal_moves(position, Geometry::STANDARD)
}

/// Generates moves that do not leave the mover's general attacked.
pub fn generate_legal_moves(position: &Position, geometry: Geometry) -> MoveList {
    let us = position.side_to_move();
    let mut moves = generate_pseudo_moves(position, geometry);
    moves.retain(|m| {
        let next = make_move(position, *m);
        !is_general_attacked_with(&next, us, geometry)
    });
    moves
}

/// Returns true if `m` moves a piece of the side to move along its own
/// movement rules.
pub fn is_pseudo_legal(position: &Position, m: Move, geometry: Geometry) -> bool {
    let us = position.side_to_move();
    let Some((piece, color)) = position.piece_at(m.from()) else {
        return false;
    };
    if color != us {
        return false;
    }
    let mut targets = MoveList::new();
    piece_targets(position, m.from(), piece, us, geometry, &mut targets);
    targets.contains(m)
}

/// Returns true if `m` is pseudo-legal and keeps the mover's general safe.
pub fn is_legal(position: &Position, m: Move, geometry: Geometry) -> bool {
    if !is_pseudo_legal(position, m, geometry) {
        return false;
    }
    let us = position.side_to_move();
    !is_general_attacked_with(&make_move(position, m), us, geometry)
}

/// Returns true if `color`'s general is attacked under classical geometry.
pub fn is_general_attacked(position: &Position, color: Color) -> bool {
    attacks::is_general_attacked(position, color, Geometry::STANDARD)
}

/// Returns true if `color`'s general is attacked under `geometry`.
pub fn is_general_attacked_with(position: &Position, color: Color, geometry: Geometry) -> bool {
    attacks::is_general_attacked(position, color, geometry)
}

/// Returns true if the side to move is in check.
pub fn in_check(position: &Position) -> bool {
    is_general_attacked(position, position.side_to_move())
}

/// Returns the position after `m` without recording history.
///
/// The move is assumed pseudo-legal; an empty origin leaves the board
/// unchanged apart from the side to move.
pub fn make_move(position: &Position, m: Move) -> Position {
    let mut next = position.clone();
    next.apply_raw(m);
    next
}

/// Returns the piece captured by `m`, if any.
pub fn captured_piece(position: &Position, m: Move) -> Option<Piece> {
    position.piece_at(m.to()).map(|(piece, _)| piece)
}
