//! Zobrist hashing for position identification.
//!
//! Zobrist hashing creates a near-unique hash for each Xiangqi position by
//! XORing random numbers associated with:
//! - Each piece on each square (14 pieces x 90 squares = 1260 values)
//! - Side to move
//!
//! Hashes are updated incrementally when moves are made and drive both
//! repetition detection and the search's transposition table.

use xiangqi_core::{Color, Piece, Square};

/// One random key per (piece, color, square), plus one for Black to move.
pub struct ZobristKeys {
    /// Indexed by [`Piece::index`], [`Color::index`] and [`Square::index`].
    pub pieces: [[[u64; Square::COUNT]; 2]; Piece::COUNT],
    pub black_to_move: u64,
}

/// splitmix64 step; returns the new state and its output.
const fn splitmix(state: u64) -> (u64, u64) {
    let state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    (state, z ^ (z >> 31))
}

impl ZobristKeys {
    /// Derives every key from a fixed seed, so hashes agree between runs.
    pub const fn new() -> Self {
        let mut state = 0x5851_F42D_4C95_7F2D;
        let mut pieces = [[[0u64; Square::COUNT]; 2]; Piece::COUNT];

        let mut slot = 0;
        while slot < Piece::COUNT * 2 * Square::COUNT {
            let (next, key) = splitmix(state);
            state = next;
            let square = slot % Square::COUNT;
            let color = (slot / Square::COUNT) % 2;
            let piece = slot / (Square::COUNT * 2);
            pieces[piece][color][square] = key;
            slot += 1;
        }

        let (_, black_to_move) = splitmix(state);
        ZobristKeys {
            pieces,
            black_to_move,
        }
    }

    #[inline]
    pub const fn piece_key(&self, piece: Piece, color: Color, square: Square) -> u64 {
        self.pieces[piece.index()][color.index()][square.index() as usize]
    }
}

/// Global Zobrist keys (initialized at compile time).
pub static ZOBRIST: ZobristKeys = ZobristKeys::new();
