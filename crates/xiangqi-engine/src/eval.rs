//! Static evaluation.
//!
//! Material plus piece-square bonuses, in hundredths of a soldier, from the
//! side to move's perspective.

use crate::Position;
use xiangqi_core::{Color, Piece, Square};

/// Score of a mate at the root; mates further away score closer to zero.
pub const MATE_SCORE: i32 = 30_000;

/// Scores beyond this magnitude encode a forced mate.
pub const MATE_THRESHOLD: i32 = MATE_SCORE - 256;

const SOLDIER_VALUE: i32 = 100;
const ADVISOR_VALUE: i32 = 200;
const ELEPHANT_VALUE: i32 = 200;
const HORSE_VALUE: i32 = 400;
const CANNON_VALUE: i32 = 450;
const CHARIOT_VALUE: i32 = 900;

/// Material value of a piece; the general is priceless and scores zero.
pub const fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::General => 0,
        Piece::Advisor => ADVISOR_VALUE,
        Piece::Elephant => ELEPHANT_VALUE,
        Piece::Horse => HORSE_VALUE,
        Piece::Chariot => CHARIOT_VALUE,
        Piece::Cannon => CANNON_VALUE,
        Piece::Soldier => SOLDIER_VALUE,
    }
}

/// Soldier bonuses from Red's perspective, rank 9 first.
#[rustfmt::skip]
const SOLDIER_PST: [i32; 90] = [
     0,   3,   6,   9,  12,   9,   6,   3,   0,
    18,  36,  56,  80, 120,  80,  56,  36,  18,
    14,  26,  42,  60,  80,  60,  42,  26,  14,
    10,  20,  30,  34,  40,  34,  30,  20,  10,
     6,  12,  18,  18,  20,  18,  18,  12,   6,
     2,   0,   8,   0,   8,   0,   8,   0,   2,
     0,   0,  -2,   0,   4,   0,  -2,   0,   0,
     0,   0,   0,   0,   0,   0,   0,   0,   0,
     0,   0,   0,   0,   0,   0,   0,   0,   0,
     0,   0,   0,   0,   0,   0,   0,   0,   0,
];

/// Horse bonuses from Red's perspective, rank 9 first.
#[rustfmt::skip]
const HORSE_PST: [i32; 90] = [
     4,   8,  16,  12,   4,  12,  16,   8,   4,
     4,  10,  28,  16,   8,  16,  28,  10,   4,
    12,  14,  16,  20,  18,  20,  16,  14,  12,
     8,  24,  18,  24,  20,  24,  18,  24,   8,
     6,  16,  14,  18,  16,  18,  14,  16,   6,
     4,  12,  16,  14,  12,  14,  16,  12,   4,
     2,   6,   8,   6,  10,   6,   8,   6,   2,
     4,   2,   8,   8,   4,   8,   8,   2,   4,
     0,   2,   4,   4,  -2,   4,   4,   2,   0,
     0,  -4,   0,   0,   0,   0,   0,  -4,   0,
];

/// Index into a Red-perspective table, mirroring Black's squares.
#[inline]
fn table_index(sq: Square, color: Color) -> usize {
    let file = sq.file().index() as usize;
    let rank = sq.rank().index() as usize;
    match color {
        Color::Red => (9 - rank) * 9 + file,
        Color::Black => rank * 9 + (8 - file),
    }
}

fn positional_bonus(piece: Piece, sq: Square, color: Color) -> i32 {
    match piece {
        Piece::Soldier => SOLDIER_PST[table_index(sq, color)],
        Piece::Horse => HORSE_PST[table_index(sq, color)],
        // Central cannons pin the opposing general's file.
        Piece::Cannon if sq.file().index() == 4 => 20,
        // Chariots are strongest once off the back rank.
        Piece::Chariot if sq.rank().index() != color.back_rank() => 15,
        _ => 0,
    }
}

/// Evaluates the position from the side to move's perspective.
pub fn evaluate(position: &Position) -> i32 {
    let mut score = 0i32;

    for color in Color::ALL {
        let sign = if color == Color::Red { 1 } else { -1 };
        for (sq, piece) in position.squares_of(color) {
            score += sign * (piece_value(piece) + positional_bonus(piece, sq, color));
        }
    }

    if position.side_to_move() == Color::Red {
        score
    } else {
        -score
    }
}
