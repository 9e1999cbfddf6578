//! Per-piece movement geometry and attack detection.
//!
//! Each `*_targets` function pushes the pseudo-legal moves of one piece.
//! Pseudo-legal means the piece's own movement rules hold (palace, river,
//! blocking legs and eyes, cannon screens) and the destination is not
//! occupied by a friendly piece; whether the mover's general ends up in
//! check is decided elsewhere.

use super::{Geometry, MoveList};
use crate::Position;
use xiangqi_core::{Color, Move, Piece, Square};

const ORTHOGONAL: [(i8, i8); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Horse jumps as (file delta, rank delta, leg file delta, leg rank delta).
const HORSE_JUMPS: [(i8, i8, i8, i8); 8] = [
    (1, 2, 0, 1),
    (-1, 2, 0, 1),
    (1, -2, 0, -1),
    (-1, -2, 0, -1),
    (2, 1, 1, 0),
    (2, -1, 1, 0),
    (-2, 1, -1, 0),
    (-2, -1, -1, 0),
];

#[inline]
fn push_if_target(position: &Position, from: Square, to: Square, us: Color, moves: &mut MoveList) {
    match position.piece_at(to) {
        Some((_, color)) if color == us => {}
        _ => moves.push(Move::new(from, to)),
    }
}

/// General: one orthogonal step inside the palace.
pub fn general_targets(position: &Position, from: Square, us: Color, moves: &mut MoveList) {
    for (df, dr) in ORTHOGONAL {
        if let Some(to) = from.offset(df, dr) {
            if to.in_palace(us) {
                push_if_target(position, from, to, us, moves);
            }
        }
    }
}

/// Advisor: one diagonal step inside the palace.
pub fn advisor_targets(position: &Position, from: Square, us: Color, moves: &mut MoveList) {
    for (df, dr) in DIAGONAL {
        if let Some(to) = from.offset(df, dr) {
            if to.in_palace(us) {
                push_if_target(position, from, to, us, moves);
            }
        }
    }
}

/// Elephant: two diagonal steps, blocked by a piece on the eye, never across the river.
pub fn elephant_targets(position: &Position, from: Square, us: Color, moves: &mut MoveList) {
    for (df, dr) in DIAGONAL {
        let (Some(eye), Some(to)) = (from.offset(df, dr), from.offset(2 * df, 2 * dr)) else {
            continue;
        };
        if to.on_home_side(us) && position.piece_at(eye).is_none() {
            push_if_target(position, from, to, us, moves);
        }
    }
}

/// Horse: one orthogonal then one diagonal step, blocked by a piece on the leg.
pub fn horse_targets(position: &Position, from: Square, us: Color, moves: &mut MoveList) {
    for (df, dr, lf, lr) in HORSE_JUMPS {
        let (Some(leg), Some(to)) = (from.offset(lf, lr), from.offset(df, dr)) else {
            continue;
        };
        if position.piece_at(leg).is_none() {
            push_if_target(position, from, to, us, moves);
        }
    }
}

/// Chariot: slides orthogonally until blocked, capturing the first enemy piece.
pub fn chariot_targets(position: &Position, from: Square, us: Color, moves: &mut MoveList) {
    for (df, dr) in ORTHOGONAL {
        let mut current = from;
        while let Some(to) = current.offset(df, dr) {
            match position.piece_at(to) {
                None => moves.push(Move::new(from, to)),
                Some((_, color)) => {
                    if color != us {
                        moves.push(Move::new(from, to));
                    }
                    break;
                }
            }
            current = to;
        }
    }
}

/// Cannon: slides like a chariot to move, captures by jumping exactly one screen.
pub fn cannon_targets(position: &Position, from: Square, us: Color, moves: &mut MoveList) {
    for (df, dr) in ORTHOGONAL {
        let mut current = from;
        let mut screened = false;
        while let Some(to) = current.offset(df, dr) {
            match (position.piece_at(to), screened) {
                (None, false) => moves.push(Move::new(from, to)),
                (None, true) => {}
                (Some(_), false) => screened = true,
                (Some((_, color)), true) => {
                    if color != us {
                        moves.push(Move::new(from, to));
                    }
                    break;
                }
            }
            current = to;
        }
    }
}

/// Soldier: one step forward; sideways once across the river; one step back
/// across the river only when the geometry permits retreats.
pub fn soldier_targets(
    position: &Position,
    from: Square,
    us: Color,
    geometry: Geometry,
    moves: &mut MoveList,
) {
    let forward = us.forward();
    if let Some(to) = from.offset(0, forward) {
        push_if_target(position, from, to, us, moves);
    }
    if from.on_home_side(us) {
        return;
    }
    for df in [1, -1] {
        if let Some(to) = from.offset(df, 0) {
            push_if_target(position, from, to, us, moves);
        }
    }
    if geometry.soldier_retreat {
        if let Some(to) = from.offset(0, -forward) {
            push_if_target(position, from, to, us, moves);
        }
    }
}

/// Pushes the pseudo-legal moves of the piece on `from`.
pub fn piece_targets(
    position: &Position,
    from: Square,
    piece: Piece,
    us: Color,
    geometry: Geometry,
    moves: &mut MoveList,
) {
    match piece {
        Piece::General => general_targets(position, from, us, moves),
        Piece::Advisor => advisor_targets(position, from, us, moves),
        Piece::Elephant => elephant_targets(position, from, us, moves),
        Piece::Horse => horse_targets(position, from, us, moves),
        Piece::Chariot => chariot_targets(position, from, us, moves),
        Piece::Cannon => cannon_targets(position, from, us, moves),
        Piece::Soldier => soldier_targets(position, from, us, geometry, moves),
    }
}

/// Returns true if `color`'s general is attacked, including by the opposing
/// general along an open file.
///
/// A side without a general is never reported as attacked.
pub fn is_general_attacked(position: &Position, color: Color, geometry: Geometry) -> bool {
    let Some(general) = position.general_square(color) else {
        return false;
    };
    let them = color.opposite();
    let is_enemy = |sq: Square, piece: Piece| position.piece_at(sq) == Some((piece, them));

    // Chariots, cannons and the facing general along ranks and files.
    for (df, dr) in ORTHOGONAL {
        let mut current = general;
        let mut screened = false;
        while let Some(sq) = current.offset(df, dr) {
            if let Some((piece, owner)) = position.piece_at(sq) {
                if !screened {
                    if owner == them
                        && (piece == Piece::Chariot || (piece == Piece::General && df == 0))
                    {
                        return true;
                    }
                    screened = true;
                } else {
                    if owner == them && piece == Piece::Cannon {
                        return true;
                    }
                    break;
                }
            }
            current = sq;
        }
    }

    // Horses: the leg sits diagonally next to the general.
    for (df, dr, _, _) in HORSE_JUMPS {
        let Some(horse) = general.offset(df, dr) else {
            continue;
        };
        if !is_enemy(horse, Piece::Horse) {
            continue;
        }
        let Some(leg) = general.offset(df.signum(), dr.signum()) else {
            continue;
        };
        if position.piece_at(leg).is_none() {
            return true;
        }
    }

    // Soldiers: from behind (their forward), from the side once across the
    // river, and from in front when retreats are allowed.
    let their_forward = them.forward();
    if let Some(sq) = general.offset(0, -their_forward) {
        if is_enemy(sq, Piece::Soldier) {
            return true;
        }
    }
    for df in [1, -1] {
        if let Some(sq) = general.offset(df, 0) {
            if is_enemy(sq, Piece::Soldier) && !sq.on_home_side(them) {
                return true;
            }
        }
    }
    if geometry.soldier_retreat {
        if let Some(sq) = general.offset(0, their_forward) {
            if is_enemy(sq, Piece::Soldier) && !sq.on_home_side(them) {
                return true;
            }
        }
    }

    false
}
