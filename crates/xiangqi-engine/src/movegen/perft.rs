//! Perft (performance test) for move generator validation.
//!
//! Perft counts the number of leaf nodes at a given depth, which can be
//! compared against known-correct values to validate the move generator.

use super::{generate_legal_moves, make_move, Geometry};
use crate::Position;

/// Counts the number of leaf nodes at the given depth with classical geometry.
pub fn perft(position: &Position, depth: u32) -> u64 {
    perft_with(position, depth, Geometry::STANDARD)
}

/// Counts leaf nodes under the given movement geometry.
pub fn perft_with(position: &Position, depth: u32, geometry: Geometry) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = generate_legal_moves(position, geometry);

    if depth == 1 {
        return moves.len() as u64;
    }

    moves
        .as_slice()
        .iter()
        .map(|m| perft_with(&make_move(position, *m), depth - 1, geometry))
        .sum()
}

/// Perft with divide: node count below each root move, sorted by ICCS.
pub fn perft_divide(position: &Position, depth: u32) -> Vec<(String, u64)> {
    let moves = generate_legal_moves(position, Geometry::STANDARD);
    let mut results: Vec<(String, u64)> = moves
        .as_slice()
        .iter()
        .map(|m| {
            let nodes = if depth > 1 {
                perft(&make_move(position, *m), depth - 1)
            } else {
                1
            };
            (m.to_iccs(), nodes)
        })
        .collect();

    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}
