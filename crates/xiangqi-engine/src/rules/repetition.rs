//! Repetition detection over a position's recorded history.

use crate::Position;
use xiangqi_core::Move;

/// A move that would bring about a position for the third time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ThirdOccurrence {
    /// Every move the mover made since the first occurrence, this one
    /// included, gave check.
    pub perpetual_check: bool,
}

/// Returns `Some` if playing `m` repeats a position for the third time.
pub(crate) fn third_occurrence(position: &Position, m: Move) -> Option<ThirdOccurrence> {
    let mover = position.side_to_move();
    let next = position.play(m);
    let target = next.zobrist_hash();
    let history = next.history();

    let first = history.iter().position(|entry| entry.hash == target)?;
    let earlier = history[first..]
        .iter()
        .filter(|entry| entry.hash == target)
        .count();
    if earlier < 2 {
        return None;
    }

    let perpetual_check = history[first..]
        .iter()
        .filter(|entry| entry.side == mover)
        .all(|entry| entry.gave_check);
    Some(ThirdOccurrence { perpetual_check })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::Position;
    use xiangqi_core::Move;

    /// The red chariot follows the black general between the d and e
    /// files, checking on every move.
    pub fn checking_cycle() -> (Position, [Move; 4]) {
        let position = Position::from_fen("4k4/9/9/9/9/9/9/9/3R5/5K3 w").unwrap();
        let cycle = [
            Move::from_iccs("d1e1").unwrap(),
            Move::from_iccs("e9d9").unwrap(),
            Move::from_iccs("e1d1").unwrap(),
            Move::from_iccs("d9e9").unwrap(),
        ];
        (position, cycle)
    }

    /// Both sides shuffle chariots on their back ranks without checks.
    pub fn quiet_cycle() -> (Position, [Move; 4]) {
        let position = Position::from_fen("r2k5/9/9/9/9/9/9/9/9/R3K4 w").unwrap();
        let cycle = [
            Move::from_iccs("a0b0").unwrap(),
            Move::from_iccs("a9b9").unwrap(),
            Move::from_iccs("b0a0").unwrap(),
            Move::from_iccs("b9a9").unwrap(),
        ];
        (position, cycle)
    }

    /// Plays `cycle` through `times` times.
    pub fn play_cycles(position: Position, cycle: &[Move; 4], times: usize) -> Position {
        let mut position = position;
        for _ in 0..times {
            for m in cycle {
                position = position.play(*m);
            }
        }
        position
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn fresh_positions_do_not_repeat() {
        let (position, cycle) = quiet_cycle();
        assert_eq!(third_occurrence(&position, cycle[0]), None);
    }

    #[test]
    fn second_occurrence_is_not_third() {
        let (position, cycle) = quiet_cycle();
        // After one full cycle the start position has occurred twice; the
        // move leading to the position after a0b0 has occurred once.
        let position = play_cycles(position, &cycle, 1);
        assert_eq!(third_occurrence(&position, cycle[0]), None);
    }

    #[test]
    fn third_quiet_occurrence_is_detected() {
        let (position, cycle) = quiet_cycle();
        let position = play_cycles(position, &cycle, 2);
        assert_eq!(
            third_occurrence(&position, cycle[0]),
            Some(ThirdOccurrence {
                perpetual_check: false
            })
        );
    }

    #[test]
    fn third_checking_occurrence_is_perpetual() {
        let (position, cycle) = checking_cycle();
        let position = play_cycles(position, &cycle, 2);
        assert_eq!(
            third_occurrence(&position, cycle[0]),
            Some(ThirdOccurrence {
                perpetual_check: true
            })
        );
    }
}
