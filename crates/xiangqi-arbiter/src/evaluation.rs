//! Position evaluation as shown to the user.

use serde::{Deserialize, Serialize};
use std::fmt;
use xiangqi_engine::eval::{MATE_SCORE, MATE_THRESHOLD};

/// Represents a position evaluation from the mover's point of view.
///
/// Evaluations are either scores in hundredths of a soldier (for normal
/// positions) or mate distances (when a forced mate is found).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    /// Score in hundredths of a soldier (positive = the mover is better)
    Score(i32),
    /// Mate in N moves (positive = the mover mates, negative = the mover is mated)
    Mate(i32),
}

impl Evaluation {
    /// Converts a raw search score.
    pub fn from_score(score: i32) -> Self {
        if score.abs() < MATE_THRESHOLD {
            return Evaluation::Score(score);
        }
        let plies = MATE_SCORE - score.abs();
        let moves = (plies + 1) / 2;
        Evaluation::Mate(if score > 0 { moves } else { -moves })
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Evaluation::Score(score) => write!(f, "{:+.2}", f64::from(score) / 100.0),
            Evaluation::Mate(moves) if moves < 0 => write!(f, "-M{}", -moves),
            Evaluation::Mate(moves) => write!(f, "M{moves}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_display_in_soldiers() {
        assert_eq!(Evaluation::Score(35).to_string(), "+0.35");
        assert_eq!(Evaluation::Score(-120).to_string(), "-1.20");
        assert_eq!(Evaluation::Score(0).to_string(), "+0.00");
    }

    #[test]
    fn mate_scores_become_move_counts() {
        assert_eq!(Evaluation::from_score(MATE_SCORE - 1), Evaluation::Mate(1));
        assert_eq!(Evaluation::from_score(MATE_SCORE - 3), Evaluation::Mate(2));
        assert_eq!(Evaluation::from_score(-(MATE_SCORE - 2)), Evaluation::Mate(-1));
        assert_eq!(Evaluation::from_score(250), Evaluation::Score(250));
        assert_eq!(Evaluation::Mate(2).to_string(), "M2");
        assert_eq!(Evaluation::Mate(-1).to_string(), "-M1");
    }
}
