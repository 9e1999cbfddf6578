//! Standard rules.

use super::repetition::third_occurrence;
use super::{basic_legality, RuleEngine, RuleError};
use crate::Position;
use xiangqi_core::Move;

/// Standard Xiangqi rules.
///
/// - Classical piece movement; soldiers never retreat
/// - A move may not leave the mover's general attacked or facing the
///   opposing general on an open file
/// - Perpetual check: a move that brings about a position for the third time
///   is illegal when every one of the mover's moves since its first
///   occurrence gave check
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl RuleEngine for StandardRules {
    fn name(&self) -> &str {
        "Standard"
    }

    fn is_legal_move(&self, m: Move, position: &Position) -> Result<bool, RuleError> {
        if !basic_legality(m, position, self.geometry())? {
            return Ok(false);
        }
        let perpetual = third_occurrence(position, m).is_some_and(|r| r.perpetual_check);
        Ok(!perpetual)
    }
}
