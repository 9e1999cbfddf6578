//! Rules enforced by online play platforms.

use super::repetition::third_occurrence;
use super::{basic_legality, RuleEngine, RuleError};
use crate::Position;
use xiangqi_core::Move;

/// Platform rules: classical movement, and the mover may never bring about
/// any position for the third time, checking or not.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformRules;

impl RuleEngine for PlatformRules {
    fn name(&self) -> &str {
        "Platform-specific"
    }

    fn is_legal_move(&self, m: Move, position: &Position) -> Result<bool, RuleError> {
        if !basic_legality(m, position, self.geometry())? {
            return Ok(false);
        }
        Ok(third_occurrence(position, m).is_none())
    }
}
