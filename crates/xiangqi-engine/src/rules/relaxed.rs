//! Relaxed rules for casual play.

use super::{basic_legality, RuleEngine, RuleError};
use crate::movegen::Geometry;
use crate::Position;
use xiangqi_core::Move;

/// Relaxed rules: soldiers across the river may step straight back, and
/// repeated positions are never restricted. Check evasion still applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelaxedRules;

impl RuleEngine for RelaxedRules {
    fn name(&self) -> &str {
        "Relaxed"
    }

    fn geometry(&self) -> Geometry {
        Geometry::RELAXED
    }

    fn is_legal_move(&self, m: Move, position: &Position) -> Result<bool, RuleError> {
        basic_legality(m, position, self.geometry())
    }
}
