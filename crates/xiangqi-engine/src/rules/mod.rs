//! Rule variants and the legality contract.
//!
//! Search and book code propose moves; a [`RuleEngine`] decides whether a
//! proposal may be played. All variants share piece geometry and check
//! evasion (including the flying-general rule). They differ in whether
//! soldiers may retreat and in how repeated positions are treated.

mod platform;
mod relaxed;
mod repetition;
mod standard;

pub use platform::PlatformRules;
pub use relaxed::RelaxedRules;
pub use standard::StandardRules;

use crate::movegen::{self, Geometry, MoveList};
use crate::notation::{self, NotationError};
use crate::position::PositionError;
use crate::Position;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use xiangqi_core::Move;

/// Errors raised while judging a move.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleError {
    /// The move string does not decode against the position.
    #[error("invalid notation: {0}")]
    InvalidNotation(#[from] NotationError),
    /// The position cannot be played on.
    #[error("invalid position: {0}")]
    InvalidPosition(#[from] PositionError),
}

/// A legality policy.
///
/// Implementations are pure functions of (move, position): the same inputs
/// always produce the same answer.
///
/// # Example
///
/// ```
/// use xiangqi_engine::{Position, RuleEngine, RuleVariant};
///
/// let position = Position::startpos();
/// assert_eq!(RuleVariant::Standard.is_legal("炮二平五", &position), Ok(true));
/// assert_eq!(RuleVariant::Standard.is_legal("h2h3", &position), Ok(true));
/// assert_eq!(RuleVariant::Standard.is_legal("车九平八", &position), Ok(false));
/// ```
pub trait RuleEngine {
    /// Stable display identifier.
    fn name(&self) -> &str;

    /// Piece movement used by this policy.
    fn geometry(&self) -> Geometry {
        Geometry::STANDARD
    }

    /// Judges a structured move.
    fn is_legal_move(&self, m: Move, position: &Position) -> Result<bool, RuleError>;

    /// Decodes `notation` against `position` and judges the result.
    ///
    /// A broken position is reported before the notation is looked at.
    fn is_legal(&self, notation: &str, position: &Position) -> Result<bool, RuleError> {
        position.validate()?;
        let m = notation::decode(position, notation)?;
        self.is_legal_move(m, position)
    }

    /// Lists every move this policy allows in `position`.
    fn legal_moves(&self, position: &Position) -> Result<MoveList, RuleError> {
        position.validate()?;
        let mut moves = movegen::generate_pseudo_moves(position, self.geometry());
        moves.retain(|m| matches!(self.is_legal_move(*m, position), Ok(true)));
        Ok(moves)
    }
}

impl<T: RuleEngine + ?Sized> RuleEngine for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn geometry(&self) -> Geometry {
        (**self).geometry()
    }

    fn is_legal_move(&self, m: Move, position: &Position) -> Result<bool, RuleError> {
        (**self).is_legal_move(m, position)
    }
}

/// Shared checks: the board is playable and the move keeps the mover's
/// general safe under `geometry`.
pub(crate) fn basic_legality(
    m: Move,
    position: &Position,
    geometry: Geometry,
) -> Result<bool, RuleError> {
    position.validate()?;
    Ok(movegen::is_legal(position, m, geometry))
}

/// The closed set of rule variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleVariant {
    /// Soldiers never retreat; perpetual check may not be repeated a third time.
    #[default]
    Standard,
    /// Soldiers across the river may step back; repetition is unrestricted.
    Relaxed,
    /// Soldiers never retreat; no position may be repeated a third time.
    #[serde(alias = "platform")]
    PlatformSpecific,
}

impl RuleVariant {
    pub const ALL: [RuleVariant; 3] = [
        RuleVariant::Standard,
        RuleVariant::Relaxed,
        RuleVariant::PlatformSpecific,
    ];

    /// Machine identifier used in configuration files and flags.
    pub const fn id(self) -> &'static str {
        match self {
            RuleVariant::Standard => "standard",
            RuleVariant::Relaxed => "relaxed",
            RuleVariant::PlatformSpecific => "platform_specific",
        }
    }
}

impl RuleEngine for RuleVariant {
    fn name(&self) -> &str {
        match self {
            RuleVariant::Standard => StandardRules.name(),
            RuleVariant::Relaxed => RelaxedRules.name(),
            RuleVariant::PlatformSpecific => PlatformRules.name(),
        }
    }

    fn geometry(&self) -> Geometry {
        match self {
            RuleVariant::Standard => StandardRules.geometry(),
            RuleVariant::Relaxed => RelaxedRules.geometry(),
            RuleVariant::PlatformSpecific => PlatformRules.geometry(),
        }
    }

    fn is_legal_move(&self, m: Move, position: &Position) -> Result<bool, RuleError> {
        match self {
            RuleVariant::Standard => StandardRules.is_legal_move(m, position),
            RuleVariant::Relaxed => RelaxedRules.is_legal_move(m, position),
            RuleVariant::PlatformSpecific => PlatformRules.is_legal_move(m, position),
        }
    }
}

impl fmt::Display for RuleVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an unknown variant identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown rule variant {0:?} (expected standard, relaxed or platform_specific)")]
pub struct UnknownVariant(pub String);

impl FromStr for RuleVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "standard" => Ok(RuleVariant::Standard),
            "relaxed" => Ok(RuleVariant::Relaxed),
            "platform_specific" | "platform" => Ok(RuleVariant::PlatformSpecific),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}
