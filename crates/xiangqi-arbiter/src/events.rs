//! Events streamed from an analysis run.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use xiangqi_core::Move;

use crate::error::ArbiterError;
use crate::evaluation::Evaluation;

/// One progress tick: a completed search depth, or the book move at depth 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisEvent {
    pub depth: u8,
    pub best_move: Move,
    /// `best_move` in traditional Chinese notation.
    pub notation: String,
    pub evaluation: Evaluation,
    /// Nodes searched since the run started.
    pub nodes: u64,
    /// Time since the run started.
    pub elapsed: Duration,
    /// Principal variation starting with `best_move`.
    pub pv: Vec<Move>,
}

impl AnalysisEvent {
    /// Returns true for the book marker event.
    pub fn is_book(&self) -> bool {
        self.depth == 0
    }
}

/// A candidate that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// The candidate as it was judged.
    pub notation: String,
    /// Decoded move, when the notation could be decoded at all.
    #[serde(rename = "move")]
    pub mv: Option<Move>,
    /// 1-based validation attempt that rejected it.
    pub attempt: usize,
    pub reason: String,
}

/// Where an accepted move came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Book,
    Search,
}

/// The accepted move of a run; always legal under the run's rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(rename = "move")]
    pub mv: Move,
    pub notation: String,
    /// Display name of the rules the move was validated under.
    pub rule_variant: String,
    /// Candidates rejected before this one.
    pub retries: usize,
    pub source: DecisionSource,
    /// Expected reply, when pondering is enabled and the search produced one.
    pub ponder: Option<Move>,
    /// Search evaluation of the move, when it was the principal move.
    pub evaluation: Option<Evaluation>,
    /// Deepest completed depth; 0 for book moves.
    pub depth: u8,
}

/// Everything a run reports, in production order.
///
/// Every run ends with exactly one of `Decision`, `Failed` or `Cancelled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArbiterEvent {
    Progress(AnalysisEvent),
    Rejected(Rejection),
    Decision(Decision),
    Failed(ArbiterError),
    Cancelled,
}

impl ArbiterEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ArbiterEvent::Decision(_) | ArbiterEvent::Failed(_) | ArbiterEvent::Cancelled
        )
    }
}
