use thiserror::Error;
use xiangqi_engine::PositionError;

use crate::params::ParameterError;

/// Errors reported by the arbiter, synchronously or as a run failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArbiterError {
    /// `start` was called while a run is active.
    #[error("an analysis run is already active")]
    AlreadyRunning,
    /// Configuration was changed while a run is active.
    #[error("cannot {0} while an analysis run is active")]
    Busy(&'static str),
    #[error("invalid search parameters: {0}")]
    InvalidParameters(#[from] ParameterError),
    /// No candidate passed the rules within the attempt bound.
    #[error("no legal move found after {attempts} validation attempts")]
    NoLegalMoveFound { attempts: usize },
    /// The run's position cannot be played on.
    #[error("invalid position: {0}")]
    InvalidPosition(#[from] PositionError),
    /// The worker thread could not be started.
    #[error("failed to start analysis worker: {0}")]
    Worker(String),
}
