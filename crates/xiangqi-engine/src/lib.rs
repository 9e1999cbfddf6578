//! Xiangqi rules engine.
//!
//! This crate provides:
//! - [`Position`] - board state with side to move, counters and repetition history
//! - Move generation with the palace, river, leg, eye and screen rules
//! - [`notation`] - ICCS, traditional Chinese and WXF decoding and rendering
//! - [`RuleEngine`] - the legality contract, implemented by [`RuleVariant`]
//! - [`search`] - iterative-deepening alpha-beta search for move proposals
//!
//! # Architecture
//!
//! The board is a 90-square mailbox indexed by rank and file. Positions are
//! immutable values: playing a move returns a new position that remembers
//! the hashes of the positions before it, which the rule variants use to
//! judge repetition.
//!
//! # Example
//!
//! ```
//! use xiangqi_engine::{notation, Position, RuleEngine, RuleVariant};
//!
//! let position = Position::startpos();
//! let rules = RuleVariant::Standard;
//! let moves = rules.legal_moves(&position).unwrap();
//! println!("Legal moves from the starting position: {}", moves.len());
//!
//! assert_eq!(rules.is_legal("炮二平五", &position), Ok(true));
//! let m = notation::decode(&position, "炮二平五").unwrap();
//! let next = position.play(m);
//! assert_eq!(notation::describe(&next, notation::decode(&next, "马8进7").unwrap()), "马8进7");
//! ```

pub mod eval;
pub mod movegen;
pub mod notation;
mod position;
pub mod rules;
pub mod search;
mod zobrist;

pub use movegen::{generate_moves, in_check, is_general_attacked, make_move, Geometry, MoveList};
pub use notation::{describe, NotationError};
pub use position::{HistoryEntry, Position, PositionError};
pub use rules::{PlatformRules, RelaxedRules, RuleEngine, RuleError, RuleVariant, StandardRules};
pub use search::{DepthReport, SearchLimits, SearchOutcome, Searcher, StopReason, StopSignals};
