//! Move arbitration for Xiangqi.
//!
//! This crate turns a position into one legal move. A run first consults an
//! opening book, otherwise searches with iterative deepening, streaming
//! progress as it goes, and finally validates candidates against a
//! [`RuleEngine`](xiangqi_engine::RuleEngine) before committing to one.
//!
//! # Overview
//!
//! - [`MoveArbiter`] - owns configuration and starts runs
//! - [`AnalysisRun`] - the event stream of one run
//! - [`ArbiterEvent`] - progress, rejections and the single terminal outcome
//! - [`SearchParameters`] - thinking time, depth, hash, threads, book, ponder
//! - [`Evaluation`] - scores shown in soldiers or as mate distances
//!
//! # Example
//!
//! ```no_run
//! use xiangqi_arbiter::{ArbiterEvent, MoveArbiter, SearchParameters};
//!
//! let mut arbiter = MoveArbiter::new();
//! arbiter.configure(SearchParameters { max_depth: 4, ..SearchParameters::default() })?;
//! for event in arbiter.start()? {
//!     match event {
//!         ArbiterEvent::Progress(p) => println!("depth {} {} {}", p.depth, p.notation, p.evaluation),
//!         ArbiterEvent::Decision(d) => println!("play {}", d.notation),
//!         other => println!("{other:?}"),
//!     }
//! }
//! # Ok::<(), xiangqi_arbiter::ArbiterError>(())
//! ```

pub mod arbiter;
mod error;
pub mod evaluation;
pub mod events;
pub mod params;

pub use arbiter::{AnalysisRun, ArbiterState, MoveArbiter, RunControl, MAX_VALIDATION_ATTEMPTS};
pub use error::ArbiterError;
pub use evaluation::Evaluation;
pub use events::{AnalysisEvent, ArbiterEvent, Decision, DecisionSource, Rejection};
pub use params::{ParameterError, SearchParameters};
