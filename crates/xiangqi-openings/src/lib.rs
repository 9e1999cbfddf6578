//! Xiangqi opening book database and lookup.
//!
//! This crate provides functionality for storing, loading, and querying
//! opening books. Positions are keyed by piece placement and side to move,
//! each carrying weighted candidate moves in any notation the rule engine
//! decodes. A classic book is compiled in; custom books load from JSON and
//! can be collected into a [`BookLibrary`] of named books.

pub mod builtin;
pub mod database;
pub mod library;
pub mod opening;

pub use builtin::builtin_database;
pub use database::{position_key, DatabaseError, MoveDatabase, OpeningBook};
pub use library::BookLibrary;
pub use opening::{BookInfo, OpeningMove};
