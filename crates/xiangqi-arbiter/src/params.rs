//! Search parameters chosen by the user.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;
use thiserror::Error;
use xiangqi_engine::SearchLimits;

/// Accepted search depths.
pub const DEPTH_RANGE: RangeInclusive<u8> = 1..=64;
/// Accepted transposition table sizes, in megabytes.
pub const HASH_RANGE: RangeInclusive<usize> = 16..=2048;
/// Accepted search thread counts.
pub const THREAD_RANGE: RangeInclusive<usize> = 1..=32;

/// A parameter outside its accepted range.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("thinking time must be positive")]
    ZeroThinkingTime,
    #[error("max depth {0} outside 1..=64")]
    MaxDepth(u8),
    #[error("hash size {0} MB outside 16..=2048")]
    HashSize(usize),
    #[error("thread count {0} outside 1..=32")]
    Threads(usize),
}

/// Engine configuration snapshotted at the start of each run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParameters {
    pub thinking_time_ms: u64,
    pub max_depth: u8,
    pub hash_mb: usize,
    pub threads: usize,
    /// Consult the opening book before searching.
    pub book_enabled: bool,
    /// Report the expected reply with search decisions.
    pub ponder_enabled: bool,
}

impl Default for SearchParameters {
    fn default() -> Self {
        SearchParameters {
            thinking_time_ms: 3000,
            max_depth: 18,
            hash_mb: 512,
            threads: 4,
            book_enabled: true,
            ponder_enabled: true,
        }
    }
}

impl SearchParameters {
    /// Checks every field against its accepted range.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.thinking_time_ms == 0 {
            return Err(ParameterError::ZeroThinkingTime);
        }
        if !DEPTH_RANGE.contains(&self.max_depth) {
            return Err(ParameterError::MaxDepth(self.max_depth));
        }
        if !HASH_RANGE.contains(&self.hash_mb) {
            return Err(ParameterError::HashSize(self.hash_mb));
        }
        if !THREAD_RANGE.contains(&self.threads) {
            return Err(ParameterError::Threads(self.threads));
        }
        Ok(())
    }

    pub fn thinking_time(&self) -> Duration {
        Duration::from_millis(self.thinking_time_ms)
    }

    /// Limits handed to the searcher.
    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            max_depth: self.max_depth,
            thinking_time: self.thinking_time(),
            hash_mb: self.hash_mb,
            threads: self.threads,
        }
    }
}
