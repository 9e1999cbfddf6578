//! Core opening book types.

use serde::{Deserialize, Serialize};

/// A single move from an opening book with associated metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningMove {
    /// The move in any notation the rule engine decodes (e.g. "炮二平五").
    pub notation: String,
    /// How often the move was played; higher is picked more often.
    pub weight: u32,
    /// Share of games won after this move, between 0 and 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_rate: Option<f32>,
}

impl OpeningMove {
    /// Creates a new opening move with the given notation and weight.
    #[must_use]
    pub fn new(notation: impl Into<String>, weight: u32) -> Self {
        Self {
            notation: notation.into(),
            weight,
            win_rate: None,
        }
    }

    /// Sets the recorded win rate.
    #[must_use]
    pub fn with_win_rate(mut self, win_rate: f32) -> Self {
        self.win_rate = Some(win_rate);
        self
    }
}

/// Descriptive information about a book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl BookInfo {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            author: None,
            version: None,
        }
    }

    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}
