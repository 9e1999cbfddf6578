//! Opening book storage and lookup.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use xiangqi_engine::Position;

use crate::opening::{BookInfo, OpeningMove};

/// Errors that can occur when working with opening books.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A book entry names a position that cannot be parsed.
    #[error("invalid position {fen:?} in opening book: {reason}")]
    InvalidPosition { fen: String, reason: String },

    /// Failed to read or write the book file.
    #[error("failed to access opening book: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A library already holds a book with this name.
    #[error("opening book {0:?} already exists")]
    DuplicateBook(String),

    /// A library holds no book with this name.
    #[error("no opening book named {0:?}")]
    UnknownBook(String),
}

/// Supplies at most one suggested move for a position.
pub trait OpeningBook {
    /// Returns the notation of a book move for `position`, if the book knows it.
    fn probe(&self, position: &Position) -> Option<String>;
}

/// Key under which a position is stored: piece placement and side to move.
///
/// Counters and history are left out so transpositions share an entry.
#[must_use]
pub fn position_key(position: &Position) -> String {
    let fen = position.to_fen();
    let mut parts = fen.split_whitespace();
    let placement = parts.next().unwrap_or_default();
    let side = parts.next().unwrap_or("w");
    format!("{placement} {side}")
}

/// A move database that maps positions to weighted candidate moves.
#[derive(Debug, Clone, Default)]
pub struct MoveDatabase {
    info: BookInfo,
    /// Maps position keys to candidate moves.
    positions: HashMap<String, Vec<OpeningMove>>,
}

/// On-disk layout of a book file.
#[derive(Debug, Serialize, Deserialize)]
struct BookFile {
    #[serde(flatten)]
    info: BookInfo,
    positions: Vec<BookEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BookEntry {
    fen: String,
    moves: Vec<OpeningMove>,
}

impl MoveDatabase {
    /// Creates a new empty move database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty database carrying the given description.
    #[must_use]
    pub fn with_info(info: BookInfo) -> Self {
        Self {
            info,
            positions: HashMap::new(),
        }
    }

    #[must_use]
    pub fn info(&self) -> &BookInfo {
        &self.info
    }

    /// Returns true if the database is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Returns the number of positions in the database.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Adds candidate moves for a position, replacing earlier ones.
    pub fn add_position(&mut self, position: &Position, moves: Vec<OpeningMove>) {
        self.positions.insert(position_key(position), moves);
    }

    /// Looks up candidate moves for a position.
    #[must_use]
    pub fn lookup(&self, position: &Position) -> Option<&[OpeningMove]> {
        self.positions
            .get(&position_key(position))
            .map(|v| v.as_slice())
    }

    /// Selects a random move from the candidates, weighted by their weights.
    pub fn select_move<R: Rng>(&self, position: &Position, rng: &mut R) -> Option<&OpeningMove> {
        let moves = self.lookup(position)?;
        if moves.is_empty() {
            return None;
        }

        let total_weight: u64 = moves.iter().map(|m| u64::from(m.weight)).sum();
        if total_weight == 0 {
            // If all weights are zero, select uniformly
            return moves.choose(rng);
        }

        let mut choice = rng.gen_range(0..total_weight);
        for mv in moves {
            let weight = u64::from(mv.weight);
            if choice < weight {
                return Some(mv);
            }
            choice -= weight;
        }

        moves.last()
    }

    /// Parses a book from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, DatabaseError> {
        let file: BookFile = serde_json::from_str(json)?;
        let mut db = MoveDatabase::with_info(file.info);
        for entry in file.positions {
            let position =
                Position::from_fen(&entry.fen).map_err(|e| DatabaseError::InvalidPosition {
                    fen: entry.fen.clone(),
                    reason: e.to_string(),
                })?;
            db.add_position(&position, entry.moves);
        }
        Ok(db)
    }

    /// Loads a book from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let db = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), positions = db.len(), "opening book loaded");
        Ok(db)
    }

    /// Serializes the book to JSON, positions in key order.
    pub fn to_json(&self) -> Result<String, DatabaseError> {
        let mut keys: Vec<&String> = self.positions.keys().collect();
        keys.sort();
        let positions = keys
            .into_iter()
            .map(|key| BookEntry {
                fen: key.clone(),
                moves: self.positions[key].clone(),
            })
            .collect();
        let file = BookFile {
            info: self.info.clone(),
            positions,
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Writes the book to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DatabaseError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl OpeningBook for MoveDatabase {
    fn probe(&self, position: &Position) -> Option<String> {
        let mut rng = rand::thread_rng();
        let selected = self.select_move(position, &mut rng)?;
        tracing::debug!(notation = %selected.notation, weight = selected.weight, "book move selected");
        Some(selected.notation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use xiangqi_core::Move;

    #[test]
    fn test_empty_move_database() {
        let db = MoveDatabase::new();
        assert!(db.is_empty());
        assert_eq!(db.len(), 0);
        assert!(db.lookup(&Position::startpos()).is_none());
        assert!(db.probe(&Position::startpos()).is_none());
    }

    #[test]
    fn test_move_database_add_and_lookup() {
        let mut db = MoveDatabase::new();
        db.add_position(
            &Position::startpos(),
            vec![
                OpeningMove::new("炮二平五", 100),
                OpeningMove::new("马八进七", 80),
            ],
        );

        assert!(!db.is_empty());
        assert_eq!(db.len(), 1);

        let moves = db.lookup(&Position::startpos()).unwrap();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].notation, "炮二平五");
    }

    #[test]
    fn test_key_ignores_counters_and_history() {
        let start = Position::startpos();
        let shuffled = start
            .play(Move::from_iccs("h0g2").unwrap())
            .play(Move::from_iccs("h9g7").unwrap())
            .play(Move::from_iccs("g2h0").unwrap())
            .play(Move::from_iccs("g7h9").unwrap());
        assert_eq!(position_key(&start), position_key(&shuffled));
        assert_ne!(start.to_fen(), shuffled.to_fen());
    }

    #[test]
    fn test_side_to_move_is_part_of_the_key() {
        let red = Position::startpos();
        let black = red.clone().with_side_to_move(xiangqi_core::Color::Black);
        assert_ne!(position_key(&red), position_key(&black));
    }

    #[test]
    fn test_move_database_select_move() {
        let mut db = MoveDatabase::new();
        db.add_position(&Position::startpos(), vec![OpeningMove::new("炮二平五", 100)]);

        let mut rng = rand::thread_rng();
        let selected = db.select_move(&Position::startpos(), &mut rng).unwrap();
        assert_eq!(selected.notation, "炮二平五");
    }

    #[test]
    fn test_zero_weight_moves_are_never_weighted_in() {
        let mut db = MoveDatabase::new();
        db.add_position(
            &Position::startpos(),
            vec![
                OpeningMove::new("马八进七", 0),
                OpeningMove::new("炮二平五", 5),
            ],
        );
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let selected = db.select_move(&Position::startpos(), &mut rng).unwrap();
            assert_eq!(selected.notation, "炮二平五");
        }
    }

    #[test]
    fn test_huge_weights_do_not_overflow() {
        let mut db = MoveDatabase::new();
        db.add_position(
            &Position::startpos(),
            vec![
                OpeningMove::new("炮二平五", u32::MAX),
                OpeningMove::new("马八进七", u32::MAX),
                OpeningMove::new("兵七进一", 0),
            ],
        );
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            let selected = db.select_move(&Position::startpos(), &mut rng).unwrap();
            assert_ne!(selected.notation, "兵七进一");
            seen.insert(selected.notation.clone());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_all_zero_weights_select_uniformly() {
        let mut db = MoveDatabase::new();
        db.add_position(
            &Position::startpos(),
            vec![OpeningMove::new("马八进七", 0), OpeningMove::new("炮二平五", 0)],
        );
        let mut rng = StdRng::seed_from_u64(11);
        assert!(db.select_move(&Position::startpos(), &mut rng).is_some());
    }

    #[test]
    fn test_json_roundtrip_through_file() {
        let mut db = MoveDatabase::with_info(BookInfo::new("测试").with_version("1"));
        db.add_position(
            &Position::startpos(),
            vec![OpeningMove::new("炮二平五", 10).with_win_rate(0.5)],
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        db.save(&path).unwrap();

        let loaded = MoveDatabase::load(&path).unwrap();
        assert_eq!(loaded.info(), db.info());
        assert_eq!(
            loaded.lookup(&Position::startpos()),
            db.lookup(&Position::startpos())
        );
    }

    #[test]
    fn test_bare_placement_keys_load() {
        let json = r#"{
            "name": "minimal",
            "positions": [
                {
                    "fen": "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR",
                    "moves": [{ "notation": "h2e2", "weight": 1 }]
                }
            ]
        }"#;
        let db = MoveDatabase::from_json(json).unwrap();
        assert_eq!(db.info().name, "minimal");
        assert_eq!(db.probe(&Position::startpos()).as_deref(), Some("h2e2"));
    }

    #[test]
    fn test_invalid_position_is_rejected() {
        let json = r#"{"name":"bad","positions":[{"fen":"9/9/9/9/9/9/9/9/9/9 w","moves":[]}]}"#;
        assert!(matches!(
            MoveDatabase::from_json(json),
            Err(DatabaseError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            MoveDatabase::load(dir.path().join("missing.json")),
            Err(DatabaseError::IoError(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_a_json_error() {
        assert!(matches!(
            MoveDatabase::from_json("{ not json"),
            Err(DatabaseError::JsonError(_))
        ));
    }
}
