//! Built-in opening book data.
//!
//! This module provides the classic book that is compiled into the library.
//! Lines are written in traditional notation and replayed from the starting
//! position to find the key each set of candidates belongs to.

use xiangqi_engine::{notation, Position};

use crate::database::MoveDatabase;
use crate::opening::{BookInfo, OpeningMove};

/// A line from the starting position and the candidates played after it.
struct BookLine {
    line: &'static [&'static str],
    moves: &'static [(&'static str, u32, Option<f32>)],
}

const CLASSIC_LINES: &[BookLine] = &[
    // Starting position, by popularity.
    BookLine {
        line: &[],
        moves: &[
            ("炮二平五", 1245, Some(0.582)), // Central Cannon
            ("马八进七", 987, Some(0.547)),
            ("车一进一", 845, Some(0.621)),
            ("兵七进一", 763, Some(0.516)), // Pawn Opening
            ("相三进五", 654, Some(0.568)), // Elephant Opening
            ("马二进三", 589, Some(0.534)),
            ("车九平八", 476, Some(0.597)),
            ("炮八平九", 423, Some(0.493)),
            ("士四进五", 387, Some(0.551)),
            ("炮五平六", 321, Some(0.529)),
        ],
    },
    BookLine {
        line: &["炮二平五"],
        moves: &[
            ("马8进7", 612, None), // Screen Horses
            ("炮8平5", 344, None), // Same Direction Cannons
            ("马2进3", 298, None),
            ("卒7进1", 121, None),
        ],
    },
    BookLine {
        line: &["马八进七"],
        moves: &[("卒7进1", 402, None), ("马2进3", 311, None), ("炮8平5", 96, None)],
    },
    BookLine {
        line: &["兵七进一"],
        moves: &[("卒7进1", 356, None), ("炮2平3", 201, None), ("马8进7", 140, None)],
    },
    BookLine {
        line: &["相三进五"],
        moves: &[("马8进7", 280, None), ("卒7进1", 233, None), ("炮2平4", 118, None)],
    },
    BookLine {
        line: &["马二进三"],
        moves: &[("卒7进1", 260, None), ("马8进7", 214, None), ("车9进1", 75, None)],
    },
    BookLine {
        line: &["炮二平五", "马8进7"],
        moves: &[("马二进三", 540, None), ("兵七进一", 160, None)],
    },
    BookLine {
        line: &["炮二平五", "马8进7", "马二进三"],
        moves: &[("车9平8", 470, None), ("卒7进1", 190, None)],
    },
    BookLine {
        line: &["炮二平五", "马8进7", "马二进三", "车9平8"],
        moves: &[("车一平二", 455, None), ("兵七进一", 120, None)],
    },
];

/// Replays a line of moves from the starting position.
fn position_after(line: &[&str]) -> Option<Position> {
    let mut position = Position::startpos();
    for text in line {
        match notation::decode(&position, text) {
            Ok(m) => position = position.play(m),
            Err(err) => {
                tracing::warn!(%text, %err, "skipping unplayable book line");
                return None;
            }
        }
    }
    Some(position)
}

/// Creates the built-in classic opening book.
///
/// The first moves carry the weights and win rates collected for the book;
/// a few of them cannot be played from the standard array and are rejected
/// by the rules when drawn.
#[must_use]
pub fn builtin_database() -> MoveDatabase {
    let info = BookInfo::new("经典开局库")
        .with_author("象棋大师")
        .with_version("2024.1");
    let mut db = MoveDatabase::with_info(info);

    for entry in CLASSIC_LINES {
        let Some(position) = position_after(entry.line) else {
            continue;
        };
        let moves = entry
            .moves
            .iter()
            .map(|&(notation, weight, win_rate)| {
                let mv = OpeningMove::new(notation, weight);
                match win_rate {
                    Some(rate) => mv.with_win_rate(rate),
                    None => mv,
                }
            })
            .collect();
        db.add_position(&position, moves);
    }

    db
}
