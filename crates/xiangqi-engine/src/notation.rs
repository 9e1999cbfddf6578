//! Move notation: ICCS coordinates, traditional Chinese and WXF.
//!
//! Decoding resolves a move string against a position into a structured
//! [`Move`]. A string decodes to exactly one move or fails with a
//! [`NotationError`]; it never guesses between candidates.
//!
//! ```text
//! ICCS     h2e2        h2-e2
//! Chinese  炮二平五     马8进7      前炮平五
//! WXF      C2.5        H8+7        +C.5
//! ```
//!
//! Chinese and WXF file numbers are relative to the mover: Red counts files
//! from its right (i = 1), Black from its right (a = 1).

use crate::movegen::Geometry;
use crate::Position;
use thiserror::Error;
use xiangqi_core::{Color, File, Move, Piece, Square};

/// Reasons a move string cannot be decoded against a position.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotationError {
    #[error("empty move string")]
    Empty,
    #[error("unrecognized move format: {0:?}")]
    UnrecognizedFormat(String),
    #[error("unknown piece symbol {0:?}")]
    UnknownPiece(char),
    #[error("invalid file or step number {0:?}")]
    InvalidNumber(char),
    #[error("invalid action symbol {0:?}")]
    InvalidAction(char),
    #[error("no {piece:?} on file {file}")]
    NoPieceOnFile { piece: Piece, file: u8 },
    #[error("no file holds more than one {0:?}")]
    NoTandemPieces(Piece),
    #[error("tandem prefix {0:?} does not match the pieces on the file")]
    InvalidTandemPrefix(char),
    #[error("notation matches more than one {0:?}")]
    Ambiguous(Piece),
    #[error("{0:?} cannot reach the named target")]
    UnreachableTarget(Piece),
    #[error("destination is off the board")]
    OffBoard,
    #[error("no piece on {0}")]
    EmptyOrigin(Square),
}

/// The notation families the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotationKind {
    Iccs,
    Chinese,
    Wxf,
}

impl NotationKind {
    /// Guesses the family of a move string from its shape.
    pub fn detect(text: &str) -> Option<NotationKind> {
        let text = text.trim();
        if iccs_body(text).is_some() {
            Some(NotationKind::Iccs)
        } else if text.chars().next()?.is_ascii() {
            Some(NotationKind::Wxf)
        } else {
            Some(NotationKind::Chinese)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Advance,
    Retreat,
    Traverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tandem {
    /// Index counted from the front; `usize::MAX` marks the rearmost piece.
    Index(usize),
    Middle,
}

const REAR: usize = usize::MAX;

/// Decodes `text` into a move for the side to move in `position`.
pub fn decode(position: &Position, text: &str) -> Result<Move, NotationError> {
    let text = text.trim();
    match NotationKind::detect(text) {
        None => Err(NotationError::Empty),
        Some(NotationKind::Iccs) => decode_iccs(position, text),
        Some(NotationKind::Wxf) => decode_wxf(position, text),
        Some(NotationKind::Chinese) => decode_chinese(position, text),
    }
}

fn iccs_body(text: &str) -> Option<String> {
    let lowered = text.to_ascii_lowercase();
    let body = match lowered.len() {
        4 => lowered,
        5 if lowered.as_bytes()[2] == b'-' => lowered.replacen('-', "", 1),
        _ => return None,
    };
    Move::from_iccs(&body).map(|_| body)
}

fn decode_iccs(position: &Position, text: &str) -> Result<Move, NotationError> {
    let m = iccs_body(text)
        .and_then(|body| Move::from_iccs(&body))
        .ok_or_else(|| NotationError::UnrecognizedFormat(text.to_string()))?;
    if position.piece_at(m.from()).is_none() {
        return Err(NotationError::EmptyOrigin(m.from()));
    }
    Ok(m)
}

fn decode_chinese(position: &Position, text: &str) -> Result<Move, NotationError> {
    let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.len() != 4 {
        return Err(NotationError::UnrecognizedFormat(text.to_string()));
    }

    let action = chinese_action(chars[2])?;
    let target = parse_number(chars[3])?;

    if let Some(piece) = Piece::from_chinese_char(chars[0]) {
        let file = parse_number(chars[1])?;
        resolve_on_file(position, piece, file, action, target)
    } else if let Some(piece) = Piece::from_chinese_char(chars[1]) {
        let tandem = match chars[0] {
            '前' => Tandem::Index(0),
            '中' => Tandem::Middle,
            '后' | '後' => Tandem::Index(REAR),
            c => match chinese_numeral(c) {
                Some(n) if n <= 5 => Tandem::Index(n as usize - 1),
                _ => return Err(NotationError::InvalidTandemPrefix(c)),
            },
        };
        resolve_tandem(position, piece, tandem, chars[0], action, target)
    } else {
        Err(NotationError::UnknownPiece(chars[0]))
    }
}

fn decode_wxf(position: &Position, text: &str) -> Result<Move, NotationError> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() != 4 {
        return Err(NotationError::UnrecognizedFormat(text.to_string()));
    }

    let action = wxf_action(chars[2])?;
    let target = parse_number(chars[3])?;

    match (chars[0], chars[1]) {
        (prefix @ ('+' | '-'), letter) | (letter, prefix @ ('+' | '-')) => {
            let piece = Piece::from_wxf_char(letter).ok_or(NotationError::UnknownPiece(letter))?;
            let tandem = if prefix == '+' {
                Tandem::Index(0)
            } else {
                Tandem::Index(REAR)
            };
            resolve_tandem(position, piece, tandem, prefix, action, target)
        }
        (letter, file) => {
            let piece = Piece::from_wxf_char(letter).ok_or(NotationError::UnknownPiece(letter))?;
            let file = parse_number(file)?;
            resolve_on_file(position, piece, file, action, target)
        }
    }
}

fn chinese_action(c: char) -> Result<Action, NotationError> {
    match c {
        '进' | '進' => Ok(Action::Advance),
        '退' => Ok(Action::Retreat),
        '平' => Ok(Action::Traverse),
        other => Err(NotationError::InvalidAction(other)),
    }
}

fn wxf_action(c: char) -> Result<Action, NotationError> {
    match c {
        '+' => Ok(Action::Advance),
        '-' => Ok(Action::Retreat),
        '.' | '=' => Ok(Action::Traverse),
        other => Err(NotationError::InvalidAction(other)),
    }
}

const CHINESE_NUMERALS: [char; 9] = ['一', '二', '三', '四', '五', '六', '七', '八', '九'];

fn chinese_numeral(c: char) -> Option<u8> {
    CHINESE_NUMERALS
        .iter()
        .position(|&n| n == c)
        .map(|i| i as u8 + 1)
}

/// Parses a number 1-9 written as a Chinese numeral, an ASCII digit or a
/// full-width digit.
fn parse_number(c: char) -> Result<u8, NotationError> {
    let n = match c {
        '1'..='9' => c as u8 - b'0',
        '１'..='９' => (c as u32 - '０' as u32) as u8,
        _ => chinese_numeral(c).ok_or(NotationError::InvalidNumber(c))?,
    };
    Ok(n)
}

/// Pieces of one type on one file, most advanced first.
fn file_column(position: &Position, piece: Piece, us: Color, file: File) -> Vec<Square> {
    let mut column: Vec<Square> = position
        .pieces_of(piece, us)
        .filter(|sq| sq.file() == file)
        .collect();
    column.sort_by_key(|sq| {
        let rank = sq.rank().index() as i8;
        -(rank * us.forward())
    });
    column
}

fn resolve_on_file(
    position: &Position,
    piece: Piece,
    file_number: u8,
    action: Action,
    target: u8,
) -> Result<Move, NotationError> {
    let us = position.side_to_move();
    let file = File::from_number(file_number, us).ok_or(NotationError::InvalidNumber(
        char::from(b'0' + file_number),
    ))?;
    let column = file_column(position, piece, us, file);
    if column.is_empty() {
        return Err(NotationError::NoPieceOnFile {
            piece,
            file: file_number,
        });
    }

    let mut resolved: Vec<Move> = Vec::new();
    let mut last_error = NotationError::UnreachableTarget(piece);
    for &from in &column {
        match destination(from, piece, us, action, target) {
            Ok(to) => resolved.push(Move::new(from, to)),
            Err(e) => last_error = e,
        }
    }

    match resolved.len() {
        0 => Err(last_error),
        1 => Ok(resolved[0]),
        // Advisors and elephants may share a file without a tandem prefix;
        // the one that can actually make the move is meant.
        _ if matches!(piece, Piece::Advisor | Piece::Elephant) => {
            let mut movable = resolved
                .iter()
                .filter(|m| crate::movegen::is_pseudo_legal(position, **m, Geometry::STANDARD));
            match (movable.next(), movable.next()) {
                (Some(m), None) => Ok(*m),
                _ => Err(NotationError::Ambiguous(piece)),
            }
        }
        _ => Err(NotationError::Ambiguous(piece)),
    }
}

fn resolve_tandem(
    position: &Position,
    piece: Piece,
    tandem: Tandem,
    prefix: char,
    action: Action,
    target: u8,
) -> Result<Move, NotationError> {
    let us = position.side_to_move();
    let mut columns = File::ALL
        .into_iter()
        .map(|file| file_column(position, piece, us, file))
        .filter(|column| column.len() >= 2);
    let column = columns.next().ok_or(NotationError::NoTandemPieces(piece))?;
    if columns.next().is_some() {
        return Err(NotationError::Ambiguous(piece));
    }

    let index = match tandem {
        Tandem::Index(REAR) => column.len() - 1,
        Tandem::Index(i) if i < column.len() => i,
        Tandem::Middle if column.len() == 3 => 1,
        _ => return Err(NotationError::InvalidTandemPrefix(prefix)),
    };
    let from = column[index];
    let to = destination(from, piece, us, action, target)?;
    Ok(Move::new(from, to))
}

/// Computes the destination named by an action and target number.
///
/// Straight movers count steps when advancing or retreating; diagonal movers
/// name the destination file, the rank change following from their shape.
fn destination(
    from: Square,
    piece: Piece,
    us: Color,
    action: Action,
    target: u8,
) -> Result<Square, NotationError> {
    let direction = match action {
        Action::Advance => us.forward(),
        Action::Retreat => -us.forward(),
        Action::Traverse => {
            if !piece.is_straight_mover() {
                return Err(NotationError::UnreachableTarget(piece));
            }
            let file = File::from_number(target, us)
                .ok_or(NotationError::InvalidNumber(char::from(b'0' + target)))?;
            let df = file.index() as i8 - from.file().index() as i8;
            if df == 0 {
                return Err(NotationError::UnreachableTarget(piece));
            }
            return from.offset(df, 0).ok_or(NotationError::OffBoard);
        }
    };

    if piece.is_straight_mover() {
        return from
            .offset(0, direction * target as i8)
            .ok_or(NotationError::OffBoard);
    }

    let file = File::from_number(target, us)
        .ok_or(NotationError::InvalidNumber(char::from(b'0' + target)))?;
    let df = file.index() as i8 - from.file().index() as i8;
    let ranks = match (piece, df.abs()) {
        (Piece::Advisor, 1) => 1,
        (Piece::Elephant, 2) => 2,
        (Piece::Horse, 1) => 2,
        (Piece::Horse, 2) => 1,
        _ => return Err(NotationError::UnreachableTarget(piece)),
    };
    from.offset(df, direction * ranks)
        .ok_or(NotationError::OffBoard)
}

/// Renders a move in traditional Chinese notation.
///
/// Red numbers use Chinese numerals and Black numbers ASCII digits. Falls
/// back to ICCS when the origin is empty or when tandem pieces stand on
/// more than one file.
pub fn describe(position: &Position, m: Move) -> String {
    let Some((piece, color)) = position.piece_at(m.from()) else {
        return m.to_iccs();
    };
    let Some((action, target)) = action_and_target(m, piece, color) else {
        return m.to_iccs();
    };
    let number = |n: u8| match color {
        Color::Red => CHINESE_NUMERALS[n as usize - 1],
        Color::Black => char::from(b'0' + n),
    };
    let action_char = match action {
        Action::Advance => '进',
        Action::Retreat => '退',
        Action::Traverse => '平',
    };
    let symbol = piece.chinese_char(color);

    let mut out = String::new();
    match tandem_prefix(position, m.from(), piece, color) {
        Prefix::Single => {
            out.push(symbol);
            out.push(number(m.from().file().number_for(color)));
        }
        Prefix::Tandem(prefix) => {
            out.push(prefix);
            out.push(symbol);
        }
        Prefix::Unrepresentable => return m.to_iccs(),
    }
    out.push(action_char);
    out.push(number(target));
    out
}

/// Renders a move in WXF notation, falling back to ICCS where WXF needs
/// more than a front/rear prefix.
pub fn describe_wxf(position: &Position, m: Move) -> String {
    let Some((piece, color)) = position.piece_at(m.from()) else {
        return m.to_iccs();
    };
    let Some((action, target)) = action_and_target(m, piece, color) else {
        return m.to_iccs();
    };
    let action_char = match action {
        Action::Advance => '+',
        Action::Retreat => '-',
        Action::Traverse => '.',
    };
    let head = match tandem_prefix(position, m.from(), piece, color) {
        Prefix::Single => format!(
            "{}{}",
            piece.wxf_char(),
            m.from().file().number_for(color)
        ),
        Prefix::Tandem('前') => format!("+{}", piece.wxf_char()),
        Prefix::Tandem('后') => format!("-{}", piece.wxf_char()),
        _ => return m.to_iccs(),
    };
    format!("{head}{action_char}{target}")
}

fn action_and_target(m: Move, piece: Piece, color: Color) -> Option<(Action, u8)> {
    let dr = (m.to().rank().index() as i8 - m.from().rank().index() as i8) * color.forward();
    let action = match dr {
        0 => Action::Traverse,
        d if d > 0 => Action::Advance,
        _ => Action::Retreat,
    };
    let target = if action != Action::Traverse && piece.is_straight_mover() {
        if m.to().file() != m.from().file() {
            return None;
        }
        dr.unsigned_abs()
    } else {
        m.to().file().number_for(color)
    };
    Some((action, target))
}

enum Prefix {
    Single,
    Tandem(char),
    Unrepresentable,
}

fn tandem_prefix(position: &Position, from: Square, piece: Piece, color: Color) -> Prefix {
    let column = file_column(position, piece, color, from.file());
    if column.len() < 2 {
        return Prefix::Single;
    }
    // Advisors and elephants are told apart by direction instead.
    if matches!(piece, Piece::Advisor | Piece::Elephant) {
        return Prefix::Single;
    }
    let crowded_files = File::ALL
        .into_iter()
        .filter(|&file| file_column(position, piece, color, file).len() >= 2)
        .count();
    if crowded_files > 1 {
        return Prefix::Unrepresentable;
    }
    let Some(index) = column.iter().position(|&sq| sq == from) else {
        return Prefix::Unrepresentable;
    };
    let prefix = match (column.len(), index) {
        (_, 0) if column.len() <= 3 => '前',
        (n, i) if n <= 3 && i == n - 1 => '后',
        (3, 1) => '中',
        (_, i) if i < 5 => CHINESE_NUMERALS[i],
        _ => return Prefix::Unrepresentable,
    };
    Prefix::Tandem(prefix)
}
