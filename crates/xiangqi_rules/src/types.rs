//! Core domain types for xiangqi.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::instrument;

/// Number of board columns.
pub const COLUMNS: i8 = 9;

/// Number of board rows.
pub const ROWS: i8 = 10;

/// One of the two competing sides.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Side {
    /// Red (moves first, starts on rows 5-9).
    Red,
    /// Black (starts on rows 0-4).
    Black,
}

impl Side {
    /// Returns the opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Side::Red => Side::Black,
            Side::Black => Side::Red,
        }
    }

    /// Row delta of a single forward step.
    pub fn forward(self) -> i8 {
        match self {
            Side::Red => -1,
            Side::Black => 1,
        }
    }

    /// Whether `row` lies on this side's own half of the board.
    pub fn owns_row(self, row: i8) -> bool {
        match self {
            Side::Red => (5..ROWS).contains(&row),
            Side::Black => (0..5).contains(&row),
        }
    }

    /// Whether `pos` lies inside this side's palace.
    pub fn palace_contains(self, pos: Position) -> bool {
        let rows = match self {
            Side::Red => 7..=9,
            Side::Black => 0..=2,
        };
        (3..=5).contains(&pos.col) && rows.contains(&pos.row)
    }
}

/// The seven piece kinds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PieceKind {
    /// General (king).
    General,
    /// Advisor (guard).
    Advisor,
    /// Elephant (minister).
    Elephant,
    /// Horse.
    Horse,
    /// Chariot (rook).
    Chariot,
    /// Cannon.
    Cannon,
    /// Soldier (pawn).
    Soldier,
}

impl PieceKind {
    /// Single-letter symbol used in board snapshots.
    pub fn symbol(self) -> char {
        match self {
            PieceKind::General => 'G',
            PieceKind::Advisor => 'A',
            PieceKind::Elephant => 'E',
            PieceKind::Horse => 'H',
            PieceKind::Chariot => 'R',
            PieceKind::Cannon => 'C',
            PieceKind::Soldier => 'S',
        }
    }
}

/// A board coordinate, origin top-left from Black's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Column, 0-8.
    pub col: i8,
    /// Row, 0-9.
    pub row: i8,
}

impl Position {
    /// Where captured pieces are parked.
    pub const OFF_BOARD: Position = Position { col: -1, row: -1 };

    /// Creates a position (not validated).
    pub const fn new(col: i8, row: i8) -> Self {
        Self { col, row }
    }

    /// Whether the position lies on the 9x10 grid.
    pub fn is_on_board(self) -> bool {
        (0..COLUMNS).contains(&self.col) && (0..ROWS).contains(&self.row)
    }

    /// Returns the position shifted by the given deltas.
    pub fn offset(self, dcol: i8, drow: i8) -> Self {
        Self::new(self.col + dcol, self.row + drow)
    }

    /// Iterates over all 90 on-board positions, row-major.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..ROWS).flat_map(|row| (0..COLUMNS).map(move |col| Position::new(col, row)))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.col, self.row)
    }
}

/// Error parsing a `"col,row"` position.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Invalid position '{}': expected \"col,row\" on a 9x10 board", input)]
pub struct ParsePositionError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for Position {
    type Err = ParsePositionError;

    #[instrument]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePositionError {
            input: s.to_string(),
        };
        let (col, row) = s.trim().split_once(',').ok_or_else(err)?;
        let col = col.trim().parse::<i8>().map_err(|_| err())?;
        let row = row.trim().parse::<i8>().map_err(|_| err())?;
        let pos = Position::new(col, row);
        if pos.is_on_board() { Ok(pos) } else { Err(err()) }
    }
}

/// Stable, unique piece identity.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct PieceId(String);

impl PieceId {
    /// Creates a piece id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A piece. Captured pieces stay in the board's piece list, dead and off-board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    /// Identity, fixed for the piece's lifetime.
    pub id: PieceId,
    /// Kind.
    pub kind: PieceKind,
    /// Owning side.
    pub side: Side,
    /// Current position, [`Position::OFF_BOARD`] once captured.
    pub position: Position,
    /// Liveness flag.
    pub alive: bool,
}

impl Piece {
    /// Creates a live piece.
    pub fn new(id: impl Into<String>, kind: PieceKind, side: Side, position: Position) -> Self {
        Self {
            id: PieceId::new(id),
            kind,
            side,
            position,
            alive: true,
        }
    }

    /// Marks the piece captured.
    pub fn capture(&mut self) {
        self.alive = false;
        self.position = Position::OFF_BOARD;
    }
}

/// A recorded move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    /// Source cell.
    pub from: Position,
    /// Destination cell.
    pub to: Position,
    /// Identity of the piece captured by this move, if any.
    #[serde(default)]
    pub captured: Option<PieceId>,
    /// When the move was committed.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Move {
    /// Creates a move record.
    pub fn new(
        from: Position,
        to: Position,
        captured: Option<PieceId>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            from,
            to,
            captured,
            timestamp,
        }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.captured {
            Some(id) => write!(f, "{} x {} ({})", self.from, self.to, id),
            None => write!(f, "{} -> {}", self.from, self.to),
        }
    }
}
