//! Pure xiangqi game logic.
//!
//! - **Types**: sides, piece kinds, positions, pieces and recorded moves
//! - **Board**: the ordered piece list and its canonical starting layout
//! - **Rules**: move legality per piece kind, plus check detection
//! - **Replay**: rebuilding a board from move history
//!
//! Nothing here performs I/O.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod error;
mod replay;
pub mod rules;
mod types;

pub use board::Board;
pub use error::MoveError;
pub use replay::reconstruct;
pub use rules::{check_move, general_captured, is_in_check, is_legal, legal_destinations};
pub use types::{
    COLUMNS, Move, ParsePositionError, Piece, PieceId, PieceKind, Position, ROWS, Side,
};
