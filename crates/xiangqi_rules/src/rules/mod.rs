//! Move legality for xiangqi.
//!
//! Pure functions over a [`Board`]. Legality is decided per piece kind by a
//! single exhaustive dispatch in [`movement`]; check detection in [`check`]
//! reuses the same predicate.

pub mod check;
pub mod movement;

pub use check::{general_captured, is_in_check};
pub use movement::kind_allows;

use crate::{Board, MoveError, Piece, Position};
use tracing::instrument;

/// Validates a proposed move, explaining any rejection.
///
/// Checks, in order: liveness, null displacement, board bounds, own-piece
/// capture, then the kind-specific rule.
///
/// # Errors
///
/// Returns the first [`MoveError`] that applies.
#[instrument(skip(board), fields(piece = %piece.id, kind = %piece.kind))]
pub fn check_move(piece: &Piece, to: Position, board: &Board) -> Result<(), MoveError> {
    if !piece.alive {
        return Err(MoveError::DeadPiece(piece.id.clone()));
    }
    let from = piece.position;
    if from == to {
        return Err(MoveError::NullMove);
    }
    if !to.is_on_board() {
        return Err(MoveError::OffBoard(to));
    }
    if board.piece_at(to).is_some_and(|p| p.side == piece.side) {
        return Err(MoveError::OwnPiece(to));
    }
    if !kind_allows(piece, to, board) {
        return Err(MoveError::Forbidden {
            kind: piece.kind,
            from,
            to,
        });
    }
    Ok(())
}

/// Whether `piece` may move to `to` on `board`.
pub fn is_legal(piece: &Piece, to: Position, board: &Board) -> bool {
    check_move(piece, to, board).is_ok()
}

/// Every cell the piece may legally move to.
#[instrument(skip(board), fields(piece = %piece.id))]
pub fn legal_destinations(piece: &Piece, board: &Board) -> Vec<Position> {
    Position::all()
        .filter(|to| is_legal(piece, *to, board))
        .collect()
}
