//! Move rejection reasons.

use super::types::{PieceId, PieceKind, Position};

/// Why the rules engine rejected a move.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum MoveError {
    /// Source and destination coincide.
    #[display("Null move: source equals destination")]
    NullMove,

    /// Destination lies outside the 9x10 grid.
    #[display("Destination {} is off the board", _0)]
    OffBoard(#[error(not(source))] Position),

    /// The piece has been captured.
    #[display("Piece {} is no longer on the board", _0)]
    DeadPiece(#[error(not(source))] PieceId),

    /// Destination holds a piece of the mover's own side.
    #[display("Cannot capture own piece at {}", _0)]
    OwnPiece(#[error(not(source))] Position),

    /// The kind-specific movement rule forbids the displacement.
    #[display("{} cannot move from {} to {}", kind, from, to)]
    Forbidden {
        /// Kind of the moving piece.
        kind: PieceKind,
        /// Source cell.
        from: Position,
        /// Destination cell.
        to: Position,
    },
}
