//! Session operation errors.

use crate::ClientId;
use derive_more::{Display, Error, From};
use xiangqi_rules::{MoveError, PieceId, Side};

/// Broad classification of a rejected session operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionErrorKind {
    /// The rules engine refused the move.
    IllegalMove,
    /// The actor may not perform this operation now.
    PermissionDenied,
}

/// Why a session operation was rejected. A rejected operation leaves the
/// state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, From)]
pub enum SessionError {
    /// The rules engine rejected the move.
    #[display("Illegal move: {}", _0)]
    #[from]
    IllegalMove(MoveError),

    /// No such piece on the board.
    #[display("Unknown piece {}", _0)]
    UnknownPiece(#[error(not(source))] PieceId),

    /// The piece does not belong to the side to move.
    #[display("Piece {} does not belong to {}", piece, turn)]
    WrongSide {
        /// The piece the actor tried to move.
        piece: PieceId,
        /// The side to move.
        turn: Side,
    },

    /// The actor is neither the side to move nor its helper.
    #[display("{} may not act for {}", actor, turn)]
    NotYourTurn {
        /// Acting identity.
        actor: ClientId,
        /// The side to move.
        turn: Side,
    },

    /// The actor holds no seat.
    #[display("{} is not seated in this room", _0)]
    NotSeated(#[error(not(source))] ClientId),

    /// Both seats must be filled first.
    #[display("Waiting for both seats to be filled")]
    WaitingForSeats,

    /// The game already has a winner.
    #[display("Game is already over, {} won", _0)]
    GameOver(#[error(not(source))] Side),

    /// The requested seat belongs to someone else.
    #[display("Seat {} is already taken", _0)]
    SeatTaken(#[error(not(source))] Side),

    /// An undo request is already awaiting an answer.
    #[display("{} already asked to undo", _0)]
    UndoAlreadyPending(#[error(not(source))] Side),

    /// No undo request to answer.
    #[display("No undo request is pending")]
    NoUndoPending,

    /// The requester cannot answer its own request.
    #[display("{} cannot answer its own undo request", _0)]
    OwnUndoRequest(#[error(not(source))] Side),

    /// Nothing has been played yet.
    #[display("No move to undo")]
    NothingToUndo,

    /// Helpers must be registered spectators.
    #[display("{} is not a spectator", _0)]
    NotASpectator(#[error(not(source))] ClientId),
}

impl SessionError {
    /// Maps the error onto the recoverable error taxonomy.
    pub fn kind(&self) -> SessionErrorKind {
        match self {
            Self::IllegalMove(_) => SessionErrorKind::IllegalMove,
            _ => SessionErrorKind::PermissionDenied,
        }
    }
}
