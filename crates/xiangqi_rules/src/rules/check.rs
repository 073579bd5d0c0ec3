//! Check and game-end detection.
//!
//! Moves that leave the mover's own general attacked are not forbidden; this
//! module only reports the condition.

use crate::{Board, Side};
use tracing::instrument;

use super::is_legal;

/// Whether `side`'s general is attacked by any live opposing piece.
///
/// A side without a live general is not reported as in check.
#[instrument(skip(board))]
pub fn is_in_check(side: Side, board: &Board) -> bool {
    let Some(general) = board.general(side) else {
        return false;
    };
    let target = general.position;
    board
        .live_pieces(side.opponent())
        .any(|attacker| is_legal(attacker, target, board))
}

/// The side whose general has been captured, if any.
#[instrument(skip(board))]
pub fn general_captured(board: &Board) -> Option<Side> {
    [Side::Red, Side::Black]
        .into_iter()
        .find(|side| board.general(*side).is_none())
}
