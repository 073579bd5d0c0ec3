//! Board reconstruction from move history.

use crate::{Board, Move};
use tracing::{debug, instrument, warn};

/// Rebuilds a board by replaying `history` from the canonical initial layout.
///
/// Deterministic and stateless: the same history always yields the same
/// board, and any prefix of a history is itself replayable. A move whose
/// source holds no live piece is skipped and the rest of the history still
/// applies, so a corrupted history degrades the board instead of aborting.
#[instrument(skip(history), fields(moves = history.len()))]
pub fn reconstruct(history: &[Move]) -> Board {
    let mut board = Board::initial();
    for (ply, mv) in history.iter().enumerate() {
        let Some(mover) = board.piece_at(mv.from).map(|p| p.id.clone()) else {
            warn!(ply, from = %mv.from, "No live piece at recorded source, skipping move");
            continue;
        };
        if let Some(captured) = &mv.captured {
            match board.piece_mut(captured) {
                Some(victim) => victim.capture(),
                None => warn!(ply, %captured, "Recorded capture names an unknown piece"),
            }
        }
        if let Some(piece) = board.piece_mut(&mover) {
            piece.position = mv.to;
        }
        debug!(ply, %mv, "Replayed move");
    }
    board
}
