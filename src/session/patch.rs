//! Partial session updates.
//!
//! Each state-machine operation reports exactly the fields it touched so the
//! sync layer can merge them into the shared document without clobbering
//! anything else.

use crate::ClientId;
use crate::session::{Players, SessionState};
use chrono::{DateTime, Utc};
use xiangqi_rules::{Board, Move, Side};

/// Metadata fields touched by an update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaPatch {
    /// New turn clock anchor.
    pub last_move_at: Option<DateTime<Utc>>,
    /// New pending undo requester (`Some(None)` clears it).
    pub undo_requested_by: Option<Option<Side>>,
    /// New helper delegation (`Some(None)` clears it).
    pub helper: Option<Option<ClientId>>,
}

impl MetaPatch {
    /// Whether no metadata field is touched.
    pub fn is_empty(&self) -> bool {
        self.last_move_at.is_none() && self.undo_requested_by.is_none() && self.helper.is_none()
    }
}

/// Session fields touched by an update; `None` means "leave as stored".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePatch {
    /// Replacement board.
    pub board: Option<Board>,
    /// Replacement side to move.
    pub turn: Option<Side>,
    /// Replacement history.
    pub history: Option<Vec<Move>>,
    /// Replacement winner (`Some(None)` clears it).
    pub winner: Option<Option<Side>>,
    /// Replacement seats and spectators.
    pub players: Option<Players>,
    /// Metadata changes.
    pub meta: MetaPatch,
}

impl StatePatch {
    /// A patch that rewrites every field from `state`.
    pub fn full(state: &SessionState) -> Self {
        Self {
            board: Some(state.board.clone()),
            turn: Some(state.turn),
            history: Some(state.history.clone()),
            winner: Some(state.winner),
            players: Some(state.players.clone()),
            meta: MetaPatch {
                last_move_at: Some(state.meta.last_move_at),
                undo_requested_by: Some(state.meta.undo_requested_by),
                helper: Some(state.meta.helper.clone()),
            },
        }
    }

    /// Whether the patch touches nothing.
    pub fn is_empty(&self) -> bool {
        self.board.is_none()
            && self.turn.is_none()
            && self.history.is_none()
            && self.winner.is_none()
            && self.players.is_none()
            && self.meta.is_empty()
    }

    /// Applies the patch to an in-memory state.
    pub fn apply_to(&self, state: &mut SessionState) {
        if let Some(board) = &self.board {
            state.board = board.clone();
        }
        if let Some(turn) = self.turn {
            state.turn = turn;
        }
        if let Some(history) = &self.history {
            state.history = history.clone();
        }
        if let Some(winner) = self.winner {
            state.winner = winner;
        }
        if let Some(players) = &self.players {
            state.players = players.clone();
        }
        if let Some(at) = self.meta.last_move_at {
            state.meta.last_move_at = at;
        }
        if let Some(undo) = self.meta.undo_requested_by {
            state.meta.undo_requested_by = undo;
        }
        if let Some(helper) = &self.meta.helper {
            state.meta.helper = helper.clone();
        }
    }
}
