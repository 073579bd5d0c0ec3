//! Logical session state: the payload every participant replicates.

use crate::ClientId;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use xiangqi_rules::{Board, Move, Side};

/// Truncates `now` to the millisecond precision timestamps are stored with.
pub(crate) fn to_stored_precision(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(3)
}

/// Turn clock and forfeit settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, new)]
pub struct SessionRules {
    /// Time allowed for one move.
    turn_limit: TimeDelta,
    /// Timeouts after which a side forfeits.
    max_timeouts: u8,
}

impl Default for SessionRules {
    fn default() -> Self {
        Self::new(TimeDelta::minutes(3), 3)
    }
}

/// One playing seat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerRecord {
    /// Seated identity, `None` while the seat is open.
    pub(crate) id: Option<ClientId>,
    /// Timeouts accumulated by this side.
    pub(crate) timeouts: u8,
    /// Whether the seat has been filled.
    pub(crate) joined: bool,
}

/// Both seats plus spectators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct Players {
    /// Red seat.
    pub(crate) red: PlayerRecord,
    /// Black seat.
    pub(crate) black: PlayerRecord,
    /// Spectators, deduplicated by identity.
    pub(crate) spectators: Vec<ClientId>,
}

impl Players {
    /// The seat record of `side`.
    pub fn seat(&self, side: Side) -> &PlayerRecord {
        match side {
            Side::Red => &self.red,
            Side::Black => &self.black,
        }
    }

    pub(crate) fn seat_mut(&mut self, side: Side) -> &mut PlayerRecord {
        match side {
            Side::Red => &mut self.red,
            Side::Black => &mut self.black,
        }
    }

    /// The side `id` is seated on, if any.
    pub fn side_of(&self, id: &ClientId) -> Option<Side> {
        [Side::Red, Side::Black]
            .into_iter()
            .find(|side| self.seat(*side).id.as_ref() == Some(id))
    }

    /// Whether both seats are filled.
    pub fn both_seated(&self) -> bool {
        self.red.joined && self.black.joined
    }

    /// Whether `id` watches as a spectator.
    pub fn is_spectator(&self, id: &ClientId) -> bool {
        self.spectators.contains(id)
    }
}

/// Session metadata stored alongside board and history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionMeta {
    /// Turn clock anchor: last committed move, timeout, or seat fill.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub(crate) last_move_at: DateTime<Utc>,
    /// Side awaiting an answer to its undo request.
    pub(crate) undo_requested_by: Option<Side>,
    /// Spectator currently allowed to move for the side to move.
    pub(crate) helper: Option<ClientId>,
    /// Bumped by every write of the shared document.
    pub(crate) version: u64,
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Fewer than two seats filled.
    WaitingForSeats,
    /// Both seats filled, no winner.
    Active(UndoState),
    /// A winner has been assigned.
    Concluded(Side),
}

/// Undo negotiation sub-state of [`SessionPhase::Active`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoState {
    /// No request outstanding.
    Idle,
    /// The given side asked to take back the last move.
    Pending(Side),
}

/// The complete replicated session.
///
/// Each client holds one as a cache that is authoritative only until the next
/// state arrives from the shared document.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct SessionState {
    pub(crate) board: Board,
    pub(crate) turn: Side,
    pub(crate) history: Vec<Move>,
    pub(crate) winner: Option<Side>,
    pub(crate) players: Players,
    pub(crate) meta: SessionMeta,
}

impl SessionState {
    /// Opens a room: full board, Red to move, `creator` seated as Red.
    pub fn open(creator: ClientId, now: DateTime<Utc>) -> Self {
        let mut players = Players::default();
        players.red = PlayerRecord {
            id: Some(creator),
            timeouts: 0,
            joined: true,
        };
        Self {
            board: Board::initial(),
            turn: Side::Red,
            history: Vec::new(),
            winner: None,
            players,
            meta: SessionMeta {
                last_move_at: to_stored_precision(now),
                ..SessionMeta::default()
            },
        }
    }

    /// Assembles a state from decoded parts.
    pub fn from_parts(
        board: Board,
        turn: Side,
        history: Vec<Move>,
        winner: Option<Side>,
        players: Players,
        meta: SessionMeta,
    ) -> Self {
        Self {
            board,
            turn,
            history,
            winner,
            players,
            meta,
        }
    }

    /// Derives the lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        if let Some(winner) = self.winner {
            return SessionPhase::Concluded(winner);
        }
        if !self.players.both_seated() {
            return SessionPhase::WaitingForSeats;
        }
        match self.meta.undo_requested_by {
            Some(side) => SessionPhase::Active(UndoState::Pending(side)),
            None => SessionPhase::Active(UndoState::Idle),
        }
    }

    /// Time the side to move has used so far.
    pub fn elapsed(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.meta.last_move_at
    }
}
