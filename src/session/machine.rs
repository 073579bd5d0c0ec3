//! Session state machine: turn ownership, undo negotiation, turn clock and
//! helper delegation.
//!
//! Every operation validates against the current state, builds the
//! [`StatePatch`] it implies, applies that patch locally and hands it back for
//! propagation. A rejected operation changes nothing.

use crate::ClientId;
use crate::session::{
    MetaPatch, PlayerRecord, Players, SessionError, SessionRules, SessionState, StatePatch,
};
use crate::session::state::to_stored_precision;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use xiangqi_rules::{Board, Move, PieceId, PieceKind, Position, Side, check_move, reconstruct};

/// Which place a participant asks for when joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatRequest {
    /// A specific playing seat.
    Side(Side),
    /// The first open seat, else spectating.
    FirstOpen,
    /// Watch without a seat.
    Spectator,
}

impl SessionState {
    fn commit(
        &mut self,
        op: &'static str,
        result: Result<StatePatch, SessionError>,
    ) -> Result<StatePatch, SessionError> {
        match result {
            Ok(patch) => {
                patch.apply_to(self);
                info!(op, turn = %self.turn, winner = ?self.winner, "Session updated");
                Ok(patch)
            }
            Err(e) => {
                warn!(op, error = %e, "Session operation rejected");
                Err(e)
            }
        }
    }

    fn ensure_in_play(&self) -> Result<(), SessionError> {
        if let Some(winner) = self.winner {
            return Err(SessionError::GameOver(winner));
        }
        if !self.players.both_seated() {
            return Err(SessionError::WaitingForSeats);
        }
        Ok(())
    }

    fn seated_side(&self, actor: &ClientId) -> Result<Side, SessionError> {
        self.players
            .side_of(actor)
            .ok_or_else(|| SessionError::NotSeated(actor.clone()))
    }

    /// Whether `actor` may move right now, as a player or as the helper.
    fn authorize_move(&self, actor: &ClientId) -> Result<(), SessionError> {
        if let Some(winner) = self.winner {
            return Err(SessionError::GameOver(winner));
        }
        if self.meta.helper.as_ref() == Some(actor) {
            debug!(%actor, "Helper acting for side to move");
            return Ok(());
        }
        match self.players.side_of(actor) {
            Some(side) if side == self.turn => {
                if self.players.both_seated() {
                    Ok(())
                } else {
                    Err(SessionError::WaitingForSeats)
                }
            }
            _ => Err(SessionError::NotYourTurn {
                actor: actor.clone(),
                turn: self.turn,
            }),
        }
    }

    /// Moves `piece` to `to` on behalf of `actor`.
    ///
    /// On success the turn passes, the move is appended to history, any
    /// pending undo request and helper delegation are dropped, the clock
    /// anchor is reset and capturing a general decides the game.
    ///
    /// # Errors
    ///
    /// Permission failures and rule violations, with no state change.
    #[instrument(skip(self), fields(turn = %self.turn))]
    pub fn attempt_move(
        &mut self,
        actor: &ClientId,
        piece: &PieceId,
        to: Position,
        now: DateTime<Utc>,
    ) -> Result<StatePatch, SessionError> {
        let now = to_stored_precision(now);
        let result = self.plan_move(actor, piece, to, now);
        self.commit("attempt_move", result)
    }

    fn plan_move(
        &self,
        actor: &ClientId,
        piece: &PieceId,
        to: Position,
        now: DateTime<Utc>,
    ) -> Result<StatePatch, SessionError> {
        self.authorize_move(actor)?;
        let mover = self
            .board
            .piece(piece)
            .ok_or_else(|| SessionError::UnknownPiece(piece.clone()))?;
        if mover.side != self.turn {
            return Err(SessionError::WrongSide {
                piece: piece.clone(),
                turn: self.turn,
            });
        }
        check_move(mover, to, &self.board)?;

        let from = mover.position;
        let mut board = self.board.clone();
        let captured = board.relocate(from, to).flatten();
        let general_taken = captured
            .as_ref()
            .and_then(|id| board.piece(id))
            .is_some_and(|p| p.kind == PieceKind::General);
        if general_taken {
            info!(winner = %self.turn, "General captured");
        }

        let mut history = self.history.clone();
        history.push(Move::new(from, to, captured, now));

        Ok(StatePatch {
            board: Some(board),
            turn: Some(self.turn.opponent()),
            history: Some(history),
            winner: general_taken.then_some(Some(self.turn)),
            players: None,
            meta: MetaPatch {
                last_move_at: Some(now),
                undo_requested_by: Some(None),
                helper: Some(None),
            },
        })
    }

    /// Asks the opponent to take back the last move.
    ///
    /// Either seated side may ask regardless of whose turn it is.
    ///
    /// # Errors
    ///
    /// Rejected outside active play, for unseated actors, while another
    /// request is pending, or when there is nothing to undo.
    #[instrument(skip(self))]
    pub fn request_undo(&mut self, actor: &ClientId) -> Result<StatePatch, SessionError> {
        let result = self.plan_undo_request(actor);
        self.commit("request_undo", result)
    }

    fn plan_undo_request(&self, actor: &ClientId) -> Result<StatePatch, SessionError> {
        self.ensure_in_play()?;
        let side = self.seated_side(actor)?;
        if let Some(pending) = self.meta.undo_requested_by {
            return Err(SessionError::UndoAlreadyPending(pending));
        }
        if self.history.is_empty() {
            return Err(SessionError::NothingToUndo);
        }
        Ok(StatePatch {
            meta: MetaPatch {
                undo_requested_by: Some(Some(side)),
                ..MetaPatch::default()
            },
            ..StatePatch::default()
        })
    }

    /// Answers a pending undo request.
    ///
    /// Accepting drops the last move, rebuilds the board from the remaining
    /// history, hands the turn back to the side that made it, clears any
    /// winner and restarts the clock.
    /// Only one move is taken back per request.
    ///
    /// # Errors
    ///
    /// Rejected without a pending request, for unseated actors, or when the
    /// requester tries to answer itself.
    #[instrument(skip(self))]
    pub fn respond_undo(
        &mut self,
        actor: &ClientId,
        accept: bool,
        now: DateTime<Utc>,
    ) -> Result<StatePatch, SessionError> {
        let now = to_stored_precision(now);
        let result = self.plan_undo_response(actor, accept, now);
        self.commit("respond_undo", result)
    }

    fn plan_undo_response(
        &self,
        actor: &ClientId,
        accept: bool,
        now: DateTime<Utc>,
    ) -> Result<StatePatch, SessionError> {
        let requester = self
            .meta
            .undo_requested_by
            .ok_or(SessionError::NoUndoPending)?;
        let responder = self.seated_side(actor)?;
        if responder == requester {
            return Err(SessionError::OwnUndoRequest(requester));
        }

        let clear = MetaPatch {
            undo_requested_by: Some(None),
            ..MetaPatch::default()
        };
        if !accept {
            info!(%requester, "Undo declined");
            return Ok(StatePatch {
                meta: clear,
                ..StatePatch::default()
            });
        }

        let mut history = self.history.clone();
        let Some(undone) = history.pop() else {
            warn!("Undo accepted with empty history, clearing request only");
            return Ok(StatePatch {
                meta: clear,
                ..StatePatch::default()
            });
        };
        // The side that made the undone move plays again.
        let mover = self
            .board
            .piece_at(undone.to)
            .map_or(self.turn.opponent(), |p| p.side);
        info!(%requester, %mover, remaining = history.len(), "Undo accepted");
        Ok(StatePatch {
            board: Some(reconstruct(&history)),
            turn: Some(mover),
            history: Some(history),
            winner: Some(None),
            players: None,
            meta: MetaPatch {
                last_move_at: Some(now),
                ..clear
            },
        })
    }

    /// Runs the turn clock on behalf of `actor`.
    ///
    /// Only the client seated on the side to move evaluates its own clock, so
    /// two observers never count the same timeout twice. Returns the timeout
    /// patch when the turn limit has been reached.
    #[instrument(skip(self, rules))]
    pub fn tick_clock(
        &mut self,
        actor: &ClientId,
        now: DateTime<Utc>,
        rules: &SessionRules,
    ) -> Option<StatePatch> {
        if self.players.side_of(actor) != Some(self.turn) {
            return None;
        }
        if self.winner.is_some() || !self.players.both_seated() {
            return None;
        }
        if self.elapsed(now) < *rules.turn_limit() {
            return None;
        }
        Some(self.on_timeout(now, rules))
    }

    /// Charges a timeout to the side to move and passes the turn.
    ///
    /// Reaching the forfeit limit hands the win to the opponent. Any helper
    /// delegation and any pending undo request lapse with the turn.
    #[instrument(skip(self, rules), fields(turn = %self.turn))]
    pub fn on_timeout(&mut self, now: DateTime<Utc>, rules: &SessionRules) -> StatePatch {
        let now = to_stored_precision(now);
        let side = self.turn;
        let mut players = self.players.clone();
        let seat = players.seat_mut(side);
        seat.timeouts = seat.timeouts.saturating_add(1);
        let count = seat.timeouts;
        let forfeited = count >= *rules.max_timeouts();
        warn!(%side, count, forfeited, "Turn timed out");

        let patch = StatePatch {
            turn: Some(side.opponent()),
            winner: forfeited.then_some(Some(side.opponent())),
            players: Some(players),
            meta: MetaPatch {
                last_move_at: Some(now),
                undo_requested_by: Some(None),
                helper: Some(None),
            },
            ..StatePatch::default()
        };
        patch.apply_to(self);
        patch
    }

    /// Grants or revokes a spectator's right to move for the side to move.
    ///
    /// Only the player whose turn it is may delegate. Naming the current
    /// helper again revokes the delegation.
    ///
    /// # Errors
    ///
    /// Rejected outside active play, for anyone but the player to move, or
    /// when `helper` is not a spectator.
    #[instrument(skip(self))]
    pub fn delegate_helper(
        &mut self,
        actor: &ClientId,
        helper: &ClientId,
    ) -> Result<StatePatch, SessionError> {
        let result = self.plan_delegation(actor, helper);
        self.commit("delegate_helper", result)
    }

    fn plan_delegation(
        &self,
        actor: &ClientId,
        helper: &ClientId,
    ) -> Result<StatePatch, SessionError> {
        self.ensure_in_play()?;
        if self.players.side_of(actor) != Some(self.turn) {
            return Err(SessionError::NotYourTurn {
                actor: actor.clone(),
                turn: self.turn,
            });
        }
        if !self.players.is_spectator(helper) {
            return Err(SessionError::NotASpectator(helper.clone()));
        }
        let next = if self.meta.helper.as_ref() == Some(helper) {
            None
        } else {
            Some(helper.clone())
        };
        Ok(StatePatch {
            meta: MetaPatch {
                helper: Some(next),
                ..MetaPatch::default()
            },
            ..StatePatch::default()
        })
    }

    /// Seats `identity` or adds it to the spectators.
    ///
    /// Already-seated identities get an empty patch: seats are never vacated
    /// and a reconnecting player keeps its slot. Filling the second seat
    /// starts the turn clock.
    ///
    /// # Errors
    ///
    /// [`SessionError::SeatTaken`] when the requested seat belongs to someone
    /// else.
    #[instrument(skip(self))]
    pub fn join_seat(
        &mut self,
        identity: &ClientId,
        request: SeatRequest,
        now: DateTime<Utc>,
    ) -> Result<StatePatch, SessionError> {
        let now = to_stored_precision(now);
        let result = self.plan_join(identity, request, now);
        self.commit("join_seat", result)
    }

    fn plan_join(
        &self,
        identity: &ClientId,
        request: SeatRequest,
        now: DateTime<Utc>,
    ) -> Result<StatePatch, SessionError> {
        if let Some(side) = self.players.side_of(identity) {
            debug!(%side, "Identity already seated");
            return Ok(StatePatch::default());
        }
        let open = |side: Side| !self.players.seat(side).joined;
        let target = match request {
            SeatRequest::Side(side) if open(side) => Some(side),
            SeatRequest::Side(side) => return Err(SessionError::SeatTaken(side)),
            SeatRequest::FirstOpen => [Side::Red, Side::Black].into_iter().find(|s| open(*s)),
            SeatRequest::Spectator => None,
        };

        let mut players = self.players.clone();
        match target {
            Some(side) => {
                players.spectators.retain(|s| s != identity);
                *players.seat_mut(side) = PlayerRecord {
                    id: Some(identity.clone()),
                    timeouts: 0,
                    joined: true,
                };
                info!(%side, "Seat filled");
            }
            None if players.is_spectator(identity) => return Ok(StatePatch::default()),
            None => {
                players.spectators.push(identity.clone());
                info!("Spectator joined");
            }
        }

        let clock_starts = !self.players.both_seated() && players.both_seated();
        Ok(StatePatch {
            players: Some(players),
            meta: MetaPatch {
                last_move_at: clock_starts.then_some(now),
                ..MetaPatch::default()
            },
            ..StatePatch::default()
        })
    }

    /// Starts a fresh game in the same room, keeping the seats.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotSeated`] for spectators.
    #[instrument(skip(self))]
    pub fn restart(
        &mut self,
        actor: &ClientId,
        now: DateTime<Utc>,
    ) -> Result<StatePatch, SessionError> {
        let now = to_stored_precision(now);
        let result = self.plan_restart(actor, now);
        self.commit("restart", result)
    }

    fn plan_restart(&self, actor: &ClientId, now: DateTime<Utc>) -> Result<StatePatch, SessionError> {
        self.seated_side(actor)?;
        let players = Players {
            red: PlayerRecord {
                timeouts: 0,
                ..self.players.red.clone()
            },
            black: PlayerRecord {
                timeouts: 0,
                ..self.players.black.clone()
            },
            spectators: self.players.spectators.clone(),
        };
        Ok(StatePatch {
            board: Some(Board::initial()),
            turn: Some(Side::Red),
            history: Some(Vec::new()),
            winner: Some(None),
            players: Some(players),
            meta: MetaPatch {
                last_move_at: Some(now),
                undo_requested_by: Some(None),
                helper: Some(None),
            },
        })
    }
}
