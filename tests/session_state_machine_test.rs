//! Tests for the session state machine.

use chrono::{DateTime, TimeDelta, Utc};
use xiangqi_room::{
    Board, ClientId, Piece, PieceId, PieceKind, Position, SeatRequest, SessionError,
    SessionErrorKind, SessionMeta, SessionPhase, SessionRules, SessionState, Side, UndoState,
};
use xiangqi_rules::reconstruct;

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp")
}

fn red() -> ClientId {
    ClientId::new("red-client")
}

fn black() -> ClientId {
    ClientId::new("black-client")
}

fn watcher() -> ClientId {
    ClientId::new("watcher")
}

/// A room with both seats filled at `t0`.
fn seated_room() -> SessionState {
    let mut state = SessionState::open(red(), t0());
    state
        .join_seat(&black(), SeatRequest::Side(Side::Black), t0())
        .expect("Black seat open");
    state
}

fn central_soldiers(state: &mut SessionState) {
    state
        .attempt_move(&red(), &PieceId::new("r-soldier-2"), Position::new(4, 5), t0())
        .expect("Red soldier advance");
    state
        .attempt_move(&black(), &PieceId::new("b-soldier-2"), Position::new(4, 4), t0())
        .expect("Black soldier advance");
}

#[test]
fn test_open_room_waits_for_second_seat() {
    let state = SessionState::open(red(), t0());
    assert_eq!(state.phase(), SessionPhase::WaitingForSeats);
    assert_eq!(*state.turn(), Side::Red);
    assert_eq!(state.players().side_of(&red()), Some(Side::Red));
    assert_eq!(state.board(), &Board::initial());
}

#[test]
fn test_move_rejected_until_both_seated() {
    let mut state = SessionState::open(red(), t0());
    let before = state.clone();
    let err = state
        .attempt_move(&red(), &PieceId::new("r-soldier-2"), Position::new(4, 5), t0())
        .unwrap_err();
    assert_eq!(err, SessionError::WaitingForSeats);
    assert_eq!(state, before);
}

#[test]
fn test_second_seat_starts_clock() {
    let mut state = SessionState::open(red(), t0());
    let later = t0() + TimeDelta::seconds(40);
    let patch = state
        .join_seat(&black(), SeatRequest::FirstOpen, later)
        .expect("join");
    assert_eq!(patch.meta.last_move_at, Some(later));
    assert_eq!(*state.meta().last_move_at(), later);
    assert_eq!(state.phase(), SessionPhase::Active(UndoState::Idle));
}

#[test]
fn test_seat_taken_and_spectators() {
    let mut state = seated_room();
    let err = state
        .join_seat(&watcher(), SeatRequest::Side(Side::Red), t0())
        .unwrap_err();
    assert_eq!(err, SessionError::SeatTaken(Side::Red));

    state
        .join_seat(&watcher(), SeatRequest::FirstOpen, t0())
        .expect("falls back to spectating");
    let again = state
        .join_seat(&watcher(), SeatRequest::Spectator, t0())
        .expect("rejoin");
    assert!(again.is_empty());
    assert_eq!(state.players().spectators(), &vec![watcher()]);
}

#[test]
fn test_seated_player_rejoin_is_noop() {
    let mut state = seated_room();
    let before = state.clone();
    let patch = state
        .join_seat(&black(), SeatRequest::Side(Side::Red), t0())
        .expect("already seated");
    assert!(patch.is_empty());
    assert_eq!(state, before);
}

#[test]
fn test_move_passes_turn_and_records_history() {
    let mut state = seated_room();
    let later = t0() + TimeDelta::seconds(5);
    state
        .attempt_move(&red(), &PieceId::new("r-soldier-2"), Position::new(4, 5), later)
        .expect("legal");
    assert_eq!(*state.turn(), Side::Black);
    assert_eq!(state.history().len(), 1);
    assert_eq!(state.history()[0].from, Position::new(4, 6));
    assert_eq!(state.history()[0].to, Position::new(4, 5));
    assert_eq!(*state.meta().last_move_at(), later);
    assert_eq!(
        state.board().piece_at(Position::new(4, 5)).map(|p| p.kind),
        Some(PieceKind::Soldier)
    );
}

#[test]
fn test_out_of_turn_move_changes_nothing() {
    let mut state = seated_room();
    let before = state.clone();
    let err = state
        .attempt_move(&black(), &PieceId::new("b-soldier-2"), Position::new(4, 4), t0())
        .unwrap_err();
    assert_eq!(err.kind(), SessionErrorKind::PermissionDenied);
    assert_eq!(state, before);

    let err = state
        .attempt_move(&red(), &PieceId::new("b-soldier-2"), Position::new(4, 4), t0())
        .unwrap_err();
    assert!(matches!(err, SessionError::WrongSide { .. }));
    assert_eq!(state, before);
}

#[test]
fn test_illegal_move_changes_nothing() {
    let mut state = seated_room();
    let before = state.clone();
    let err = state
        .attempt_move(&red(), &PieceId::new("r-soldier-2"), Position::new(4, 4), t0())
        .unwrap_err();
    assert_eq!(err.kind(), SessionErrorKind::IllegalMove);
    assert_eq!(state, before);

    let err = state
        .attempt_move(&red(), &PieceId::new("r-dragon-0"), Position::new(4, 4), t0())
        .unwrap_err();
    assert!(matches!(err, SessionError::UnknownPiece(_)));
}

#[test]
fn test_accepted_undo_takes_back_one_move() {
    let mut state = seated_room();
    central_soldiers(&mut state);
    assert_eq!(*state.turn(), Side::Red);

    state.request_undo(&black()).expect("request");
    assert_eq!(
        state.phase(),
        SessionPhase::Active(UndoState::Pending(Side::Black))
    );

    let later = t0() + TimeDelta::seconds(90);
    state.respond_undo(&red(), true, later).expect("accept");
    assert_eq!(state.history().len(), 1);
    assert_eq!(*state.turn(), Side::Black);
    assert_eq!(state.board(), &reconstruct(state.history()));
    assert_eq!(*state.meta().undo_requested_by(), None);
    assert_eq!(*state.meta().last_move_at(), later);
}

#[test]
fn test_declined_undo_only_clears_request() {
    let mut state = seated_room();
    central_soldiers(&mut state);
    state.request_undo(&red()).expect("request");
    let board = state.board().clone();
    state.respond_undo(&black(), false, t0()).expect("decline");
    assert_eq!(state.history().len(), 2);
    assert_eq!(state.board(), &board);
    assert_eq!(state.phase(), SessionPhase::Active(UndoState::Idle));
}

#[test]
fn test_undo_negotiation_rejections() {
    let mut state = seated_room();
    assert_eq!(
        state.request_undo(&red()).unwrap_err(),
        SessionError::NothingToUndo
    );
    assert_eq!(
        state.respond_undo(&black(), true, t0()).unwrap_err(),
        SessionError::NoUndoPending
    );

    central_soldiers(&mut state);
    state.request_undo(&red()).expect("request");
    assert_eq!(
        state.request_undo(&black()).unwrap_err(),
        SessionError::UndoAlreadyPending(Side::Red)
    );
    assert_eq!(
        state.respond_undo(&red(), true, t0()).unwrap_err(),
        SessionError::OwnUndoRequest(Side::Red)
    );
    state
        .join_seat(&watcher(), SeatRequest::Spectator, t0())
        .expect("spectate");
    assert!(matches!(
        state.respond_undo(&watcher(), true, t0()).unwrap_err(),
        SessionError::NotSeated(_)
    ));
}

#[test]
fn test_next_move_drops_pending_undo() {
    let mut state = seated_room();
    central_soldiers(&mut state);
    state.request_undo(&black()).expect("request");
    state
        .attempt_move(&red(), &PieceId::new("r-cannon-1"), Position::new(4, 7), t0())
        .expect("cannon slides to centre");
    assert_eq!(*state.meta().undo_requested_by(), None);
}

#[test]
fn test_tick_only_for_side_to_move_after_limit() {
    let rules = SessionRules::default();
    let mut state = seated_room();
    let early = t0() + TimeDelta::seconds(179);
    let due = t0() + TimeDelta::seconds(180);

    assert!(state.tick_clock(&red(), early, &rules).is_none());
    assert!(state.tick_clock(&black(), due, &rules).is_none());
    assert!(state.tick_clock(&watcher(), due, &rules).is_none());

    let patch = state.tick_clock(&red(), due, &rules).expect("timeout due");
    assert_eq!(patch.turn, Some(Side::Black));
    assert_eq!(*state.turn(), Side::Black);
    assert_eq!(*state.players().seat(Side::Red).timeouts(), 1);
    assert_eq!(*state.meta().last_move_at(), due);
    assert!(state.winner().is_none());
}

#[test]
fn test_third_timeout_forfeits() {
    let rules = SessionRules::default();
    let mut state = seated_room();
    let mut now = t0();
    for side in [Side::Red, Side::Black, Side::Red, Side::Black, Side::Red] {
        now += TimeDelta::minutes(3);
        assert_eq!(*state.turn(), side);
        let actor = if side == Side::Red { red() } else { black() };
        state.tick_clock(&actor, now, &rules).expect("timeout due");
    }
    assert_eq!(*state.players().seat(Side::Red).timeouts(), 3);
    assert_eq!(*state.players().seat(Side::Black).timeouts(), 2);
    assert_eq!(*state.winner(), Some(Side::Black));
    assert_eq!(state.phase(), SessionPhase::Concluded(Side::Black));

    now += TimeDelta::minutes(3);
    assert!(state.tick_clock(&black(), now, &rules).is_none());
}

#[test]
fn test_timeout_cancels_pending_undo() {
    let rules = SessionRules::default();
    let mut state = seated_room();
    state
        .attempt_move(&red(), &PieceId::new("r-soldier-2"), Position::new(4, 5), t0())
        .expect("Red soldier advance");
    state.request_undo(&red()).expect("request");

    state
        .tick_clock(&black(), t0() + TimeDelta::minutes(3), &rules)
        .expect("timeout due");
    assert_eq!(*state.turn(), Side::Red);
    assert_eq!(*state.meta().undo_requested_by(), None);

    assert_eq!(
        state.respond_undo(&black(), true, t0()).unwrap_err(),
        SessionError::NoUndoPending
    );
    assert_eq!(state.history().len(), 1);
    assert_eq!(*state.turn(), Side::Red);
}

#[test]
fn test_undoing_opening_move_returns_turn_to_red() {
    let mut state = seated_room();
    state
        .attempt_move(&red(), &PieceId::new("r-soldier-2"), Position::new(4, 5), t0())
        .expect("Red soldier advance");
    state.request_undo(&red()).expect("request");
    state.respond_undo(&black(), true, t0()).expect("accept");
    assert!(state.history().is_empty());
    assert_eq!(state.board(), &Board::initial());
    assert_eq!(*state.turn(), Side::Red);
}

#[test]
fn test_undo_hands_turn_to_side_of_undone_move() {
    // A merged document can carry a pending request next to a turn that has
    // already moved on.
    let mut played = seated_room();
    played
        .attempt_move(&red(), &PieceId::new("r-soldier-2"), Position::new(4, 5), t0())
        .expect("Red soldier advance");
    let meta: SessionMeta = serde_json::from_value(serde_json::json!({
        "lastMoveAt": 1_700_000_000_000_i64,
        "undoRequestedBy": "RED",
    }))
    .expect("meta decodes");
    let mut state = SessionState::from_parts(
        played.board().clone(),
        Side::Red,
        played.history().clone(),
        None,
        played.players().clone(),
        meta,
    );

    state.respond_undo(&black(), true, t0()).expect("accept");
    assert!(state.history().is_empty());
    assert_eq!(*state.turn(), Side::Red);
}

#[test]
fn test_times_are_kept_at_millisecond_precision() {
    let precise = DateTime::from_timestamp(1_700_000_020, 123_456_789).expect("valid timestamp");
    let stored = DateTime::from_timestamp(1_700_000_020, 123_000_000).expect("valid timestamp");

    let mut state = SessionState::open(red(), precise);
    assert_eq!(*state.meta().last_move_at(), stored);
    state
        .join_seat(&black(), SeatRequest::Side(Side::Black), precise)
        .expect("join");
    state
        .attempt_move(&red(), &PieceId::new("r-soldier-2"), Position::new(4, 5), precise)
        .expect("Red soldier advance");
    assert_eq!(state.history()[0].timestamp, stored);
    assert_eq!(*state.meta().last_move_at(), stored);
}

#[test]
fn test_helper_moves_once_for_side_to_move() {
    let mut state = seated_room();
    state
        .join_seat(&watcher(), SeatRequest::Spectator, t0())
        .expect("spectate");

    let err = state.delegate_helper(&black(), &watcher()).unwrap_err();
    assert_eq!(err.kind(), SessionErrorKind::PermissionDenied);

    state.delegate_helper(&red(), &watcher()).expect("delegate");
    assert_eq!(state.meta().helper(), &Some(watcher()));

    state
        .attempt_move(&watcher(), &PieceId::new("r-horse-0"), Position::new(2, 7), t0())
        .expect("helper moves the horse");
    assert_eq!(*state.turn(), Side::Black);
    assert_eq!(state.meta().helper(), &None);

    let err = state
        .attempt_move(&watcher(), &PieceId::new("b-horse-0"), Position::new(2, 2), t0())
        .unwrap_err();
    assert!(matches!(err, SessionError::NotYourTurn { .. }));
}

#[test]
fn test_helper_delegation_toggles_and_requires_spectator() {
    let mut state = seated_room();
    assert_eq!(
        state.delegate_helper(&red(), &watcher()).unwrap_err(),
        SessionError::NotASpectator(watcher())
    );
    state
        .join_seat(&watcher(), SeatRequest::Spectator, t0())
        .expect("spectate");
    state.delegate_helper(&red(), &watcher()).expect("grant");
    state.delegate_helper(&red(), &watcher()).expect("revoke");
    assert_eq!(state.meta().helper(), &None);
}

#[test]
fn test_timeout_clears_helper() {
    let rules = SessionRules::default();
    let mut state = seated_room();
    state
        .join_seat(&watcher(), SeatRequest::Spectator, t0())
        .expect("spectate");
    state.delegate_helper(&red(), &watcher()).expect("grant");
    state
        .tick_clock(&red(), t0() + TimeDelta::minutes(5), &rules)
        .expect("timeout due");
    assert_eq!(state.meta().helper(), &None);
}

/// Red chariot on an open file facing the black general.
fn general_exposed() -> SessionState {
    let seated = seated_room();
    let board = Board::from_pieces(vec![
        Piece::new("r-general-0", PieceKind::General, Side::Red, Position::new(3, 9)),
        Piece::new("r-chariot-0", PieceKind::Chariot, Side::Red, Position::new(4, 5)),
        Piece::new("b-general-0", PieceKind::General, Side::Black, Position::new(4, 0)),
        Piece::new("b-soldier-0", PieceKind::Soldier, Side::Black, Position::new(0, 3)),
    ]);
    SessionState::from_parts(
        board,
        Side::Red,
        Vec::new(),
        None,
        seated.players().clone(),
        seated.meta().clone(),
    )
}

#[test]
fn test_capturing_general_ends_game() {
    let mut state = general_exposed();
    state
        .attempt_move(&red(), &PieceId::new("r-chariot-0"), Position::new(4, 0), t0())
        .expect("chariot takes general");
    assert_eq!(*state.winner(), Some(Side::Red));
    assert_eq!(
        state.history()[0].captured,
        Some(PieceId::new("b-general-0"))
    );

    let err = state
        .attempt_move(&black(), &PieceId::new("b-soldier-0"), Position::new(0, 4), t0())
        .unwrap_err();
    assert_eq!(err, SessionError::GameOver(Side::Red));
}

#[test]
fn test_concluded_game_rejects_undo_request() {
    let mut state = general_exposed();
    state
        .attempt_move(&red(), &PieceId::new("r-chariot-0"), Position::new(4, 0), t0())
        .expect("chariot takes general");
    assert_eq!(
        state.request_undo(&black()).unwrap_err(),
        SessionError::GameOver(Side::Red)
    );
}

#[test]
fn test_restart_resets_board_and_keeps_seats() {
    let mut state = general_exposed();
    state
        .attempt_move(&red(), &PieceId::new("r-chariot-0"), Position::new(4, 0), t0())
        .expect("chariot takes general");

    state
        .join_seat(&watcher(), SeatRequest::Spectator, t0())
        .expect("spectate");
    assert!(matches!(
        state.restart(&watcher(), t0()).unwrap_err(),
        SessionError::NotSeated(_)
    ));

    state.restart(&black(), t0()).expect("restart");
    assert_eq!(state.board(), &Board::initial());
    assert!(state.history().is_empty());
    assert_eq!(*state.turn(), Side::Red);
    assert!(state.winner().is_none());
    assert_eq!(state.players().side_of(&red()), Some(Side::Red));
    assert_eq!(state.players().side_of(&black()), Some(Side::Black));
}
