//! Per-kind movement geometry.
//!
//! These predicates assume the generic checks (liveness, bounds, null move,
//! own-piece capture) already passed.

use crate::{Board, Piece, PieceKind, Position, Side};
use tracing::instrument;

/// Dispatches to the movement rule of the piece's kind.
#[instrument(skip(piece, board), fields(kind = %piece.kind, from = %piece.position, to = %to))]
pub fn kind_allows(piece: &Piece, to: Position, board: &Board) -> bool {
    let from = piece.position;
    match piece.kind {
        PieceKind::General => general(piece.side, from, to),
        PieceKind::Advisor => advisor(piece.side, from, to),
        PieceKind::Elephant => elephant(piece.side, from, to, board),
        PieceKind::Horse => horse(from, to, board),
        PieceKind::Chariot => chariot(from, to, board),
        PieceKind::Cannon => cannon(from, to, board),
        PieceKind::Soldier => soldier(piece.side, from, to),
    }
}

fn delta(from: Position, to: Position) -> (i8, i8) {
    (to.col - from.col, to.row - from.row)
}

fn general(side: Side, from: Position, to: Position) -> bool {
    let (dc, dr) = delta(from, to);
    side.palace_contains(to) && dc.abs() + dr.abs() == 1
}

fn advisor(side: Side, from: Position, to: Position) -> bool {
    let (dc, dr) = delta(from, to);
    side.palace_contains(to) && dc.abs() == 1 && dr.abs() == 1
}

fn elephant(side: Side, from: Position, to: Position, board: &Board) -> bool {
    let (dc, dr) = delta(from, to);
    if dc.abs() != 2 || dr.abs() != 2 || !side.owns_row(to.row) {
        return false;
    }
    let eye = from.offset(dc / 2, dr / 2);
    !board.is_occupied(eye)
}

fn horse(from: Position, to: Position, board: &Board) -> bool {
    let (dc, dr) = delta(from, to);
    let leg = match (dc.abs(), dr.abs()) {
        (2, 1) => from.offset(dc / 2, 0),
        (1, 2) => from.offset(0, dr / 2),
        _ => return false,
    };
    !board.is_occupied(leg)
}

fn chariot(from: Position, to: Position, board: &Board) -> bool {
    board.count_between(from, to) == Some(0)
}

fn cannon(from: Position, to: Position, board: &Board) -> bool {
    let screens = match board.count_between(from, to) {
        Some(n) => n,
        None => return false,
    };
    if board.is_occupied(to) {
        screens == 1
    } else {
        screens == 0
    }
}

fn soldier(side: Side, from: Position, to: Position) -> bool {
    let (dc, dr) = delta(from, to);
    if dc == 0 && dr == side.forward() {
        return true;
    }
    let crossed = !side.owns_row(from.row);
    crossed && dr == 0 && dc.abs() == 1
}

#[cfg(test)]
mod tests {
    use crate::rules::is_legal;
    use crate::{Board, Piece, PieceKind, Position, Side};

    fn lone(kind: PieceKind, side: Side, col: i8, row: i8) -> Piece {
        Piece::new(format!("t-{}", kind), kind, side, Position::new(col, row))
    }

    fn board_with(pieces: Vec<Piece>) -> Board {
        Board::from_pieces(pieces)
    }

    #[test]
    fn cannon_captures_over_exactly_one_screen() {
        let cannon = lone(PieceKind::Cannon, Side::Red, 0, 9);
        let target = lone(PieceKind::Chariot, Side::Black, 0, 3);
        let screen = Piece::new("screen", PieceKind::Soldier, Side::Red, Position::new(0, 6));
        let board = board_with(vec![cannon.clone(), target, screen.clone()]);
        assert!(is_legal(&cannon, Position::new(0, 3), &board));

        let second = Piece::new("screen-2", PieceKind::Soldier, Side::Black, Position::new(0, 5));
        let crowded = board_with(vec![
            cannon.clone(),
            lone(PieceKind::Chariot, Side::Black, 0, 3),
            screen,
            second,
        ]);
        assert!(!is_legal(&cannon, Position::new(0, 3), &crowded));

        let bare = board_with(vec![cannon.clone(), lone(PieceKind::Chariot, Side::Black, 0, 3)]);
        assert!(!is_legal(&cannon, Position::new(0, 3), &bare));
    }

    #[test]
    fn cannon_quiet_move_needs_clear_path() {
        let cannon = lone(PieceKind::Cannon, Side::Red, 0, 9);
        let blocker = lone(PieceKind::Soldier, Side::Red, 0, 6);
        let board = board_with(vec![cannon.clone(), blocker]);
        assert!(is_legal(&cannon, Position::new(0, 7), &board));
        assert!(!is_legal(&cannon, Position::new(0, 4), &board));
    }

    #[test]
    fn chariot_cannot_pass_through_pieces() {
        let chariot = lone(PieceKind::Chariot, Side::Red, 4, 5);
        let blocker = lone(PieceKind::Soldier, Side::Black, 4, 3);
        let board = board_with(vec![chariot.clone(), blocker]);
        assert!(is_legal(&chariot, Position::new(4, 3), &board));
        assert!(!is_legal(&chariot, Position::new(4, 2), &board));
        assert!(is_legal(&chariot, Position::new(0, 5), &board));
        assert!(!is_legal(&chariot, Position::new(5, 4), &board));
    }

    #[test]
    fn elephant_blocked_by_eye() {
        let elephant = lone(PieceKind::Elephant, Side::Red, 2, 9);
        let board = board_with(vec![elephant.clone()]);
        assert!(is_legal(&elephant, Position::new(4, 7), &board));

        let eye = lone(PieceKind::Soldier, Side::Black, 3, 8);
        let blocked = board_with(vec![elephant.clone(), eye]);
        assert!(!is_legal(&elephant, Position::new(4, 7), &blocked));
        assert!(is_legal(&elephant, Position::new(0, 7), &blocked));
    }

    #[test]
    fn elephant_never_crosses_river() {
        let red = lone(PieceKind::Elephant, Side::Red, 2, 5);
        let board = board_with(vec![red.clone()]);
        assert!(!is_legal(&red, Position::new(4, 3), &board));
        assert!(is_legal(&red, Position::new(4, 7), &board));

        let black = lone(PieceKind::Elephant, Side::Black, 2, 4);
        let board = board_with(vec![black.clone()]);
        assert!(!is_legal(&black, Position::new(4, 6), &board));
        assert!(is_legal(&black, Position::new(0, 2), &board));
    }

    #[test]
    fn horse_blocked_only_by_leg() {
        let horse = lone(PieceKind::Horse, Side::Red, 4, 5);
        let empty = board_with(vec![horse.clone()]);
        let targets = [
            Position::new(6, 4),
            Position::new(6, 6),
            Position::new(2, 4),
            Position::new(2, 6),
            Position::new(5, 3),
            Position::new(3, 3),
            Position::new(5, 7),
            Position::new(3, 7),
        ];
        for to in targets {
            assert!(is_legal(&horse, to, &empty), "{} should be reachable", to);
        }

        // Leg for the horizontal-long move to (6,4) is (5,5).
        let leg = lone(PieceKind::Soldier, Side::Black, 5, 5);
        let board = board_with(vec![horse.clone(), leg]);
        assert!(!is_legal(&horse, Position::new(6, 4), &board));
        assert!(!is_legal(&horse, Position::new(6, 6), &board));
        assert!(is_legal(&horse, Position::new(5, 3), &board));

        // The diagonal midpoint (5,4) does not block.
        let diagonal = lone(PieceKind::Soldier, Side::Black, 5, 4);
        let board = board_with(vec![horse.clone(), diagonal]);
        assert!(is_legal(&horse, Position::new(6, 4), &board));
        assert!(is_legal(&horse, Position::new(5, 3), &board));

        // Leg for the vertical-long move to (5,3) is (4,4).
        let vertical_leg = lone(PieceKind::Soldier, Side::Black, 4, 4);
        let board = board_with(vec![horse.clone(), vertical_leg]);
        assert!(!is_legal(&horse, Position::new(5, 3), &board));
        assert!(!is_legal(&horse, Position::new(3, 3), &board));
        assert!(is_legal(&horse, Position::new(6, 4), &board));
    }

    #[test]
    fn soldier_moves_forward_then_sideways_after_river() {
        let board = Board::initial();
        let soldier = board.piece_at(Position::new(0, 6)).cloned().unwrap();
        assert!(is_legal(&soldier, Position::new(0, 5), &board));
        assert!(!is_legal(&soldier, Position::new(0, 7), &board));

        let mut advanced = soldier.clone();
        advanced.position = Position::new(0, 5);
        assert!(!is_legal(&advanced, Position::new(1, 5), &board));

        let crossed = lone(PieceKind::Soldier, Side::Red, 4, 4);
        let open = board_with(vec![crossed.clone()]);
        assert!(is_legal(&crossed, Position::new(3, 4), &open));
        assert!(is_legal(&crossed, Position::new(5, 4), &open));
        assert!(is_legal(&crossed, Position::new(4, 3), &open));
        assert!(!is_legal(&crossed, Position::new(4, 5), &open));
    }

    #[test]
    fn black_soldier_advances_downward() {
        let soldier = lone(PieceKind::Soldier, Side::Black, 2, 3);
        let board = board_with(vec![soldier.clone()]);
        assert!(is_legal(&soldier, Position::new(2, 4), &board));
        assert!(!is_legal(&soldier, Position::new(2, 2), &board));
        assert!(!is_legal(&soldier, Position::new(3, 3), &board));
    }

    #[test]
    fn general_and_advisor_stay_in_palace() {
        let general = lone(PieceKind::General, Side::Red, 3, 7);
        let advisor = lone(PieceKind::Advisor, Side::Red, 4, 8);
        let board = board_with(vec![general.clone(), advisor.clone()]);
        assert!(!is_legal(&general, Position::new(2, 7), &board));
        assert!(!is_legal(&general, Position::new(3, 6), &board));
        assert!(is_legal(&general, Position::new(3, 8), &board));
        assert!(!is_legal(&general, Position::new(4, 8), &board));
        assert!(is_legal(&advisor, Position::new(5, 9), &board));
        assert!(!is_legal(&advisor, Position::new(4, 7), &board));
    }
}
