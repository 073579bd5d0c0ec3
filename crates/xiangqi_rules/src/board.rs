//! Board storage: the ordered piece list and its canonical starting layout.

use super::types::{COLUMNS, Piece, PieceId, PieceKind, Position, ROWS, Side};
use serde::{Deserialize, Serialize};
use tracing::instrument;

const BACK_RANK: [PieceKind; 9] = [
    PieceKind::Chariot,
    PieceKind::Horse,
    PieceKind::Elephant,
    PieceKind::Advisor,
    PieceKind::General,
    PieceKind::Advisor,
    PieceKind::Elephant,
    PieceKind::Horse,
    PieceKind::Chariot,
];

/// Ordered set of pieces, dead ones included.
///
/// At most one live piece occupies any position. Dead pieces are kept so that
/// history replay can bring them back deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    pieces: Vec<Piece>,
}

impl Board {
    /// Builds a board from an explicit piece list.
    pub fn from_pieces(pieces: Vec<Piece>) -> Self {
        Self { pieces }
    }

    /// The canonical starting layout, Red first then Black.
    #[instrument]
    pub fn initial() -> Self {
        let mut pieces = Vec::with_capacity(32);
        for side in [Side::Red, Side::Black] {
            let (back, cannons, soldiers) = match side {
                Side::Red => (9, 7, 6),
                Side::Black => (0, 2, 3),
            };
            let prefix = match side {
                Side::Red => 'r',
                Side::Black => 'b',
            };
            let mut counts = std::collections::HashMap::<PieceKind, usize>::new();
            let mut place = |kind: PieceKind, col: i8, row: i8| {
                let n = counts.entry(kind).or_default();
                pieces.push(Piece::new(
                    format!("{}-{}-{}", prefix, kind, n),
                    kind,
                    side,
                    Position::new(col, row),
                ));
                *n += 1;
            };
            for (col, kind) in BACK_RANK.iter().enumerate() {
                place(*kind, col as i8, back);
            }
            place(PieceKind::Cannon, 1, cannons);
            place(PieceKind::Cannon, 7, cannons);
            for col in [0, 2, 4, 6, 8] {
                place(PieceKind::Soldier, col, soldiers);
            }
        }
        Self { pieces }
    }

    /// All pieces, dead ones included.
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Live pieces of one side.
    pub fn live_pieces(&self, side: Side) -> impl Iterator<Item = &Piece> {
        self.pieces.iter().filter(move |p| p.alive && p.side == side)
    }

    /// The live piece at `pos`, if any.
    pub fn piece_at(&self, pos: Position) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.alive && p.position == pos)
    }

    /// Whether a live piece occupies `pos`.
    pub fn is_occupied(&self, pos: Position) -> bool {
        self.piece_at(pos).is_some()
    }

    /// Looks a piece up by identity, dead or alive.
    pub fn piece(&self, id: &PieceId) -> Option<&Piece> {
        self.pieces.iter().find(|p| &p.id == id)
    }

    /// Mutable lookup by identity.
    pub fn piece_mut(&mut self, id: &PieceId) -> Option<&mut Piece> {
        self.pieces.iter_mut().find(|p| &p.id == id)
    }

    /// The live general of `side`.
    pub fn general(&self, side: Side) -> Option<&Piece> {
        self.live_pieces(side).find(|p| p.kind == PieceKind::General)
    }

    /// Counts live pieces strictly between two cells on a shared rank or file.
    ///
    /// Returns `None` when the cells are not on a straight line or coincide.
    pub fn count_between(&self, from: Position, to: Position) -> Option<usize> {
        if from == to || (from.col != to.col && from.row != to.row) {
            return None;
        }
        let dcol = (to.col - from.col).signum();
        let drow = (to.row - from.row).signum();
        let mut count = 0;
        let mut cursor = from.offset(dcol, drow);
        while cursor != to {
            if self.is_occupied(cursor) {
                count += 1;
            }
            cursor = cursor.offset(dcol, drow);
        }
        Some(count)
    }

    /// Moves the live piece at `from` to `to`, capturing whatever stood there.
    ///
    /// Returns the captured piece's identity. Does no legality checking; the
    /// caller has already consulted the rules. Returns `None` without
    /// changing anything when `from` is empty.
    #[instrument(skip(self))]
    pub fn relocate(&mut self, from: Position, to: Position) -> Option<Option<PieceId>> {
        let mover = self.piece_at(from)?.id.clone();
        let captured = self.piece_at(to).map(|p| p.id.clone());
        if let Some(id) = &captured
            && let Some(victim) = self.piece_mut(id)
        {
            victim.capture();
        }
        if let Some(piece) = self.piece_mut(&mover) {
            piece.position = to;
        }
        Some(captured)
    }

    /// Text snapshot of the board, Black at the top.
    ///
    /// Red pieces are upper-case, Black lower-case, empty cells `.`.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity((COLUMNS as usize + 1) * ROWS as usize * 2);
        for row in 0..ROWS {
            for col in 0..COLUMNS {
                let cell = match self.piece_at(Position::new(col, row)) {
                    Some(p) if p.side == Side::Red => p.kind.symbol(),
                    Some(p) => p.kind.symbol().to_ascii_lowercase(),
                    None => '.',
                };
                out.push(cell);
                if col + 1 < COLUMNS {
                    out.push(' ');
                }
            }
            out.push('\n');
            if row == 4 {
                out.push_str("~ ~ ~ ~ ~ ~ ~ ~ ~\n");
            }
        }
        out
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}
