//! Shared session model and its state machine.

mod error;
mod machine;
mod patch;
mod state;

pub use error::{SessionError, SessionErrorKind};
pub use machine::SeatRequest;
pub use patch::{MetaPatch, StatePatch};
pub use state::{
    PlayerRecord, Players, SessionMeta, SessionPhase, SessionRules, SessionState, UndoState,
};
