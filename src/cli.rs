//! Command-line interface for xiangqi_room.

use clap::{Parser, Subcommand, ValueEnum};
use xiangqi_room::{Position, RoomId, SeatRequest, Side};

/// Xiangqi Room - play Chinese chess through a shared room document
#[derive(Parser, Debug)]
#[command(name = "xiangqi_room")]
#[command(about = "Two-player xiangqi over a shared room document", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the client config (created on first run)
    #[arg(short, long, global = true, default_value = "xiangqi_room.toml")]
    pub config: std::path::PathBuf,

    /// Override the database path from the config
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Which place to take when joining.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SeatChoice {
    /// Red seat
    Red,
    /// Black seat
    Black,
    /// First open seat, else spectate
    Any,
    /// Watch only
    Spectator,
}

impl From<SeatChoice> for SeatRequest {
    fn from(choice: SeatChoice) -> Self {
        match choice {
            SeatChoice::Red => SeatRequest::Side(Side::Red),
            SeatChoice::Black => SeatRequest::Side(Side::Black),
            SeatChoice::Any => SeatRequest::FirstOpen,
            SeatChoice::Spectator => SeatRequest::Spectator,
        }
    }
}

/// Undo negotiation step.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum UndoAction {
    /// Ask to take back the last move
    Request,
    /// Accept the opponent's request
    Accept,
    /// Decline the opponent's request
    Decline,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the config with a fresh identity
    Init {
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Open a new room, seated as Red
    Create,

    /// Join an existing room
    Join {
        /// Four-digit room code
        room: RoomId,

        /// Place to take
        #[arg(long, value_enum, default_value = "any")]
        seat: SeatChoice,
    },

    /// Print the board and session status
    Show {
        /// Four-digit room code
        room: RoomId,
    },

    /// Move the piece standing on FROM to TO (cells as "col,row")
    Move {
        /// Four-digit room code
        room: RoomId,

        /// Source cell
        from: Position,

        /// Destination cell
        to: Position,
    },

    /// Request or answer an undo
    Undo {
        /// Four-digit room code
        room: RoomId,

        /// Step to take
        #[arg(value_enum)]
        action: UndoAction,
    },

    /// Let a spectator move for you, or revoke that
    Delegate {
        /// Four-digit room code
        room: RoomId,

        /// Spectator identity
        spectator: String,
    },

    /// Check the turn clock and record a timeout if due
    Tick {
        /// Four-digit room code
        room: RoomId,
    },

    /// Start a new game in a concluded room
    Restart {
        /// Four-digit room code
        room: RoomId,
    },
}
