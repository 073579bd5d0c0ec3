//! Xiangqi Room - CLI
//!
//! Plays two-player xiangqi against a local sqlite room store.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Command, UndoAction};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use tracing_subscriber::EnvFilter;
use xiangqi_room::{
    ClientConfig, ClientId, RoomClient, RoomId, SessionPhase, SessionState, Side, SqliteStore,
    UndoState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::Init { name } = &cli.command {
        return run_init(&cli.config, name.clone());
    }

    let config = ClientConfig::load_or_init(&cli.config)?;
    let db_path = cli
        .db_path
        .clone()
        .unwrap_or_else(|| config.db_path().clone());
    let store = Arc::new(SqliteStore::open(db_path)?);
    let now = Utc::now();

    match cli.command {
        Command::Init { .. } => Ok(()),
        Command::Create => {
            let client = RoomClient::create_room(&config, store, now).await?;
            println!("Room {} created, you play Red", client.room());
            print_state(client.room(), client.state());
            Ok(())
        }
        Command::Join { room, seat } => {
            let client = RoomClient::join_room(&config, store, room, seat.into(), now).await?;
            match client.state().players().side_of(config.identity()) {
                Some(side) => println!("Joined room {} as {}", client.room(), side),
                None => println!("Watching room {}", client.room()),
            }
            print_state(client.room(), client.state());
            Ok(())
        }
        Command::Show { room } => {
            let client = RoomClient::open(&config, store, room).await?;
            print_state(client.room(), client.state());
            Ok(())
        }
        Command::Move { room, from, to } => {
            let mut client = RoomClient::open(&config, store, room).await?;
            let outcome = client.move_from(from, to, now).await?;
            report_stale(outcome.stale);
            print_state(client.room(), client.state());
            Ok(())
        }
        Command::Undo { room, action } => {
            let mut client = RoomClient::open(&config, store, room).await?;
            let outcome = match action {
                UndoAction::Request => client.request_undo().await?,
                UndoAction::Accept => client.respond_undo(true, now).await?,
                UndoAction::Decline => client.respond_undo(false, now).await?,
            };
            report_stale(outcome.stale);
            print_state(client.room(), client.state());
            Ok(())
        }
        Command::Delegate { room, spectator } => {
            let mut client = RoomClient::open(&config, store, room).await?;
            let outcome = client.delegate_helper(&ClientId::new(spectator)).await?;
            report_stale(outcome.stale);
            print_state(client.room(), client.state());
            Ok(())
        }
        Command::Tick { room } => {
            let mut client = RoomClient::open(&config, store, room).await?;
            let outcome = client.tick(now).await?;
            if outcome.pushed {
                println!("Turn clock expired, timeout recorded");
            } else {
                println!("Nothing to do");
            }
            print_state(client.room(), client.state());
            Ok(())
        }
        Command::Restart { room } => {
            let mut client = RoomClient::open(&config, store, room).await?;
            client.restart(now).await?;
            print_state(client.room(), client.state());
            Ok(())
        }
    }
}

/// Create or update the config file
#[instrument]
fn run_init(path: &std::path::Path, name: Option<String>) -> Result<()> {
    let mut config = ClientConfig::load_or_init(path)?;
    if let Some(name) = name {
        config = config.with_display_name(name);
        config.save(path)?;
        debug!("Display name updated");
    }
    info!(identity = %config.identity(), "Config ready");
    println!("Identity: {}", config.identity());
    println!("Name:     {}", config.display_name());
    Ok(())
}

fn report_stale(stale: bool) {
    if stale {
        println!("Warning: another participant wrote concurrently, refresh to verify");
    }
}

fn seat_label(state: &SessionState, side: Side) -> String {
    match state.players().seat(side).id() {
        Some(id) => format!("{} ({} timeouts)", id, state.players().seat(side).timeouts()),
        None => "open".to_string(),
    }
}

fn print_state(room: &RoomId, state: &SessionState) {
    println!();
    println!("{}", state.board().render());
    println!("Room:       {}", room);
    println!("Red:        {}", seat_label(state, Side::Red));
    println!("Black:      {}", seat_label(state, Side::Black));
    println!("Spectators: {}", state.players().spectators().len());
    println!("Moves:      {}", state.history().len());
    match state.phase() {
        SessionPhase::WaitingForSeats => println!("Waiting for a second player"),
        SessionPhase::Concluded(winner) => println!("{} wins", winner),
        SessionPhase::Active(UndoState::Idle) => println!("{} to move", state.turn()),
        SessionPhase::Active(UndoState::Pending(side)) => {
            println!("{} to move, {} asked to undo", state.turn(), side)
        }
    }
    if let Some(helper) = state.meta().helper() {
        println!("Helper:     {}", helper);
    }
}
