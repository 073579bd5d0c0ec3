//! Client-side room orchestration.
//!
//! A [`RoomClient`] owns one participant's cached [`SessionState`] for one
//! room. Local actions run through the session state machine and the
//! resulting patch is pushed through the sync protocol; remote changes arrive
//! on a channel and replace the cache wholesale.

use crate::session::{SeatRequest, SessionError, SessionRules, SessionState, StatePatch};
use crate::sync::{
    DocumentStore, DocumentSync, PeerSignal, SubscriptionHandle, SyncError, SyncEvent,
};
use crate::{ClientConfig, ClientId, RoomId};
use chrono::{DateTime, Utc};
use derive_more::{Display, Error, From};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use xiangqi_rules::{PieceId, Position};

/// Room codes tried before giving up on creation.
const CREATE_ATTEMPTS: usize = 16;

/// Failure of a room client operation.
#[derive(Debug, Clone, Display, Error, From)]
pub enum ClientError {
    /// The session state machine rejected the action.
    #[display("{}", _0)]
    #[from]
    Session(SessionError),

    /// Talking to the shared document failed.
    #[display("{}", _0)]
    #[from]
    Sync(SyncError),

    /// No room with this code exists.
    #[display("Room {} not found", _0)]
    RoomNotFound(#[error(not(source))] RoomId),

    /// No unused room code was found.
    #[display("No free room code after {} attempts", _0)]
    NoFreeRoomCode(#[error(not(source))] usize),

    /// No live piece stands on the given cell.
    #[display("No piece at {}", _0)]
    EmptyCell(#[error(not(source))] Position),
}

/// What a local action produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Whether anything was written.
    pub pushed: bool,
    /// The write may have overwritten a concurrent one.
    pub stale: bool,
}

/// One participant's view of one room.
pub struct RoomClient<S: DocumentStore + ?Sized + 'static> {
    identity: ClientId,
    rules: SessionRules,
    room: RoomId,
    sync: DocumentSync<S>,
    state: SessionState,
    events: Option<mpsc::UnboundedReceiver<SyncEvent>>,
    subscription: Option<SubscriptionHandle>,
    peer_signals: Vec<PeerSignal>,
}

impl<S: DocumentStore + ?Sized + 'static> std::fmt::Debug for RoomClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomClient")
            .field("identity", &self.identity)
            .field("room", &self.room)
            .field("turn", self.state.turn())
            .field("subscribed", &self.subscription.is_some())
            .finish()
    }
}

impl<S: DocumentStore + ?Sized + 'static> RoomClient<S> {
    fn with_state(
        config: &ClientConfig,
        room: RoomId,
        sync: DocumentSync<S>,
        state: SessionState,
    ) -> Self {
        Self {
            identity: config.identity().clone(),
            rules: config.session_rules(),
            room,
            sync,
            state,
            events: None,
            subscription: None,
            peer_signals: Vec::new(),
        }
    }

    /// Opens a new room under a fresh code with this client seated as Red.
    ///
    /// # Errors
    ///
    /// Store failures, or [`ClientError::NoFreeRoomCode`] if every code tried
    /// was taken.
    #[instrument(skip(config, store), fields(identity = %config.identity()))]
    pub async fn create_room(
        config: &ClientConfig,
        store: Arc<S>,
        now: DateTime<Utc>,
    ) -> Result<Self, ClientError> {
        let sync = DocumentSync::new(store);
        for attempt in 0..CREATE_ATTEMPTS {
            let room = RoomId::generate();
            if sync.store().fetch(&room).await.map_err(SyncError::from)?.is_some() {
                debug!(attempt, %room, "Room code in use");
                continue;
            }
            let mut state = SessionState::open(config.identity().clone(), now);
            let version = sync.create(&room, &state).await?;
            state.meta.version = version;
            info!(%room, "Room created");
            return Ok(Self::with_state(config, room, sync, state));
        }
        warn!("Exhausted room codes");
        Err(ClientError::NoFreeRoomCode(CREATE_ATTEMPTS))
    }

    /// Joins an existing room, taking the requested place.
    ///
    /// # Errors
    ///
    /// [`ClientError::RoomNotFound`] for unknown codes, session rejections
    /// such as a taken seat, or sync failures.
    #[instrument(skip(config, store), fields(identity = %config.identity()))]
    pub async fn join_room(
        config: &ClientConfig,
        store: Arc<S>,
        room: RoomId,
        seat: SeatRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, ClientError> {
        let sync = DocumentSync::new(store);
        let state = sync
            .fetch(&room)
            .await?
            .ok_or_else(|| ClientError::RoomNotFound(room.clone()))?;
        let mut client = Self::with_state(config, room, sync, state);
        let identity = client.identity.clone();
        client
            .run(|state| state.join_seat(&identity, seat, now))
            .await?;
        Ok(client)
    }

    /// Attaches to a room this client already takes part in, without joining.
    ///
    /// # Errors
    ///
    /// [`ClientError::RoomNotFound`] for unknown codes, or sync failures.
    #[instrument(skip(config, store), fields(identity = %config.identity()))]
    pub async fn open(
        config: &ClientConfig,
        store: Arc<S>,
        room: RoomId,
    ) -> Result<Self, ClientError> {
        let sync = DocumentSync::new(store);
        let state = sync
            .fetch(&room)
            .await?
            .ok_or_else(|| ClientError::RoomNotFound(room.clone()))?;
        Ok(Self::with_state(config, room, sync, state))
    }

    /// The room code.
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// This client's identity.
    pub fn identity(&self) -> &ClientId {
        &self.identity
    }

    /// The cached session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Peer signals received since the last [`RoomClient::take_peer_signals`].
    pub fn peer_signals(&self) -> &[PeerSignal] {
        &self.peer_signals
    }

    /// Hands over the buffered peer signals, leaving the buffer empty.
    pub fn take_peer_signals(&mut self) -> Vec<PeerSignal> {
        std::mem::take(&mut self.peer_signals)
    }

    async fn push(&mut self, patch: StatePatch) -> Result<ActionOutcome, ClientError> {
        if patch.is_empty() {
            return Ok(ActionOutcome {
                pushed: false,
                stale: false,
            });
        }
        let receipt = self
            .sync
            .push(&self.room, &patch, *self.state.meta().version())
            .await?;
        self.state.meta.version = receipt.version;
        Ok(ActionOutcome {
            pushed: true,
            stale: receipt.stale,
        })
    }

    async fn run<F>(&mut self, op: F) -> Result<ActionOutcome, ClientError>
    where
        F: FnOnce(&mut SessionState) -> Result<StatePatch, SessionError>,
    {
        let patch = op(&mut self.state)?;
        self.push(patch).await
    }

    /// Moves a piece for the side to move.
    ///
    /// # Errors
    ///
    /// Session rejections (nothing is pushed) or sync failures.
    #[instrument(skip(self), fields(room = %self.room))]
    pub async fn attempt_move(
        &mut self,
        piece: &PieceId,
        to: Position,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, ClientError> {
        let identity = self.identity.clone();
        self.run(|state| state.attempt_move(&identity, piece, to, now))
            .await
    }

    /// Moves whatever live piece stands on `from`.
    ///
    /// # Errors
    ///
    /// [`ClientError::EmptyCell`], session rejections or sync failures.
    #[instrument(skip(self), fields(room = %self.room))]
    pub async fn move_from(
        &mut self,
        from: Position,
        to: Position,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, ClientError> {
        let piece = self
            .state
            .board()
            .piece_at(from)
            .map(|p| p.id.clone())
            .ok_or(ClientError::EmptyCell(from))?;
        self.attempt_move(&piece, to, now).await
    }

    /// Asks the opponent to take back the last move.
    ///
    /// # Errors
    ///
    /// Session rejections or sync failures.
    #[instrument(skip(self), fields(room = %self.room))]
    pub async fn request_undo(&mut self) -> Result<ActionOutcome, ClientError> {
        let identity = self.identity.clone();
        self.run(|state| state.request_undo(&identity)).await
    }

    /// Answers the opponent's undo request.
    ///
    /// # Errors
    ///
    /// Session rejections or sync failures.
    #[instrument(skip(self), fields(room = %self.room))]
    pub async fn respond_undo(
        &mut self,
        accept: bool,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, ClientError> {
        let identity = self.identity.clone();
        self.run(|state| state.respond_undo(&identity, accept, now))
            .await
    }

    /// Grants or revokes help from a spectator.
    ///
    /// # Errors
    ///
    /// Session rejections or sync failures.
    #[instrument(skip(self), fields(room = %self.room))]
    pub async fn delegate_helper(
        &mut self,
        helper: &ClientId,
    ) -> Result<ActionOutcome, ClientError> {
        let identity = self.identity.clone();
        self.run(|state| state.delegate_helper(&identity, helper))
            .await
    }

    /// Starts a new game in this room.
    ///
    /// # Errors
    ///
    /// Session rejections or sync failures.
    #[instrument(skip(self), fields(room = %self.room))]
    pub async fn restart(&mut self, now: DateTime<Utc>) -> Result<ActionOutcome, ClientError> {
        let identity = self.identity.clone();
        self.run(|state| state.restart(&identity, now)).await
    }

    /// Evaluates the turn clock; only acts when this client owns the side to
    /// move.
    ///
    /// # Errors
    ///
    /// Sync failures while pushing a timeout.
    #[instrument(skip(self), fields(room = %self.room))]
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<ActionOutcome, ClientError> {
        let identity = self.identity.clone();
        let rules = self.rules;
        match self.state.tick_clock(&identity, now, &rules) {
            Some(patch) => self.push(patch).await,
            None => Ok(ActionOutcome {
                pushed: false,
                stale: false,
            }),
        }
    }

    /// Starts receiving remote changes for this room.
    ///
    /// The store holds the only sender of the event channel, so once the
    /// subscription ends the channel closes after its last buffered event.
    ///
    /// # Errors
    ///
    /// Sync failures while registering.
    #[instrument(skip(self), fields(room = %self.room))]
    pub async fn subscribe(&mut self) -> Result<(), ClientError> {
        if self.subscription.is_some() {
            return Ok(());
        }
        let (tx, events) = mpsc::unbounded_channel();
        let handle = self
            .sync
            .subscribe(&self.room, move |event| {
                if tx.send(event).is_err() {
                    debug!("Room client dropped, discarding event");
                }
            })
            .await?;
        self.subscription = Some(handle);
        self.events = Some(events);
        Ok(())
    }

    /// Stops receiving remote changes.
    ///
    /// # Errors
    ///
    /// Sync failures.
    #[instrument(skip(self), fields(room = %self.room))]
    pub async fn unsubscribe(&mut self) -> Result<(), ClientError> {
        if let Some(handle) = self.subscription.take() {
            self.sync.unsubscribe(handle).await?;
        }
        Ok(())
    }

    /// Asks peers to open a media connection.
    ///
    /// # Errors
    ///
    /// Sync failures.
    #[instrument(skip(self), fields(room = %self.room))]
    pub async fn request_connection(&self) -> Result<(), ClientError> {
        let signal = PeerSignal::RequestConnection {
            from: self.identity.clone(),
        };
        self.sync.signal(&self.room, signal).await?;
        Ok(())
    }

    fn apply(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::State(state) => {
                debug!(version = *state.meta().version(), "Applying remote state");
                self.state = *state;
            }
            SyncEvent::Peer(signal) => self.peer_signals.push(signal),
        }
    }

    /// Applies every remote event received so far, returning how many.
    #[instrument(skip(self), fields(room = %self.room))]
    pub fn drain_remote(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.events.as_mut().and_then(|rx| rx.try_recv().ok()) {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Waits for the next remote event and applies it.
    ///
    /// Returns `false` once no further events can arrive: never subscribed,
    /// or unsubscribed with nothing left buffered.
    #[instrument(skip(self), fields(room = %self.room))]
    pub async fn next_remote(&mut self) -> bool {
        let event = match self.events.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        };
        match event {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Replaces the cache with the stored state.
    ///
    /// # Errors
    ///
    /// [`ClientError::RoomNotFound`] if the room vanished, or sync failures.
    #[instrument(skip(self), fields(room = %self.room))]
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.state = self
            .sync
            .fetch(&self.room)
            .await?
            .ok_or_else(|| ClientError::RoomNotFound(self.room.clone()))?;
        Ok(())
    }
}
