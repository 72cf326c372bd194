//! Async client for the omok room protocol.
//!
//! [`OmokClient`] is a thin handle over a background transport loop. The
//! handle and the loop share one [`Session`] behind a mutex: user intents lock
//! it to validate and build the outgoing message, the loop locks it to apply
//! each inbound message in delivery order. Outgoing messages travel to the
//! loop over an unbounded MPSC channel; events come back on a bounded channel
//! returned from [`OmokClient::start`].
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = WebSocketTransport::connect("wss://omok.example/ws").await?;
//! let (client, mut events) = OmokClient::start(transport, OmokConfig::new());
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         OmokEvent::RoomListUpdated { rooms } => { /* … */ }
//!         OmokEvent::GameInitialized { start_available: true, .. } => client.start_game().await?,
//!         OmokEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, warn};
use url::form_urlencoded;

use crate::error::{DesyncError, OmokError, Result};
use crate::event::OmokEvent;
use crate::game::GameState;
use crate::protocol::{ClientMessage, PlayerId, Room, RoomId, ServerMessage};
use crate::render::Renderer;
use crate::session::{CreateRoomParams, Phase, Session};
use crate::transport::Transport;

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default period between `getRoomList` requests.
pub const DEFAULT_ROOM_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for an [`OmokClient`].
///
/// # Example
///
/// ```
/// use omok_client::client::OmokConfig;
/// use std::time::Duration;
///
/// let config = OmokConfig::new()
///     .with_room_refresh_interval(Some(Duration::from_secs(10)))
///     .with_hide_playing(true)
///     .with_join_query("?room=abc123");
/// assert_eq!(config.join_room.as_deref(), Some("abc123"));
/// ```
#[derive(Debug, Clone)]
pub struct OmokConfig {
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer falls behind, events are dropped with a warning so the
    /// transport loop never blocks. `Disconnected` is always delivered.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`OmokClient::shutdown`] waits for the loop before aborting it.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// Period of automatic `getRoomList` requests. `None` (or zero) disables
    /// them; [`OmokClient::refresh_rooms`] still works.
    ///
    /// Defaults to **5 seconds**.
    pub room_refresh_interval: Option<Duration>,
    /// Leave rooms already playing out of [`OmokEvent::RoomListUpdated`].
    pub hide_playing: bool,
    /// Room to join as soon as the channel is up, e.g. from a shared link.
    pub join_room: Option<RoomId>,
}

impl Default for OmokConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OmokConfig {
    pub fn new() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            room_refresh_interval: Some(DEFAULT_ROOM_REFRESH_INTERVAL),
            hide_playing: false,
            join_room: None,
        }
    }

    /// Set the capacity of the bounded event channel. Values below 1 are
    /// clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_room_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.room_refresh_interval = interval;
        self
    }

    #[must_use]
    pub fn with_hide_playing(mut self, hide_playing: bool) -> Self {
        self.hide_playing = hide_playing;
        self
    }

    #[must_use]
    pub fn with_join_room(mut self, room_id: impl Into<RoomId>) -> Self {
        self.join_room = Some(room_id.into());
        self
    }

    /// Take the join target from a `?room=<id>` query string, if present.
    #[must_use]
    pub fn with_join_query(mut self, query: &str) -> Self {
        if let Some(room_id) = room_id_from_query(query) {
            self.join_room = Some(room_id);
        }
        self
    }
}

/// The `room` parameter of a URL query string.
///
/// ```
/// use omok_client::client::room_id_from_query;
///
/// assert_eq!(room_id_from_query("?lang=ko&room=42").as_deref(), Some("42"));
/// assert_eq!(room_id_from_query("room=%EB%B0%A9+1").as_deref(), Some("방 1"));
/// assert_eq!(room_id_from_query("room="), None);
/// ```
pub fn room_id_from_query(query: &str) -> Option<RoomId> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .find(|(key, _)| key == "room")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

// ── Shared state ────────────────────────────────────────────────────

/// Internal shared state between the client handle and the transport loop.
struct ClientState {
    connected: AtomicBool,
    session: Mutex<Session>,
}

// ── Client handle ───────────────────────────────────────────────────

/// Async client handle for the omok room protocol.
///
/// Intent methods validate against the local session first. A rejected intent
/// returns the error and sends nothing; an accepted one is queued and the call
/// returns without waiting for the server.
pub struct OmokClient {
    /// Sender half of the command channel to the transport loop.
    cmd_tx: mpsc::UnboundedSender<ClientMessage>,
    /// Shared state updated by the transport loop.
    state: Arc<ClientState>,
    /// Handle to the background transport loop task.
    task: Option<tokio::task::JoinHandle<()>>,
    /// Oneshot sender to signal the transport loop to shut down gracefully.
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    /// Timeout for the graceful shutdown.
    shutdown_timeout: Duration,
}

impl OmokClient {
    /// Start the transport loop and return a handle plus event receiver.
    ///
    /// The first outgoing messages are the configured join-by-reference
    /// `joinRoom`, if any, followed by `getRoomList`.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        transport: impl Transport,
        config: OmokConfig,
    ) -> (Self, mpsc::Receiver<OmokEvent>) {
        Self::spawn(transport, config, None)
    }

    /// Like [`start`](Self::start), drawing the board with `renderer` after
    /// every accepted snapshot and placement.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start_with_renderer(
        transport: impl Transport,
        config: OmokConfig,
        renderer: impl Renderer,
    ) -> (Self, mpsc::Receiver<OmokEvent>) {
        Self::spawn(transport, config, Some(Box::new(renderer)))
    }

    fn spawn(
        transport: impl Transport,
        config: OmokConfig,
        renderer: Option<Box<dyn Renderer>>,
    ) -> (Self, mpsc::Receiver<OmokEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientMessage>();
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<OmokEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let mut session = Session::new().with_hide_playing(config.hide_playing);
        if let Some(room_id) = config.join_room {
            match session.join_room(room_id, None) {
                // Cannot fail: the receiver is still in scope.
                Ok(msg) => {
                    let _ = cmd_tx.send(msg);
                }
                Err(e) => warn!("join-by-reference skipped: {e}"),
            }
        }
        let _ = cmd_tx.send(ClientMessage::GetRoomList);

        let state = Arc::new(ClientState {
            connected: AtomicBool::new(true),
            session: Mutex::new(session),
        });

        let task = tokio::spawn(transport_loop(
            transport,
            cmd_rx,
            event_tx,
            Arc::clone(&state),
            shutdown_rx,
            renderer,
            config.room_refresh_interval,
        ));

        let client = Self {
            cmd_tx,
            state,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };

        (client, event_rx)
    }

    // ── Intents ─────────────────────────────────────────────────────

    /// Ask for a fresh room list now.
    ///
    /// # Errors
    ///
    /// Returns [`OmokError::NotConnected`] if the transport has closed.
    pub async fn refresh_rooms(&self) -> Result<()> {
        self.dispatch(|session| session.request_room_list()).await
    }

    /// Create a room, then ask for the room list.
    ///
    /// The server may answer with an `init` that carries no room id; the
    /// refreshed directory is what names the new room.
    ///
    /// # Errors
    ///
    /// See [`Session::create_room`].
    pub async fn create_room(&self, params: CreateRoomParams) -> Result<()> {
        self.dispatch(|session| session.create_room(params)).await?;
        self.refresh_rooms().await
    }

    /// Join a room, with a password for protected rooms.
    ///
    /// # Errors
    ///
    /// See [`Session::join_room`].
    pub async fn join_room(
        &self,
        room_id: impl Into<RoomId>,
        password: Option<String>,
    ) -> Result<()> {
        let room_id = room_id.into();
        self.dispatch(|session| session.join_room(room_id, password))
            .await
    }

    /// Ask the server to start the game.
    ///
    /// # Errors
    ///
    /// See [`Session::start_game`].
    pub async fn start_game(&self) -> Result<()> {
        self.dispatch(Session::start_game).await
    }

    /// Place a stone at `(x, y)`.
    ///
    /// # Errors
    ///
    /// See [`Session::place`].
    pub async fn place(&self, x: usize, y: usize) -> Result<()> {
        self.dispatch(|session| session.place(x, y)).await
    }

    /// Return to the room directory. Local only.
    pub async fn leave_room(&self) {
        self.state.session.lock().await.leave_room();
    }

    pub async fn set_hide_playing(&self, hide_playing: bool) {
        self.state.session.lock().await.set_hide_playing(hide_playing);
    }

    /// Shut down the client, closing the transport and stopping the background task.
    ///
    /// After calling this method, the event receiver will yield `None` once the
    /// transport loop exits.
    pub async fn shutdown(&mut self) {
        debug!("OmokClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        // Abort the loop if it outlives the timeout so the task cannot detach.
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("transport loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("transport loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("transport loop aborted: {join_err}");
                    }
                }
            }
        }

        self.state.connected.store(false, Ordering::Release);
        self.state.session.lock().await.mark_disconnected();
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Returns `true` if the transport is believed to be connected.
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    pub async fn phase(&self) -> Phase {
        self.state.session.lock().await.phase()
    }

    /// Rooms from the latest snapshot, newest first.
    pub async fn list_rooms(&self, hide_playing: bool) -> Vec<Room> {
        self.state.session.lock().await.list_rooms(hide_playing)
    }

    /// A copy of the current game, if any.
    pub async fn game_snapshot(&self) -> Option<GameState> {
        self.state.session.lock().await.game().cloned()
    }

    pub async fn local_player_id(&self) -> Option<PlayerId> {
        self.state.session.lock().await.local_player_id()
    }

    pub async fn current_room_id(&self) -> Option<RoomId> {
        self.state
            .session
            .lock()
            .await
            .current_room_id()
            .map(ToString::to_string)
    }

    /// Desyncs recorded so far.
    pub async fn diagnostics(&self) -> Vec<DesyncError> {
        self.state.session.lock().await.diagnostics().to_vec()
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Validate an intent against the session and queue its message.
    async fn dispatch<F>(&self, intent: F) -> Result<()>
    where
        F: FnOnce(&mut Session) -> Result<ClientMessage>,
    {
        if !self.state.connected.load(Ordering::Acquire) {
            return Err(OmokError::NotConnected);
        }
        let msg = {
            let mut session = self.state.session.lock().await;
            intent(&mut session).inspect_err(|e| debug!("intent rejected: {e}"))?
        };
        self.cmd_tx
            .send(msg)
            .map_err(|_| OmokError::NotConnected)
    }
}

impl std::fmt::Debug for OmokClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OmokClient")
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for OmokClient {
    fn drop(&mut self) {
        // No executor is available here to drive `transport.close()`, so the
        // task is aborted instead of signalled.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Transport loop ──────────────────────────────────────────────────

/// Background loop multiplexing commands, shutdown, refresh ticks and inbound
/// messages via `tokio::select!`.
///
/// Exits when:
/// - The command channel closes (client handle dropped)
/// - Shutdown is signalled
/// - The transport returns `None` (server closed connection)
/// - A transport error occurs
async fn transport_loop(
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientMessage>,
    event_tx: mpsc::Sender<OmokEvent>,
    state: Arc<ClientState>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    mut renderer: Option<Box<dyn Renderer>>,
    refresh_interval: Option<Duration>,
) {
    debug!("transport loop started");

    emit_event(&event_tx, OmokEvent::Connected).await;

    let mut refresh = refresh_interval
        .filter(|period| !period.is_zero())
        .map(|period| {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

    loop {
        tokio::select! {
            // Branch 1: outgoing message from the client handle
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(msg) => {
                        if let Err(e) = send_message(&mut transport, &msg).await {
                            error!("transport send error: {e}");
                            emit_disconnected(
                                &event_tx,
                                &state,
                                Some(format!("transport send error: {e}")),
                            ).await;
                            break;
                        }
                    }
                    // Command channel closed — client handle dropped.
                    None => {
                        debug!("command channel closed, shutting down transport loop");
                        let _ = transport.close().await;
                        emit_disconnected(&event_tx, &state, Some("client shut down".into())).await;
                        break;
                    }
                }
            }

            // Branch 2: shutdown signal
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &state, Some("client shut down".into())).await;
                break;
            }

            // Branch 3: periodic room list refresh
            () = next_refresh(&mut refresh) => {
                if let Err(e) = send_message(&mut transport, &ClientMessage::GetRoomList).await {
                    error!("transport send error: {e}");
                    emit_disconnected(
                        &event_tx,
                        &state,
                        Some(format!("transport send error: {e}")),
                    ).await;
                    break;
                }
            }

            // Branch 4: incoming message from the server
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(server_msg) => {
                                let events = {
                                    let mut session = state.session.lock().await;
                                    let events = session.handle(server_msg);
                                    if let Some(renderer) = renderer.as_deref_mut() {
                                        if events.iter().any(OmokEvent::changes_board) {
                                            session.render(renderer);
                                        }
                                    }
                                    events
                                };
                                for event in events {
                                    emit_event(&event_tx, event).await;
                                }
                            }
                            Err(e) => {
                                warn!("ignoring unreadable server message: {e} (raw: {text})");
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        emit_disconnected(
                            &event_tx,
                            &state,
                            Some(format!("transport receive error: {e}")),
                        ).await;
                        break;
                    }
                    // Transport closed cleanly.
                    None => {
                        debug!("transport closed by server");
                        emit_disconnected(&event_tx, &state, None).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("transport loop exited");
}

/// Serialize and send one message. Only transport failures are returned;
/// serialization failures are logged and the message dropped.
async fn send_message(transport: &mut impl Transport, msg: &ClientMessage) -> Result<()> {
    debug!("sending client message: {:?}", std::mem::discriminant(msg));
    match serde_json::to_string(msg) {
        Ok(json) => transport.send(json).await,
        Err(e) => {
            error!("failed to serialize ClientMessage: {e}");
            Ok(())
        }
    }
}

/// Resolve on the next refresh tick, or never when refresh is disabled.
async fn next_refresh(refresh: &mut Option<Interval>) {
    match refresh {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Emit an event to the event channel. If the channel is full, log a warning
/// and drop the event to avoid blocking the transport loop.
async fn emit_event(event_tx: &mpsc::Sender<OmokEvent>, event: OmokEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Mark the session terminally disconnected and emit
/// [`Disconnected`](OmokEvent::Disconnected).
///
/// Uses `send().await` rather than `try_send` because `Disconnected` is the
/// last event on the channel and must not be dropped.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<OmokEvent>,
    state: &ClientState,
    reason: Option<String>,
) {
    state.connected.store(false, Ordering::Release);
    state.session.lock().await.mark_disconnected();
    let event = OmokEvent::Disconnected { reason };
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::protocol::InitPayload;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex as StdMutex;

    // ── Mock transport ──────────────────────────────────────────────

    /// Records sent messages and replays scripted responses.
    struct MockTransport {
        incoming: VecDeque<Option<std::result::Result<String, OmokError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        fn new(
            incoming: Vec<Option<std::result::Result<String, OmokError>>>,
        ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
            let sent = Arc::new(StdMutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let transport = Self {
                incoming: VecDeque::from(incoming),
                sent: Arc::clone(&sent),
                closed: Arc::clone(&closed),
            };
            (transport, sent, closed)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), OmokError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, OmokError>> {
            if let Some(item) = self.incoming.pop_front() {
                item
            } else {
                // Script exhausted: stay open until shutdown.
                std::future::pending().await
            }
        }

        async fn close(&mut self) -> std::result::Result<(), OmokError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    /// Renderer that records which players' boards it was asked to draw.
    struct RecordingRenderer {
        draws: Arc<StdMutex<Vec<(usize, usize, PlayerId)>>>,
    }

    impl Renderer for RecordingRenderer {
        fn draw(
            &mut self,
            board: &Board,
            size: usize,
            _last_move: &BTreeMap<PlayerId, (usize, usize)>,
            local_player_id: PlayerId,
        ) {
            self.draws
                .lock()
                .unwrap()
                .push((size, board.stones().count(), local_player_id));
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn init_json(local: PlayerId, started: bool) -> String {
        serde_json::to_string(&ServerMessage::Init(Box::new(InitPayload {
            player_id: local,
            board: vec![vec![0; 15]; 15],
            current_player: 1,
            max_players: 2,
            players: vec![1, 2],
            started,
            room_id: Some("r1".into()),
        })))
        .unwrap()
    }

    fn update_json(x: i64, y: i64, player_id: PlayerId, current_player: PlayerId) -> String {
        serde_json::to_string(&ServerMessage::Update {
            x,
            y,
            player_id,
            current_player,
            room_id: Some("r1".into()),
        })
        .unwrap()
    }

    fn quiet_config() -> OmokConfig {
        OmokConfig::new().with_room_refresh_interval(None)
    }

    fn sent_messages(sent: &Arc<StdMutex<Vec<String>>>) -> Vec<ClientMessage> {
        sent.lock()
            .unwrap()
            .iter()
            .map(|json| serde_json::from_str(json).unwrap())
            .collect()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn start_requests_room_list_first() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = OmokClient::start(transport, quiet_config());

        assert!(matches!(events.recv().await.unwrap(), OmokEvent::Connected));
        settle().await;
        assert_eq!(sent_messages(&sent), vec![ClientMessage::GetRoomList]);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn join_by_reference_goes_out_before_room_list() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let config = quiet_config().with_join_query("?room=shared-7");
        let (mut client, mut events) = OmokClient::start(transport, config);

        let _ = events.recv().await; // Connected
        settle().await;
        assert_eq!(
            sent_messages(&sent),
            vec![
                ClientMessage::JoinRoom {
                    room_id: "shared-7".into(),
                    password: None
                },
                ClientMessage::GetRoomList,
            ]
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn init_then_place_sends_place() {
        let (transport, sent, _closed) = MockTransport::new(vec![Some(Ok(init_json(1, true)))]);
        let (mut client, mut events) = OmokClient::start(transport, quiet_config());

        let _ = events.recv().await; // Connected
        let ev = events.recv().await.unwrap();
        assert!(matches!(ev, OmokEvent::GameInitialized { player_id: 1, .. }));
        assert_eq!(client.phase().await, Phase::Playing);

        client.place(7, 7).await.unwrap();
        settle().await;
        assert_eq!(
            sent_messages(&sent).last().unwrap(),
            &ClientMessage::Place {
                x: 7,
                y: 7,
                player_id: 1,
                room_id: Some("r1".into())
            }
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn rejected_place_sends_nothing() {
        let (transport, sent, _closed) = MockTransport::new(vec![Some(Ok(init_json(2, true)))]);
        let (mut client, mut events) = OmokClient::start(transport, quiet_config());

        let _ = events.recv().await; // Connected
        let _ = events.recv().await; // GameInitialized

        let err = client.place(0, 0).await.unwrap_err();
        assert!(matches!(
            err,
            OmokError::Validation(crate::error::ValidationError::NotYourTurn { .. })
        ));
        settle().await;
        assert_eq!(sent_messages(&sent), vec![ClientMessage::GetRoomList]);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn unreadable_messages_are_skipped() {
        let room_list = r#"{"type":"roomList","rooms":[]}"#.to_string();
        let (transport, _sent, _closed) = MockTransport::new(vec![
            Some(Ok("not json".into())),
            Some(Ok(r#"{"type":"teleport","x":1}"#.into())),
            Some(Ok(r#"{"type":"update","x":1}"#.into())),
            Some(Ok(room_list)),
        ]);
        let (mut client, mut events) = OmokClient::start(transport, quiet_config());

        let _ = events.recv().await; // Connected
        let ev = events.recv().await.unwrap();
        assert_eq!(ev, OmokEvent::RoomListUpdated { rooms: vec![] });
        assert!(client.is_connected());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn renderer_runs_after_board_changes_only() {
        let draws = Arc::new(StdMutex::new(Vec::new()));
        let renderer = RecordingRenderer {
            draws: Arc::clone(&draws),
        };
        let (transport, _sent, _closed) = MockTransport::new(vec![
            Some(Ok(init_json(2, true))),
            Some(Ok(r#"{"type":"gameStarted"}"#.into())),
            Some(Ok(update_json(3, 4, 1, 2))),
            Some(Ok(update_json(3, 4, 2, 1))),
        ]);
        let (mut client, mut events) =
            OmokClient::start_with_renderer(transport, quiet_config(), renderer);

        let _ = events.recv().await; // Connected
        let _ = events.recv().await; // GameInitialized
        let _ = events.recv().await; // GameStarted
        let _ = events.recv().await; // StonePlaced
        let ev = events.recv().await.unwrap();
        assert!(matches!(ev, OmokEvent::Desync(_)));

        assert_eq!(*draws.lock().unwrap(), vec![(15, 0, 2), (15, 1, 2)]);
        assert_eq!(client.diagnostics().await.len(), 1);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn refresh_interval_requests_room_list() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let config = OmokConfig::new().with_room_refresh_interval(Some(Duration::from_millis(20)));
        let (mut client, mut events) = OmokClient::start(transport, config);

        let _ = events.recv().await; // Connected
        tokio::time::sleep(Duration::from_millis(150)).await;
        let requests = sent_messages(&sent)
            .into_iter()
            .filter(|m| *m == ClientMessage::GetRoomList)
            .count();
        assert!(requests >= 3, "expected periodic requests, got {requests}");

        client.shutdown().await;
    }

    #[tokio::test]
    async fn disconnect_is_terminal() {
        let (transport, _sent, _closed) =
            MockTransport::new(vec![Some(Ok(init_json(1, true))), None]);
        let (mut client, mut events) = OmokClient::start(transport, quiet_config());

        let _ = events.recv().await; // Connected
        let _ = events.recv().await; // GameInitialized
        let ev = events.recv().await.unwrap();
        assert_eq!(ev, OmokEvent::Disconnected { reason: None });

        assert!(!client.is_connected());
        assert_eq!(client.phase().await, Phase::Disconnected);
        assert!(matches!(
            client.place(0, 0).await,
            Err(OmokError::NotConnected)
        ));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn transport_recv_error_emits_disconnected() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Err(
            OmokError::TransportReceive("boom".into()),
        ))]);
        let (mut client, mut events) = OmokClient::start(transport, quiet_config());

        let _ = events.recv().await; // Connected
        let ev = events.recv().await.unwrap();
        let OmokEvent::Disconnected { reason } = ev else {
            panic!("expected Disconnected, got {ev:?}");
        };
        assert!(reason.unwrap().contains("boom"));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_closes_transport_and_emits_disconnected() {
        let (transport, _sent, closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = OmokClient::start(transport, quiet_config());

        let _ = events.recv().await; // Connected
        client.shutdown().await;

        let ev = events.recv().await.unwrap();
        assert_eq!(
            ev,
            OmokEvent::Disconnected {
                reason: Some("client shut down".into())
            }
        );
        assert!(closed.load(Ordering::Relaxed));
        assert!(matches!(
            client.refresh_rooms().await,
            Err(OmokError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn double_shutdown_does_not_panic() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = OmokClient::start(transport, quiet_config());
        let _ = events.recv().await; // Connected
        client.shutdown().await;
        client.shutdown().await;
    }

    #[tokio::test]
    async fn drop_without_explicit_shutdown() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (client, mut events) = OmokClient::start(transport, quiet_config());
        let _ = events.recv().await; // Connected
        drop(client);
        while let Some(_event) = events.recv().await {}
    }

    /// Transport whose `close()` never returns.
    struct HangingCloseTransport {
        close_called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for HangingCloseTransport {
        async fn send(&mut self, _message: String) -> std::result::Result<(), OmokError> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, OmokError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), OmokError> {
            self.close_called.store(true, Ordering::Release);
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn shutdown_timeout_aborts_stuck_transport_task() {
        let close_called = Arc::new(AtomicBool::new(false));
        let transport = HangingCloseTransport {
            close_called: Arc::clone(&close_called),
        };
        let config = quiet_config().with_shutdown_timeout(Duration::from_millis(20));
        let (mut client, mut events) = OmokClient::start(transport, config);

        let _ = events.recv().await; // Connected
        client.shutdown().await;

        assert!(close_called.load(Ordering::Acquire));
        assert!(!client.is_connected());
        assert_eq!(client.phase().await, Phase::Disconnected);
    }

    #[test]
    fn disabled_refresh_never_fires() {
        let mut refresh = None;
        let mut tick = tokio_test::task::spawn(next_refresh(&mut refresh));
        tokio_test::assert_pending!(tick.poll());
        tokio_test::assert_pending!(tick.poll());
    }

    #[tokio::test]
    async fn zero_refresh_interval_disables_refresh() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let config = OmokConfig::new().with_room_refresh_interval(Some(Duration::ZERO));
        let (mut client, mut events) = OmokClient::start(transport, config);

        let _ = events.recv().await; // Connected
        settle().await;
        assert_eq!(sent_messages(&sent), vec![ClientMessage::GetRoomList]);

        client.shutdown().await;
    }

    #[test]
    fn config_defaults() {
        let config = OmokConfig::new();
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.room_refresh_interval, Some(Duration::from_secs(5)));
        assert!(!config.hide_playing);
        assert!(config.join_room.is_none());
    }

    #[test]
    fn event_channel_capacity_is_clamped_to_one() {
        let config = OmokConfig::new().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[test]
    fn room_id_from_query_variants() {
        assert_eq!(room_id_from_query("?room=abc").as_deref(), Some("abc"));
        assert_eq!(room_id_from_query("a=1&room=9&room=10").as_deref(), Some("9"));
        assert_eq!(room_id_from_query("?rooms=abc"), None);
        assert_eq!(room_id_from_query("?room"), None);
        assert_eq!(room_id_from_query(""), None);
    }

    #[test]
    fn room_id_from_query_decodes_percent_and_plus() {
        assert_eq!(
            room_id_from_query("?room=%EB%B0%A9%201").as_deref(),
            Some("방 1")
        );
        assert_eq!(room_id_from_query("room=a+b&x=1").as_deref(), Some("a b"));
        assert_eq!(room_id_from_query("room=a%26b").as_deref(), Some("a&b"));
        assert_eq!(room_id_from_query("r%6Fom=7").as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn debug_impl_for_client() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = OmokClient::start(transport, quiet_config());
        let _ = events.recv().await; // Connected
        let debug_str = format!("{client:?}");
        assert!(debug_str.contains("OmokClient"));
        assert!(debug_str.contains("connected"));
        client.shutdown().await;
    }
}
