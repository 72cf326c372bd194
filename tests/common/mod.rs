#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for omok client integration tests.
//!
//! Two transports:
//! - [`MockTransport`] replays a fixed script as fast as the client reads it.
//! - [`ChannelTransport`] is driven live by a [`FakeServer`] so a test can
//!   interleave client intents with server replies.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use omok_client::protocol::{
    ClientMessage, InitPayload, PlayerId, Room, RoomStatus, ServerMessage,
};
use omok_client::{OmokError, Transport};
use tokio::sync::mpsc;

// ── MockTransport ───────────────────────────────────────────────────

/// Scripted server responses are consumed in order by `recv()`.
/// All messages sent by the client are recorded in `sent`.
pub struct MockTransport {
    incoming: VecDeque<Option<Result<String, OmokError>>>,
    pub sent: Arc<StdMutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new(
        incoming: Vec<Option<Result<String, OmokError>>>,
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
    async fn send(&mut self, message: String) -> Result<(), OmokError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, OmokError>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else {
            // Script exhausted: stay open until shutdown.
            std::future::pending().await
        }
    }

    async fn close(&mut self) -> Result<(), OmokError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── ChannelTransport / FakeServer ───────────────────────────────────

/// Client side of an in-memory connection.
pub struct ChannelTransport {
    to_server: mpsc::UnboundedSender<String>,
    from_server: mpsc::UnboundedReceiver<String>,
}

/// Server side of an in-memory connection. Dropping it closes the connection.
pub struct FakeServer {
    to_client: Option<mpsc::UnboundedSender<String>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

pub fn channel_pair() -> (ChannelTransport, FakeServer) {
    let (to_server, from_client) = mpsc::unbounded_channel();
    let (to_client, from_server) = mpsc::unbounded_channel();
    (
        ChannelTransport {
            to_server,
            from_server,
        },
        FakeServer {
            to_client: Some(to_client),
            from_client,
        },
    )
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, message: String) -> Result<(), OmokError> {
        self.to_server
            .send(message)
            .map_err(|_| OmokError::TransportClosed)
    }

    async fn recv(&mut self) -> Option<Result<String, OmokError>> {
        self.from_server.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), OmokError> {
        self.from_server.close();
        Ok(())
    }
}

impl FakeServer {
    pub fn push(&self, json: String) {
        if let Some(tx) = &self.to_client {
            tx.send(json).unwrap();
        }
    }

    /// Next message from the client, failing the test after one second.
    pub async fn expect(&mut self) -> ClientMessage {
        let raw = tokio::time::timeout(Duration::from_secs(1), self.from_client.recv())
            .await
            .expect("timed out waiting for a client message")
            .expect("client hung up");
        serde_json::from_str(&raw).expect("client sent unreadable JSON")
    }

    /// Assert nothing else arrives within a short window.
    pub async fn expect_silence(&mut self) {
        let res = tokio::time::timeout(Duration::from_millis(100), self.from_client.recv()).await;
        if let Ok(Some(raw)) = res {
            panic!("unexpected client message: {raw}");
        }
    }

    pub fn hang_up(&mut self) {
        self.to_client = None;
    }
}

// ── JSON helper functions ───────────────────────────────────────────

pub fn room(room_id: &str, name: &str, players: u32, status: RoomStatus, created_at: u64) -> Room {
    Room {
        room_id: room_id.into(),
        name: name.into(),
        password_protected: false,
        max_players: 2,
        size: 15,
        player_count: players,
        status,
        created_at,
    }
}

pub fn room_list_json(rooms: Vec<Room>) -> String {
    serde_json::to_string(&ServerMessage::RoomList { rooms }).expect("room_list_json serialization")
}

/// `init` for an empty `size`×`size` board.
pub fn init_json(
    room_id: Option<&str>,
    local: PlayerId,
    players: Vec<PlayerId>,
    size: usize,
    started: bool,
) -> String {
    init_json_with_board(room_id, local, players, vec![vec![0; size]; size], 1, started)
}

pub fn init_json_with_board(
    room_id: Option<&str>,
    local: PlayerId,
    players: Vec<PlayerId>,
    board: Vec<Vec<PlayerId>>,
    current_player: PlayerId,
    started: bool,
) -> String {
    let max_players = u32::try_from(players.len()).unwrap().max(2);
    serde_json::to_string(&ServerMessage::Init(Box::new(InitPayload {
        player_id: local,
        board,
        current_player,
        max_players,
        players,
        started,
        room_id: room_id.map(Into::into),
    })))
    .expect("init_json serialization")
}

pub fn update_json(
    room_id: &str,
    x: i64,
    y: i64,
    player_id: PlayerId,
    current_player: PlayerId,
) -> String {
    serde_json::to_string(&ServerMessage::Update {
        x,
        y,
        player_id,
        current_player,
        room_id: Some(room_id.into()),
    })
    .expect("update_json serialization")
}

pub fn game_started_json() -> String {
    serde_json::to_string(&ServerMessage::GameStarted { room_id: None })
        .expect("game_started_json serialization")
}

pub fn win_json(winner: PlayerId) -> String {
    serde_json::to_string(&ServerMessage::Win {
        winner,
        room_id: None,
    })
    .expect("win_json serialization")
}

pub fn invalid_password_json() -> String {
    serde_json::to_string(&ServerMessage::InvalidPassword)
        .expect("invalid_password_json serialization")
}
