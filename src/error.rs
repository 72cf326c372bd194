//! Error types for the omok client.
//!
//! [`OmokError`] is the crate-wide error. Two narrower enums sit beside it:
//! [`ValidationError`] for intents rejected locally before anything is sent,
//! and [`DesyncError`] for inbound updates that contradict the local board.

use thiserror::Error;

use crate::protocol::{PlayerId, RoomId};

/// Errors that can occur when using the omok client.
#[derive(Debug, Error)]
pub enum OmokError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The connection is gone. Connection loss is terminal for a session.
    #[error("not connected to server")]
    NotConnected,

    /// An intent was rejected locally; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An inbound message was well-formed JSON but not a usable snapshot.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A user intent that fails local checks. Never sent over the channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("room name must not be empty")]
    EmptyRoomName,

    #[error("room {room_id} is password protected")]
    PasswordRequired { room_id: RoomId },

    #[error("no game is active")]
    NotInGame,

    #[error("the game has not started")]
    GameNotStarted,

    #[error("it is player {current_player}'s turn")]
    NotYourTurn { current_player: PlayerId },

    #[error("cell ({x}, {y}) is outside the {size}x{size} board")]
    OutOfRange { x: usize, y: usize, size: usize },

    #[error("cell ({x}, {y}) is already occupied")]
    Occupied { x: usize, y: usize },

    #[error("only the host can start the game")]
    NotHost,

    #[error("room has {players} of {max_players} players")]
    RoomNotFull { players: usize, max_players: u32 },

    #[error("the game has already started")]
    AlreadyStarted,

    #[error("a start request is already pending")]
    StartPending,
}

/// An inbound `update` that cannot be applied to the local board.
///
/// The mutation is skipped and the session keeps its last consistent state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DesyncError {
    #[error("update at ({x}, {y}) is outside the {size}x{size} board")]
    OutOfRange { x: i64, y: i64, size: usize },

    #[error("update at ({x}, {y}) targets a cell held by player {occupant}")]
    Occupied {
        x: usize,
        y: usize,
        occupant: PlayerId,
    },

    #[error("update references player {player_id} who is not in the roster")]
    UnknownPlayer { player_id: PlayerId },
}

/// A specialized [`Result`] type for omok client operations.
pub type Result<T> = std::result::Result<T, OmokError>;
