//! Wire-compatible protocol types for the omok room protocol.
//!
//! Every message is a JSON object with a `type` discriminator and camelCase
//! fields. Deserialization is lenient in the places where the deployed server
//! is known to vary:
//!
//! - room ids may arrive as strings or numbers
//! - player ids inside `init`/`update` may arrive as numeric strings
//! - room status may use the Korean labels `"대기중"` / `"게임중"`
//! - `passwordProtected` may arrive as a `password` bool or string
//! - `started` may arrive as `isGameStarted`
//!
//! Board cells are plain integers on the wire, `0` meaning empty.

use serde::{Deserialize, Serialize};

// ── Type aliases ────────────────────────────────────────────────────

/// Player number assigned by the server at join time. Always positive.
pub type PlayerId = u32;

/// Opaque room identifier chosen by the server.
pub type RoomId = String;

/// Wire value of an empty board cell.
pub const EMPTY_CELL: PlayerId = 0;

// ── Rooms ───────────────────────────────────────────────────────────

/// Whether a room is still gathering players or already playing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    #[serde(alias = "대기중")]
    Waiting,
    #[serde(alias = "게임중")]
    Playing,
}

/// One entry of a `roomList` snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(deserialize_with = "de::room_id")]
    pub room_id: RoomId,
    pub name: String,
    #[serde(default, alias = "password", deserialize_with = "de::password_flag")]
    pub password_protected: bool,
    pub max_players: u32,
    pub size: u32,
    #[serde(default, alias = "players")]
    pub player_count: u32,
    #[serde(default)]
    pub status: RoomStatus,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_at: u64,
}

// ── Payload structs ─────────────────────────────────────────────────

/// Full game snapshot sent when the client enters a room.
/// Boxed in `ServerMessage` to reduce enum size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
    /// The receiving client's own player number.
    #[serde(deserialize_with = "de::player_id")]
    pub player_id: PlayerId,
    /// Row-major grid, `board[y][x]`, with [`EMPTY_CELL`] for empty cells.
    pub board: Vec<Vec<PlayerId>>,
    #[serde(deserialize_with = "de::player_id")]
    pub current_player: PlayerId,
    pub max_players: u32,
    /// Roster in turn order; `players[0]` is the host.
    pub players: Vec<PlayerId>,
    #[serde(default, alias = "isGameStarted")]
    pub started: bool,
    #[serde(
        default,
        deserialize_with = "de::optional_room_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub room_id: Option<RoomId>,
}

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Ask for a fresh `roomList`.
    GetRoomList,
    /// Create a room. Ranges of `max_players` and `size` are the server's call.
    CreateRoom {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        max_players: u32,
        size: u32,
    },
    /// Join an existing room.
    JoinRoom {
        room_id: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    /// Host asks the server to start the game.
    ///
    /// `room_id` is `null` while the id of a room the client created itself
    /// is still unknown; the server then scopes the request to the sender.
    StartGame {
        #[serde(default)]
        room_id: Option<RoomId>,
    },
    /// Place a stone at `(x, y)`. `room_id` as for [`StartGame`](Self::StartGame).
    Place {
        x: usize,
        y: usize,
        player_id: PlayerId,
        #[serde(default)]
        room_id: Option<RoomId>,
    },
}

/// Message types sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Snapshot of every room the server knows about.
    RoomList { rooms: Vec<Room> },
    /// Full game snapshot for the room just entered (boxed to reduce enum size).
    Init(Box<InitPayload>),
    /// One stone placed. Coordinates are signed so that a negative value
    /// decodes and is reported as a desync instead of a parse failure.
    Update {
        x: i64,
        y: i64,
        #[serde(deserialize_with = "de::player_id")]
        player_id: PlayerId,
        #[serde(deserialize_with = "de::player_id")]
        current_player: PlayerId,
        #[serde(
            default,
            deserialize_with = "de::optional_room_id",
            skip_serializing_if = "Option::is_none"
        )]
        room_id: Option<RoomId>,
    },
    /// The host's start request was accepted.
    GameStarted {
        #[serde(
            default,
            deserialize_with = "de::optional_room_id",
            skip_serializing_if = "Option::is_none"
        )]
        room_id: Option<RoomId>,
    },
    /// The server declared a winner.
    Win {
        #[serde(deserialize_with = "de::player_id")]
        winner: PlayerId,
        #[serde(
            default,
            deserialize_with = "de::optional_room_id",
            skip_serializing_if = "Option::is_none"
        )]
        room_id: Option<RoomId>,
    },
    /// The password supplied with `joinRoom` was rejected.
    InvalidPassword,
}

impl ServerMessage {
    /// The room this message is scoped to, when the server names one.
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::Init(payload) => payload.room_id.as_deref(),
            Self::Update { room_id, .. }
            | Self::GameStarted { room_id }
            | Self::Win { room_id, .. } => room_id.as_deref(),
            Self::RoomList { .. } | Self::InvalidPassword => None,
        }
    }
}

// ── Lenient field decoders ──────────────────────────────────────────

mod de {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    use super::{PlayerId, RoomId};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u64),
        Text(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PasswordField {
        Flag(bool),
        Text(String),
    }

    pub(super) fn player_id<'de, D>(deserializer: D) -> Result<PlayerId, D::Error>
    where
        D: Deserializer<'de>,
    {
        match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Number(n) => PlayerId::try_from(n)
                .map_err(|_| D::Error::custom(format!("player id {n} out of range"))),
            NumberOrText::Text(text) => text.trim().parse().map_err(D::Error::custom),
        }
    }

    pub(super) fn room_id<'de, D>(deserializer: D) -> Result<RoomId, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Number(n) => n.to_string(),
            NumberOrText::Text(text) => text,
        })
    }

    pub(super) fn optional_room_id<'de, D>(deserializer: D) -> Result<Option<RoomId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(
            Option::<NumberOrText>::deserialize(deserializer)?.map(|raw| match raw {
                NumberOrText::Number(n) => n.to_string(),
                NumberOrText::Text(text) => text,
            }),
        )
    }

    pub(super) fn password_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<PasswordField>::deserialize(deserializer)? {
            None => false,
            Some(PasswordField::Flag(flag)) => flag,
            Some(PasswordField::Text(text)) => !text.is_empty(),
        })
    }
}
