//! Events emitted by [`OmokClient`](crate::client::OmokClient).

use crate::error::DesyncError;
use crate::protocol::{PlayerId, Room, RoomId};

/// Everything the client reports to the application, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OmokEvent {
    /// The transport loop is running. Always the first event.
    Connected,

    /// A new room list arrived; already sorted and filtered.
    RoomListUpdated { rooms: Vec<Room> },

    /// The client entered a room and received a full snapshot.
    GameInitialized {
        room_id: Option<RoomId>,
        player_id: PlayerId,
        size: usize,
        players: Vec<PlayerId>,
        current_player: PlayerId,
        started: bool,
        /// Whether the local player may start the game now.
        start_available: bool,
    },

    /// The server confirmed a placement.
    StonePlaced {
        x: usize,
        y: usize,
        player_id: PlayerId,
        current_player: PlayerId,
        /// Advisory result of the local five-in-a-row check.
        local_win: bool,
    },

    /// The game started.
    GameStarted,

    /// The server declared a winner.
    GameWon {
        winner: PlayerId,
        /// Whether the local board also shows five in a row for `winner`.
        confirmed_locally: bool,
    },

    /// The join password was rejected; still in the room directory.
    InvalidPassword,

    /// An `init` snapshot could not be applied; the previous state stands.
    SnapshotRejected { reason: String },

    /// An update contradicted the local board and was skipped.
    Desync(DesyncError),

    /// The connection is gone. Always the last event.
    Disconnected { reason: Option<String> },
}

impl OmokEvent {
    /// Whether the board changed and should be redrawn.
    pub fn changes_board(&self) -> bool {
        matches!(self, Self::GameInitialized { .. } | Self::StonePlaced { .. })
    }
}
