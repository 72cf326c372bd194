//! Room lifecycle and message application.
//!
//! [`Session`] is the only mutable state of a client: the room directory, the
//! active [`GameState`], and the bookkeeping around joining and starting.
//! Intent methods validate locally and return the [`ClientMessage`] to send;
//! [`Session::handle`] applies one inbound [`ServerMessage`] and returns the
//! resulting events. Neither side touches the network.
//!
//! Lifecycle: `Directory` → (`joinRoom` or `createRoom`, then `init`) →
//! `Waiting` → (`gameStarted`) → `Playing`. `leave_room` returns to
//! `Directory`; connection loss ends in `Disconnected`.

use tracing::{debug, warn};

use crate::directory::RoomDirectory;
use crate::error::{DesyncError, OmokError, Result, ValidationError};
use crate::event::OmokEvent;
use crate::game::GameState;
use crate::protocol::{ClientMessage, InitPayload, PlayerId, Room, RoomId, ServerMessage};
use crate::render::Renderer;
use crate::rules;
use crate::win::check_win;

/// Default `maxPlayers` for new rooms.
pub const DEFAULT_MAX_PLAYERS: u32 = 2;

/// Default board dimension for new rooms.
pub const DEFAULT_BOARD_SIZE: u32 = 19;

// ── CreateRoomParams ────────────────────────────────────────────────

/// Parameters for creating a room.
///
/// # Example
///
/// ```
/// use omok_client::session::CreateRoomParams;
///
/// let params = CreateRoomParams::new("friday night")
///     .with_password("hunter2")
///     .with_max_players(3)
///     .with_size(15);
/// assert_eq!(params.max_players, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoomParams {
    pub name: String,
    pub password: Option<String>,
    /// Passed through unchecked; the server owns the valid range.
    pub max_players: u32,
    /// Passed through unchecked; the server owns the valid range.
    pub size: u32,
}

impl CreateRoomParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: None,
            max_players: DEFAULT_MAX_PLAYERS,
            size: DEFAULT_BOARD_SIZE,
        }
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_max_players(mut self, max_players: u32) -> Self {
        self.max_players = max_players;
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }
}

// ── Phase ───────────────────────────────────────────────────────────

/// Where the session is in the room lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Browsing rooms, possibly with a join in flight.
    Directory,
    /// In a room, game not started.
    Waiting,
    /// In a room, game running.
    Playing,
    /// Connection lost. Terminal.
    Disconnected,
}

// ── Session ─────────────────────────────────────────────────────────

/// A `createRoom` whose room id the server has not told us yet.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingCreate {
    name: String,
    /// Rooms that already had this name when the request went out.
    existing: Vec<RoomId>,
}

impl PendingCreate {
    fn matches(&self, room: &Room) -> bool {
        room.name == self.name && !self.existing.contains(&room.room_id)
    }
}

#[derive(Debug, Default)]
pub struct Session {
    directory: RoomDirectory,
    game: Option<GameState>,
    local_player_id: Option<PlayerId>,
    current_room: Option<RoomId>,
    pending_join: Option<RoomId>,
    pending_create: Option<PendingCreate>,
    start_requested: bool,
    hide_playing: bool,
    disconnected: bool,
    diagnostics: Vec<DesyncError>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter playing rooms out of [`OmokEvent::RoomListUpdated`].
    #[must_use]
    pub fn with_hide_playing(mut self, hide_playing: bool) -> Self {
        self.hide_playing = hide_playing;
        self
    }

    pub fn set_hide_playing(&mut self, hide_playing: bool) {
        self.hide_playing = hide_playing;
    }

    pub fn phase(&self) -> Phase {
        if self.disconnected {
            return Phase::Disconnected;
        }
        match &self.game {
            None => Phase::Directory,
            Some(game) if game.started() => Phase::Playing,
            Some(_) => Phase::Waiting,
        }
    }

    // ── Intents ─────────────────────────────────────────────────────

    /// `getRoomList`.
    ///
    /// # Errors
    ///
    /// Returns [`OmokError::NotConnected`] after connection loss.
    pub fn request_room_list(&self) -> Result<ClientMessage> {
        self.ensure_connected()?;
        Ok(ClientMessage::GetRoomList)
    }

    /// `createRoom`. Name and password are trimmed; an empty password is
    /// sent as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyRoomName`] for a blank name.
    pub fn create_room(&mut self, params: CreateRoomParams) -> Result<ClientMessage> {
        self.ensure_connected()?;
        let name = params.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyRoomName.into());
        }
        debug!(name, "requesting room creation");
        self.pending_join = None;
        self.pending_create = Some(PendingCreate {
            name: name.to_string(),
            existing: self
                .directory
                .list_rooms(false)
                .into_iter()
                .filter(|room| room.name == name)
                .map(|room| room.room_id)
                .collect(),
        });
        Ok(ClientMessage::CreateRoom {
            name: name.to_string(),
            password: normalize_password(params.password),
            max_players: params.max_players,
            size: params.size,
        })
    }

    /// `joinRoom`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PasswordRequired`] if the directory lists
    /// the room as protected and no password was given.
    pub fn join_room(
        &mut self,
        room_id: impl Into<RoomId>,
        password: Option<String>,
    ) -> Result<ClientMessage> {
        self.ensure_connected()?;
        let room_id = room_id.into();
        let password = normalize_password(password);
        let protected = self
            .directory
            .find(&room_id)
            .is_some_and(|room| room.password_protected);
        if protected && password.is_none() {
            return Err(ValidationError::PasswordRequired { room_id }.into());
        }
        debug!(room_id = %room_id, "requesting join");
        self.pending_create = None;
        self.pending_join = Some(room_id.clone());
        Ok(ClientMessage::JoinRoom { room_id, password })
    }

    /// `startGame`. Only the host of a full, unstarted room may start, and
    /// only once until the server answers.
    ///
    /// The room id is left out while the id of a just-created room is still
    /// unresolved.
    ///
    /// # Errors
    ///
    /// A [`ValidationError`] naming the failed condition.
    pub fn start_game(&mut self) -> Result<ClientMessage> {
        self.ensure_connected()?;
        let (game, local) = self.active_game()?;
        if game.started() {
            return Err(ValidationError::AlreadyStarted.into());
        }
        if game.host() != Some(local) {
            return Err(ValidationError::NotHost.into());
        }
        if !game.is_full() {
            return Err(ValidationError::RoomNotFull {
                players: game.players().len(),
                max_players: game.max_players(),
            }
            .into());
        }
        if self.start_requested {
            return Err(ValidationError::StartPending.into());
        }
        let room_id = self.current_room.clone();
        self.start_requested = true;
        debug!(room_id = ?room_id, "requesting game start");
        Ok(ClientMessage::StartGame { room_id })
    }

    /// `place`, if the local gate allows it.
    ///
    /// # Errors
    ///
    /// The [`ValidationError`] from [`rules::check_placement`].
    pub fn place(&self, x: usize, y: usize) -> Result<ClientMessage> {
        self.ensure_connected()?;
        let (game, local) = self.active_game()?;
        rules::check_placement(game, x, y, local)?;
        Ok(ClientMessage::Place {
            x,
            y,
            player_id: local,
            room_id: self.current_room.clone(),
        })
    }

    /// Drop the game and go back to the directory. Nothing is sent.
    pub fn leave_room(&mut self) {
        debug!(room_id = ?self.current_room, "leaving room");
        self.game = None;
        self.local_player_id = None;
        self.current_room = None;
        self.pending_join = None;
        self.pending_create = None;
        self.start_requested = false;
    }

    /// Enter the terminal disconnected phase.
    pub fn mark_disconnected(&mut self) {
        self.disconnected = true;
    }

    // ── Inbound ─────────────────────────────────────────────────────

    /// Apply one server message.
    ///
    /// Messages scoped to a room other than the current one are dropped, as
    /// are game messages while no game is active. In a created room whose id
    /// is still unknown, scoped messages pass only once the directory shows
    /// that room. Bad snapshots and desyncs are reported as events and never
    /// abort the session.
    pub fn handle(&mut self, msg: ServerMessage) -> Vec<OmokEvent> {
        if self.disconnected {
            debug!("ignoring message after disconnect");
            return Vec::new();
        }
        if !matches!(msg, ServerMessage::Init(_)) {
            if let Some(room_id) = msg.room_id() {
                if !self.accepts_room(room_id) {
                    warn!(
                        room_id,
                        current = ?self.current_room,
                        "ignoring message for another room"
                    );
                    return Vec::new();
                }
            }
        }

        match msg {
            ServerMessage::RoomList { rooms } => self.apply_room_list(rooms),
            ServerMessage::Init(payload) => self.apply_init(*payload),
            ServerMessage::Update {
                x,
                y,
                player_id,
                current_player,
                ..
            } => self.apply_update(x, y, player_id, current_player),
            ServerMessage::GameStarted { .. } => self.apply_game_started(),
            ServerMessage::Win { winner, .. } => self.apply_win(winner),
            ServerMessage::InvalidPassword => {
                debug!(room_id = ?self.pending_join, "join password rejected");
                self.pending_join = None;
                vec![OmokEvent::InvalidPassword]
            }
        }
    }

    /// Hand the current board to `renderer`, if a game is active.
    pub fn render(&self, renderer: &mut dyn Renderer) {
        if let (Some(game), Some(local)) = (&self.game, self.local_player_id) {
            renderer.draw(game.board(), game.size(), game.last_moves(), local);
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    pub fn list_rooms(&self, hide_playing: bool) -> Vec<Room> {
        self.directory.list_rooms(hide_playing)
    }

    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    pub fn local_player_id(&self) -> Option<PlayerId> {
        self.local_player_id
    }

    pub fn current_room_id(&self) -> Option<&str> {
        self.current_room.as_deref()
    }

    /// Room id of a join awaiting its `init` or `invalidPassword`.
    pub fn pending_join(&self) -> Option<&str> {
        self.pending_join.as_deref()
    }

    pub fn start_requested(&self) -> bool {
        self.start_requested
    }

    /// Every desync recorded since the session began.
    pub fn diagnostics(&self) -> &[DesyncError] {
        &self.diagnostics
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn ensure_connected(&self) -> Result<()> {
        if self.disconnected {
            Err(OmokError::NotConnected)
        } else {
            Ok(())
        }
    }

    fn active_game(&self) -> Result<(&GameState, PlayerId)> {
        match (&self.game, self.local_player_id) {
            (Some(game), Some(local)) => Ok((game, local)),
            _ => Err(ValidationError::NotInGame.into()),
        }
    }

    /// Whether a message scoped to `room_id` belongs to the current room.
    ///
    /// While in a created room with an unresolved id, the scope is adopted if
    /// the directory shows it as that room; anything else is foreign.
    fn accepts_room(&mut self, room_id: &str) -> bool {
        if let Some(current) = self.current_room.as_deref() {
            return current == room_id;
        }
        if self.game.is_none() {
            return true;
        }
        let created = self.pending_create.as_ref().is_some_and(|pending| {
            self.directory
                .find(room_id)
                .is_some_and(|room| pending.matches(room))
        });
        if created {
            self.adopt_room(room_id.to_string());
        }
        created
    }

    /// Newest room in the directory that can be the pending creation.
    fn created_room_id(&self) -> Option<RoomId> {
        let pending = self.pending_create.as_ref()?;
        self.directory
            .list_rooms(false)
            .into_iter()
            .find(|room| pending.matches(room))
            .map(|room| room.room_id)
    }

    fn adopt_room(&mut self, room_id: RoomId) {
        debug!(room_id = %room_id, "resolved id of created room");
        self.current_room = Some(room_id);
        self.pending_create = None;
    }

    fn apply_room_list(&mut self, rooms: Vec<Room>) -> Vec<OmokEvent> {
        debug!(count = rooms.len(), "room list updated");
        self.directory.replace(rooms);
        if self.game.is_some() && self.current_room.is_none() {
            if let Some(room_id) = self.created_room_id() {
                self.adopt_room(room_id);
            }
        }
        vec![OmokEvent::RoomListUpdated {
            rooms: self.directory.list_rooms(self.hide_playing),
        }]
    }

    fn apply_init(&mut self, payload: InitPayload) -> Vec<OmokEvent> {
        let state = match GameState::from_init(&payload) {
            Ok(state) => state,
            Err(e) => {
                warn!("ignoring init snapshot: {e}");
                return vec![OmokEvent::SnapshotRejected {
                    reason: e.to_string(),
                }];
            }
        };
        if !state.players().contains(&payload.player_id) {
            warn!(
                player_id = payload.player_id,
                "ignoring init snapshot: local player is not in the roster"
            );
            return vec![OmokEvent::SnapshotRejected {
                reason: format!("player {} is not in the roster", payload.player_id),
            }];
        }

        let room_id = payload
            .room_id
            .or_else(|| self.pending_join.take())
            .or_else(|| self.created_room_id());
        self.pending_join = None;
        if room_id.is_some() {
            self.pending_create = None;
        }
        self.start_requested = false;
        self.local_player_id = Some(payload.player_id);
        self.current_room = room_id.clone();
        debug!(
            room_id = ?room_id,
            player_id = payload.player_id,
            size = state.size(),
            "game initialized"
        );

        let event = OmokEvent::GameInitialized {
            room_id,
            player_id: payload.player_id,
            size: state.size(),
            players: state.players().to_vec(),
            current_player: state.current_player(),
            started: state.started(),
            start_available: state.start_available(payload.player_id),
        };
        self.game = Some(state);
        vec![event]
    }

    fn apply_update(
        &mut self,
        x: i64,
        y: i64,
        player_id: PlayerId,
        current_player: PlayerId,
    ) -> Vec<OmokEvent> {
        let Some(game) = self.game.as_mut() else {
            warn!(x, y, player_id, "ignoring update with no active game");
            return Vec::new();
        };
        match game.apply_update(x, y, player_id, current_player) {
            Ok(placement) => {
                let local_win = check_win(game.board(), placement.x, placement.y, player_id);
                debug!(x, y, player_id, current_player, local_win, "stone placed");
                vec![OmokEvent::StonePlaced {
                    x: placement.x,
                    y: placement.y,
                    player_id,
                    current_player,
                    local_win,
                }]
            }
            Err(desync) => {
                warn!("skipping update: {desync}");
                self.diagnostics.push(desync.clone());
                vec![OmokEvent::Desync(desync)]
            }
        }
    }

    fn apply_game_started(&mut self) -> Vec<OmokEvent> {
        let Some(game) = self.game.as_mut() else {
            warn!("ignoring gameStarted with no active game");
            return Vec::new();
        };
        game.apply_game_started();
        debug!("game started");
        vec![OmokEvent::GameStarted]
    }

    fn apply_win(&mut self, winner: PlayerId) -> Vec<OmokEvent> {
        let Some(game) = self.game.as_ref() else {
            warn!(winner, "ignoring win with no active game");
            return Vec::new();
        };
        let board = game.board();
        let confirmed_locally = board
            .stones()
            .any(|(x, y, player)| player == winner && check_win(board, x, y, winner));
        if !confirmed_locally {
            warn!(winner, "server declared a winner the local board does not show");
        }
        vec![OmokEvent::GameWon {
            winner,
            confirmed_locally,
        }]
    }
}

fn normalize_password(password: Option<String>) -> Option<String> {
    password
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::RoomStatus;

    fn init_msg(room: Option<&str>, local: PlayerId, players: Vec<PlayerId>, started: bool) -> ServerMessage {
        ServerMessage::Init(Box::new(InitPayload {
            player_id: local,
            board: vec![vec![0; 15]; 15],
            current_player: players[0],
            max_players: 2,
            players,
            started,
            room_id: room.map(Into::into),
        }))
    }

    fn update(x: i64, y: i64, player_id: PlayerId, current_player: PlayerId) -> ServerMessage {
        ServerMessage::Update {
            x,
            y,
            player_id,
            current_player,
            room_id: None,
        }
    }

    fn protected_room(id: &str) -> Room {
        Room {
            room_id: id.into(),
            name: "secret".into(),
            password_protected: true,
            max_players: 2,
            size: 15,
            player_count: 1,
            status: RoomStatus::Waiting,
            created_at: 1,
        }
    }

    #[test]
    fn create_room_rejects_blank_names() {
        let mut session = Session::new();
        for name in ["", "   ", "\t\n"] {
            let err = session.create_room(CreateRoomParams::new(name)).unwrap_err();
            assert!(matches!(
                err,
                OmokError::Validation(ValidationError::EmptyRoomName)
            ));
        }
        assert_eq!(session.phase(), Phase::Directory);
    }

    #[test]
    fn create_room_passes_fields_through() {
        let mut session = Session::new();
        let msg = session
            .create_room(
                CreateRoomParams::new("  den ")
                    .with_password(" pw ")
                    .with_max_players(40)
                    .with_size(3),
            )
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::CreateRoom {
                name: "den".into(),
                password: Some("pw".into()),
                max_players: 40,
                size: 3,
            }
        );
    }

    #[test]
    fn join_protected_room_requires_password() {
        let mut session = Session::new();
        session.handle(ServerMessage::RoomList {
            rooms: vec![protected_room("r1")],
        });
        assert!(matches!(
            session.join_room("r1", None),
            Err(OmokError::Validation(ValidationError::PasswordRequired { .. }))
        ));
        assert!(matches!(
            session.join_room("r1", Some("  ".into())),
            Err(OmokError::Validation(ValidationError::PasswordRequired { .. }))
        ));
        assert!(session.pending_join().is_none());
        assert_eq!(
            session.join_room("r1", Some("pw".into())).unwrap(),
            ClientMessage::JoinRoom {
                room_id: "r1".into(),
                password: Some("pw".into()),
            }
        );
        assert_eq!(session.pending_join(), Some("r1"));
    }

    #[test]
    fn invalid_password_keeps_directory_phase_and_allows_retry() {
        let mut session = Session::new();
        session.handle(ServerMessage::RoomList {
            rooms: vec![protected_room("r1")],
        });
        session.join_room("r1", Some("wrong".into())).unwrap();
        let events = session.handle(ServerMessage::InvalidPassword);
        assert_eq!(events, vec![OmokEvent::InvalidPassword]);
        assert_eq!(session.phase(), Phase::Directory);
        assert!(session.game().is_none());
        assert!(session.pending_join().is_none());

        session.join_room("r1", Some("right".into())).unwrap();
        session.handle(init_msg(None, 2, vec![1, 2], false));
        assert_eq!(session.phase(), Phase::Waiting);
        assert_eq!(session.current_room_id(), Some("r1"));
    }

    #[test]
    fn init_prefers_room_id_from_payload() {
        let mut session = Session::new();
        session.join_room("r1", None).unwrap();
        session.handle(init_msg(Some("r9"), 1, vec![1], false));
        assert_eq!(session.current_room_id(), Some("r9"));
    }

    #[test]
    fn init_with_local_player_outside_roster_is_reported() {
        let mut session = Session::new();
        let events = session.handle(init_msg(Some("r1"), 5, vec![1, 2], false));
        assert!(matches!(
            events.as_slice(),
            [OmokEvent::SnapshotRejected { reason }] if reason.contains("roster")
        ));
        assert!(session.game().is_none());
    }

    #[test]
    fn malformed_init_keeps_the_running_game() {
        let mut session = Session::new();
        session.handle(init_msg(Some("r1"), 1, vec![1, 2], true));
        session.handle(update(4, 4, 1, 2));

        let events = session.handle(ServerMessage::Init(Box::new(InitPayload {
            player_id: 1,
            board: vec![vec![0, 0], vec![0]],
            current_player: 1,
            max_players: 2,
            players: vec![1, 2],
            started: true,
            room_id: Some("r1".into()),
        })));
        assert!(matches!(
            events.as_slice(),
            [OmokEvent::SnapshotRejected { .. }]
        ));
        assert!(!events.iter().any(OmokEvent::changes_board));
        let game = session.game().unwrap();
        assert_eq!(game.board().stones().count(), 1);
        assert_eq!(game.current_player(), 2);
    }

    #[test]
    fn start_game_only_by_host_of_full_room() {
        let mut session = Session::new();
        session.handle(init_msg(Some("r1"), 2, vec![1, 2], false));
        assert!(matches!(
            session.start_game(),
            Err(OmokError::Validation(ValidationError::NotHost))
        ));
        assert!(!session.start_requested());

        let mut session = Session::new();
        session.handle(init_msg(Some("r1"), 1, vec![1], false));
        assert!(matches!(
            session.start_game(),
            Err(OmokError::Validation(ValidationError::RoomNotFull {
                players: 1,
                max_players: 2
            }))
        ));
    }

    #[test]
    fn start_game_is_disabled_after_first_request() {
        let mut session = Session::new();
        session.handle(init_msg(Some("r1"), 1, vec![1, 2], false));
        assert_eq!(
            session.start_game().unwrap(),
            ClientMessage::StartGame {
                room_id: Some("r1".into())
            }
        );
        assert!(matches!(
            session.start_game(),
            Err(OmokError::Validation(ValidationError::StartPending))
        ));

        assert_eq!(
            session.handle(ServerMessage::GameStarted { room_id: None }),
            vec![OmokEvent::GameStarted]
        );
        assert_eq!(session.phase(), Phase::Playing);
        assert!(matches!(
            session.start_game(),
            Err(OmokError::Validation(ValidationError::AlreadyStarted))
        ));
    }

    #[test]
    fn game_started_accepted_without_local_request() {
        let mut session = Session::new();
        session.handle(init_msg(Some("r1"), 2, vec![1, 2], false));
        session.handle(ServerMessage::GameStarted { room_id: None });
        session.handle(ServerMessage::GameStarted {
            room_id: Some("r1".into()),
        });
        assert_eq!(session.phase(), Phase::Playing);
    }

    #[test]
    fn place_is_gated_locally() {
        let mut session = Session::new();
        session.handle(init_msg(Some("r1"), 2, vec![1, 2], true));
        assert!(matches!(
            session.place(0, 0),
            Err(OmokError::Validation(ValidationError::NotYourTurn {
                current_player: 1
            }))
        ));

        session.handle(update(7, 7, 1, 2));
        assert!(matches!(
            session.place(7, 7),
            Err(OmokError::Validation(ValidationError::Occupied { x: 7, y: 7 }))
        ));
        assert_eq!(
            session.place(8, 7).unwrap(),
            ClientMessage::Place {
                x: 8,
                y: 7,
                player_id: 2,
                room_id: Some("r1".into())
            }
        );
    }

    fn named_room(id: &str, name: &str, created_at: u64) -> Room {
        Room {
            room_id: id.into(),
            name: name.into(),
            password_protected: false,
            max_players: 2,
            size: 15,
            player_count: 1,
            status: RoomStatus::Waiting,
            created_at,
        }
    }

    #[test]
    fn created_room_without_id_can_start_and_place() {
        let mut session = Session::new();
        session.create_room(CreateRoomParams::new("den")).unwrap();
        session.handle(init_msg(None, 1, vec![1, 2], false));
        assert_eq!(session.current_room_id(), None);

        assert_eq!(
            session.start_game().unwrap(),
            ClientMessage::StartGame { room_id: None }
        );
        session.handle(ServerMessage::GameStarted { room_id: None });
        assert_eq!(
            session.place(7, 7).unwrap(),
            ClientMessage::Place {
                x: 7,
                y: 7,
                player_id: 1,
                room_id: None
            }
        );
    }

    #[test]
    fn created_room_ignores_updates_for_unknown_rooms() {
        let mut session = Session::new();
        session.create_room(CreateRoomParams::new("den")).unwrap();
        session.handle(init_msg(None, 1, vec![1, 2], true));

        let events = session.handle(ServerMessage::Update {
            x: 0,
            y: 0,
            player_id: 2,
            current_player: 1,
            room_id: Some("someOtherRoom".into()),
        });
        assert!(events.is_empty());
        let game = session.game().unwrap();
        assert_eq!(game.board().stones().count(), 0);
        assert_eq!(game.current_player(), 1);
    }

    #[test]
    fn created_room_id_is_resolved_from_room_list() {
        let mut session = Session::new();
        session.handle(ServerMessage::RoomList {
            rooms: vec![named_room("old", "den", 1)],
        });
        session.create_room(CreateRoomParams::new("den")).unwrap();
        session.handle(init_msg(None, 1, vec![1, 2], true));
        assert_eq!(session.current_room_id(), None);

        session.handle(ServerMessage::RoomList {
            rooms: vec![named_room("old", "den", 1), named_room("new", "den", 2)],
        });
        assert_eq!(session.current_room_id(), Some("new"));
        assert_eq!(
            session.place(1, 1).unwrap(),
            ClientMessage::Place {
                x: 1,
                y: 1,
                player_id: 1,
                room_id: Some("new".into())
            }
        );
        assert!(session
            .handle(ServerMessage::Win {
                winner: 2,
                room_id: Some("old".into())
            })
            .is_empty());
    }

    #[test]
    fn created_room_adopts_id_the_directory_confirms() {
        let mut session = Session::new();
        session.create_room(CreateRoomParams::new("den")).unwrap();
        session.handle(init_msg(None, 1, vec![1, 2], true));
        session.handle(ServerMessage::RoomList {
            rooms: vec![named_room("other", "cafe", 3)],
        });
        assert_eq!(session.current_room_id(), None);

        // A room list that arrived before the init is enough to vouch for it.
        let mut session = Session::new();
        session.create_room(CreateRoomParams::new("den")).unwrap();
        session.handle(ServerMessage::RoomList {
            rooms: vec![named_room("d1", "den", 5)],
        });
        session.handle(init_msg(None, 1, vec![1, 2], true));
        assert_eq!(session.current_room_id(), Some("d1"));
    }

    #[test]
    fn desync_is_recorded_and_skipped() {
        let mut session = Session::new();
        session.handle(init_msg(Some("r1"), 1, vec![1, 2], true));
        session.handle(update(3, 3, 1, 2));
        let events = session.handle(update(3, 3, 2, 1));
        assert!(matches!(
            events.as_slice(),
            [OmokEvent::Desync(DesyncError::Occupied { .. })]
        ));
        session.handle(update(99, 0, 2, 1));
        assert_eq!(session.diagnostics().len(), 2);

        let game = session.game().unwrap();
        assert_eq!(game.current_player(), 2);
        assert_eq!(game.board().stones().count(), 1);
    }

    #[test]
    fn messages_for_other_rooms_are_ignored() {
        let mut session = Session::new();
        session.handle(init_msg(Some("r1"), 1, vec![1, 2], false));
        assert!(session
            .handle(ServerMessage::GameStarted {
                room_id: Some("old".into())
            })
            .is_empty());
        assert!(session
            .handle(ServerMessage::Update {
                x: 0,
                y: 0,
                player_id: 1,
                current_player: 2,
                room_id: Some("old".into()),
            })
            .is_empty());
        assert_eq!(session.phase(), Phase::Waiting);
        assert_eq!(session.game().unwrap().board().stones().count(), 0);
    }

    #[test]
    fn game_messages_without_a_game_are_ignored() {
        let mut session = Session::new();
        assert!(session.handle(update(0, 0, 1, 2)).is_empty());
        assert!(session
            .handle(ServerMessage::GameStarted { room_id: None })
            .is_empty());
        assert!(session
            .handle(ServerMessage::Win {
                winner: 1,
                room_id: None
            })
            .is_empty());
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn leave_room_discards_game() {
        let mut session = Session::new();
        session.handle(init_msg(Some("r1"), 1, vec![1, 2], true));
        session.leave_room();
        assert_eq!(session.phase(), Phase::Directory);
        assert!(session.game().is_none());
        assert!(session.local_player_id().is_none());
        assert!(session.handle(update(0, 0, 1, 2)).is_empty());
    }

    #[test]
    fn scenario_five_in_a_column_wins() {
        let mut session = Session::new();
        session.handle(init_msg(Some("r1"), 1, vec![1, 2], true));
        let moves = [
            (0, 0, 1, 2),
            (5, 5, 2, 1),
            (0, 1, 1, 2),
            (6, 5, 2, 1),
            (0, 2, 1, 2),
            (7, 5, 2, 1),
            (0, 3, 1, 2),
            (9, 9, 2, 1),
        ];
        for (x, y, p, next) in moves {
            let events = session.handle(update(x, y, p, next));
            assert!(matches!(
                events.as_slice(),
                [OmokEvent::StonePlaced {
                    local_win: false,
                    ..
                }]
            ));
        }
        let events = session.handle(update(0, 4, 1, 2));
        assert!(matches!(
            events.as_slice(),
            [OmokEvent::StonePlaced {
                x: 0,
                y: 4,
                player_id: 1,
                local_win: true,
                ..
            }]
        ));

        let events = session.handle(ServerMessage::Win {
            winner: 1,
            room_id: Some("r1".into()),
        });
        assert_eq!(
            events,
            vec![OmokEvent::GameWon {
                winner: 1,
                confirmed_locally: true
            }]
        );
        let events = session.handle(ServerMessage::Win {
            winner: 2,
            room_id: None,
        });
        assert_eq!(
            events,
            vec![OmokEvent::GameWon {
                winner: 2,
                confirmed_locally: false
            }]
        );
    }

    #[test]
    fn room_list_event_honours_hide_playing() {
        let mut session = Session::new().with_hide_playing(true);
        let mut playing = protected_room("p");
        playing.status = RoomStatus::Playing;
        let events = session.handle(ServerMessage::RoomList {
            rooms: vec![playing, protected_room("w")],
        });
        let OmokEvent::RoomListUpdated { rooms } = &events[0] else {
            panic!("expected RoomListUpdated, got {events:?}");
        };
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].room_id, "w");
        assert_eq!(session.list_rooms(false).len(), 2);
    }

    #[test]
    fn disconnected_session_rejects_everything() {
        let mut session = Session::new();
        session.handle(init_msg(Some("r1"), 1, vec![1, 2], true));
        session.mark_disconnected();
        assert_eq!(session.phase(), Phase::Disconnected);
        assert!(matches!(
            session.request_room_list(),
            Err(OmokError::NotConnected)
        ));
        assert!(matches!(session.place(0, 0), Err(OmokError::NotConnected)));
        assert!(session.handle(update(0, 0, 1, 2)).is_empty());
    }
}
