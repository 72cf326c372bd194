//! Per-room game snapshot.
//!
//! A [`GameState`] is built wholesale from an `init` payload and then moved
//! forward only by `update` and `gameStarted` messages. Turn order is whatever
//! the server says it is: `current_player` is copied from each update, never
//! derived from the roster.

use std::collections::BTreeMap;

use crate::board::{Board, Cell};
use crate::error::{DesyncError, OmokError, Result};
use crate::protocol::{InitPayload, PlayerId};

/// An accepted placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: usize,
    pub y: usize,
    pub player_id: PlayerId,
}

/// Board, turn and roster of the room the client is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    current_player: PlayerId,
    players: Vec<PlayerId>,
    max_players: u32,
    started: bool,
    last_move: BTreeMap<PlayerId, (usize, usize)>,
}

impl GameState {
    /// Build a state from an `init` snapshot.
    ///
    /// Stones already on the board have no recorded last move; the marker
    /// only follows placements seen through [`apply_update`](Self::apply_update).
    ///
    /// # Errors
    ///
    /// Returns [`OmokError::Protocol`] if the board is not square, the roster
    /// is empty or contains player `0`, or a stone or `current_player` is not
    /// in the roster.
    pub fn from_init(payload: &InitPayload) -> Result<Self> {
        let board = Board::from_rows(&payload.board)?;
        if payload.players.is_empty() {
            return Err(OmokError::Protocol("init has an empty roster".into()));
        }
        if payload.players.contains(&0) {
            return Err(OmokError::Protocol("roster contains player 0".into()));
        }
        if !payload.players.contains(&payload.current_player) {
            return Err(OmokError::Protocol(format!(
                "current player {} is not in the roster",
                payload.current_player
            )));
        }
        if let Some((x, y, player)) = board
            .stones()
            .find(|(_, _, player)| !payload.players.contains(player))
        {
            return Err(OmokError::Protocol(format!(
                "stone at ({x}, {y}) belongs to unknown player {player}"
            )));
        }

        Ok(Self {
            board,
            current_player: payload.current_player,
            players: payload.players.clone(),
            max_players: payload.max_players,
            started: payload.started,
            last_move: BTreeMap::new(),
        })
    }

    /// Apply one server-confirmed placement.
    ///
    /// # Errors
    ///
    /// Returns a [`DesyncError`] and leaves the state untouched if the cell
    /// is off the board or occupied, or if either player is not in the roster.
    pub fn apply_update(
        &mut self,
        x: i64,
        y: i64,
        player_id: PlayerId,
        current_player: PlayerId,
    ) -> std::result::Result<Placement, DesyncError> {
        let size = self.board.size();
        let (ux, uy) = match (usize::try_from(x), usize::try_from(y)) {
            (Ok(ux), Ok(uy)) if self.board.contains(ux, uy) => (ux, uy),
            _ => return Err(DesyncError::OutOfRange { x, y, size }),
        };
        if let Some(Cell::Stone(occupant)) = self.board.get(ux, uy) {
            return Err(DesyncError::Occupied {
                x: ux,
                y: uy,
                occupant,
            });
        }
        for id in [player_id, current_player] {
            if !self.players.contains(&id) {
                return Err(DesyncError::UnknownPlayer { player_id: id });
            }
        }

        self.board.set(ux, uy, Cell::Stone(player_id));
        self.last_move.insert(player_id, (ux, uy));
        self.current_player = current_player;
        Ok(Placement {
            x: ux,
            y: uy,
            player_id,
        })
    }

    /// Mark the game as started. Idempotent.
    pub fn apply_game_started(&mut self) {
        self.started = true;
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn size(&self) -> usize {
        self.board.size()
    }

    pub fn current_player(&self) -> PlayerId {
        self.current_player
    }

    /// Roster in turn order.
    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    /// `players[0]`.
    pub fn host(&self) -> Option<PlayerId> {
        self.players.first().copied()
    }

    pub fn max_players(&self) -> u32 {
        self.max_players
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn is_full(&self) -> bool {
        u32::try_from(self.players.len()).is_ok_and(|n| n == self.max_players)
    }

    /// Most recent placement of every player who has placed since `init`.
    pub fn last_moves(&self) -> &BTreeMap<PlayerId, (usize, usize)> {
        &self.last_move
    }

    pub fn last_move_of(&self, player: PlayerId) -> Option<(usize, usize)> {
        self.last_move.get(&player).copied()
    }

    /// Whether the start control should be offered to `local`.
    pub fn start_available(&self, local: PlayerId) -> bool {
        !self.started && self.is_full() && self.host() == Some(local)
    }

    /// One-line turn display, e.g. `"me: 2 / turn: 1 / players: 1, 2"`.
    pub fn turn_summary(&self, local: PlayerId) -> String {
        let roster = self
            .players
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "me: {local} / turn: {} / players: {roster}",
            self.current_player
        )
    }
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

    fn init(size: usize, players: Vec<PlayerId>, started: bool) -> InitPayload {
        InitPayload {
            player_id: players[0],
            board: vec![vec![0; size]; size],
            current_player: players[0],
            max_players: players.len() as u32,
            players,
            started,
            room_id: Some("r1".into()),
        }
    }

    #[test]
    fn from_init_derives_size_from_board() {
        let state = GameState::from_init(&init(15, vec![1, 2], false)).unwrap();
        assert_eq!(state.size(), 15);
        assert_eq!(state.host(), Some(1));
        assert!(state.last_moves().is_empty());
    }

    #[test]
    fn from_init_rejects_current_player_outside_roster() {
        let mut payload = init(9, vec![1, 2], true);
        payload.current_player = 3;
        assert!(matches!(
            GameState::from_init(&payload),
            Err(OmokError::Protocol(_))
        ));
    }

    #[test]
    fn from_init_rejects_foreign_stones() {
        let mut payload = init(9, vec![1, 2], true);
        payload.board[4][4] = 7;
        assert!(GameState::from_init(&payload).is_err());
    }

    #[test]
    fn apply_update_places_and_follows_server_turn() {
        let mut state = GameState::from_init(&init(15, vec![1, 2, 3], true)).unwrap();
        // The server may skip player 2; the client follows.
        let placement = state.apply_update(7, 3, 1, 3).unwrap();
        assert_eq!(
            placement,
            Placement {
                x: 7,
                y: 3,
                player_id: 1
            }
        );
        assert_eq!(state.board().get(7, 3), Some(Cell::Stone(1)));
        assert_eq!(state.current_player(), 3);
        assert_eq!(state.last_move_of(1), Some((7, 3)));
        assert_eq!(state.last_move_of(2), None);
    }

    #[test]
    fn apply_update_moves_last_move_marker() {
        let mut state = GameState::from_init(&init(15, vec![1, 2], true)).unwrap();
        state.apply_update(0, 0, 1, 2).unwrap();
        state.apply_update(1, 1, 2, 1).unwrap();
        state.apply_update(0, 1, 1, 2).unwrap();
        assert_eq!(state.last_move_of(1), Some((0, 1)));
        assert_eq!(state.last_move_of(2), Some((1, 1)));
    }

    #[test]
    fn apply_update_rejects_out_of_range() {
        let mut state = GameState::from_init(&init(15, vec![1, 2], true)).unwrap();
        let before = state.clone();
        for (x, y) in [(-1, 0), (0, -1), (15, 0), (0, 15)] {
            assert_eq!(
                state.apply_update(x, y, 1, 2),
                Err(DesyncError::OutOfRange { x, y, size: 15 })
            );
        }
        assert_eq!(state, before);
    }

    #[test]
    fn apply_update_never_overwrites() {
        let mut state = GameState::from_init(&init(15, vec![1, 2], true)).unwrap();
        state.apply_update(3, 3, 1, 2).unwrap();
        let before = state.clone();
        assert_eq!(
            state.apply_update(3, 3, 2, 1),
            Err(DesyncError::Occupied {
                x: 3,
                y: 3,
                occupant: 1
            })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn apply_update_rejects_unknown_players() {
        let mut state = GameState::from_init(&init(15, vec![1, 2], true)).unwrap();
        assert_eq!(
            state.apply_update(0, 0, 9, 1),
            Err(DesyncError::UnknownPlayer { player_id: 9 })
        );
        assert_eq!(
            state.apply_update(0, 0, 1, 9),
            Err(DesyncError::UnknownPlayer { player_id: 9 })
        );
        assert_eq!(state.board().get(0, 0), Some(Cell::Empty));
    }

    #[test]
    fn replaying_updates_matches_a_fresh_init() {
        let mut state = GameState::from_init(&init(9, vec![1, 2], true)).unwrap();
        let moves = [(4, 4, 1, 2), (5, 4, 2, 1), (4, 5, 1, 2), (8, 0, 2, 1)];
        for (x, y, p, next) in moves {
            state.apply_update(x, y, p, next).unwrap();
        }

        let mut snapshot = init(9, vec![1, 2], true);
        snapshot.board = state.board().to_rows();
        snapshot.current_player = state.current_player();
        let fresh = GameState::from_init(&snapshot).unwrap();

        assert_eq!(fresh.board(), state.board());
        assert_eq!(fresh.current_player(), state.current_player());
    }

    #[test]
    fn game_started_is_idempotent() {
        let mut state = GameState::from_init(&init(15, vec![1, 2], false)).unwrap();
        state.apply_game_started();
        state.apply_game_started();
        assert!(state.started());
    }

    #[test]
    fn start_available_only_for_full_unstarted_host() {
        let state = GameState::from_init(&init(15, vec![1, 2], false)).unwrap();
        assert!(state.start_available(1));
        assert!(!state.start_available(2));

        let mut waiting = init(15, vec![1], false);
        waiting.max_players = 2;
        let state = GameState::from_init(&waiting).unwrap();
        assert!(!state.start_available(1));
    }

    #[test]
    fn turn_summary_lists_roster() {
        let state = GameState::from_init(&init(15, vec![1, 2, 3], true)).unwrap();
        assert_eq!(state.turn_summary(2), "me: 2 / turn: 1 / players: 1, 2, 3");
    }
}
