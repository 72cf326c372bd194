//! Latest room-list snapshot.
//!
//! The directory holds no timers. Whoever drives the connection decides when
//! to ask for a new `roomList`; each one replaces the previous snapshot.

use crate::protocol::{Room, RoomStatus};

#[derive(Debug, Clone, Default)]
pub struct RoomDirectory {
    rooms: Vec<Room>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot.
    pub fn replace(&mut self, rooms: Vec<Room>) {
        self.rooms = rooms;
    }

    /// Rooms newest first; with `hide_playing`, rooms already playing are left out.
    pub fn list_rooms(&self, hide_playing: bool) -> Vec<Room> {
        let mut rooms: Vec<Room> = self
            .rooms
            .iter()
            .filter(|room| !(hide_playing && room.status == RoomStatus::Playing))
            .cloned()
            .collect();
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rooms
    }

    pub fn find(&self, room_id: &str) -> Option<&Room> {
        self.rooms.iter().find(|room| room.room_id == room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
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

    fn room(id: &str, created_at: u64, status: RoomStatus) -> Room {
        Room {
            room_id: id.into(),
            name: format!("room {id}"),
            password_protected: false,
            max_players: 2,
            size: 15,
            player_count: 1,
            status,
            created_at,
        }
    }

    fn sample() -> RoomDirectory {
        let mut directory = RoomDirectory::new();
        directory.replace(vec![
            room("a", 100, RoomStatus::Waiting),
            room("b", 300, RoomStatus::Playing),
            room("c", 200, RoomStatus::Waiting),
            room("d", 400, RoomStatus::Playing),
            room("e", 50, RoomStatus::Waiting),
        ]);
        directory
    }

    fn ids(rooms: &[Room]) -> Vec<&str> {
        rooms.iter().map(|r| r.room_id.as_str()).collect()
    }

    #[test]
    fn lists_newest_first() {
        let rooms = sample().list_rooms(false);
        assert_eq!(ids(&rooms), vec!["d", "b", "c", "a", "e"]);
        assert!(rooms.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn hide_playing_removes_exactly_playing_rooms() {
        let directory = sample();
        let all = directory.list_rooms(false);
        let visible = directory.list_rooms(true);
        assert_eq!(ids(&visible), vec!["c", "a", "e"]);
        assert!(visible.iter().all(|r| r.status == RoomStatus::Waiting));
        let playing = all
            .iter()
            .filter(|r| r.status == RoomStatus::Playing)
            .count();
        assert_eq!(all.len() - visible.len(), playing);
    }

    #[test]
    fn replace_discards_previous_snapshot() {
        let mut directory = sample();
        directory.replace(vec![room("z", 1, RoomStatus::Waiting)]);
        assert_eq!(directory.len(), 1);
        assert!(directory.find("a").is_none());
        assert_eq!(directory.find("z").unwrap().created_at, 1);
    }

    #[test]
    fn listing_does_not_mutate() {
        let directory = sample();
        let _ = directory.list_rooms(true);
        assert_eq!(directory.len(), 5);
        assert_eq!(directory.list_rooms(false).len(), 5);
    }

    #[test]
    fn empty_directory_lists_nothing() {
        let directory = RoomDirectory::new();
        assert!(directory.is_empty());
        assert!(directory.list_rooms(true).is_empty());
    }
}
