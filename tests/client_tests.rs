#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! End-to-end client tests against an in-memory server.
//!
//! A [`FakeServer`] plays the authority: the test drives `OmokClient` intents,
//! checks exactly what reaches the wire, and feeds replies back.

mod common;

use std::io::Write;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use omok_client::protocol::{ClientMessage, RoomStatus};
use omok_client::{
    CreateRoomParams, OmokClient, OmokConfig, OmokError, OmokEvent, Phase, TextRenderer,
    ValidationError,
};
use tokio::sync::mpsc::Receiver;

use common::{
    channel_pair, game_started_json, init_json, init_json_with_board, invalid_password_json,
    room, room_list_json, update_json, win_json, FakeServer, MockTransport,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

fn quiet_config() -> OmokConfig {
    OmokConfig::new().with_room_refresh_interval(None)
}

/// Start a client on a live in-memory connection and consume the startup
/// `Connected` event and `getRoomList` request.
async fn connect(config: OmokConfig) -> (OmokClient, Receiver<OmokEvent>, FakeServer) {
    let (transport, mut server) = channel_pair();
    let (client, mut events) = OmokClient::start(transport, config);
    assert_eq!(next_event(&mut events).await, OmokEvent::Connected);
    assert_eq!(server.expect().await, ClientMessage::GetRoomList);
    (client, events, server)
}

async fn next_event(rx: &mut Receiver<OmokEvent>) -> OmokEvent {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Unwrap the next event as `(x, y, player_id, local_win)` of a `StonePlaced`.
async fn next_placement(rx: &mut Receiver<OmokEvent>) -> (usize, usize, u32, bool) {
    match next_event(rx).await {
        OmokEvent::StonePlaced {
            x,
            y,
            player_id,
            local_win,
            ..
        } => (x, y, player_id, local_win),
        other => panic!("expected StonePlaced, got {other:?}"),
    }
}

/// `Write` sink shared between the renderer and the test.
#[derive(Clone, Default)]
struct SharedBuf(Arc<StdMutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════
// Full game: create, fill, start, play to five in a column
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn host_creates_room_starts_and_wins_down_a_column() {
    let (mut client, mut events, mut server) = connect(quiet_config()).await;

    client
        .create_room(CreateRoomParams::new("  column  ").with_size(15))
        .await
        .unwrap();
    assert_eq!(
        server.expect().await,
        ClientMessage::CreateRoom {
            name: "column".into(),
            password: None,
            max_players: 2,
            size: 15,
        }
    );
    assert_eq!(server.expect().await, ClientMessage::GetRoomList);

    // Alone in the room: no start yet.
    server.push(init_json(Some("r1"), 1, vec![1], 15, false));
    let ev = next_event(&mut events).await;
    assert!(matches!(
        ev,
        OmokEvent::GameInitialized {
            start_available: false,
            ..
        }
    ));
    assert!(matches!(
        client.start_game().await,
        Err(OmokError::Validation(ValidationError::RoomNotFull { .. }))
    ));

    // Second player arrives.
    server.push(init_json(Some("r1"), 1, vec![1, 2], 15, false));
    let ev = next_event(&mut events).await;
    assert!(matches!(
        ev,
        OmokEvent::GameInitialized {
            start_available: true,
            ..
        }
    ));
    assert_eq!(client.phase().await, Phase::Waiting);

    client.start_game().await.unwrap();
    assert_eq!(
        server.expect().await,
        ClientMessage::StartGame {
            room_id: Some("r1".into())
        }
    );
    assert!(matches!(
        client.start_game().await,
        Err(OmokError::Validation(ValidationError::StartPending))
    ));

    server.push(game_started_json());
    assert_eq!(next_event(&mut events).await, OmokEvent::GameStarted);
    assert_eq!(client.phase().await, Phase::Playing);

    for y in 0..4 {
        client.place(0, y).await.unwrap();
        assert_eq!(
            server.expect().await,
            ClientMessage::Place {
                x: 0,
                y,
                player_id: 1,
                room_id: Some("r1".into()),
            }
        );
        let wire_y = i64::try_from(y).unwrap();
        // Player 2's turn now: a local attempt is refused before the wire.
        server.push(update_json("r1", 0, wire_y, 1, 2));
        assert_eq!(next_placement(&mut events).await, (0, y, 1, false));
        assert!(matches!(
            client.place(7, 7).await,
            Err(OmokError::Validation(ValidationError::NotYourTurn {
                current_player: 2
            }))
        ));

        server.push(update_json("r1", 10, wire_y, 2, 1));
        assert_eq!(next_placement(&mut events).await, (10, y, 2, false));
    }

    client.place(0, 4).await.unwrap();
    let _ = server.expect().await;
    server.push(update_json("r1", 0, 4, 1, 2));
    assert_eq!(next_placement(&mut events).await, (0, 4, 1, true));

    server.push(win_json(1));
    assert_eq!(
        next_event(&mut events).await,
        OmokEvent::GameWon {
            winner: 1,
            confirmed_locally: true
        }
    );

    let snapshot = client.game_snapshot().await.unwrap();
    assert_eq!(snapshot.last_move_of(1), Some((0, 4)));
    assert_eq!(snapshot.last_move_of(2), Some((10, 3)));

    server.expect_silence().await;
    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Local validation never reaches the wire
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn blank_room_name_is_rejected_locally() {
    let (mut client, _events, mut server) = connect(quiet_config()).await;

    for name in ["", "   ", "\t\n"] {
        let err = client
            .create_room(CreateRoomParams::new(name))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OmokError::Validation(ValidationError::EmptyRoomName)
        ));
    }

    server.expect_silence().await;
    client.shutdown().await;
}

#[tokio::test]
async fn non_host_cannot_start() {
    let (mut client, mut events, mut server) = connect(quiet_config()).await;

    client.join_room("r9", None).await.unwrap();
    let _ = server.expect().await;
    server.push(init_json(None, 2, vec![1, 2], 15, false));
    let ev = next_event(&mut events).await;
    assert_eq!(
        ev,
        OmokEvent::GameInitialized {
            room_id: Some("r9".into()),
            player_id: 2,
            size: 15,
            players: vec![1, 2],
            current_player: 1,
            started: false,
            start_available: false,
        }
    );

    assert!(matches!(
        client.start_game().await,
        Err(OmokError::Validation(ValidationError::NotHost))
    ));
    server.expect_silence().await;
    client.shutdown().await;
}

#[tokio::test]
async fn placement_before_start_is_refused() {
    let (mut client, mut events, mut server) = connect(quiet_config()).await;

    server.push(init_json(Some("r1"), 1, vec![1, 2], 15, false));
    let _ = next_event(&mut events).await;
    // The init arrived without a join, yet carries its own room id.
    assert_eq!(client.current_room_id().await.as_deref(), Some("r1"));

    assert!(matches!(
        client.place(3, 3).await,
        Err(OmokError::Validation(ValidationError::GameNotStarted))
    ));
    server.expect_silence().await;
    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Password-protected rooms
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn wrong_password_keeps_directory_and_retry_succeeds() {
    let (mut client, mut events, mut server) = connect(quiet_config()).await;

    let mut locked = room("secret", "locked", 1, RoomStatus::Waiting, 10);
    locked.password_protected = true;
    server.push(room_list_json(vec![locked]));
    let _ = next_event(&mut events).await;

    assert!(matches!(
        client.join_room("secret", None).await,
        Err(OmokError::Validation(ValidationError::PasswordRequired { .. }))
    ));

    client
        .join_room("secret", Some("wrong".into()))
        .await
        .unwrap();
    assert_eq!(
        server.expect().await,
        ClientMessage::JoinRoom {
            room_id: "secret".into(),
            password: Some("wrong".into()),
        }
    );
    server.push(invalid_password_json());
    assert_eq!(next_event(&mut events).await, OmokEvent::InvalidPassword);
    assert_eq!(client.phase().await, Phase::Directory);
    assert!(client.game_snapshot().await.is_none());

    client
        .join_room("secret", Some("right".into()))
        .await
        .unwrap();
    let _ = server.expect().await;
    server.push(init_json(None, 2, vec![1, 2], 15, false));
    let _ = next_event(&mut events).await;
    assert_eq!(client.phase().await, Phase::Waiting);
    assert_eq!(client.current_room_id().await.as_deref(), Some("secret"));

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Room directory
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn room_list_is_newest_first_and_can_hide_playing_rooms() {
    let (mut client, mut events, server) = connect(quiet_config().with_hide_playing(true)).await;

    server.push(room_list_json(vec![
        room("a", "old", 1, RoomStatus::Waiting, 100),
        room("b", "busy", 2, RoomStatus::Playing, 300),
        room("c", "new", 1, RoomStatus::Waiting, 200),
    ]));
    let OmokEvent::RoomListUpdated { rooms } = next_event(&mut events).await else {
        panic!("expected RoomListUpdated");
    };
    let ids: Vec<&str> = rooms.iter().map(|r| r.room_id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a"]);

    let all: Vec<String> = client
        .list_rooms(false)
        .await
        .into_iter()
        .map(|r| r.room_id)
        .collect();
    assert_eq!(all, vec!["b", "c", "a"]);

    client.set_hide_playing(false).await;
    server.push(room_list_json(vec![room("b", "busy", 2, RoomStatus::Playing, 300)]));
    let OmokEvent::RoomListUpdated { rooms } = next_event(&mut events).await else {
        panic!("expected RoomListUpdated");
    };
    assert_eq!(rooms.len(), 1);

    client.shutdown().await;
}

#[tokio::test]
async fn refresh_rooms_sends_request() {
    let (mut client, _events, mut server) = connect(quiet_config()).await;
    client.refresh_rooms().await.unwrap();
    assert_eq!(server.expect().await, ClientMessage::GetRoomList);
    client.shutdown().await;
}

#[tokio::test]
async fn join_by_reference_from_query() {
    let (transport, mut server) = channel_pair();
    let config = quiet_config().with_join_query("?room=77");
    let (mut client, mut events) = OmokClient::start(transport, config);

    assert_eq!(next_event(&mut events).await, OmokEvent::Connected);
    assert_eq!(
        server.expect().await,
        ClientMessage::JoinRoom {
            room_id: "77".into(),
            password: None
        }
    );
    assert_eq!(server.expect().await, ClientMessage::GetRoomList);

    server.push(init_json(None, 2, vec![1, 2], 15, true));
    let _ = next_event(&mut events).await;
    assert_eq!(client.current_room_id().await.as_deref(), Some("77"));
    assert_eq!(client.local_player_id().await, Some(2));

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Consistency with the authority
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn messages_for_a_left_room_are_ignored() {
    let (mut client, mut events, server) = connect(quiet_config()).await;

    server.push(init_json(Some("r1"), 1, vec![1, 2], 15, true));
    let _ = next_event(&mut events).await;

    // Another room's traffic is dropped; our own applies.
    server.push(update_json("elsewhere", 1, 1, 1, 2));
    server.push(update_json("r1", 2, 2, 1, 2));
    assert_eq!(next_placement(&mut events).await, (2, 2, 1, false));

    client.leave_room().await;
    assert_eq!(client.phase().await, Phase::Directory);
    server.push(update_json("r1", 3, 3, 2, 1));
    server.push(room_list_json(vec![]));
    assert_eq!(
        next_event(&mut events).await,
        OmokEvent::RoomListUpdated { rooms: vec![] }
    );

    client.shutdown().await;
}

#[tokio::test]
async fn conflicting_update_is_reported_and_skipped() {
    let (mut client, mut events, server) = connect(quiet_config()).await;

    let mut board = vec![vec![0; 15]; 15];
    board[4][4] = 2;
    server.push(init_json_with_board(Some("r1"), 1, vec![1, 2], board, 1, true));
    let _ = next_event(&mut events).await;

    server.push(update_json("r1", 4, 4, 1, 2));
    server.push(update_json("r1", 15, 0, 1, 2));
    server.push(update_json("r1", 0, 0, 9, 2));
    for _ in 0..3 {
        assert!(matches!(next_event(&mut events).await, OmokEvent::Desync(_)));
    }
    assert_eq!(client.diagnostics().await.len(), 3);

    // The turn did not move, so the local player may still play.
    client.place(5, 5).await.unwrap();
    client.shutdown().await;
}

#[tokio::test]
async fn created_room_plays_before_its_id_is_known() {
    let (mut client, mut events, mut server) = connect(quiet_config()).await;

    client
        .create_room(CreateRoomParams::new("den"))
        .await
        .unwrap();
    assert!(matches!(
        server.expect().await,
        ClientMessage::CreateRoom { .. }
    ));
    assert_eq!(server.expect().await, ClientMessage::GetRoomList);

    // This server never puts a room id in `init`.
    server.push(init_json(None, 1, vec![1, 2], 15, false));
    assert!(matches!(
        next_event(&mut events).await,
        OmokEvent::GameInitialized {
            room_id: None,
            start_available: true,
            ..
        }
    ));

    client.start_game().await.unwrap();
    assert_eq!(
        server.expect().await,
        ClientMessage::StartGame { room_id: None }
    );
    server.push(game_started_json());
    assert_eq!(next_event(&mut events).await, OmokEvent::GameStarted);

    client.place(7, 7).await.unwrap();
    assert_eq!(
        server.expect().await,
        ClientMessage::Place {
            x: 7,
            y: 7,
            player_id: 1,
            room_id: None,
        }
    );

    // Traffic for a room the directory does not vouch for stays out.
    server.push(update_json("someOtherRoom", 0, 0, 2, 1));
    server.push(r#"{"type":"update","x":7,"y":7,"playerId":1,"currentPlayer":2}"#.to_string());
    assert_eq!(next_placement(&mut events).await, (7, 7, 1, false));

    server.push(room_list_json(vec![room("d1", "den", 2, RoomStatus::Playing, 5)]));
    assert!(matches!(
        next_event(&mut events).await,
        OmokEvent::RoomListUpdated { .. }
    ));
    assert_eq!(client.current_room_id().await.as_deref(), Some("d1"));

    server.push(update_json("d1", 8, 8, 2, 1));
    assert_eq!(next_placement(&mut events).await, (8, 8, 2, false));
    client.place(9, 9).await.unwrap();
    assert_eq!(
        server.expect().await,
        ClientMessage::Place {
            x: 9,
            y: 9,
            player_id: 1,
            room_id: Some("d1".into()),
        }
    );

    let snapshot = client.game_snapshot().await.unwrap();
    assert_eq!(snapshot.board().stones().count(), 2);
    client.shutdown().await;
}

#[tokio::test]
async fn rejected_snapshot_is_reported() {
    let (mut client, mut events, server) = connect(quiet_config()).await;

    client.join_room("r4", None).await.unwrap();
    server.push(init_json(Some("r4"), 3, vec![1, 2], 15, false));
    assert!(matches!(
        next_event(&mut events).await,
        OmokEvent::SnapshotRejected { .. }
    ));
    assert!(client.game_snapshot().await.is_none());

    client.shutdown().await;
}

#[tokio::test]
async fn unconfirmed_win_is_still_reported() {
    let (mut client, mut events, server) = connect(quiet_config()).await;

    server.push(init_json(Some("r1"), 1, vec![1, 2], 15, true));
    let _ = next_event(&mut events).await;
    server.push(win_json(2));
    assert_eq!(
        next_event(&mut events).await,
        OmokEvent::GameWon {
            winner: 2,
            confirmed_locally: false
        }
    );

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Rendering
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn text_renderer_draws_each_board_change() {
    let (transport, server) = channel_pair();
    let buf = SharedBuf::default();
    let (mut client, mut events) = OmokClient::start_with_renderer(
        transport,
        quiet_config(),
        TextRenderer::new(buf.clone()),
    );
    let _ = next_event(&mut events).await; // Connected

    server.push(init_json(Some("r1"), 2, vec![1, 2], 5, true));
    let _ = next_event(&mut events).await;
    server.push(update_json("r1", 2, 1, 1, 2));
    let _ = next_event(&mut events).await;

    let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    let frames: Vec<&str> = text.split("player 2 (r)\n").skip(1).collect();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].lines().nth(1), Some(". . B . ."));

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Connection loss
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn server_hang_up_is_terminal() {
    let (client, mut events, mut server) = connect(quiet_config()).await;

    server.push(init_json(Some("r1"), 1, vec![1, 2], 15, true));
    let _ = next_event(&mut events).await;
    server.hang_up();

    assert_eq!(
        next_event(&mut events).await,
        OmokEvent::Disconnected { reason: None }
    );
    assert!(!client.is_connected());
    assert_eq!(client.phase().await, Phase::Disconnected);
    assert!(matches!(
        client.place(0, 0).await,
        Err(OmokError::NotConnected)
    ));
    assert!(matches!(
        client.refresh_rooms().await,
        Err(OmokError::NotConnected)
    ));
    assert!(events.recv().await.is_none());
}

#[tokio::test]
async fn scripted_transport_replays_in_order() {
    let (transport, _sent, closed) = MockTransport::new(vec![
        Some(Ok(room_list_json(vec![room("a", "x", 1, RoomStatus::Waiting, 1)]))),
        Some(Ok(init_json(Some("a"), 2, vec![1, 2], 15, true))),
        Some(Ok(update_json("a", 7, 7, 1, 2))),
        None,
    ]);
    let (_client, mut events) = OmokClient::start(transport, quiet_config());

    assert_eq!(next_event(&mut events).await, OmokEvent::Connected);
    assert!(matches!(
        next_event(&mut events).await,
        OmokEvent::RoomListUpdated { .. }
    ));
    assert!(matches!(
        next_event(&mut events).await,
        OmokEvent::GameInitialized { .. }
    ));
    assert_eq!(next_placement(&mut events).await, (7, 7, 1, false));
    assert_eq!(
        next_event(&mut events).await,
        OmokEvent::Disconnected { reason: None }
    );

    // The server hung up; the client never closed its side.
    assert!(!closed.load(std::sync::atomic::Ordering::Relaxed));
}
