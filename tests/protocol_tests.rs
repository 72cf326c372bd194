#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire-format fixtures for the omok room protocol.
//!
//! Client messages are checked against the exact JSON the server expects.
//! Server messages are decoded from captured payloads, including the field
//! spellings older server builds use.

use omok_client::protocol::{ClientMessage, InitPayload, Room, RoomStatus, ServerMessage};
use serde_json::json;

fn to_value(msg: &ClientMessage) -> serde_json::Value {
    serde_json::to_value(msg).expect("client message serializes")
}

fn parse(raw: &str) -> ServerMessage {
    serde_json::from_str(raw).unwrap_or_else(|e| panic!("failed to parse {raw}: {e}"))
}

// ════════════════════════════════════════════════════════════════════
// Client → server
// ════════════════════════════════════════════════════════════════════

#[test]
fn get_room_list_is_bare_tag() {
    assert_eq!(
        to_value(&ClientMessage::GetRoomList),
        json!({ "type": "getRoomList" })
    );
}

#[test]
fn create_room_uses_camel_case_and_omits_missing_password() {
    let open = ClientMessage::CreateRoom {
        name: "lobby".into(),
        password: None,
        max_players: 3,
        size: 19,
    };
    assert_eq!(
        to_value(&open),
        json!({ "type": "createRoom", "name": "lobby", "maxPlayers": 3, "size": 19 })
    );

    let locked = ClientMessage::CreateRoom {
        name: "lobby".into(),
        password: Some("pw".into()),
        max_players: 2,
        size: 15,
    };
    assert_eq!(to_value(&locked)["password"], json!("pw"));
}

#[test]
fn join_room_carries_room_id_and_password() {
    let msg = ClientMessage::JoinRoom {
        room_id: "r1".into(),
        password: Some("pw".into()),
    };
    assert_eq!(
        to_value(&msg),
        json!({ "type": "joinRoom", "roomId": "r1", "password": "pw" })
    );
}

#[test]
fn start_game_and_place() {
    assert_eq!(
        to_value(&ClientMessage::StartGame {
            room_id: Some("r1".into())
        }),
        json!({ "type": "startGame", "roomId": "r1" })
    );
    assert_eq!(
        to_value(&ClientMessage::Place {
            x: 3,
            y: 11,
            player_id: 2,
            room_id: Some("r1".into()),
        }),
        json!({ "type": "place", "x": 3, "y": 11, "playerId": 2, "roomId": "r1" })
    );
}

#[test]
fn unknown_room_id_goes_out_as_null() {
    assert_eq!(
        to_value(&ClientMessage::StartGame { room_id: None }),
        json!({ "type": "startGame", "roomId": null })
    );
    let place = to_value(&ClientMessage::Place {
        x: 0,
        y: 0,
        player_id: 1,
        room_id: None,
    });
    assert_eq!(place["roomId"], serde_json::Value::Null);
}

// ════════════════════════════════════════════════════════════════════
// Server → client
// ════════════════════════════════════════════════════════════════════

#[test]
fn room_list_in_current_format() {
    let msg = parse(
        r#"{"type":"roomList","rooms":[
            {"roomId":"a1","name":"first","passwordProtected":true,"maxPlayers":2,
             "size":15,"playerCount":1,"status":"waiting","createdAt":1700000000000}
        ]}"#,
    );
    assert_eq!(
        msg,
        ServerMessage::RoomList {
            rooms: vec![Room {
                room_id: "a1".into(),
                name: "first".into(),
                password_protected: true,
                max_players: 2,
                size: 15,
                player_count: 1,
                status: RoomStatus::Waiting,
                created_at: 1_700_000_000_000,
            }]
        }
    );
}

#[test]
fn room_list_in_legacy_format() {
    // Numeric ids, Korean status labels, `players` for the head count and a
    // `password` field that is either a flag or the (masked) password text.
    let msg = parse(
        r#"{"type":"roomList","rooms":[
            {"roomId":17,"name":"a","password":"***","maxPlayers":4,"size":19,"players":3,"status":"게임중"},
            {"roomId":"18","name":"b","password":false,"maxPlayers":2,"size":15,"players":0,"status":"대기중"},
            {"roomId":19,"name":"c","password":"","maxPlayers":2,"size":15}
        ]}"#,
    );
    let ServerMessage::RoomList { rooms } = msg else {
        panic!("expected RoomList");
    };
    assert_eq!(rooms.len(), 3);

    assert_eq!(rooms[0].room_id, "17");
    assert!(rooms[0].password_protected);
    assert_eq!(rooms[0].player_count, 3);
    assert_eq!(rooms[0].status, RoomStatus::Playing);

    assert_eq!(rooms[1].room_id, "18");
    assert!(!rooms[1].password_protected);
    assert_eq!(rooms[1].status, RoomStatus::Waiting);

    // Missing optional fields fall back to defaults.
    assert!(!rooms[2].password_protected);
    assert_eq!(rooms[2].player_count, 0);
    assert_eq!(rooms[2].status, RoomStatus::Waiting);
    assert_eq!(rooms[2].created_at, 0);
}

#[test]
fn init_snapshot() {
    let msg = parse(
        r#"{"type":"init","playerId":2,"roomId":"r1","currentPlayer":1,"maxPlayers":2,
            "players":[1,2],"started":true,
            "board":[[0,1,0],[0,2,0],[0,0,0]]}"#,
    );
    assert_eq!(
        msg,
        ServerMessage::Init(Box::new(InitPayload {
            player_id: 2,
            board: vec![vec![0, 1, 0], vec![0, 2, 0], vec![0, 0, 0]],
            current_player: 1,
            max_players: 2,
            players: vec![1, 2],
            started: true,
            room_id: Some("r1".into()),
        }))
    );
    assert_eq!(msg.room_id(), Some("r1"));
}

#[test]
fn init_legacy_spellings() {
    let msg = parse(
        r#"{"type":"init","playerId":"3","currentPlayer":"1","maxPlayers":3,
            "players":[1,2,3],"isGameStarted":false,"board":[[0]]}"#,
    );
    let ServerMessage::Init(payload) = msg else {
        panic!("expected Init");
    };
    assert_eq!(payload.player_id, 3);
    assert_eq!(payload.current_player, 1);
    assert!(!payload.started);
    assert_eq!(payload.room_id, None);
}

#[test]
fn update_accepts_negative_coordinates_for_later_rejection() {
    let msg = parse(r#"{"type":"update","x":-1,"y":4,"playerId":1,"currentPlayer":2}"#);
    assert_eq!(
        msg,
        ServerMessage::Update {
            x: -1,
            y: 4,
            player_id: 1,
            current_player: 2,
            room_id: None,
        }
    );
}

#[test]
fn update_with_numeric_room_id() {
    let msg = parse(r#"{"type":"update","x":0,"y":0,"playerId":1,"currentPlayer":2,"roomId":5}"#);
    assert_eq!(msg.room_id(), Some("5"));
}

#[test]
fn small_server_messages() {
    assert_eq!(
        parse(r#"{"type":"gameStarted"}"#),
        ServerMessage::GameStarted { room_id: None }
    );
    assert_eq!(
        parse(r#"{"type":"win","winner":2,"roomId":"r1"}"#),
        ServerMessage::Win {
            winner: 2,
            room_id: Some("r1".into())
        }
    );
    assert_eq!(
        parse(r#"{"type":"invalidPassword"}"#),
        ServerMessage::InvalidPassword
    );
}

#[test]
fn unknown_fields_are_ignored() {
    let msg = parse(r#"{"type":"win","winner":1,"line":[[0,0],[0,4]],"elapsedMs":12}"#);
    assert!(matches!(msg, ServerMessage::Win { winner: 1, .. }));
}

#[test]
fn malformed_messages_are_rejected() {
    for raw in [
        r#"{"type":"chat","text":"hi"}"#,
        r#"{"type":"update","x":1,"y":1}"#,
        r#"{"type":"init","playerId":1}"#,
        r#"{"type":"win","winner":-1}"#,
        r#"{"type":"win","winner":"two"}"#,
        r#"{"rooms":[]}"#,
        r#"[1,2,3]"#,
        "",
    ] {
        assert!(
            serde_json::from_str::<ServerMessage>(raw).is_err(),
            "should reject {raw:?}"
        );
    }
}
