//! # Terminal Omok
//!
//! Plays omok from a terminal against an omok room server:
//!
//! 1. Connect over WebSocket and list rooms
//! 2. Create or join a room (optionally from a `?room=` share link)
//! 3. Start the game as host and place stones by typing coordinates
//! 4. Shut down on `quit`, Ctrl+C or disconnect
//!
//! ## Running
//!
//! ```sh
//! cargo run --example terminal_omok
//!
//! # Other server, join straight into a shared room:
//! OMOK_URL=ws://my-server:8080 OMOK_JOIN='?room=42' cargo run --example terminal_omok
//! ```
//!
//! Commands: `list`, `create <name> [password]`, `join <room> [password]`,
//! `start`, `place <x> <y>`, `leave`, `quit`.

use omok_client::{
    CreateRoomParams, OmokClient, OmokConfig, OmokEvent, TextRenderer, WebSocketTransport,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Default server URL when `OMOK_URL` is not set.
const DEFAULT_URL: &str = "ws://localhost:8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set `RUST_LOG=debug` for protocol traffic.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let url = std::env::var("OMOK_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let join_query = std::env::var("OMOK_JOIN").unwrap_or_default();
    tracing::info!("Connecting to {url}");

    let transport = WebSocketTransport::connect(&url).await?;
    let config = OmokConfig::new().with_join_query(&join_query);
    let (mut client, mut event_rx) =
        OmokClient::start_with_renderer(transport, config, TextRenderer::new(std::io::stdout()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    break;
                };
                match event {
                    OmokEvent::RoomListUpdated { rooms } => {
                        println!("── {} room(s) ──", rooms.len());
                        for room in rooms {
                            let lock = if room.password_protected { " [locked]" } else { "" };
                            println!(
                                "{:>8}  {}  {}/{}  {}x{}  {:?}{lock}",
                                room.room_id,
                                room.name,
                                room.player_count,
                                room.max_players,
                                room.size,
                                room.size,
                                room.status,
                            );
                        }
                    }
                    OmokEvent::GameInitialized { room_id, start_available, .. } => {
                        println!("Entered room {}", room_id.as_deref().unwrap_or("?"));
                        if start_available {
                            println!("Room is full. Type `start` to begin.");
                        }
                    }
                    OmokEvent::StonePlaced { .. } | OmokEvent::GameStarted => {
                        if let (Some(game), Some(me)) =
                            (client.game_snapshot().await, client.local_player_id().await)
                        {
                            println!("{}", game.turn_summary(me));
                        }
                    }
                    OmokEvent::GameWon { winner, .. } => {
                        println!("Player {winner} wins!");
                    }
                    OmokEvent::InvalidPassword => {
                        println!("Wrong password.");
                    }
                    OmokEvent::SnapshotRejected { reason } => {
                        println!("Could not load the room: {reason}");
                    }
                    OmokEvent::Desync(e) => {
                        tracing::warn!("Board out of sync: {e}");
                    }
                    OmokEvent::Disconnected { reason } => {
                        tracing::warn!("Disconnected: {}", reason.as_deref().unwrap_or("server closed"));
                        break;
                    }
                    OmokEvent::Connected => {}
                }
            }

            line = lines.next_line() => {
                let Ok(Some(line)) = line else {
                    break;
                };
                let words: Vec<&str> = line.split_whitespace().collect();
                let result = match words.as_slice() {
                    ["list"] => client.refresh_rooms().await,
                    ["create", name, rest @ ..] => {
                        let mut params = CreateRoomParams::new(*name);
                        if let Some(password) = rest.first() {
                            params = params.with_password(*password);
                        }
                        client.create_room(params).await
                    }
                    ["join", room, rest @ ..] => {
                        let password = rest.first().map(|p| (*p).to_string());
                        client.join_room(*room, password).await
                    }
                    ["start"] => client.start_game().await,
                    ["place", x, y] => match (x.parse(), y.parse()) {
                        (Ok(x), Ok(y)) => client.place(x, y).await,
                        _ => {
                            println!("usage: place <x> <y>");
                            Ok(())
                        }
                    },
                    ["leave"] => {
                        client.leave_room().await;
                        client.refresh_rooms().await
                    }
                    ["quit"] => break,
                    [] => Ok(()),
                    _ => {
                        println!("commands: list | create <name> [pw] | join <room> [pw] | start | place <x> <y> | leave | quit");
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    println!("{e}");
                }
            }

            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
