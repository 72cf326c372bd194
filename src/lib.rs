//! # Omok Client
//!
//! Transport-agnostic Rust client for multiplayer omok (gomoku) rooms.
//!
//! The server is authoritative for turn order and win declaration. This crate
//! keeps a local replica of the room list and the current game, validates
//! user intents before anything reaches the wire, and applies server messages
//! in delivery order.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement the [`Transport`] trait for any backend
//! - **WebSocket built-in**: default `transport-websocket` feature provides `WebSocketTransport`
//! - **Event-driven**: receive typed [`OmokEvent`]s via a channel
//! - **Sans-IO core**: [`Session`] can be driven directly without any runtime
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use omok_client::{CreateRoomParams, OmokClient, OmokConfig, OmokEvent, WebSocketTransport};
//!
//! let transport = WebSocketTransport::connect("ws://localhost:8080").await?;
//! let (client, mut events) = OmokClient::start(transport, OmokConfig::new());
//!
//! client.create_room(CreateRoomParams::new("friday night")).await?;
//! while let Some(event) = events.recv().await {
//!     if let OmokEvent::StonePlaced { x, y, player_id, .. } = event {
//!         println!("player {player_id} played ({x}, {y})");
//!     }
//! }
//! ```

pub mod board;
pub mod client;
pub mod directory;
pub mod error;
pub mod event;
pub mod game;
pub mod protocol;
pub mod render;
pub mod rules;
pub mod session;
pub mod transport;
pub mod transports;
pub mod win;

// Re-export primary types for ergonomic imports.
pub use board::{Board, Cell};
pub use client::{OmokClient, OmokConfig};
pub use directory::RoomDirectory;
pub use error::{DesyncError, OmokError, ValidationError};
pub use event::OmokEvent;
pub use game::{GameState, Placement};
pub use protocol::{ClientMessage, PlayerId, Room, RoomId, RoomStatus, ServerMessage};
pub use render::{Renderer, TextRenderer};
pub use rules::{can_place, check_placement};
pub use session::{CreateRoomParams, Phase, Session};
pub use transport::Transport;
pub use win::check_win;

#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
