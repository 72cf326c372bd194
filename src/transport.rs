//! Transport abstraction for the omok room protocol.
//!
//! The [`Transport`] trait is the connection adapter: a persistent,
//! order-preserving, bidirectional channel of JSON text messages. The client
//! relies on it for ordering and performs no reordering or buffering of its
//! own.
//!
//! Connection setup is not part of this trait. Construct a connected transport
//! externally (for example with `WebSocketTransport::connect`), then pass it to
//! `OmokClient::start`.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use omok_client::error::OmokError;
//! use omok_client::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), OmokError> {
//!         // Send one JSON text message
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, OmokError>> {
//!         // Next JSON text message, or None once the peer closed
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), OmokError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::OmokError;

/// A bidirectional text message channel to the omok server.
///
/// Each [`send`](Transport::send) transmits one complete JSON message and each
/// [`recv`](Transport::recv) yields one, in the order the server sent them.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe: the client polls it inside
/// `tokio::select!`, and a cancelled call must not lose a message.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text message to the server.
    ///
    /// # Errors
    ///
    /// Returns [`OmokError::TransportSend`] if the message could not be sent.
    async fn send(&mut self, message: String) -> Result<(), OmokError>;

    /// Receive the next JSON text message from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete message
    /// - `Some(Err(e))`: a transport failure, e.g. [`OmokError::TransportReceive`]
    /// - `None`: the server closed the connection
    async fn recv(&mut self) -> Option<Result<String, OmokError>>;

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Resources are released
    /// either way.
    async fn close(&mut self) -> Result<(), OmokError>;
}
