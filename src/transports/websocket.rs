//! WebSocket transport over `tokio-tungstenite`.
//!
//! Omok servers speak one JSON object per text frame. `ws://` and `wss://`
//! URLs both work; TLS is handled by
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), omok_client::OmokError> {
//! use omok_client::{Transport, WebSocketTransport};
//!
//! let mut transport = WebSocketTransport::connect("ws://localhost:8080").await?;
//! transport.send(r#"{"type":"getRoomList"}"#.to_string()).await?;
//!
//! if let Some(Ok(rooms)) = transport.recv().await {
//!     println!("rooms: {rooms}");
//! }
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::OmokError;
use crate::transport::Transport;

/// The underlying WebSocket stream, public for [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by a WebSocket connection.
///
/// Text frames map one-to-one onto protocol messages. Binary frames are not
/// part of the protocol and are skipped; a close frame ends the stream.
///
/// For custom TLS, proxies or extra headers, build the stream yourself and use
/// [`WebSocketTransport::from_stream`].
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe: a dropped `recv` future loses no
/// frames.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Connect to the omok server at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`OmokError::Io`] if the URL is invalid or the handshake fails.
    /// The [`ErrorKind`](std::io::ErrorKind) of an underlying I/O error is
    /// preserved; anything else becomes [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, OmokError> {
        tracing::debug!(url = %url, "connecting to omok server");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            OmokError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "connected to omok server");

        Ok(Self::from_stream(stream))
    }

    /// Like [`connect`](Self::connect), failing with [`OmokError::Timeout`]
    /// once `timeout` elapses.
    ///
    /// # Errors
    ///
    /// [`OmokError::Timeout`], or anything [`connect`](Self::connect) returns.
    pub async fn connect_with_timeout(url: &str, timeout: Duration) -> Result<Self, OmokError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| OmokError::Timeout)?
    }

    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), OmokError> {
        if self.closed {
            return Err(OmokError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| OmokError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, OmokError>> {
        loop {
            let frame = match self.stream.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return Some(Err(OmokError::TransportReceive(e.to_string()))),
                None => return None,
            };

            match frame {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(close) => {
                    tracing::debug!(?close, "server sent close frame");
                    return None;
                }
                // tungstenite queues the pong itself.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(bytes) => {
                    tracing::warn!(len = bytes.len(), "skipping binary frame");
                }
                // Only produced when writing raw frames.
                Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), OmokError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| OmokError::TransportSend(e.to_string()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::{ClientMessage, ServerMessage};
    use tokio::net::TcpListener;

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-valid-url")
            .await
            .unwrap_err();
        assert!(matches!(err, OmokError::Io(_)));
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let err = WebSocketTransport::connect("ws://127.0.0.1:1")
            .await
            .unwrap_err();
        assert!(matches!(err, OmokError::Io(_)));
    }

    #[tokio::test]
    async fn connect_with_timeout_times_out() {
        // TEST-NET-1 is never routable.
        let err = WebSocketTransport::connect_with_timeout(
            "ws://192.0.2.1:1",
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OmokError::Timeout));
    }

    /// Accept one connection on a local port and hand it to `handler`.
    async fn start_mock_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn answers_room_list_request() {
        let url = start_mock_server(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let request: ClientMessage = serde_json::from_str(&text).unwrap();
                assert_eq!(request, ClientMessage::GetRoomList);
                ws.send(Message::Text(r#"{"type":"roomList","rooms":[]}"#.into()))
                    .await
                    .unwrap();
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let request = serde_json::to_string(&ClientMessage::GetRoomList).unwrap();
        transport.send(request).await.unwrap();

        let reply = transport.recv().await.unwrap().unwrap();
        let parsed: ServerMessage = serde_json::from_str(&reply).unwrap();
        assert_eq!(parsed, ServerMessage::RoomList { rooms: vec![] });
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn messages_arrive_in_order_and_binary_is_skipped() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"type":"gameStarted"}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"type":"win","winner":2}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"gameStarted"}"#
        );
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"win","winner":2}"#
        );
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport
            .send(r#"{"type":"getRoomList"}"#.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, OmokError::TransportClosed));
    }

    #[tokio::test]
    async fn from_stream_wraps_existing_connection() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"type":"invalidPassword"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let (stream, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        let mut transport = WebSocketTransport::from_stream(stream);
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"invalidPassword"}"#
        );
    }
}
