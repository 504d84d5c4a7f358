//! WebSocket transport abstraction
//!
//! This module provides a trait-based abstraction over WebSocket connections,
//! enabling unit testing of the connection supervisor without real network
//! calls.
//!
//! OKEx v3 sends most frames as raw deflate compressed binary messages.
//! [`WsTransport`] inflates them before handing them out, so everything above
//! this layer only ever sees text.
//!
//! # Example
//!
//! ```no_run
//! use okex_ws::transport::{Transport, WsTransport, TransportError};
//!
//! async fn example() -> Result<(), TransportError> {
//!     let mut transport = WsTransport::new("wss://real.okex.com:8443/ws/v3");
//!     transport.connect().await?;
//!     transport.send("ping").await?;
//!     if let Some(response) = transport.recv().await? {
//!         println!("Received: {}", response);
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use flate2::read::DeflateDecoder;
use futures_util::{SinkExt, StreamExt};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument, trace};

/// Transport layer errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Connection timeout
    #[error("connection timeout after {0:?}")]
    Timeout(Duration),

    /// Not connected
    #[error("not connected")]
    NotConnected,

    /// A single frame could not be decoded; the socket is still usable
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Check if the error only affects the current frame
    pub fn is_frame_error(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

/// Trait for WebSocket transport abstraction
///
/// This trait enables unit testing of connection logic by allowing
/// mock implementations to be injected instead of real WebSocket connections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the WebSocket endpoint
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Send a text message
    async fn send(&mut self, message: &str) -> Result<(), TransportError>;

    /// Receive a text message
    ///
    /// Returns `None` if the connection was closed gracefully.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// Close the connection gracefully
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Check if currently connected
    fn is_connected(&self) -> bool;

    /// Get the endpoint URL
    fn endpoint(&self) -> &str;
}

/// Creates a fresh transport for every physical connection
pub type TransportFactory = Arc<dyn Fn() -> Box<dyn Transport> + Send + Sync>;

/// Largest inflated frame accepted, in bytes
pub const MAX_INFLATED_LEN: u64 = 16 * 1024 * 1024;

/// Inflate a raw deflate payload (no zlib header) into UTF-8 text
///
/// Output larger than [`MAX_INFLATED_LEN`] is rejected.
pub fn inflate(data: &[u8]) -> Result<String, TransportError> {
    inflate_limited(data, MAX_INFLATED_LEN)
}

fn inflate_limited(data: &[u8], limit: u64) -> Result<String, TransportError> {
    let mut bytes = Vec::new();
    DeflateDecoder::new(data)
        .take(limit + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| TransportError::Protocol(format!("inflate failed: {}", e)))?;

    if bytes.len() as u64 > limit {
        return Err(TransportError::Protocol(format!(
            "inflated frame exceeds {} bytes",
            limit
        )));
    }
    String::from_utf8(bytes).map_err(|e| TransportError::Protocol(e.to_string()))
}

/// Real WebSocket transport using tokio-tungstenite
pub struct WsTransport {
    url: String,
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    connect_timeout: Duration,
    decompress: bool,
}

impl WsTransport {
    /// Create a new WebSocket transport
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
            connect_timeout: Duration::from_secs(10),
            decompress: true,
        }
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable inflating binary frames
    pub fn with_decompression(mut self, enabled: bool) -> Self {
        self.decompress = enabled;
        self
    }

    fn decode_binary(&self, data: Vec<u8>) -> Result<String, TransportError> {
        if self.decompress {
            inflate(&data)
        } else {
            String::from_utf8(data).map_err(|e| TransportError::Protocol(e.to_string()))
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn connect(&mut self) -> Result<(), TransportError> {
        debug!("Connecting to WebSocket");

        let connect_future = connect_async(&self.url);

        let (ws_stream, _response) = timeout(self.connect_timeout, connect_future)
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))?
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        self.stream = Some(ws_stream);
        debug!("WebSocket connected");
        Ok(())
    }

    #[instrument(skip(self, message), fields(len = message.len()))]
    async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        stream
            .send(Message::Text(message.to_string()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Binary(data))) => return self.decode_binary(data).map(Some),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Close frame received");
                    self.stream = None;
                    return Ok(None);
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // tungstenite answers pings itself
                    trace!("Control frame skipped");
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
                None => {
                    self.stream = None;
                    return Err(TransportError::ConnectionClosed);
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            stream
                .close(None)
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{mock_factory, MockServer, MockTransport};

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use super::{Transport, TransportError, TransportFactory};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    enum Inbound {
        Text(String),
        Close,
        Error(TransportError),
    }

    /// Mock transport for testing
    ///
    /// Inbound frames are pushed through the paired [`MockServer`] while the
    /// connection is running; `recv` waits until one arrives. Every frame the
    /// client writes shows up on the server side.
    pub struct MockTransport {
        url: String,
        connected: bool,
        inbound: mpsc::UnboundedReceiver<Inbound>,
        sent: mpsc::UnboundedSender<String>,
        /// Simulate connection failure
        pub fail_connect: bool,
        /// Simulate send failure
        pub fail_send: bool,
    }

    /// Server side of a [`MockTransport`]
    pub struct MockServer {
        inbound: mpsc::UnboundedSender<Inbound>,
        sent: mpsc::UnboundedReceiver<String>,
    }

    impl MockTransport {
        /// Create a connected pair of mock transport and server handle
        pub fn new(url: impl Into<String>) -> (Self, MockServer) {
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            let (sent_tx, sent_rx) = mpsc::unbounded_channel();
            let transport = Self {
                url: url.into(),
                connected: false,
                inbound: inbound_rx,
                sent: sent_tx,
                fail_connect: false,
                fail_send: false,
            };
            let server = MockServer {
                inbound: inbound_tx,
                sent: sent_rx,
            };
            (transport, server)
        }

        /// A transport whose `connect` always fails
        pub fn unreachable(url: impl Into<String>) -> Self {
            let (mut transport, _server) = Self::new(url);
            transport.fail_connect = true;
            transport
        }
    }

    impl MockServer {
        /// Deliver a text frame to the client
        pub fn push(&self, msg: impl Into<String>) {
            let _ = self.inbound.send(Inbound::Text(msg.into()));
        }

        /// Deliver several text frames in order
        pub fn push_all(&self, msgs: impl IntoIterator<Item = impl Into<String>>) {
            for msg in msgs {
                self.push(msg);
            }
        }

        /// Simulate a graceful close by the server
        pub fn push_close(&self) {
            let _ = self.inbound.send(Inbound::Close);
        }

        /// Simulate a receive error
        pub fn push_error(&self, error: TransportError) {
            let _ = self.inbound.send(Inbound::Error(error));
        }

        /// Wait for the next frame the client wrote
        pub async fn next_sent(&mut self) -> Option<String> {
            self.sent.recv().await
        }

        /// Take every frame written so far without waiting
        pub fn drain_sent(&mut self) -> Vec<String> {
            let mut frames = Vec::new();
            while let Ok(frame) = self.sent.try_recv() {
                frames.push(frame);
            }
            frames
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn connect(&mut self) -> Result<(), TransportError> {
            if self.fail_connect {
                return Err(TransportError::ConnectionFailed("mock connection failure".into()));
            }
            self.connected = true;
            Ok(())
        }

        async fn send(&mut self, message: &str) -> Result<(), TransportError> {
            if !self.connected {
                return Err(TransportError::NotConnected);
            }
            if self.fail_send {
                return Err(TransportError::SendFailed("mock send failure".into()));
            }
            let _ = self.sent.send(message.to_string());
            Ok(())
        }

        async fn recv(&mut self) -> Result<Option<String>, TransportError> {
            if !self.connected {
                return Err(TransportError::NotConnected);
            }
            match self.inbound.recv().await {
                Some(Inbound::Text(text)) => Ok(Some(text)),
                Some(Inbound::Close) => {
                    self.connected = false;
                    Ok(None)
                }
                Some(Inbound::Error(e)) => Err(e),
                None => {
                    self.connected = false;
                    Err(TransportError::ConnectionClosed)
                }
            }
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn endpoint(&self) -> &str {
            &self.url
        }
    }

    /// Factory handing out the given transports in order
    ///
    /// Once the queue is exhausted every further connection attempt fails.
    pub fn mock_factory(transports: Vec<MockTransport>) -> TransportFactory {
        let queue = Arc::new(Mutex::new(VecDeque::from(transports)));
        Arc::new(move || {
            let next = queue.lock().pop_front();
            match next {
                Some(transport) => Box::new(transport) as Box<dyn Transport>,
                None => Box::new(MockTransport::unreachable("mock://exhausted")),
            }
        })
    }
}
