//! Streaming WebSocket client for the OKEx v3 swap and futures API
//!
//! This crate keeps one persistent connection to OKEx and turns its frames
//! into typed events:
//!
//! - Automatic reconnection at a fixed interval, with `ping` keep-alives
//!   and dead-peer detection
//! - Raw deflate decompression of binary frames
//! - Signed login on every new connection when credentials are configured
//! - Subscription registry, replayed after every reconnect
//! - One handler per message category (ticker, depth, trade, candle, order,
//!   account, position)
//!
//! # Example
//!
//! ```no_run
//! use okex_ws::{OkexStream, StreamConfig, StreamEvent};
//! use okex_types::{ContractType, CurrencyPair, KlinePeriod};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = OkexStream::new(StreamConfig::default());
//!     let mut events = stream.take_event_receiver().unwrap();
//!
//!     stream.on_ticker(|t| println!("{} last {}", t.pair, t.last));
//!     stream.on_kline(|k| println!("{} close {}", k.pair, k.close));
//!
//!     let btc = CurrencyPair::new("BTC", "USD");
//!     stream.subscribe_ticker(&btc, ContractType::Swap).await?;
//!     stream.subscribe_kline(&btc, ContractType::Swap, KlinePeriod::M1).await?;
//!
//!     while let Some(event) = events.recv().await {
//!         if let StreamEvent::Error(e) = event {
//!             eprintln!("stream error: {}", e);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod connection;
pub mod contract;
pub mod decode;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod handlers;
pub mod login;
pub mod reconnect;
pub mod subscription;
pub mod transport;

// Re-export main types
pub use channel::{Envelope, Frame, LoginAck, TableKind};
pub use config::StreamConfig;
pub use connection::{ConnectionState, OkexStream};
pub use contract::{ContractInfo, ContractResolver, ContractTable};
pub use endpoint::Endpoint;
pub use error::{StreamError, StreamResult};
pub use events::{ConnectionEvent, DisconnectReason, StreamEvent};
pub use handlers::HandlerRegistry;
pub use login::AuthState;
pub use reconnect::ReconnectPolicy;
pub use subscription::{SubscriptionRegistry, Topic};
pub use transport::{Transport, TransportError, TransportFactory, WsTransport};
