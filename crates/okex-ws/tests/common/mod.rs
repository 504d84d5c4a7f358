//! Common test utilities and fixtures for integration tests
//!
//! Frames follow the shapes OKEx v3 sends on `wss://real.okex.com:8443/ws/v3`.

#![allow(dead_code)]

use okex_auth::Credentials;
use okex_ws::transport::{mock_factory, MockServer, MockTransport};
use okex_ws::{
    ConnectionEvent, ContractInfo, ContractTable, OkexStream, ReconnectPolicy, StreamConfig,
    StreamError, StreamEvent,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Upper bound for any single wait in a test
pub const WAIT: Duration = Duration::from_secs(60);

pub const TICKER: &str = r#"{"table":"swap/ticker","data":[{
    "instrument_id":"BTC-USD-SWAP","last":"3640.5","best_bid":"3640.4","best_ask":"3640.6",
    "high_24h":"3700.0","low_24h":"3600.0","volume_24h":"120000","timestamp":"2019-03-05T08:40:22.123Z"
}]}"#;

/// Asks deliberately out of order
pub const DEPTH: &str = r#"{"table":"swap/depth5","data":[{
    "instrument_id":"BTC-USD-SWAP",
    "asks":[["3640.8","5","0","1"],["3641.5","2","0","1"],["3640.6","44","0","2"],["3641.0","3","0","1"]],
    "bids":[["3640.4","7","0","1"],["3640.1","12","0","3"],["3639.8","1","0","1"]],
    "timestamp":"2019-03-05T08:40:22.123Z"
}]}"#;

pub const TRADE: &str = r#"{"table":"swap/trade","data":[{
    "instrument_id":"BTC-USD-SWAP","trade_id":"4097","side":"sell","price":"3640.5","size":"12",
    "timestamp":"2019-03-05T08:40:22.123Z"
}]}"#;

pub const SWAP_CANDLE: &str = r#"{"table":"swap/candle60s","data":[{
    "instrument_id":"BTC-USD-SWAP",
    "candle":["2019-03-05T08:40:00.000Z","3640","3650","3630","3645","1200","32.9"]
}]}"#;

pub const FUTURES_CANDLE: &str = r#"{"table":"futures/candle60s","data":[{
    "instrument_id":"BTC-USD-190329",
    "candle":["2019-03-05T08:40:00.000Z","3700","3710","3690","3705","800","21.6"]
}]}"#;

/// Candle table whose period segment cannot be parsed
pub const BAD_PERIOD_CANDLE: &str = r#"{"table":"swap/candleXs","data":[{
    "instrument_id":"BTC-USD-SWAP",
    "candle":["2019-03-05T08:40:00.000Z","1","2","0.5","1.5","10","0.1"]
}]}"#;

pub const UNKNOWN_TABLE: &str = r#"{"table":"swap/funding_rate","data":[{"instrument_id":"BTC-USD-SWAP"}]}"#;

pub const SUBSCRIBE_ACK: &str = r#"{"event":"subscribe","channel":"swap/ticker:BTC-USD-SWAP"}"#;

pub const LOGIN_OK: &str = r#"{"event":"login","success":true}"#;

pub const LOGIN_REJECTED: &str = r#"{"event":"error","message":"Invalid sign","errorCode":30013}"#;

pub const CHANNEL_ERROR: &str = r#"{"event":"error","message":"Channel swap/tickers doesn't exist","errorCode":30040}"#;

/// Fast reconnects and bounded waits
pub fn config() -> StreamConfig {
    StreamConfig::new()
        .with_ready_timeout(Duration::from_secs(5))
        .with_login_timeout(Duration::from_secs(5))
        .with_reconnect(ReconnectPolicy::new().with_interval(Duration::from_millis(10)))
}

pub fn credentials() -> Credentials {
    Credentials::new("api-key", "api-secret", "passphrase").unwrap()
}

pub fn contracts() -> Arc<ContractTable> {
    Arc::new(ContractTable::from_contracts([ContractInfo {
        instrument_id: "BTC-USD-190329".into(),
        alias: "quarter".into(),
        underlying_index: "BTC".into(),
        quote_currency: "USD".into(),
    }]))
}

/// Stream backed by `connections` mock transports, in order
pub fn mock_stream(config: StreamConfig, connections: usize) -> (OkexStream, Vec<MockServer>) {
    let mut transports = Vec::new();
    let mut servers = Vec::new();
    for i in 0..connections {
        let (transport, server) = MockTransport::new(format!("mock://okex/{}", i));
        transports.push(transport);
        servers.push(server);
    }
    let stream = OkexStream::with_transport(config, contracts(), mock_factory(transports));
    (stream, servers)
}

/// Handler that forwards into a channel
pub fn forward<T: Send + 'static>() -> (impl Fn(T) + Send + Sync + 'static, mpsc::UnboundedReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        move |item| {
            let _ = tx.send(item);
        },
        rx,
    )
}

/// Next item from a handler channel
pub async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for handler")
        .expect("handler channel closed")
}

/// Next frame the client wrote, skipping keep-alives
pub async fn next_frame(server: &mut MockServer) -> Value {
    loop {
        let frame = timeout(WAIT, server.next_sent())
            .await
            .expect("timed out waiting for client frame")
            .expect("client side gone");
        if frame != "ping" {
            return serde_json::from_str(&frame).expect("client frame is JSON");
        }
    }
}

/// Non-keep-alive frames written so far
pub fn sent_frames(server: &mut MockServer) -> Vec<Value> {
    server
        .drain_sent()
        .into_iter()
        .filter(|f| f != "ping")
        .map(|f| serde_json::from_str(&f).expect("client frame is JSON"))
        .collect()
}

/// Next reported error, skipping connection events
pub async fn next_error(events: &mut mpsc::UnboundedReceiver<StreamEvent>) -> StreamError {
    loop {
        match recv(events).await {
            StreamEvent::Error(e) => return e,
            StreamEvent::Connection(_) => {}
        }
    }
}

/// Wait for the first connection event matching `pred`
pub async fn wait_for_event(
    events: &mut mpsc::UnboundedReceiver<StreamEvent>,
    pred: impl Fn(&ConnectionEvent) -> bool,
) -> ConnectionEvent {
    loop {
        if let StreamEvent::Connection(event) = recv(events).await {
            if pred(&event) {
                return event;
            }
        }
    }
}

/// Errors currently queued on the event channel
pub fn queued_errors(events: &mut mpsc::UnboundedReceiver<StreamEvent>) -> Vec<StreamError> {
    let mut errors = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let StreamEvent::Error(e) = event {
            errors.push(e);
        }
    }
    errors
}
