//! Inbound frame classification
//!
//! Every text frame is one of:
//!
//! - the literal `pong` (or `ping`) keep-alive text,
//! - an event frame: `{"event":"subscribe"|"login"|"error", ...}`,
//! - a table frame: `{"table":"swap/depth5","data":[...]}`,
//! - a bare error: `{"errorCode":..., "message":...}`.
//!
//! Anything else is unrecognized. Classification never fails the
//! connection; errors are returned to the caller to be reported.

use crate::error::{StreamError, StreamResult};
use okex_types::{Category, KlinePeriod, Market};
use serde::Deserialize;
use serde_json::Value;

/// Keep-alive text sent by the client
pub const PING: &str = "ping";
/// Keep-alive text answered by the server
pub const PONG: &str = "pong";

/// Raw envelope shared by every JSON frame
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// `subscribe`, `login` or `error`
    #[serde(default)]
    pub event: Option<String>,
    /// Channel echoed in subscribe acks
    #[serde(default)]
    pub channel: Option<String>,
    /// Table name of a data frame
    #[serde(default)]
    pub table: Option<String>,
    /// Payload of a data frame
    #[serde(default)]
    pub data: Value,
    /// Login result flag
    #[serde(default)]
    pub success: Option<bool>,
    /// Error code, number or string
    #[serde(default, rename = "errorCode")]
    pub error_code: Option<Value>,
    /// Error message
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope {
    /// Error code as text
    pub fn error_code_str(&self) -> Option<String> {
        self.error_code.as_ref().map(|code| match code {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Login acknowledgment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAck {
    /// Whether the exchange accepted the login
    pub success: bool,
    /// Error code of a rejection
    pub code: Option<String>,
    /// Message of a rejection
    pub message: Option<String>,
}

impl LoginAck {
    /// A successful acknowledgment
    pub fn accepted() -> Self {
        Self {
            success: true,
            code: None,
            message: None,
        }
    }

    /// A rejection
    pub fn rejected(code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            message: Some(message.into()),
        }
    }
}

/// Parsed table name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableKind {
    /// Category selecting decoder and handler
    pub category: Category,
    /// `swap` or `futures` prefix, if recognized
    pub market: Option<Market>,
    /// Candle granularity in seconds; 0 when absent or unparseable
    pub period_secs: u32,
}

impl TableKind {
    /// Candle period, if the table carried a usable one
    pub fn period(&self) -> Option<KlinePeriod> {
        KlinePeriod::from_seconds(self.period_secs)
    }
}

/// Classified inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// `ping`/`pong` text
    KeepAlive,
    /// Subscribe acknowledgment
    Subscribed {
        /// Channel echoed by the exchange
        channel: Option<String>,
    },
    /// Login acknowledgment
    Login(LoginAck),
    /// Error reported by the exchange (event or bare error code)
    ExchangeError {
        /// Error code
        code: String,
        /// Error message
        message: String,
    },
    /// Data frame
    Table {
        /// Raw table name
        table: String,
        /// Parsed table name
        kind: TableKind,
        /// Payload
        data: Value,
    },
}

/// Check for literal keep-alive text
pub fn is_keepalive(text: &str) -> bool {
    let text = text.trim();
    text == PONG || text == PING
}

/// Classify one inbound text frame
pub fn classify(text: &str) -> StreamResult<Frame> {
    if is_keepalive(text) {
        return Ok(Frame::KeepAlive);
    }

    let envelope: Envelope = serde_json::from_str(text)?;

    if let Some(event) = envelope.event.as_deref() {
        return match event {
            "subscribe" => Ok(Frame::Subscribed {
                channel: envelope.channel,
            }),
            "login" => {
                let ack = if envelope.success.unwrap_or(false) {
                    LoginAck::accepted()
                } else {
                    LoginAck::rejected(
                        envelope.error_code_str(),
                        envelope.message.clone().unwrap_or_else(|| "login failed".into()),
                    )
                };
                Ok(Frame::Login(ack))
            }
            "error" => Ok(Frame::ExchangeError {
                code: envelope.error_code_str().unwrap_or_default(),
                message: envelope.message.unwrap_or_default(),
            }),
            _ => Err(StreamError::UnrecognizedMessage(text.to_string())),
        };
    }

    if let Some(code) = envelope.error_code_str() {
        return Ok(Frame::ExchangeError {
            code,
            message: envelope.message.unwrap_or_default(),
        });
    }

    if let Some(table) = envelope.table {
        let kind = classify_table(&table)?;
        return Ok(Frame::Table {
            table,
            kind,
            data: envelope.data,
        });
    }

    Err(StreamError::UnrecognizedMessage(text.to_string()))
}

/// Map a table name such as `swap/depth5` or `futures/candle60s` to its kind
pub fn classify_table(table: &str) -> StreamResult<TableKind> {
    let market = table.split('/').next().and_then(Market::from_prefix);

    // Candle tables embed a variable period, so match them by substring
    if table.contains("/candle") {
        return Ok(TableKind {
            category: Category::Candle,
            market,
            period_secs: candle_period(table),
        });
    }

    let channel = table
        .split('/')
        .nth(1)
        .map(|segment| segment.split(':').next().unwrap_or(segment))
        .unwrap_or_default();

    let category = Category::from_channel(channel)
        .ok_or_else(|| StreamError::UnknownChannel(table.to_string()))?;

    Ok(TableKind {
        category,
        market,
        period_secs: 0,
    })
}

/// Candle granularity in seconds from a table or topic name
///
/// Returns 0 unless the name splits into exactly two `/` parts and the
/// second one is `candle<N>s`, optionally followed by `:<instrument>`.
pub fn candle_period(table: &str) -> u32 {
    let parts: Vec<&str> = table.split('/').collect();
    if parts.len() != 2 {
        return 0;
    }

    let segment = parts[1].split(':').next().unwrap_or_default();
    segment
        .strip_prefix("candle")
        .and_then(|rest| rest.strip_suffix('s'))
        .and_then(|secs| secs.parse::<u32>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keepalive() {
        assert_eq!(classify("pong").unwrap(), Frame::KeepAlive);
        assert_eq!(classify("ping").unwrap(), Frame::KeepAlive);
    }

    #[test]
    fn test_subscribe_ack() {
        let frame = classify(r#"{"event":"subscribe","channel":"swap/ticker:BTC-USD-SWAP"}"#).unwrap();
        assert_eq!(
            frame,
            Frame::Subscribed {
                channel: Some("swap/ticker:BTC-USD-SWAP".into())
            }
        );
    }

    #[test]
    fn test_login_ack() {
        assert_eq!(
            classify(r#"{"event":"login","success":true}"#).unwrap(),
            Frame::Login(LoginAck::accepted())
        );
        match classify(r#"{"event":"login","success":false}"#).unwrap() {
            Frame::Login(ack) => assert!(!ack.success),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_error_event() {
        let frame = classify(r#"{"event":"error","message":"Invalid sign","errorCode":30013}"#).unwrap();
        assert_eq!(
            frame,
            Frame::ExchangeError {
                code: "30013".into(),
                message: "Invalid sign".into()
            }
        );
    }

    #[test]
    fn test_bare_error_code() {
        let frame = classify(r#"{"errorCode":"30040","message":"channel doesn't exist"}"#).unwrap();
        assert!(matches!(frame, Frame::ExchangeError { code, .. } if code == "30040"));
    }

    #[test]
    fn test_unknown_event() {
        assert!(matches!(
            classify(r#"{"event":"unsubscribe","channel":"swap/ticker"}"#),
            Err(StreamError::UnrecognizedMessage(_))
        ));
    }

    #[test]
    fn test_unrecognized_shapes() {
        assert!(matches!(classify(r#"{"foo":1}"#), Err(StreamError::UnrecognizedMessage(_))));
        assert!(matches!(classify("not json"), Err(StreamError::Json(_))));
    }

    #[test]
    fn test_table_categories() {
        let cases = [
            ("swap/ticker", Category::Ticker),
            ("swap/depth5", Category::Depth),
            ("futures/depth5", Category::Depth),
            ("swap/trade", Category::Trade),
            ("futures/order", Category::Order),
            ("swap/account", Category::Account),
            ("swap/position", Category::Position),
            ("swap/ticker:BTC-USD-SWAP", Category::Ticker),
        ];
        for (table, category) in cases {
            assert_eq!(classify_table(table).unwrap().category, category, "{}", table);
        }
    }

    #[test]
    fn test_unknown_table() {
        assert!(matches!(
            classify_table("swap/funding_rate"),
            Err(StreamError::UnknownChannel(t)) if t == "swap/funding_rate"
        ));
        assert!(classify_table("ticker").is_err());
    }

    #[test]
    fn test_candle_tables() {
        let swap = classify_table("swap/candle60s:BTC-USD-SWAP").unwrap();
        assert_eq!(swap.category, Category::Candle);
        assert_eq!(swap.market, Some(Market::Swap));
        assert_eq!(swap.period(), Some(KlinePeriod::M1));

        let futures = classify_table("futures/candle60s:BTC-USD-190329").unwrap();
        assert_eq!(futures.category, Category::Candle);
        assert_eq!(futures.market, Some(Market::Futures));
        assert_eq!(futures.period_secs, 60);
    }

    #[test]
    fn test_candle_period_sentinel() {
        assert_eq!(candle_period("swap/candle900s"), 900);
        assert_eq!(candle_period("swap/candleXs"), 0);
        assert_eq!(candle_period("swap/candle60"), 0);
        assert_eq!(candle_period("a/b/candle60s"), 0);

        let kind = classify_table("swap/candleabc").unwrap();
        assert_eq!(kind.category, Category::Candle);
        assert_eq!(kind.period_secs, 0);
        assert_eq!(kind.period(), None);
    }

    #[test]
    fn test_table_frame_carries_data() {
        let frame = classify(r#"{"table":"swap/trade","data":[{"side":"buy"}]}"#).unwrap();
        match frame {
            Frame::Table { table, kind, data } => {
                assert_eq!(table, "swap/trade");
                assert_eq!(kind.category, Category::Trade);
                assert_eq!(data[0]["side"], "buy");
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}
