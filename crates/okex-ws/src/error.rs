//! Error types for stream operations

use crate::connection::ConnectionState;
use crate::transport::TransportError;
use okex_auth::AuthError;
use okex_types::{Category, ContractType, CurrencyPair};
use std::time::Duration;

/// Errors that can occur while operating an [`OkexStream`](crate::OkexStream)
///
/// Errors raised on the receive path (protocol, decode, exchange errors) are
/// not returned to any caller; they are reported on the event channel as
/// [`StreamEvent::Error`](crate::StreamEvent::Error) and the connection keeps
/// running.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Socket level failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Credential or signing failure
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Operation needs a ready connection
    #[error("connection not ready (state: {state:?})")]
    NotReady {
        /// State at the time of the call
        state: ConnectionState,
    },

    /// The stream was closed by the caller
    #[error("stream closed")]
    Closed,

    /// Subscribe attempted without a handler for the category
    #[error("no handler registered for {0}")]
    NoHandler(Category),

    /// Login or private subscription without credentials
    #[error("no credentials configured")]
    NoCredentials,

    /// Exchange answered the login with a failure
    #[error("login rejected: {message}")]
    LoginRejected {
        /// Exchange error code, if any
        code: Option<String>,
        /// Exchange message
        message: String,
    },

    /// Connection dropped while a login was pending
    #[error("login interrupted by disconnect")]
    LoginInterrupted,

    /// Timeout waiting for a response or state
    #[error("timeout after {timeout:?} waiting for {what}")]
    Timeout {
        /// What was being waited for
        what: &'static str,
        /// How long we waited
        timeout: Duration,
    },

    /// No dated contract matches the pair and contract type
    #[error("unknown contract: {pair} {contract_type}")]
    UnknownContract {
        /// Requested pair
        pair: CurrencyPair,
        /// Requested contract type
        contract_type: ContractType,
    },

    /// Table name did not map to any category
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// Frame matched no known shape
    #[error("unrecognized message: {0}")]
    UnrecognizedMessage(String),

    /// Exchange reported an error
    #[error("exchange error {code}: {message}")]
    Exchange {
        /// Error code as sent by OKEx
        code: String,
        /// Error message
        message: String,
    },

    /// Payload did not match the category's wire shape
    #[error("failed to decode {category} payload: {message}")]
    Decode {
        /// Category being decoded
        category: Category,
        /// Decoder message
        message: String,
    },

    /// Reconnect policy gave up
    #[error("reconnect failed after {failures} consecutive failures")]
    ReconnectExhausted {
        /// Consecutive connect failures
        failures: u32,
    },
}

impl StreamError {
    /// Build a decode error for a category
    pub fn decode(category: Category, message: impl ToString) -> Self {
        Self::Decode {
            category,
            message: message.to_string(),
        }
    }

    /// Check if retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::NotReady { .. }
                | Self::LoginInterrupted
                | Self::Timeout { .. }
                | Self::ReconnectExhausted { .. }
        )
    }

    /// Check if this error came from the receive path
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            Self::Json(_)
                | Self::UnknownChannel(_)
                | Self::UnrecognizedMessage(_)
                | Self::Exchange { .. }
                | Self::Decode { .. }
        ) || matches!(self, Self::Transport(e) if e.is_frame_error())
    }
}

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;
