//! Connection lifecycle events
//!
//! Decoded market and account data go to the per-category handlers. What is
//! left for the event channel is the connection's own story: connects,
//! drops, retries, logins, and every error raised on the receive path.

use crate::error::StreamError;
use std::time::Duration;

/// Reason for disconnection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Server closed the connection
    ServerClosed,
    /// Network error occurred
    NetworkError(String),
    /// No inbound traffic within the idle timeout
    IdleTimeout,
    /// Client requested shutdown
    Shutdown,
}

/// Connection lifecycle events
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Physical connection established
    Connected {
        /// Connection generation, starts at 1
        generation: u64,
    },
    /// Login acknowledged by the exchange
    Authenticated {
        /// Connection generation the login belongs to
        generation: u64,
    },
    /// Login rejected, timed out or interrupted
    LoginFailed {
        /// Connection generation the login belongs to
        generation: u64,
        /// Failure description
        reason: String,
    },
    /// Connection was lost
    Disconnected {
        /// Reason for disconnection
        reason: DisconnectReason,
    },
    /// Waiting before the next connection attempt
    Reconnecting {
        /// Consecutive failed attempts so far (0 after a drop)
        failures: u32,
        /// Delay before the next attempt
        delay: Duration,
    },
    /// Reconnect policy exhausted; the stream is closed
    ReconnectFailed {
        /// Final error
        error: String,
    },
    /// Recorded subscriptions re-sent on a new connection
    SubscriptionsRestored {
        /// Number of topics re-sent
        count: usize,
    },
}

/// Everything emitted on the stream's event channel
#[derive(Debug)]
pub enum StreamEvent {
    /// Connection lifecycle
    Connection(ConnectionEvent),
    /// Error reported by the receive path; the stream keeps running
    Error(StreamError),
}

impl StreamEvent {
    /// Returns the connection event, if this is one
    pub fn as_connection(&self) -> Option<&ConnectionEvent> {
        match self {
            Self::Connection(event) => Some(event),
            Self::Error(_) => None,
        }
    }

    /// Returns the error, if this is one
    pub fn as_error(&self) -> Option<&StreamError> {
        match self {
            Self::Error(err) => Some(err),
            Self::Connection(_) => None,
        }
    }
}

impl From<ConnectionEvent> for StreamEvent {
    fn from(event: ConnectionEvent) -> Self {
        Self::Connection(event)
    }
}

impl From<StreamError> for StreamEvent {
    fn from(err: StreamError) -> Self {
        Self::Error(err)
    }
}
