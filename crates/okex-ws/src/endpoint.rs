//! WebSocket endpoint definitions

use std::fmt;

/// OKEx v3 WebSocket endpoints
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Endpoint {
    /// Production endpoint (default)
    #[default]
    Production,
    /// Any other URL (proxies, local test servers)
    Custom(String),
}

impl Endpoint {
    /// Get the WebSocket URL for this endpoint
    pub fn url(&self) -> &str {
        match self {
            Self::Production => "wss://real.okex.com:8443/ws/v3",
            Self::Custom(url) => url,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}
