//! Stream configuration

use crate::endpoint::Endpoint;
use crate::reconnect::ReconnectPolicy;
use okex_auth::Credentials;
use std::time::Duration;

/// Default interval between `ping` keep-alives
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(28);

/// Configuration for an [`OkexStream`](crate::OkexStream)
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// WebSocket endpoint
    pub endpoint: Endpoint,
    /// API credentials; required for private channels
    pub credentials: Option<Credentials>,
    /// Reconnection settings
    pub reconnect: ReconnectPolicy,
    /// Timeout for a single connection attempt
    pub connect_timeout: Duration,
    /// How long `connect()` waits for the stream to become ready
    pub ready_timeout: Duration,
    /// How long a login waits for the exchange's acknowledgment
    pub login_timeout: Duration,
    /// Interval between `ping` keep-alives
    pub heartbeat_interval: Duration,
    /// Force a reconnect when nothing was received for this long
    pub idle_timeout: Duration,
    /// Inflate deflate-compressed binary frames
    pub decompress: bool,
    /// Re-send all recorded subscriptions on every new connection
    pub replay_subscriptions: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Production,
            credentials: None,
            reconnect: ReconnectPolicy::default(),
            connect_timeout: Duration::from_secs(10),
            ready_timeout: Duration::from_secs(30),
            login_timeout: Duration::from_secs(10),
            heartbeat_interval: DEFAULT_HEARTBEAT,
            idle_timeout: DEFAULT_HEARTBEAT * 2,
            decompress: true,
            replay_subscriptions: true,
        }
    }
}

impl StreamConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Set API credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set reconnection policy
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Give up after the first failed connection attempt
    pub fn without_reconnect(mut self) -> Self {
        self.reconnect = ReconnectPolicy::disabled();
        self
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set how long `connect()` waits for readiness
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Set login acknowledgment timeout
    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Set heartbeat interval; the idle timeout follows at twice the interval
    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self.idle_timeout = interval * 2;
        self
    }

    /// Set idle timeout independently of the heartbeat
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Enable or disable frame decompression
    pub fn with_decompression(mut self, enabled: bool) -> Self {
        self.decompress = enabled;
        self
    }

    /// Enable or disable automatic subscription replay
    pub fn with_subscription_replay(mut self, enabled: bool) -> Self {
        self.replay_subscriptions = enabled;
        self
    }

    /// Whether login is performed on each new connection
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.endpoint, Endpoint::Production);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(28));
        assert_eq!(config.idle_timeout, Duration::from_secs(56));
        assert_eq!(config.reconnect.interval, Duration::from_secs(1));
        assert!(config.decompress);
        assert!(config.replay_subscriptions);
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_builder() {
        let creds = Credentials::new("key", "secret", "pass").unwrap();
        let config = StreamConfig::new()
            .with_credentials(creds)
            .with_heartbeat(Duration::from_secs(5))
            .with_login_timeout(Duration::from_secs(2))
            .with_subscription_replay(false)
            .without_reconnect();

        assert!(config.has_credentials());
        assert_eq!(config.idle_timeout, Duration::from_secs(10));
        assert_eq!(config.login_timeout, Duration::from_secs(2));
        assert!(!config.replay_subscriptions);
        assert_eq!(config.reconnect.max_failures, Some(1));
    }

    #[test]
    fn test_idle_timeout_override() {
        let config = StreamConfig::new()
            .with_heartbeat(Duration::from_secs(5))
            .with_idle_timeout(Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
    }
}
