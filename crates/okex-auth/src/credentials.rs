//! API credentials and the signed `login` operation
//!
//! OKEx v3 signs a pre-hash string with HMAC-SHA256 over the raw secret key:
//!
//! ```text
//! base64(HMAC_SHA256(secret, timestamp + "GET" + "/users/self/verify" + body))
//! ```
//!
//! # Security
//!
//! The secret key and passphrase are stored using the `secrecy` crate which:
//! - Zeroizes memory on drop
//! - Prevents accidental logging via Debug impl
//! - Provides explicit access via `expose_secret()`

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::error::{AuthError, AuthResult};

type HmacSha256 = Hmac<Sha256>;

/// HTTP verb that is part of the login pre-hash
pub const LOGIN_METHOD: &str = "GET";

/// Request path that is part of the login pre-hash
pub const LOGIN_PATH: &str = "/users/self/verify";

/// API credentials for the private channels
pub struct Credentials {
    /// API key (public)
    api_key: String,
    /// Secret key used as the HMAC key
    secret_key: SecretString,
    /// Passphrase chosen when the key was created
    passphrase: SecretString,
}

impl Credentials {
    /// Create new credentials
    ///
    /// # Arguments
    /// * `api_key` - Your OKEx API key
    /// * `secret_key` - Your secret key, used verbatim as the HMAC key
    /// * `passphrase` - The passphrase bound to the API key
    pub fn new(
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> AuthResult<Self> {
        let api_key = api_key.into();
        let secret_key = secret_key.into();
        let passphrase = passphrase.into();

        if api_key.is_empty() {
            return Err(AuthError::InvalidCredentials("empty API key".to_string()));
        }
        if secret_key.is_empty() {
            return Err(AuthError::InvalidCredentials("empty secret key".to_string()));
        }

        Ok(Self {
            api_key,
            secret_key: SecretString::from(secret_key),
            passphrase: SecretString::from(passphrase),
        })
    }

    /// Create credentials from environment variables
    ///
    /// Reads `OKEX_API_KEY`, `OKEX_API_SECRET` and `OKEX_API_PASSPHRASE`.
    pub fn from_env() -> AuthResult<Self> {
        let api_key = std::env::var("OKEX_API_KEY")
            .map_err(|_| AuthError::EnvVarNotSet("OKEX_API_KEY".to_string()))?;
        let secret_key = std::env::var("OKEX_API_SECRET")
            .map_err(|_| AuthError::EnvVarNotSet("OKEX_API_SECRET".to_string()))?;
        let passphrase = std::env::var("OKEX_API_PASSPHRASE")
            .map_err(|_| AuthError::EnvVarNotSet("OKEX_API_PASSPHRASE".to_string()))?;

        Self::new(api_key, secret_key, passphrase)
    }

    /// Get the API key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Current unix time in whole seconds
    pub fn timestamp() -> String {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            .to_string()
    }

    /// Sign an arbitrary pre-hash string
    ///
    /// Returns the base64 encoded HMAC-SHA256 digest.
    pub fn sign(&self, prehash: &str) -> AuthResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.expose_secret().as_bytes())
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        mac.update(prehash.as_bytes());

        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    /// Sign a request the way OKEx composes its pre-hash
    pub fn sign_request(
        &self,
        timestamp: &str,
        method: &str,
        path: &str,
        body: &str,
    ) -> AuthResult<String> {
        let prehash = format!("{}{}{}{}", timestamp, method.to_uppercase(), path, body);
        self.sign(&prehash)
    }

    /// Build the login request for the given unix timestamp (seconds)
    pub fn login_request_at(&self, timestamp: impl Into<String>) -> AuthResult<LoginRequest> {
        let timestamp = timestamp.into();
        let signature = self.sign_request(&timestamp, LOGIN_METHOD, LOGIN_PATH, "")?;
        debug!(timestamp = %timestamp, "Signed login request");

        Ok(LoginRequest {
            api_key: self.api_key.clone(),
            passphrase: self.passphrase.expose_secret().to_string(),
            timestamp,
            signature,
        })
    }

    /// Build the login request for the current second
    pub fn login_request(&self) -> AuthResult<LoginRequest> {
        self.login_request_at(Self::timestamp())
    }
}

impl Clone for Credentials {
    fn clone(&self) -> Self {
        Self {
            api_key: self.api_key.clone(),
            secret_key: SecretString::from(self.secret_key.expose_secret().to_string()),
            passphrase: SecretString::from(self.passphrase.expose_secret().to_string()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "api_key",
                &format!("{}...", &self.api_key[..8.min(self.api_key.len())]),
            )
            .field("secret_key", &"[REDACTED]")
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}

/// A signed `login` operation
///
/// Serializes to `{"op":"login","args":[apiKey, passphrase, timestamp, sign]}`.
#[derive(Clone)]
pub struct LoginRequest {
    /// API key
    pub api_key: String,
    /// Passphrase in clear text, as the wire format requires
    pub passphrase: String,
    /// Unix timestamp in seconds
    pub timestamp: String,
    /// Base64 HMAC-SHA256 signature
    pub signature: String,
}

impl LoginRequest {
    /// Wire representation
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "op": "login",
            "args": [self.api_key, self.passphrase, self.timestamp, self.signature]
        })
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("api_key", &self.api_key)
            .field("passphrase", &"[REDACTED]")
            .field("timestamp", &self.timestamp)
            .field("signature", &self.signature)
            .finish()
    }
}
