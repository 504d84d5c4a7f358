//! Credentials and login signing for the OKEx v3 WebSocket API
//!
//! Private channels (orders, positions, account) only emit data after a
//! signed `login` operation on the same physical connection. This crate
//! builds that operation.
//!
//! # Example
//!
//! ```no_run
//! use okex_auth::Credentials;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load credentials from environment
//!     let creds = Credentials::from_env()?;
//!
//!     // Build the login frame for the current second
//!     let login = creds.login_request()?;
//!     println!("{}", login.to_json());
//!
//!     Ok(())
//! }
//! ```

mod credentials;
mod error;

pub use credentials::{Credentials, LoginRequest, LOGIN_METHOD, LOGIN_PATH};
pub use error::{AuthError, AuthResult};
