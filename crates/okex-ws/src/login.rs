//! Pending login slot
//!
//! The caller that sends a `login` frame parks a oneshot sender here; the
//! receive loop takes it out when the acknowledgment arrives. Taking the
//! sender out of the slot is what guarantees an acknowledgment is delivered
//! at most once. An acknowledgment with nobody waiting is dropped.

use crate::channel::LoginAck;
use crate::error::{StreamError, StreamResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

/// Authentication progress of the current connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No login attempted on this connection
    NotAuthenticated,
    /// Login frame sent, waiting for the acknowledgment
    LoggingIn,
    /// Exchange accepted the login
    Authenticated,
    /// Last attempt failed
    Failed(String),
}

/// Auth state tagged with the connection generation it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStatus {
    /// Connection generation
    pub generation: u64,
    /// State on that connection
    pub state: AuthState,
}

impl Default for AuthStatus {
    fn default() -> Self {
        Self {
            generation: 0,
            state: AuthState::NotAuthenticated,
        }
    }
}

impl AuthStatus {
    /// Check if the connection of `generation` is logged in
    pub fn is_authenticated_on(&self, generation: u64) -> bool {
        self.generation == generation && self.state == AuthState::Authenticated
    }
}

/// Single-slot rendezvous between a login caller and the receive loop
#[derive(Debug, Default)]
pub struct LoginSlot {
    pending: Mutex<Option<(u64, oneshot::Sender<LoginAck>)>>,
    next_id: AtomicU64,
}

impl LoginSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a new waiter, replacing any stale one
    pub fn begin(&self) -> PendingLogin<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        *self.pending.lock() = Some((id, tx));
        PendingLogin { slot: self, id, rx }
    }

    /// Deliver an acknowledgment; returns false if nobody was waiting
    pub fn resolve(&self, ack: LoginAck) -> bool {
        match self.pending.lock().take() {
            Some((_, tx)) => tx.send(ack).is_ok(),
            None => false,
        }
    }

    /// Check if a login is waiting for its acknowledgment
    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Drop the waiter; it observes [`StreamError::LoginInterrupted`]
    pub fn cancel(&self) {
        self.pending.lock().take();
    }

    fn clear(&self, id: u64) {
        let mut pending = self.pending.lock();
        if matches!(pending.as_ref(), Some((current, _)) if *current == id) {
            *pending = None;
        }
    }
}

/// A parked login waiter
///
/// Dropping it (timeout, cancelled future) clears the slot so a late
/// acknowledgment is not delivered to the next attempt.
pub struct PendingLogin<'a> {
    slot: &'a LoginSlot,
    id: u64,
    rx: oneshot::Receiver<LoginAck>,
}

impl PendingLogin<'_> {
    /// Wait for the acknowledgment
    pub async fn wait(mut self, timeout: Duration) -> StreamResult<LoginAck> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(ack)) => Ok(ack),
            Ok(Err(_)) => Err(StreamError::LoginInterrupted),
            Err(_) => Err(StreamError::Timeout {
                what: "login acknowledgment",
                timeout,
            }),
        }
    }
}

impl Drop for PendingLogin<'_> {
    fn drop(&mut self) {
        self.slot.clear(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_delivers_once() {
        let slot = LoginSlot::new();
        let pending = slot.begin();
        assert!(slot.is_pending());

        assert!(slot.resolve(LoginAck::accepted()));
        assert!(!slot.resolve(LoginAck::accepted()));

        let ack = pending.wait(Duration::from_secs(1)).await.unwrap();
        assert!(ack.success);
        assert!(!slot.is_pending());
    }

    #[test]
    fn test_ack_without_waiter_dropped() {
        let slot = LoginSlot::new();
        assert!(!slot.resolve(LoginAck::accepted()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_clears_slot() {
        let slot = LoginSlot::new();
        let pending = slot.begin();

        let err = pending.wait(Duration::from_secs(10)).await.unwrap_err();
        assert!(matches!(err, StreamError::Timeout { .. }));
        assert!(!slot.is_pending());
    }

    #[tokio::test]
    async fn test_cancel_interrupts() {
        let slot = LoginSlot::new();
        let pending = slot.begin();
        slot.cancel();

        let err = pending.wait(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, StreamError::LoginInterrupted));
    }

    #[test]
    fn test_stale_guard_keeps_newer_waiter() {
        let slot = LoginSlot::new();
        let first = slot.begin();
        let _second = slot.begin();

        drop(first);
        assert!(slot.is_pending());
    }

    #[test]
    fn test_auth_status() {
        let status = AuthStatus {
            generation: 2,
            state: AuthState::Authenticated,
        };
        assert!(status.is_authenticated_on(2));
        assert!(!status.is_authenticated_on(3));
        assert!(!AuthStatus::default().is_authenticated_on(0));
    }
}
