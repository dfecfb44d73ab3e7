//! In-memory session store
//!
//! Holds the current tokens and user identity behind a lock and announces
//! changes on a broadcast channel, so screens and sockets can react to a
//! refreshed token or a forced logout without polling.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use courier_core::SessionAccessor;
use courier_domain::{RefreshedTokens, SessionSnapshot, TokenState, UserIdentity};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 16;

/// Change notifications published by [`InMemorySession`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    TokensRefreshed { rotated_refresh_token: bool },
    LoggedOut,
}

/// [`SessionAccessor`] keeping the session in process memory
#[derive(Debug)]
pub struct InMemorySession {
    snapshot: RwLock<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
    logouts: AtomicUsize,
}

impl Default for InMemorySession {
    fn default() -> Self {
        Self::new(SessionSnapshot::default())
    }
}

impl InMemorySession {
    pub fn new(snapshot: SessionSnapshot) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { snapshot: RwLock::new(snapshot), events, logouts: AtomicUsize::new(0) }
    }

    /// Receive future session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Replace the session after a successful login
    pub fn sign_in(&self, tokens: TokenState, user: Option<UserIdentity>) {
        *self.snapshot.write() = SessionSnapshot::new(tokens, user);
        info!("session signed in");
        self.publish(SessionEvent::SignedIn);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.read().clone()
    }

    /// Number of logouts performed since creation
    pub fn logout_count(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine: nobody is listening yet.
        if self.events.send(event).is_err() {
            debug!("session event dropped, no subscribers");
        }
    }
}

#[async_trait]
impl SessionAccessor for InMemorySession {
    async fn state(&self) -> SessionSnapshot {
        self.snapshot()
    }

    async fn store_tokens(&self, tokens: RefreshedTokens) {
        let rotated_refresh_token = tokens.refresh_token.is_some();
        self.snapshot.write().tokens.apply(&tokens);
        info!(rotated_refresh_token, "session tokens refreshed");
        self.publish(SessionEvent::TokensRefreshed { rotated_refresh_token });
    }

    async fn logout(&self) {
        *self.snapshot.write() = SessionSnapshot::default();
        self.logouts.fetch_add(1, Ordering::SeqCst);
        info!("session logged out");
        self.publish(SessionEvent::LoggedOut);
    }
}
