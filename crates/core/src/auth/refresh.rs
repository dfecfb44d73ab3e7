//! Single-flight token refresh
//!
//! State machine:
//!
//! ```text
//!            first 401                 refresh resolves
//!   Idle ──────────────► InFlight ─────────────────────► Settled ──► Idle
//!                          ▲   │                       (success | failure)
//!                          └───┘
//!                   later 401s join the flight
//! ```
//!
//! Exactly one refresh operation runs per cycle no matter how many requests
//! were rejected. The operation runs on its own task, so dropping the request
//! that started it does not strand the other waiters. On success the session
//! is updated before any waiter is released; on failure the session is logged
//! out once and every waiter receives `AuthExpired`.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use courier_domain::{ErrorKind, NormalizedError, RefreshedTokens};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::ports::SessionAccessor;

/// Result delivered to every request waiting on a refresh cycle
pub type RefreshOutcome = Result<RefreshedTokens, NormalizedError>;

/// Observable phase of the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    InFlight,
}

struct RefreshFlight {
    cycle: u64,
    started_at: Instant,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

enum RefreshState {
    Idle,
    InFlight(RefreshFlight),
}

/// Coordinates access-token refresh across concurrent callers
pub struct RefreshCoordinator {
    session: Arc<dyn SessionAccessor>,
    state: Mutex<RefreshState>,
    cycles: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(session: Arc<dyn SessionAccessor>) -> Self {
        Self { session, state: Mutex::new(RefreshState::Idle), cycles: AtomicU64::new(0) }
    }

    pub fn phase(&self) -> RefreshPhase {
        match &*self.state.lock() {
            RefreshState::Idle => RefreshPhase::Idle,
            RefreshState::InFlight(_) => RefreshPhase::InFlight,
        }
    }

    /// Number of refresh cycles started since creation
    pub fn cycles_started(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Requests currently waiting on the flight
    pub fn waiting(&self) -> usize {
        match &*self.state.lock() {
            RefreshState::Idle => 0,
            RefreshState::InFlight(flight) => flight.waiters.len(),
        }
    }

    /// Wait for a refreshed token
    ///
    /// Joins the flight in progress, or starts one by calling `start` when the
    /// coordinator is idle. `start` is only invoked by the caller that opens a
    /// cycle. Waiters are released in registration order.
    pub async fn refresh<F, Fut>(self: &Arc<Self>, start: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let opened = {
            let mut state = self.state.lock();
            match &mut *state {
                RefreshState::InFlight(flight) => {
                    flight.waiters.push(tx);
                    debug!(
                        cycle = flight.cycle,
                        waiters = flight.waiters.len(),
                        "joined refresh in flight"
                    );
                    None
                }
                RefreshState::Idle => {
                    let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
                    *state = RefreshState::InFlight(RefreshFlight {
                        cycle,
                        started_at: Instant::now(),
                        waiters: vec![tx],
                    });
                    Some(cycle)
                }
            }
        };

        if let Some(cycle) = opened {
            info!(cycle, "starting token refresh");
            let operation = AssertUnwindSafe(start()).catch_unwind();
            let coordinator = Arc::clone(self);
            tokio::spawn(async move {
                let outcome = operation.await.unwrap_or_else(|_| {
                    Err(NormalizedError::auth_expired("token refresh operation panicked"))
                });
                coordinator.settle(cycle, outcome).await;
            });
        }

        rx.await.unwrap_or_else(|_| {
            Err(NormalizedError::auth_expired("token refresh abandoned before settling"))
        })
    }

    async fn settle(&self, cycle: u64, outcome: RefreshOutcome) {
        let outcome = match outcome {
            Ok(tokens) => {
                self.session.store_tokens(tokens.clone()).await;
                Ok(tokens)
            }
            Err(err) => {
                warn!(cycle, error = %err, "token refresh failed, terminating session");
                self.session.logout().await;
                Err(into_auth_expired(err))
            }
        };

        let flight = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::InFlight(flight) => flight,
                RefreshState::Idle => return,
            }
        };

        info!(
            cycle,
            waiters = flight.waiters.len(),
            elapsed_ms = u64::try_from(flight.started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            success = outcome.is_ok(),
            "token refresh settled"
        );

        for waiter in flight.waiters {
            // A waiter whose request was dropped no longer listens.
            let _ = waiter.send(outcome.clone());
        }
    }
}

fn into_auth_expired(err: NormalizedError) -> NormalizedError {
    if err.kind() == ErrorKind::AuthExpired {
        return err;
    }
    NormalizedError::auth_expired(format!("session expired: {}", err.message())).with_cause(err)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use courier_domain::{SessionSnapshot, TokenState};
    use futures::future::join_all;

    use super::*;

    #[derive(Default)]
    struct RecordingSession {
        snapshot: Mutex<SessionSnapshot>,
        stores: AtomicUsize,
        logouts: AtomicUsize,
    }

    #[async_trait]
    impl SessionAccessor for RecordingSession {
        async fn state(&self) -> SessionSnapshot {
            self.snapshot.lock().clone()
        }

        async fn store_tokens(&self, tokens: RefreshedTokens) {
            self.stores.fetch_add(1, Ordering::SeqCst);
            self.snapshot.lock().tokens.apply(&tokens);
        }

        async fn logout(&self) {
            self.logouts.fetch_add(1, Ordering::SeqCst);
            self.snapshot.lock().tokens = TokenState::default();
        }
    }

    fn coordinator() -> (Arc<RefreshCoordinator>, Arc<RecordingSession>) {
        let session = Arc::new(RecordingSession::default());
        session.snapshot.lock().tokens = TokenState::new("old").with_refresh_token("r1");
        (Arc::new(RefreshCoordinator::new(session.clone())), session)
    }

    async fn slow_refresh(result: RefreshOutcome) -> RefreshOutcome {
        tokio::time::sleep(Duration::from_millis(20)).await;
        result
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let (coordinator, session) = coordinator();
        let started = Arc::new(AtomicUsize::new(0));

        let waiters = (0..5).map(|_| {
            let started = Arc::clone(&started);
            let coordinator = Arc::clone(&coordinator);
            async move {
                coordinator
                    .refresh(move || {
                        started.fetch_add(1, Ordering::SeqCst);
                        slow_refresh(Ok(RefreshedTokens::new("new", None)))
                    })
                    .await
            }
        });
        let outcomes = join_all(waiters).await;

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.cycles_started(), 1);
        assert!(outcomes.iter().all(|outcome| {
            outcome.as_ref().is_ok_and(|tokens| tokens.access_token == "new")
        }));
        assert_eq!(session.stores.load(Ordering::SeqCst), 1);
        assert_eq!(session.state().await.tokens.access_token.as_deref(), Some("new"));
        assert_eq!(coordinator.phase(), RefreshPhase::Idle);
    }

    #[tokio::test]
    async fn failed_refresh_logs_out_once_and_expires_every_waiter() {
        let (coordinator, session) = coordinator();

        let waiters = (0..5).map(|_| {
            let coordinator = Arc::clone(&coordinator);
            async move {
                let failure = NormalizedError::http_status(500, "refresh down");
                coordinator.refresh(|| slow_refresh(Err(failure))).await
            }
        });
        let outcomes = join_all(waiters).await;

        assert_eq!(session.logouts.load(Ordering::SeqCst), 1);
        assert_eq!(session.stores.load(Ordering::SeqCst), 0);
        for outcome in outcomes {
            let err = outcome.expect_err("refresh failure must reach every waiter");
            assert_eq!(err.kind(), ErrorKind::AuthExpired);
            assert!(err.message().contains("refresh down"));
        }
    }

    #[tokio::test]
    async fn settled_coordinator_starts_a_fresh_cycle() {
        let (coordinator, _session) = coordinator();

        let first = coordinator.refresh(|| slow_refresh(Ok(RefreshedTokens::new("a", None)))).await;
        assert_eq!(coordinator.phase(), RefreshPhase::Idle);
        let second =
            coordinator.refresh(|| slow_refresh(Ok(RefreshedTokens::new("b", None)))).await;

        assert_eq!(first.map(|t| t.access_token).ok().as_deref(), Some("a"));
        assert_eq!(second.map(|t| t.access_token).ok().as_deref(), Some("b"));
        assert_eq!(coordinator.cycles_started(), 2);
    }

    #[tokio::test]
    async fn phase_reports_flight_while_waiting() {
        let (coordinator, _session) = coordinator();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let pending = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator
                    .refresh(move || async move {
                        let _ = release_rx.await;
                        Ok(RefreshedTokens::new("new", None))
                    })
                    .await
            })
        };

        while coordinator.phase() != RefreshPhase::InFlight {
            tokio::task::yield_now().await;
        }
        assert_eq!(coordinator.waiting(), 1);

        release_tx.send(()).expect("refresh task still waiting");
        let outcome = pending.await.expect("task completes");
        assert!(outcome.is_ok());
        assert_eq!(coordinator.waiting(), 0);
    }

    #[tokio::test]
    async fn waiters_are_released_in_registration_order() {
        let (coordinator, _session) = coordinator();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let mut gate = Some(release_rx);
        let released = Arc::new(Mutex::new(Vec::new()));

        let mut joiners = Vec::new();
        for idx in 0..5 {
            let joiner = Arc::clone(&coordinator);
            let released = Arc::clone(&released);
            let gate = gate.take();
            joiners.push(tokio::spawn(async move {
                let outcome = joiner
                    .refresh(move || async move {
                        if let Some(gate) = gate {
                            let _ = gate.await;
                        }
                        Ok(RefreshedTokens::new("new", None))
                    })
                    .await;
                released.lock().push(idx);
                outcome
            }));

            while coordinator.waiting() != idx + 1 {
                tokio::task::yield_now().await;
            }
        }

        release_tx.send(()).expect("refresh task still waiting");
        for joiner in joiners {
            assert!(joiner.await.expect("joiner completes").is_ok());
        }

        assert_eq!(*released.lock(), vec![0, 1, 2, 3, 4]);
        assert_eq!(coordinator.cycles_started(), 1);
    }

    #[tokio::test]
    async fn panicking_operation_expires_session() {
        let (coordinator, session) = coordinator();

        let outcome = coordinator
            .refresh(|| async {
                panic!("refresh exploded");
                #[allow(unreachable_code)]
                Ok(RefreshedTokens::new("never", None))
            })
            .await;

        assert_eq!(outcome.expect_err("panic must surface").kind(), ErrorKind::AuthExpired);
        assert_eq!(session.logouts.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.phase(), RefreshPhase::Idle);
    }

    #[tokio::test]
    async fn auth_expired_errors_pass_through_unwrapped() {
        let (coordinator, _session) = coordinator();

        let outcome = coordinator
            .refresh(|| async { Err(NormalizedError::auth_expired("refresh token rejected")) })
            .await;

        let err = outcome.expect_err("refresh failed");
        assert_eq!(err.message(), "refresh token rejected");
        assert!(err.cause().is_none());
    }
}
