//! In-flight request registry
//!
//! Holds at most one entry per fingerprint. The pipeline enters the registry
//! through [`InFlightRegistry::enter`] and keeps the returned guard alive for
//! the whole call, so the entry is removed on success, on error, and when the
//! request future is dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::fingerprint::RequestFingerprint;

/// Pending-request handle recorded for an in-flight fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlightEntry {
    pub request_id: Uuid,
    pub started_at: Instant,
}

/// Registry of requests currently on the wire
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    entries: Mutex<HashMap<RequestFingerprint, InFlightEntry>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `fingerprint`
    ///
    /// Returns `false` when an entry already exists; the caller must then fail
    /// fast instead of issuing a second network call.
    pub fn begin(&self, fingerprint: &RequestFingerprint) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains_key(fingerprint) {
            return false;
        }
        let entry = InFlightEntry { request_id: Uuid::new_v4(), started_at: Instant::now() };
        debug!(request_id = %entry.request_id, "request registered in flight");
        entries.insert(fingerprint.clone(), entry);
        true
    }

    /// Remove `fingerprint`; calling it for an absent entry is a no-op
    pub fn end(&self, fingerprint: &RequestFingerprint) {
        if let Some(entry) = self.entries.lock().remove(fingerprint) {
            debug!(
                request_id = %entry.request_id,
                elapsed_ms = u64::try_from(entry.started_at.elapsed().as_millis())
                    .unwrap_or(u64::MAX),
                "request left flight"
            );
        }
    }

    /// Register `fingerprint` and return a guard that ends it on drop
    pub fn enter(self: &Arc<Self>, fingerprint: &RequestFingerprint) -> Option<InFlightGuard> {
        self.begin(fingerprint).then(|| InFlightGuard {
            registry: Arc::clone(self),
            fingerprint: fingerprint.clone(),
        })
    }

    pub fn contains(&self, fingerprint: &RequestFingerprint) -> bool {
        self.entries.lock().contains_key(fingerprint)
    }

    pub fn entry(&self, fingerprint: &RequestFingerprint) -> Option<InFlightEntry> {
        self.entries.lock().get(fingerprint).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Age of the longest-running entry
    pub fn oldest_age(&self) -> Option<Duration> {
        self.entries.lock().values().map(|entry| entry.started_at.elapsed()).max()
    }
}

/// Keeps a fingerprint registered until dropped
#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<InFlightRegistry>,
    fingerprint: RequestFingerprint,
}

impl InFlightGuard {
    pub fn fingerprint(&self) -> &RequestFingerprint {
        &self.fingerprint
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.end(&self.fingerprint);
    }
}
