//! Request identity and deduplication
//!
//! - [`fingerprint`]: stable key derived from a request's semantic content
//! - [`registry`]: tracks in-flight fingerprints and rejects exact duplicates

pub mod fingerprint;
pub mod registry;

pub use fingerprint::{fingerprint, RequestFingerprint};
pub use registry::{InFlightEntry, InFlightGuard, InFlightRegistry};
