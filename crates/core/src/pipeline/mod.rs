//! Request pipeline
//!
//! [`HttpPipeline`] is the single entry point used by application code. It
//! wires fingerprinting, in-flight deduplication, credential injection,
//! response normalization, and refresh-then-replay on 401 around a
//! [`Transport`](ports::Transport).

pub mod client;
pub mod ports;

pub use client::{HttpPipeline, HttpPipelineBuilder, RefreshClient};
pub use ports::Transport;
