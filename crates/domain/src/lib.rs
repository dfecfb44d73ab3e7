//! # Courier Domain
//!
//! Request, response, session and error types shared by the Courier HTTP
//! pipeline.
//!
//! This crate contains:
//! - Request descriptors and bodies as handed to the pipeline
//! - Normalized responses and the four-kind error taxonomy
//! - Session token state and refreshed credentials
//! - Pipeline configuration structures and header constants
//!
//! ## Architecture
//! - No dependencies on other Courier crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
