//! # Checkpoint Common
//!
//! Shared types, errors, and constants used across Checkpoint components.
//!
//! ## Modules
//! - `types` - Core data structures (Challenge, OtpSnapshot, FlowEvent, etc.)
//! - `error` - Common error types
//! - `constants` - Shared defaults and user-facing messages

pub mod constants;
pub mod error;
pub mod types;

pub use error::CheckpointError;
pub use types::*;
