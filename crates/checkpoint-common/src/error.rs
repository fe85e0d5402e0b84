//! Common error types for Checkpoint components.

use thiserror::Error;

/// Common errors across Checkpoint components
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Secure random source unavailable
    #[error("Entropy source unavailable: {0}")]
    Entropy(String),

    /// OTP service error
    #[error("OTP service error: {0}")]
    Service(String),
}

