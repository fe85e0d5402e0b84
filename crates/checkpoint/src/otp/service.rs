//! OTP issuing/verifying service interface.

use checkpoint_common::CheckpointError;
use checkpoint_common::constants::messages::{DEFAULT_REJECTION, SERVICE_UNAVAILABLE};
use thiserror::Error;

/// Failure reported by (or on the way to) the OTP service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The service answered and refused the request
    #[error("{0}")]
    Rejected(String),

    /// The service could not be reached or failed internally
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with something we could not interpret
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ServiceError {
    /// Short text suitable for showing next to the form
    pub fn user_message(&self) -> &str {
        match self {
            Self::Rejected(msg) if !msg.trim().is_empty() => msg.trim(),
            Self::Rejected(_) => DEFAULT_REJECTION,
            Self::Unavailable(_) | Self::Malformed(_) => SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ServiceError> for CheckpointError {
    fn from(err: ServiceError) -> Self {
        CheckpointError::Service(err.to_string())
    }
}

/// The external service that issues and checks one-time passcodes.
///
/// Delivery (email/SMS) happens behind this interface.
#[async_trait::async_trait]
pub trait OtpService: Send + Sync {
    /// Issue a new code to `recipient`, invalidating any previous one
    async fn request_otp(&self, recipient: &str, role: &str) -> Result<(), ServiceError>;

    /// Check a submitted code
    async fn verify_otp(&self, recipient: &str, code: &str) -> Result<(), ServiceError>;
}
