//! # Checkpoint
//!
//! Human-verification core: a locally generated text CAPTCHA and a
//! time-boxed OTP confirmation flow.
//!
//! ## Components
//! ```text
//! form ──► ChallengeGenerator ──► valid: bool (watch)
//!
//! recovery step ──► OtpFlowController ──► OtpService (request / verify)
//!                          │
//!                          └──► FlowEvent (Verified / Redirected / ResendReady)
//! ```

pub mod captcha;
pub mod config;
pub mod otp;

pub use captcha::ChallengeGenerator;
pub use config::{AppConfig, OtpConfig, OtpServiceConfig};
pub use otp::{Activation, HttpOtpService, OtpFlowController, OtpService, ServiceError};
