//! One-time passcode confirmation flow.
//!
//! - `session` - digit entry, submit, and resend state machine
//! - `countdown` - resend cooldown counter
//! - `controller` - async driver owning the countdown task
//! - `service` - interface to the issuing/verifying service
//! - `http` - REST implementation of that interface

mod controller;
mod countdown;
mod http;
mod service;
mod session;

pub use controller::{Activation, OtpFlowController};
pub use countdown::Countdown;
pub use http::HttpOtpService;
pub use service::{OtpService, ServiceError};
pub use session::{KeyOutcome, OtpSession, ResendOutcome, ResendTicket, SubmitOutcome, SubmitTicket};
