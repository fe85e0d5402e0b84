//! OTP entry state machine.
//!
//! `OtpSession` is pure state: it never touches the network or the clock.
//! The controller feeds it keystrokes, one-second ticks, and service results.
//! Long-running calls are split into `begin_*` (take a ticket) and
//! `finish_*` (apply the result) so the lock is never held across an await.

use checkpoint_common::constants::messages::{RESEND_FAILED, TRY_AGAIN_SUFFIX};
use checkpoint_common::{AttemptState, FlowMessage, OtpSnapshot, ResendState, VerifiedOtp};

use super::countdown::Countdown;
use super::service::ServiceError;
use crate::config::OtpConfig;

/// Result of a keystroke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// State changed; `focus` is the cell that should take focus next
    Accepted { focus: usize },
    /// Input ignored, nothing changed
    Rejected,
}

/// Result of a submit request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Not every cell is filled; nothing was sent
    Incomplete,
    /// A verification is already in flight
    Busy,
    /// The flow is no longer accepting input
    Inactive,
    /// The code was accepted
    Verified(VerifiedOtp),
    /// The code was refused; the message is on display
    Rejected(String),
    /// The result arrived for a code that is no longer current
    Discarded,
}

/// Result of a resend request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    /// Still cooling down; nothing was sent
    CoolingDown(u32),
    /// A resend is already in flight
    Busy,
    /// The flow is no longer accepting input
    Inactive,
    /// A new code was issued
    Sent,
    /// Issuance failed; the message is on display and resend stays available
    Failed(String),
    /// The result arrived after the flow was torn down
    Discarded,
}

/// A verification in flight
#[derive(Debug, Clone)]
pub struct SubmitTicket {
    pub recipient: String,
    pub code: String,
    epoch: u64,
}

/// A resend in flight
#[derive(Debug, Clone)]
pub struct ResendTicket {
    pub recipient: String,
}

/// State of one OTP confirmation attempt
#[derive(Debug, Clone)]
pub struct OtpSession {
    recipient: String,
    digits: Vec<Option<char>>,
    focus: usize,
    attempt: AttemptState,
    countdown: Countdown,
    message: Option<FlowMessage>,
    resend_in_flight: bool,
    /// Bumped on every issued code; stale verifications are dropped
    epoch: u64,
}

impl OtpSession {
    pub fn new(recipient: impl Into<String>, config: &OtpConfig) -> Self {
        Self {
            recipient: recipient.into(),
            digits: vec![None; config.code_length],
            focus: 0,
            attempt: AttemptState::Editing,
            countdown: Countdown::new(config.resend_cooldown_secs),
            message: None,
            resend_in_flight: false,
            epoch: 0,
        }
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn attempt(&self) -> AttemptState {
        self.attempt
    }

    pub fn resend_state(&self) -> ResendState {
        self.countdown.state()
    }

    pub fn message(&self) -> Option<&FlowMessage> {
        self.message.as_ref()
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    pub fn is_verified(&self) -> bool {
        self.attempt == AttemptState::Verified
    }

    /// Put a keystroke into cell `index`.
    ///
    /// Only a single ASCII digit is accepted. Focus moves to the next cell,
    /// staying put on the last one.
    pub fn input(&mut self, index: usize, key: &str) -> KeyOutcome {
        if !self.attempt.is_editable() || index >= self.digits.len() {
            return KeyOutcome::Rejected;
        }

        let mut chars = key.chars();
        let digit = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_digit() => c,
            _ => return KeyOutcome::Rejected,
        };

        self.digits[index] = Some(digit);
        self.focus = (index + 1).min(self.digits.len() - 1);
        self.mark_edited();

        KeyOutcome::Accepted { focus: self.focus }
    }

    /// Handle backspace in cell `index`.
    ///
    /// A filled cell is cleared in place; an empty cell hands focus to the
    /// previous one.
    pub fn backspace(&mut self, index: usize) -> KeyOutcome {
        if !self.attempt.is_editable() || index >= self.digits.len() {
            return KeyOutcome::Rejected;
        }

        if self.digits[index].take().is_some() {
            self.focus = index;
            self.mark_edited();
        } else {
            self.focus = index.saturating_sub(1);
        }

        KeyOutcome::Accepted { focus: self.focus }
    }

    /// Advance the resend countdown by one second.
    ///
    /// Returns true on the tick that makes resend available.
    pub fn tick(&mut self) -> bool {
        if self.is_verified() {
            return false;
        }
        self.countdown.tick()
    }

    /// Start a verification if the code is complete
    pub fn begin_submit(&mut self) -> Result<SubmitTicket, SubmitOutcome> {
        match self.attempt {
            AttemptState::Submitting => return Err(SubmitOutcome::Busy),
            AttemptState::Verified => return Err(SubmitOutcome::Inactive),
            AttemptState::Editing | AttemptState::Failed => {}
        }
        if !self.is_complete() {
            return Err(SubmitOutcome::Incomplete);
        }

        self.attempt = AttemptState::Submitting;
        Ok(SubmitTicket {
            recipient: self.recipient.clone(),
            code: self.code(),
            epoch: self.epoch,
        })
    }

    /// Apply the service's answer to a verification
    pub fn finish_submit(
        &mut self,
        ticket: SubmitTicket,
        result: Result<(), ServiceError>,
    ) -> SubmitOutcome {
        if ticket.epoch != self.epoch {
            // A resend replaced the code while this verification was in flight
            self.attempt = AttemptState::Editing;
            return SubmitOutcome::Discarded;
        }

        match result {
            Ok(()) => {
                self.attempt = AttemptState::Verified;
                self.message = None;
                SubmitOutcome::Verified(VerifiedOtp {
                    recipient: ticket.recipient,
                    code: ticket.code,
                    verified_at: chrono::Utc::now(),
                })
            }
            Err(err) => {
                let text = format!(
                    "{}. {}",
                    err.user_message().trim_end_matches('.'),
                    TRY_AGAIN_SUFFIX
                );
                self.attempt = AttemptState::Failed;
                self.message = Some(FlowMessage::error(text.clone()));
                SubmitOutcome::Rejected(text)
            }
        }
    }

    /// Start a resend if the cooldown has elapsed
    pub fn begin_resend(&mut self) -> Result<ResendTicket, ResendOutcome> {
        if self.is_verified() {
            return Err(ResendOutcome::Inactive);
        }
        if let ResendState::Cooldown(secs) = self.countdown.state() {
            return Err(ResendOutcome::CoolingDown(secs));
        }
        if self.resend_in_flight {
            return Err(ResendOutcome::Busy);
        }

        self.resend_in_flight = true;
        Ok(ResendTicket {
            recipient: self.recipient.clone(),
        })
    }

    /// Apply the service's answer to a resend
    pub fn finish_resend(&mut self, result: Result<(), ServiceError>) -> ResendOutcome {
        self.resend_in_flight = false;

        match result {
            Ok(()) => {
                self.epoch += 1;
                self.digits.iter_mut().for_each(|d| *d = None);
                self.focus = 0;
                self.countdown.reset();
                if self.attempt == AttemptState::Failed {
                    self.attempt = AttemptState::Editing;
                }
                self.message = Some(FlowMessage::info(format!(
                    "A new OTP has been sent to {}.",
                    self.recipient
                )));
                ResendOutcome::Sent
            }
            Err(err) => {
                let text = match &err {
                    ServiceError::Rejected(_) => err.user_message().to_string(),
                    _ => RESEND_FAILED.to_string(),
                };
                self.message = Some(FlowMessage::error(text.clone()));
                ResendOutcome::Failed(text)
            }
        }
    }

    /// Entered digits joined, skipping empty cells
    pub fn code(&self) -> String {
        self.digits.iter().flatten().collect()
    }

    pub fn snapshot(&self) -> OtpSnapshot {
        OtpSnapshot {
            recipient: self.recipient.clone(),
            digits: self.digits.clone(),
            focus: self.focus,
            attempt: self.attempt,
            resend: self.countdown.state(),
            message: self.message.clone(),
        }
    }

    fn mark_edited(&mut self) {
        self.attempt = AttemptState::Editing;
        self.message = None;
    }
}
