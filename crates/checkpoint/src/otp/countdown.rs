//! Resend cooldown counter.

use checkpoint_common::ResendState;

/// Whole-second countdown gating OTP resends.
///
/// Counts down from `window` to zero, one step per tick, and reports the
/// transition to ready exactly once per window.
#[derive(Debug, Clone)]
pub struct Countdown {
    window: u32,
    remaining: u32,
}

impl Countdown {
    /// Start a countdown at the full window
    pub fn new(window: u32) -> Self {
        Self {
            window,
            remaining: window,
        }
    }

    /// Advance by one second.
    ///
    /// Returns true only on the tick that reaches zero.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }

    /// Restart at the full window
    pub fn reset(&mut self) {
        self.remaining = self.window;
    }

    pub fn state(&self) -> ResendState {
        match self.remaining {
            0 => ResendState::Ready,
            secs => ResendState::Cooldown(secs),
        }
    }
}
