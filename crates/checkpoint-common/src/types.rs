//! Core types shared across Checkpoint components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-character visual distortion of a CAPTCHA glyph.
///
/// Only used for rendering; validation never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphStyle {
    /// Rotation in degrees, in [-10, 9]
    pub rotation_degrees: i32,
    /// Fill hue in degrees, in [0, 359]
    pub hue_degrees: i32,
}

/// A text CAPTCHA challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Expected answer (uppercase alphanumeric)
    pub text: String,

    /// One style entry per character of `text`
    pub styling: Vec<GlyphStyle>,
}

impl Challenge {
    /// Number of characters in the challenge
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns true if the challenge has no characters
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Iterate characters paired with their styling
    pub fn glyphs(&self) -> impl Iterator<Item = (char, &GlyphStyle)> {
        self.text.chars().zip(self.styling.iter())
    }
}

/// Where an OTP entry attempt currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptState {
    /// Digits are editable
    #[default]
    Editing,
    /// A verification call is in flight
    Submitting,
    /// The last submission was rejected; still editable
    Failed,
    /// The code was accepted (terminal)
    Verified,
}

impl AttemptState {
    /// Returns true if digits may be changed or the code re-submitted
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Editing | Self::Failed)
    }
}

/// Resend availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "remaining_secs")]
pub enum ResendState {
    /// Resend disabled for the remaining seconds
    Cooldown(u32),
    /// Resend may be requested
    Ready,
}

impl ResendState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn remaining_secs(&self) -> u32 {
        match self {
            Self::Cooldown(secs) => *secs,
            Self::Ready => 0,
        }
    }
}

/// Severity of a user-visible message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Info,
    Error,
}

/// A message shown next to the OTP form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl FlowMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }
}

/// Hand-off to the next recovery step after a successful verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedOtp {
    /// Identifier the code was issued to
    pub recipient: String,

    /// The accepted code
    pub code: String,

    /// When the service accepted the code
    pub verified_at: DateTime<Utc>,
}

/// Read-only view of an OTP session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpSnapshot {
    pub recipient: String,

    /// One entry per cell; `None` when empty
    pub digits: Vec<Option<char>>,

    /// Cell that should hold input focus
    pub focus: usize,

    pub attempt: AttemptState,
    pub resend: ResendState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<FlowMessage>,
}

impl OtpSnapshot {
    /// Returns true if every cell holds a digit
    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    /// The entered digits joined, skipping empty cells
    pub fn code(&self) -> String {
        self.digits.iter().flatten().collect()
    }
}

/// Terminal and notable events emitted by an OTP flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum FlowEvent {
    /// Activated without a recipient; caller should go back to the issuance step
    Redirected,
    /// The resend cooldown elapsed
    ResendReady,
    /// The code was accepted
    Verified(VerifiedOtp),
}
