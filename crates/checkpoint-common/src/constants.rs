//! Shared constants for Checkpoint components.

/// Symbols a CAPTCHA challenge is drawn from (uppercase letters, then digits)
pub const CHALLENGE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Number of characters in a CAPTCHA challenge
pub const CHALLENGE_LENGTH: usize = 6;

/// Glyph rotation spans [-10, 9] degrees
pub const ROTATION_SPAN: u32 = 20;
pub const ROTATION_OFFSET: i32 = -10;

/// Glyph hue spans [0, 359] degrees
pub const HUE_SPAN: u32 = 360;

/// Default number of OTP digits
pub const DEFAULT_OTP_LENGTH: usize = 6;

/// Default resend cooldown window (2 minutes)
pub const DEFAULT_RESEND_COOLDOWN_SECS: u32 = 120;

/// Default role sent with OTP issuance requests
pub const DEFAULT_OTP_ROLE: &str = "user";

/// Default OTP service base URL
pub const DEFAULT_OTP_SERVICE_URL: &str = "http://127.0.0.1:8080";

/// Default OTP service request timeout
pub const DEFAULT_OTP_SERVICE_TIMEOUT_SECS: u64 = 10;

/// OTP service endpoints
pub mod endpoints {
    /// Issue (or re-issue) a code: POST {email, role}
    pub const REQUEST_OTP: &str = "/auth/forgot-password";

    /// Check a submitted code: POST {email, otp}
    pub const VERIFY_OTP: &str = "/auth/verify-otp";
}

/// User-facing messages surfaced by the OTP flow
pub mod messages {
    /// Appended to a verification rejection
    pub const TRY_AGAIN_SUFFIX: &str = "Please try again.";

    /// Used when the service rejects a code without saying why
    pub const DEFAULT_REJECTION: &str = "Invalid OTP";

    /// Used when the verification service cannot be reached
    pub const SERVICE_UNAVAILABLE: &str = "Verification service unavailable";

    /// Used when a resend fails without a service-provided reason
    pub const RESEND_FAILED: &str = "Failed to resend OTP. Please try again.";
}
