//! Configuration management for Checkpoint.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use checkpoint_common::CheckpointError;
use checkpoint_common::constants::{
    DEFAULT_OTP_LENGTH, DEFAULT_OTP_ROLE, DEFAULT_OTP_SERVICE_TIMEOUT_SECS,
    DEFAULT_OTP_SERVICE_URL, DEFAULT_RESEND_COOLDOWN_SECS, endpoints,
};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// OTP flow configuration
    #[serde(default)]
    pub otp: OtpConfig,

    /// OTP service connection
    #[serde(default)]
    pub otp_service: OtpServiceConfig,
}

/// OTP flow parameters
#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    /// Number of digit cells
    #[serde(default = "default_code_length")]
    pub code_length: usize,

    /// Seconds before a resend is allowed
    #[serde(default = "default_resend_cooldown")]
    pub resend_cooldown_secs: u32,

    /// Role sent along with issuance requests
    #[serde(default = "default_role")]
    pub role: String,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            resend_cooldown_secs: default_resend_cooldown(),
            role: default_role(),
        }
    }
}

/// OTP service connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct OtpServiceConfig {
    #[serde(default = "default_service_url")]
    pub base_url: String,

    #[serde(default = "default_request_path")]
    pub request_path: String,

    #[serde(default = "default_verify_path")]
    pub verify_path: String,

    /// Per-request timeout
    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

impl Default for OtpServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_service_url(),
            request_path: default_request_path(),
            verify_path: default_verify_path(),
            timeout_secs: default_service_timeout(),
        }
    }
}

// Default value functions
fn default_code_length() -> usize { DEFAULT_OTP_LENGTH }
fn default_resend_cooldown() -> u32 { DEFAULT_RESEND_COOLDOWN_SECS }
fn default_role() -> String { DEFAULT_OTP_ROLE.to_string() }
fn default_service_url() -> String { DEFAULT_OTP_SERVICE_URL.to_string() }
fn default_request_path() -> String { endpoints::REQUEST_OTP.to_string() }
fn default_verify_path() -> String { endpoints::VERIFY_OTP.to_string() }
fn default_service_timeout() -> u64 { DEFAULT_OTP_SERVICE_TIMEOUT_SECS }

impl AppConfig {
    /// Load configuration from an optional file, then `CHECKPOINT__*` env vars
    pub fn load(config_path: &str) -> Result<Self> {
        let mut builder = config::Config::builder();

        if Path::new(config_path).exists() {
            builder = builder.add_source(config::File::with_name(config_path));
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
        }

        let config: Self = builder
            .add_source(config::Environment::with_prefix("CHECKPOINT").separator("__"))
            .build()
            .context("Failed to load config")?
            .try_deserialize()
            .context("Failed to parse config")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the OTP flow cannot run with
    pub fn validate(&self) -> Result<(), CheckpointError> {
        self.otp.validate()
    }
}

impl OtpConfig {
    pub fn validate(&self) -> Result<(), CheckpointError> {
        if self.code_length == 0 {
            return Err(CheckpointError::Config("otp.code_length must be positive".into()));
        }
        if self.resend_cooldown_secs == 0 {
            return Err(CheckpointError::Config(
                "otp.resend_cooldown_secs must be positive".into(),
            ));
        }
        if self.role.trim().is_empty() {
            return Err(CheckpointError::Config("otp.role must not be empty".into()));
        }
        Ok(())
    }
}
