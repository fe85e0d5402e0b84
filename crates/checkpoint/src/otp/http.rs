//! REST client for the OTP service.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use checkpoint_common::CheckpointError;

use super::service::{OtpService, ServiceError};
use crate::config::OtpServiceConfig;

/// `OtpService` backed by a JSON-over-HTTP API
#[derive(Clone)]
pub struct HttpOtpService {
    client: reqwest::Client,
    request_url: String,
    verify_url: String,
}

#[derive(Serialize)]
struct RequestOtpBody<'a> {
    email: &'a str,
    role: &'a str,
}

#[derive(Serialize)]
struct VerifyOtpBody<'a> {
    email: &'a str,
    otp: &'a str,
}

/// Reply shape shared by both endpoints; every field is optional
#[derive(Debug, Default, Deserialize)]
struct ServiceReply {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpOtpService {
    pub fn new(config: &OtpServiceConfig) -> Result<Self, CheckpointError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CheckpointError::Config(format!("Failed to build HTTP client: {e}")))?;

        let base = config.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            request_url: format!("{}{}", base, config.request_path),
            verify_url: format!("{}{}", base, config.verify_path),
        })
    }

    async fn post<T: Serialize>(&self, url: &str, body: &T) -> Result<(), ServiceError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Unavailable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        let reply: ServiceReply = serde_json::from_str(&text).unwrap_or_default();

        if status.is_success() {
            return match reply.success {
                Some(false) => Err(ServiceError::Rejected(reply.message.unwrap_or_default())),
                _ => Ok(()),
            };
        }

        let message = reply
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

        if status.is_server_error() {
            Err(ServiceError::Unavailable(message))
        } else {
            Err(ServiceError::Rejected(message))
        }
    }
}

#[async_trait::async_trait]
impl OtpService for HttpOtpService {
    async fn request_otp(&self, recipient: &str, role: &str) -> Result<(), ServiceError> {
        tracing::debug!(recipient = %recipient, role = %role, url = %self.request_url, "Requesting OTP");

        let result = self
            .post(&self.request_url, &RequestOtpBody { email: recipient, role })
            .await;

        if let Err(ref e) = result {
            tracing::warn!(recipient = %recipient, error = %e, "OTP request failed");
        }
        result
    }

    async fn verify_otp(&self, recipient: &str, code: &str) -> Result<(), ServiceError> {
        tracing::debug!(recipient = %recipient, url = %self.verify_url, "Verifying OTP");

        let result = self
            .post(&self.verify_url, &VerifyOtpBody { email: recipient, otp: code })
            .await;

        if let Err(ref e) = result {
            tracing::debug!(recipient = %recipient, error = %e, "OTP verification refused");
        }
        result
    }
}
