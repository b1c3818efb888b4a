//! Resend email notifier.
//!
//! Delivers billing notices through the Resend REST API. Notices are plain
//! text; the sender address and display name come from configuration and are
//! rendered as a single `From` header.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::ports::{Notice, Notifier, NotifyError};

/// Email notifier configuration (Resend).
#[derive(Clone)]
pub struct EmailNotifierConfig {
    /// Resend API key (re_...).
    api_key: SecretString,

    /// Sender email address.
    from_address: String,

    /// Sender display name.
    from_name: String,

    /// Base URL for the Resend API (default: https://api.resend.com).
    api_base_url: String,

    /// Request timeout.
    timeout: Duration,
}

impl EmailNotifierConfig {
    /// Create a new email notifier configuration.
    pub fn new(api_key: impl Into<String>, from_address: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            from_address: from_address.into(),
            from_name: "TalentHub Billing".to_string(),
            api_base_url: "https://api.resend.com".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the sender display name.
    pub fn with_from_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = name.into();
        self
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Formatted `From` header value.
    fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_address)
    }
}

/// Request body for the Resend `/emails` endpoint.
#[derive(Debug, Serialize)]
struct SendEmailBody<'a> {
    from: String,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Email notifier backed by the Resend API.
pub struct EmailNotifier {
    config: EmailNotifierConfig,
    http_client: reqwest::Client,
}

impl EmailNotifier {
    /// Create a new email notifier with the given configuration.
    pub fn new(config: EmailNotifierConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http_client,
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError> {
        let body = SendEmailBody {
            from: self.config.from_header(),
            to: [notice.to.as_str()],
            subject: &notice.subject,
            text: &notice.body,
        };

        let response = self
            .http_client
            .post(format!("{}/emails", self.config.api_base_url))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(format!("Resend request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(to = %notice.to, subject = %notice.subject, "Billing notice sent");
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(NotifyError::Config(format!(
                "Resend rejected the API key: {}",
                detail
            )));
        }

        Err(NotifyError::Delivery(format!(
            "Resend returned {}: {}",
            status, detail
        )))
    }
}
