//! Notification configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Notification configuration (Resend)
///
/// The API key is optional; without one the service falls back to the
/// log-only sender, which is the expected setup for local development.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Resend API key
    pub resend_api_key: Option<SecretString>,

    /// From email address
    #[serde(default = "default_from_email")]
    pub from_email: String,

    /// From name
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl NotificationConfig {
    /// True when a Resend key is configured and email should be sent
    pub fn email_enabled(&self) -> bool {
        self.resend_api_key
            .as_ref()
            .map(|key| !key.expose_secret().is_empty())
            .unwrap_or(false)
    }

    /// Validate notification configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(key) = &self.resend_api_key {
            if !key.expose_secret().is_empty() && !key.expose_secret().starts_with("re_") {
                return Err(ValidationError::InvalidResendKey);
            }
        }
        if !self.from_email.contains('@') {
            return Err(ValidationError::InvalidFromEmail);
        }
        Ok(())
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            from_email: default_from_email(),
            from_name: default_from_name(),
        }
    }
}

fn default_from_email() -> String {
    "billing@talenthub.io".to_string()
}

fn default_from_name() -> String {
    "TalentHub Billing".to_string()
}
