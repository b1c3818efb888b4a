//! Payment processor configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment processor configuration (Stripe-compatible API)
///
/// Holds the API credentials plus the four URLs the checkout flow moves
/// through: two callbacks the processor redirects the customer to, and the
/// two frontend pages those callbacks forward the browser to.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Processor secret API key
    pub stripe_api_key: SecretString,

    /// Webhook signing secret
    pub stripe_webhook_secret: SecretString,

    /// Callback hit after a completed checkout; the processor substitutes
    /// the session id into the placeholder
    #[serde(default = "default_checkout_success_url")]
    pub checkout_success_url: String,

    /// Callback hit after an abandoned checkout
    #[serde(default = "default_checkout_cancel_url")]
    pub checkout_cancel_url: String,

    /// Frontend page for a settled purchase
    #[serde(default = "default_success_page_url")]
    pub success_page_url: String,

    /// Frontend packages page for declined or abandoned checkouts
    #[serde(default = "default_packages_page_url")]
    pub packages_page_url: String,
}

impl PaymentConfig {
    /// Check if using a test-mode key
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    /// Check if using a live-mode key
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_live_")
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__STRIPE_WEBHOOK_SECRET",
            ));
        }

        // Verify key prefixes so a publishable key or raw secret cannot be
        // wired in by accident
        if !self.stripe_api_key.expose_secret().starts_with("sk_") {
            return Err(ValidationError::InvalidProcessorKey);
        }
        if !self
            .stripe_webhook_secret
            .expose_secret()
            .starts_with("whsec_")
        {
            return Err(ValidationError::InvalidWebhookSecret);
        }

        for (name, url) in [
            ("checkout_success_url", &self.checkout_success_url),
            ("checkout_cancel_url", &self.checkout_cancel_url),
            ("success_page_url", &self.success_page_url),
            ("packages_page_url", &self.packages_page_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidRedirectUrl(name));
            }
        }

        // Without the placeholder the confirm landing never learns which
        // session to settle
        if !self.checkout_success_url.contains("{CHECKOUT_SESSION_ID}") {
            return Err(ValidationError::MissingSessionPlaceholder(
                "checkout_success_url",
            ));
        }
        if !self.checkout_cancel_url.contains("{CHECKOUT_SESSION_ID}") {
            return Err(ValidationError::MissingSessionPlaceholder(
                "checkout_cancel_url",
            ));
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: SecretString::new(String::new()),
            stripe_webhook_secret: SecretString::new(String::new()),
            checkout_success_url: default_checkout_success_url(),
            checkout_cancel_url: default_checkout_cancel_url(),
            success_page_url: default_success_page_url(),
            packages_page_url: default_packages_page_url(),
        }
    }
}

fn default_checkout_success_url() -> String {
    "http://localhost:8080/subscription/confirm?session_id={CHECKOUT_SESSION_ID}".to_string()
}

fn default_checkout_cancel_url() -> String {
    "http://localhost:8080/subscription/cancel?session_id={CHECKOUT_SESSION_ID}".to_string()
}

fn default_success_page_url() -> String {
    "http://localhost:5173/subscription/success".to_string()
}

fn default_packages_page_url() -> String {
    "http://localhost:5173/packages".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: SecretString::new("sk_test_abcd1234".to_string()),
            stripe_webhook_secret: SecretString::new("whsec_xyz789".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn mode_detection_follows_key_prefix() {
        let config = valid_config();
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());

        let live = PaymentConfig {
            stripe_api_key: SecretString::new("sk_live_abcd1234".to_string()),
            ..valid_config()
        };
        assert!(live.is_live_mode());
        assert!(!live.is_test_mode());
    }

    #[test]
    fn missing_api_key_is_rejected() {
        assert!(PaymentConfig::default().validate().is_err());
    }

    #[test]
    fn missing_webhook_secret_is_rejected() {
        let config = PaymentConfig {
            stripe_api_key: SecretString::new("sk_test_abcd1234".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn publishable_key_prefix_is_rejected() {
        let config = PaymentConfig {
            stripe_api_key: SecretString::new("pk_test_abcd1234".to_string()),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unprefixed_webhook_secret_is_rejected() {
        let config = PaymentConfig {
            stripe_webhook_secret: SecretString::new("secret_xyz789".to_string()),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_http_redirect_url_is_rejected() {
        let config = PaymentConfig {
            packages_page_url: "ftp://app.talenthub.io/packages".to_string(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidRedirectUrl("packages_page_url"))
        ));
    }

    #[test]
    fn callback_without_session_placeholder_is_rejected() {
        let config = PaymentConfig {
            checkout_success_url: "http://localhost:8080/subscription/confirm".to_string(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingSessionPlaceholder(
                "checkout_success_url"
            ))
        ));
    }

    #[test]
    fn well_formed_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = valid_config();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk_test_abcd1234"));
        assert!(!rendered.contains("whsec_xyz789"));
    }
}
