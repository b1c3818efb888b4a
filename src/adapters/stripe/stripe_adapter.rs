//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port against the Stripe REST API:
//! customer creation, hosted checkout sessions for recurring subscriptions,
//! and subscription cancellation control. Webhook signature verification is
//! not handled here; that belongs to the domain verifier, which never needs
//! an API round trip.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key);
//! let adapter = StripePaymentAdapter::new(config);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::ports::{
    CheckoutPaymentStatus, CheckoutSession, CheckoutState, CreateCheckoutRequest,
    CreateCustomerRequest, Customer, PaymentError, PaymentErrorCode, PaymentProvider,
};

use super::api_types::{StripeCheckoutSession, StripeCustomer, StripeErrorEnvelope};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for the Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Request timeout.
    timeout: Duration,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            timeout: Duration::from_secs(30),
        }
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
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http_client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// Turn a non-success Stripe response into a PaymentError.
    ///
    /// Stripe wraps errors in a `{"error": {...}}` envelope; when that parses
    /// we keep the provider's code, otherwise the raw body goes into the
    /// message.
    async fn error_from_response(
        &self,
        operation: &str,
        response: reqwest::Response,
    ) -> PaymentError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let code = match status.as_u16() {
            401 | 403 => PaymentErrorCode::AuthenticationError,
            404 => PaymentErrorCode::NotFound,
            429 => PaymentErrorCode::RateLimitExceeded,
            400 | 402 => PaymentErrorCode::InvalidRequest,
            _ => PaymentErrorCode::ProviderError,
        };

        let (message, provider_code) =
            match serde_json::from_str::<StripeErrorEnvelope>(&body) {
                Ok(envelope) => (
                    envelope
                        .error
                        .message
                        .unwrap_or_else(|| format!("Stripe {} failed", operation)),
                    envelope.error.code,
                ),
                Err(_) => (format!("Stripe {} failed: {}", operation, body), None),
            };

        tracing::error!(
            operation = operation,
            status = status.as_u16(),
            provider_code = ?provider_code,
            "Stripe API call failed"
        );

        let mut error = PaymentError::new(code, message);
        if let Some(provider_code) = provider_code {
            error = error.with_provider_code(provider_code);
        }
        error
    }
}

fn parse_payment_status(s: &str) -> Result<CheckoutPaymentStatus, PaymentError> {
    match s {
        "paid" => Ok(CheckoutPaymentStatus::Paid),
        "unpaid" => Ok(CheckoutPaymentStatus::Unpaid),
        "no_payment_required" => Ok(CheckoutPaymentStatus::NoPaymentRequired),
        other => Err(PaymentError::provider(format!(
            "Unknown checkout payment status: {}",
            other
        ))),
    }
}

fn checkout_state_from(session: StripeCheckoutSession) -> Result<CheckoutState, PaymentError> {
    let payment_status = parse_payment_status(&session.payment_status)?;
    Ok(CheckoutState {
        id: session.id,
        payment_status,
        subscription_ref: session.subscription,
        customer_ref: session.customer,
        payment_method: session.payment_method_types.first().cloned(),
    })
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        let mut params = vec![
            ("email", request.email.clone()),
            ("metadata[account_id]", request.account_id.to_string()),
        ];

        if let Some(name) = &request.name {
            params.push(("name", name.clone()));
        }

        let response = self
            .http_client
            .post(self.url("/v1/customers"))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.error_from_response("create_customer", response).await);
        }

        let customer: StripeCustomer = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        Ok(Customer {
            id: customer.id,
            email: customer.email.unwrap_or(request.email),
        })
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let product_name = format!("TalentHub {} subscription", request.tier.display_name());

        // One recurring line item priced inline. The interval count makes
        // each billing cycle cover one full term, so every paid invoice
        // advances the local subscription by duration_months.
        let params = vec![
            ("mode", "subscription".to_string()),
            ("customer", request.customer_ref.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", "eur".to_string()),
            (
                "line_items[0][price_data][unit_amount]",
                request.amount.cents().to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                product_name,
            ),
            (
                "line_items[0][price_data][recurring][interval]",
                "month".to_string(),
            ),
            (
                "line_items[0][price_data][recurring][interval_count]",
                request.duration_months.to_string(),
            ),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("metadata[account_id]", request.account_id.to_string()),
            ("metadata[tier]", request.tier.to_string()),
            (
                "metadata[duration_months]",
                request.duration_months.to_string(),
            ),
            (
                "subscription_data[metadata][account_id]",
                request.account_id.to_string(),
            ),
        ];

        let response = self
            .http_client
            .post(self.url("/v1/checkout/sessions"))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self
                .error_from_response("create_checkout_session", response)
                .await);
        }

        let session: StripeCheckoutSession = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        let url = session.url.ok_or_else(|| {
            PaymentError::provider("Checkout session created without a URL")
        })?;

        Ok(CheckoutSession {
            id: session.id,
            url,
            expires_at: session
                .expires_at
                .unwrap_or_else(|| chrono::Utc::now().timestamp() + 24 * 60 * 60),
        })
    }

    async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutState>, PaymentError> {
        let response = self
            .http_client
            .get(self.url(&format!("/v1/checkout/sessions/{}", session_id)))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(self
                .error_from_response("get_checkout_session", response)
                .await);
        }

        let session: StripeCheckoutSession = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        checkout_state_from(session).map(Some)
    }

    async fn expire_checkout_session(&self, session_id: &str) -> Result<(), PaymentError> {
        let response = self
            .http_client
            .post(self.url(&format!("/v1/checkout/sessions/{}/expire", session_id)))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self
                .error_from_response("expire_checkout_session", response)
                .await);
        }

        Ok(())
    }

    async fn cancel_subscription(&self, subscription_ref: &str) -> Result<(), PaymentError> {
        let response = self
            .http_client
            .delete(self.url(&format!("/v1/subscriptions/{}", subscription_ref)))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self
                .error_from_response("cancel_subscription", response)
                .await);
        }

        Ok(())
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_ref: &str,
        cancel: bool,
    ) -> Result<(), PaymentError> {
        let response = self
            .http_client
            .post(self.url(&format!("/v1/subscriptions/{}", subscription_ref)))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&[(
                "cancel_at_period_end",
                if cancel { "true" } else { "false" },
            )])
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self
                .error_from_response("set_cancel_at_period_end", response)
                .await);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> StripeConfig {
        StripeConfig::new("sk_test_key")
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_new_sets_defaults() {
        let config = test_config();
        assert_eq!(config.api_base_url, "https://api.stripe.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn config_with_base_url() {
        let config = test_config().with_base_url("http://localhost:8080");
        assert_eq!(config.api_base_url, "http://localhost:8080");
    }

    #[test]
    fn config_with_timeout() {
        let config = test_config().with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Response Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn payment_status_parses_stripe_vocabulary() {
        assert_eq!(
            parse_payment_status("paid").unwrap(),
            CheckoutPaymentStatus::Paid
        );
        assert_eq!(
            parse_payment_status("unpaid").unwrap(),
            CheckoutPaymentStatus::Unpaid
        );
        assert_eq!(
            parse_payment_status("no_payment_required").unwrap(),
            CheckoutPaymentStatus::NoPaymentRequired
        );
    }

    #[test]
    fn payment_status_rejects_unknown_values() {
        assert!(parse_payment_status("partially_paid").is_err());
    }

    #[test]
    fn checkout_state_maps_completed_session() {
        let session: StripeCheckoutSession = serde_json::from_str(
            r#"{
                "id": "cs_test",
                "payment_status": "paid",
                "status": "complete",
                "customer": "cus_1",
                "subscription": "sub_1",
                "payment_method_types": ["card", "sepa_debit"]
            }"#,
        )
        .unwrap();

        let state = checkout_state_from(session).unwrap();

        assert_eq!(state.id, "cs_test");
        assert!(state.payment_status.is_paid());
        assert_eq!(state.subscription_ref.as_deref(), Some("sub_1"));
        assert_eq!(state.customer_ref.as_deref(), Some("cus_1"));
        assert_eq!(state.payment_method.as_deref(), Some("card"));
    }

    #[test]
    fn checkout_state_maps_open_session_without_method() {
        let session: StripeCheckoutSession = serde_json::from_str(
            r#"{"id": "cs_open", "payment_status": "unpaid"}"#,
        )
        .unwrap();

        let state = checkout_state_from(session).unwrap();

        assert!(!state.payment_status.is_paid());
        assert!(state.subscription_ref.is_none());
        assert!(state.payment_method.is_none());
    }
}
