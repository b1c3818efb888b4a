//! Payment provider port for external payment processing.
//!
//! Defines the contract for the payment gateway integration (e.g., Stripe).
//! Implementations handle customer creation, hosted checkout sessions, and
//! recurring subscription control at the processor.
//!
//! # Design
//!
//! - **Gateway agnostic**: the interface speaks in opaque provider references
//! - **Checkout-focused**: purchases go through hosted checkout sessions,
//!   never raw card details
//! - **Idempotent**: operations can be safely retried

use crate::domain::billing::SubscriptionTier;
use crate::domain::foundation::{AccountId, Money};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a customer in the payment system.
    ///
    /// Returns the provider's customer record for future reference.
    async fn create_customer(&self, request: CreateCustomerRequest)
        -> Result<Customer, PaymentError>;

    /// Create a hosted checkout session for a recurring subscription purchase.
    ///
    /// The request metadata (account id, tier, duration) must round-trip
    /// through the provider so webhook payloads can be cross-checked against
    /// local state.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Fetch the current state of a checkout session from the provider.
    ///
    /// Returns `None` if the provider does not know the session. This is the
    /// authoritative read the confirmation flow uses; local state is never
    /// trusted over it.
    async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutState>, PaymentError>;

    /// Expire an open checkout session so its URL stops working.
    ///
    /// Expiring an already-completed or already-expired session is a provider
    /// error; callers that don't care treat it as best-effort.
    async fn expire_checkout_session(&self, session_id: &str) -> Result<(), PaymentError>;

    /// Cancel a recurring subscription at the provider immediately.
    ///
    /// Used when the one-year ceiling is reached and billing must stop now,
    /// not at period end.
    async fn cancel_subscription(&self, subscription_ref: &str) -> Result<(), PaymentError>;

    /// Flag or unflag a recurring subscription to cancel when the current
    /// period ends.
    ///
    /// This is the auto-renewal toggle: `cancel = true` stops future charges
    /// while keeping the paid period intact, `cancel = false` resumes them.
    async fn set_cancel_at_period_end(
        &self,
        subscription_ref: &str,
        cancel: bool,
    ) -> Result<(), PaymentError>;
}

/// Request to create a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    /// Internal account ID (stored as provider metadata).
    pub account_id: AccountId,

    /// Customer email address.
    pub email: String,

    /// Customer name (optional).
    pub name: Option<String>,
}

/// Customer in the payment system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Provider's customer reference.
    pub id: String,

    /// Customer email.
    pub email: String,
}

/// Request to create a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Provider's customer reference.
    pub customer_ref: String,

    /// Internal account ID, embedded as session metadata.
    pub account_id: AccountId,

    /// Tier being purchased, embedded as session metadata.
    pub tier: SubscriptionTier,

    /// Term length in months, embedded as session metadata.
    pub duration_months: u32,

    /// Amount to charge per term, after discount.
    pub amount: Money,

    /// URL the provider redirects to after a completed checkout. The provider
    /// substitutes the session id into its `{CHECKOUT_SESSION_ID}`
    /// placeholder.
    pub success_url: String,

    /// URL the provider redirects to after an abandoned checkout.
    pub cancel_url: String,
}

/// Checkout session handed back by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session identifier.
    pub id: String,

    /// URL for the customer to complete checkout.
    pub url: String,

    /// When the session expires (Unix timestamp).
    pub expires_at: i64,
}

/// Authoritative state of a checkout session, as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutState {
    /// Provider's session identifier.
    pub id: String,

    /// Whether the provider collected the money.
    pub payment_status: CheckoutPaymentStatus,

    /// Recurring subscription created by the session, once paid.
    pub subscription_ref: Option<String>,

    /// Customer the session was created for.
    pub customer_ref: Option<String>,

    /// Payment method type the customer used (provider vocabulary, e.g.
    /// "card").
    pub payment_method: Option<String>,
}

/// Payment status vocabulary of a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPaymentStatus {
    /// Money was collected.
    Paid,

    /// Nothing collected yet.
    Unpaid,

    /// Session settled without a charge (e.g. fully discounted).
    NoPaymentRequired,
}

impl CheckoutPaymentStatus {
    /// Whether the session counts as paid for activation purposes.
    pub fn is_paid(&self) -> bool {
        matches!(
            self,
            CheckoutPaymentStatus::Paid | CheckoutPaymentStatus::NoPaymentRequired
        )
    }
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Attach the provider's own error code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidRequest, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(
            PaymentErrorCode::NotFound,
            format!("{} not found", resource),
        )
    }

    /// Create a provider API error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for crate::domain::billing::BillingError {
    fn from(err: PaymentError) -> Self {
        crate::domain::billing::BillingError::provider(err.to_string())
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Request was malformed or rejected by validation.
    InvalidRequest,

    /// Resource not found at the provider.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::BillingError;

    // Trait object safety test
    #[test]
    fn payment_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn PaymentProvider) {}
    }

    #[test]
    fn paid_and_no_payment_required_both_count_as_paid() {
        assert!(CheckoutPaymentStatus::Paid.is_paid());
        assert!(CheckoutPaymentStatus::NoPaymentRequired.is_paid());
        assert!(!CheckoutPaymentStatus::Unpaid.is_paid());
    }

    #[test]
    fn payment_error_retryable() {
        assert!(PaymentErrorCode::NetworkError.is_retryable());
        assert!(PaymentErrorCode::RateLimitExceeded.is_retryable());
        assert!(PaymentErrorCode::ProviderError.is_retryable());

        assert!(!PaymentErrorCode::AuthenticationError.is_retryable());
        assert!(!PaymentErrorCode::NotFound.is_retryable());
    }

    #[test]
    fn payment_error_display() {
        let err = PaymentError::not_found("Checkout session");
        assert!(err.to_string().contains("not_found"));
        assert!(err.to_string().contains("Checkout session not found"));
    }

    #[test]
    fn payment_error_converts_to_billing_error() {
        let payment_err = PaymentError::network("connection reset");
        let billing_err: BillingError = payment_err.into();
        assert!(billing_err.is_retryable());
        assert!(billing_err.message().contains("connection reset"));
    }
}
