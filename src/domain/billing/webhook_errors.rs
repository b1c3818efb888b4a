//! Webhook processing error types.
//!
//! Splits webhook failures into three families the HTTP layer cares about:
//! definitive rejections (signature problems, malformed payloads), ignorable
//! events acknowledged with 2xx, and transient faults returned as 5xx so the
//! processor redelivers.

use thiserror::Error;

use super::BillingError;

/// Errors that can occur while verifying and processing a webhook event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WebhookError {
    /// Signature verification failed. Treated as a security event.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Event timestamp too old (possible replay).
    #[error("Webhook timestamp outside acceptable range")]
    TimestampOutOfRange,

    /// Event timestamp in the future beyond clock skew tolerance.
    #[error("Webhook timestamp is invalid")]
    InvalidTimestamp,

    /// Failed to parse the signature header or event payload.
    #[error("Failed to parse webhook payload: {0}")]
    ParseError(String),

    /// A required field was missing from the event payload.
    #[error("Missing required field in webhook: {0}")]
    MissingField(&'static str),

    /// Event was deliberately not processed (unknown subscription, unknown
    /// event type, metadata mismatch). Acknowledged with 2xx.
    #[error("Webhook event ignored: {0}")]
    Ignored(String),

    /// The event asked for a state change the subscription cannot make.
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// A processor API call made while handling the event failed.
    #[error("Processor call failed: {0}")]
    Provider(String),

    /// Persistence failed while handling the event.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if redelivering the event could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_) | WebhookError::Provider(_))
    }

    /// True for signature and timestamp failures, which are logged as
    /// security events and never retried.
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }

    /// Returns the stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::TimestampOutOfRange | WebhookError::InvalidTimestamp => {
                "INVALID_TIMESTAMP"
            }
            WebhookError::ParseError(_) => "PARSE_ERROR",
            WebhookError::MissingField(_) => "MISSING_FIELD",
            WebhookError::Ignored(_) => "IGNORED",
            WebhookError::InvalidTransition(_) => "INVALID_TRANSITION",
            WebhookError::Provider(_) => "PROVIDER_FAILED",
            WebhookError::Database(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code to answer the processor with.
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp => 401,
            WebhookError::ParseError(_) | WebhookError::MissingField(_) => 400,
            WebhookError::Ignored(_) => 200,
            WebhookError::InvalidTransition(_) => 500,
            WebhookError::Provider(_) => 502,
            WebhookError::Database(_) => 500,
        }
    }
}

impl From<BillingError> for WebhookError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::InvalidState { .. } => WebhookError::InvalidTransition(err.message()),
            BillingError::ProviderFailed { reason } => WebhookError::Provider(reason),
            BillingError::Infrastructure(message) => WebhookError::Database(message),
            other => WebhookError::InvalidTransition(other.message()),
        }
    }
}
