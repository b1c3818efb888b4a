//! Billing-specific error types.
//!
//! Errors raised by checkout, confirmation, renewal control, and the
//! reconciliation sweep.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | AccountNotFound | 404 |
//! | PaymentNotFound | 404 |
//! | SubscriptionNotFound | 404 |
//! | InvalidTier | 400 |
//! | ValidationFailed | 400 |
//! | InvalidState | 409 |
//! | NoProcessorSubscription | 409 |
//! | RenewalWindowClosed | 409 |
//! | ProviderFailed | 502 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{AccountId, ValidationError};

/// Billing-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Account was not found.
    AccountNotFound(AccountId),

    /// No payment exists for this checkout session or invoice reference.
    PaymentNotFound(String),

    /// No active subscription exists for this account.
    SubscriptionNotFound(AccountId),

    /// Invalid subscription tier specified.
    InvalidTier(String),

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Invalid state for the requested operation.
    InvalidState { current: String, attempted: String },

    /// The subscription has no processor-side counterpart to act on.
    NoProcessorSubscription,

    /// The subscription year has ended; auto-renewal cannot be resumed.
    RenewalWindowClosed,

    /// The payment processor rejected or failed the request.
    ProviderFailed { reason: String },

    /// Infrastructure error.
    Infrastructure(String),
}

impl BillingError {
    // Constructor functions for cleaner error creation

    pub fn account_not_found(id: AccountId) -> Self {
        BillingError::AccountNotFound(id)
    }

    pub fn payment_not_found(correlation_key: impl Into<String>) -> Self {
        BillingError::PaymentNotFound(correlation_key.into())
    }

    pub fn subscription_not_found(account_id: AccountId) -> Self {
        BillingError::SubscriptionNotFound(account_id)
    }

    pub fn invalid_tier(tier: impl Into<String>) -> Self {
        BillingError::InvalidTier(tier.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        BillingError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn provider(reason: impl Into<String>) -> Self {
        BillingError::ProviderFailed {
            reason: reason.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            BillingError::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            BillingError::SubscriptionNotFound(_) => "SUBSCRIPTION_NOT_FOUND",
            BillingError::InvalidTier(_) => "INVALID_TIER",
            BillingError::ValidationFailed { .. } => "VALIDATION_FAILED",
            BillingError::InvalidState { .. } => "INVALID_STATE",
            BillingError::NoProcessorSubscription => "NO_PROCESSOR_SUBSCRIPTION",
            BillingError::RenewalWindowClosed => "RENEWAL_WINDOW_CLOSED",
            BillingError::ProviderFailed { .. } => "PROVIDER_FAILED",
            BillingError::Infrastructure(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            BillingError::AccountNotFound(id) => format!("Account not found: {}", id),
            BillingError::PaymentNotFound(key) => {
                format!("No payment found for session: {}", key)
            }
            BillingError::SubscriptionNotFound(account_id) => {
                format!("No active subscription for account: {}", account_id)
            }
            BillingError::InvalidTier(tier) => format!("Invalid subscription tier: {}", tier),
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::InvalidState { current, attempted } => {
                format!("Cannot {} in {} state", attempted, current)
            }
            BillingError::NoProcessorSubscription => {
                "Subscription has no payment processor reference".to_string()
            }
            BillingError::RenewalWindowClosed => {
                "Cannot resume auto-renewal after the subscription year has ended".to_string()
            }
            BillingError::ProviderFailed { reason } => {
                format!("Payment processor request failed: {}", reason)
            }
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::ProviderFailed { .. } | BillingError::Infrastructure(_)
        )
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyField { field } => BillingError::ValidationFailed {
                field,
                message: "cannot be empty".to_string(),
            },
            ValidationError::OutOfRange {
                field,
                min,
                max,
                actual,
            } => BillingError::ValidationFailed {
                field,
                message: format!("must be between {} and {}, got {}", min, max, actual),
            },
            ValidationError::InvalidFormat { field, reason } => {
                BillingError::ValidationFailed {
                    field,
                    message: reason,
                }
            }
        }
    }
}
