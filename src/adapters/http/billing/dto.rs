//! HTTP DTOs (Data Transfer Objects) for the subscription endpoints.
//!
//! These types define the JSON request/response structure for the billing API.
//! The wire format is camelCase; dates are RFC 3339 strings.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::BillingStatus;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to initiate a subscription checkout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCheckoutRequest {
    /// Subscription tier (bronze, platinum, diamond; case-insensitive).
    pub tier: String,
    /// Number of months in the initial term.
    pub duration_months: u32,
    /// Gross price in EUR.
    pub amount: f64,
    /// Discount in EUR, already resolved by the caller.
    #[serde(default)]
    pub discount: Option<f64>,
}

/// Query parameters for the confirm and cancel redirect landings.
///
/// `session_id` is optional here so a missing parameter maps to a 400 with
/// the standard error body instead of the extractor's plain-text rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response for checkout initiation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    /// The hosted checkout URL to send the customer to.
    pub checkout_url: String,
    /// Internal id of the pending payment.
    pub payment_id: String,
}

/// Simple message response for renewal-control commands.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Acknowledgement body for processed webhook deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Billing status snapshot for the calling account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingStatusResponse {
    pub has_active_subscription: bool,
    /// Tier display name, or null without an active subscription.
    pub tier: Option<String>,
    /// End of the paid period (RFC 3339).
    pub expire_date: Option<String>,
    pub auto_renewal: bool,
    /// Full or partial days until expiry, rounded up.
    pub days_until_expiry: Option<i64>,
    /// Hard renewal ceiling (RFC 3339).
    pub year_end_date: Option<String>,
    pub days_until_year_end: Option<i64>,
    pub renewal_count: u32,
    pub max_renewals: u32,
    pub can_cancel_auto_renewal: bool,
}

impl From<BillingStatus> for BillingStatusResponse {
    fn from(status: BillingStatus) -> Self {
        Self {
            has_active_subscription: status.has_active_subscription,
            tier: status.tier.map(|t| t.to_string()),
            expire_date: status.expire_date.map(|d| d.as_datetime().to_rfc3339()),
            auto_renewal: status.auto_renewal,
            days_until_expiry: status.days_until_expiry,
            year_end_date: status.year_end_date.map(|d| d.as_datetime().to_rfc3339()),
            days_until_year_end: status.days_until_year_end,
            renewal_count: status.renewal_count,
            max_renewals: status.max_renewals,
            can_cancel_auto_renewal: status.can_cancel_auto_renewal,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response DTO
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response body: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// The error payload inside an [`ErrorResponse`].
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}
