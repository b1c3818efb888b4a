//! Stripe API response objects.
//!
//! These types cover the subset of the Stripe REST API the billing flows
//! touch: customers, checkout sessions, and the error envelope. Webhook
//! payload parsing lives in the domain layer, not here; this module is only
//! for responses to calls we initiate.

use serde::Deserialize;
use std::collections::HashMap;

/// Stripe Customer object, as returned by /v1/customers.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    /// Unique customer identifier (cus_...).
    pub id: String,

    /// Customer email address.
    pub email: Option<String>,

    /// Whether the customer has been deleted.
    #[serde(default)]
    pub deleted: bool,
}

/// Stripe Checkout Session object, as returned by /v1/checkout/sessions.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    /// Unique session identifier (cs_...).
    pub id: String,

    /// Hosted checkout URL. Present while the session is open.
    pub url: Option<String>,

    /// Unix timestamp at which the session stops being usable.
    pub expires_at: Option<i64>,

    /// Session payment status (paid, unpaid, no_payment_required).
    pub payment_status: String,

    /// Session status (open, complete, expired).
    pub status: Option<String>,

    /// Customer the session was created for.
    pub customer: Option<String>,

    /// Recurring subscription created by the session, once paid.
    pub subscription: Option<String>,

    /// Payment method types the session was configured with.
    #[serde(default)]
    pub payment_method_types: Vec<String>,

    /// Custom metadata attached to the session.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Stripe error envelope: `{"error": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorEnvelope {
    pub error: StripeApiError,
}

/// Error body inside the envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    /// Error category (api_error, card_error, invalid_request_error, ...).
    #[serde(rename = "type")]
    pub error_type: Option<String>,

    /// Machine-readable error code.
    pub code: Option<String>,

    /// Human-readable message.
    pub message: Option<String>,
}
