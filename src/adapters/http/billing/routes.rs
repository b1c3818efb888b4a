//! Axum router configuration for subscription endpoints.
//!
//! This module defines the route structure for the billing API and wires
//! each route to its handler.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_auto_renewal, cancel_checkout, confirm_checkout, get_billing_status, handle_webhook,
    resume_auto_renewal, start_checkout, BillingAppState,
};

/// Create the subscription API router.
///
/// # Routes
///
/// ## Account Endpoints (require account context)
/// - `POST /checkout` - Start a hosted checkout for a tier purchase
/// - `POST /auto-renewal/cancel` - Stop auto-renewal at period end
/// - `POST /auto-renewal/resume` - Turn auto-renewal back on
/// - `GET /status` - Billing snapshot for the calling account
///
/// ## Browser Landings (no account context; session id in the query)
/// - `GET /confirm` - Checkout return, settles the payment and redirects
/// - `GET /cancel` - Checkout abandon, voids the payment and redirects
pub fn subscription_routes() -> Router<BillingAppState> {
    Router::new()
        // Account endpoints
        .route("/checkout", post(start_checkout))
        .route("/auto-renewal/cancel", post(cancel_auto_renewal))
        .route("/auto-renewal/resume", post(resume_auto_renewal))
        .route("/status", get(get_billing_status))
        // Browser landings
        .route("/confirm", get(confirm_checkout))
        .route("/cancel", get(cancel_checkout))
}

/// Create the webhook router.
///
/// Kept separate from the account routes because webhook requests carry no
/// account context; trust comes from the signature over the raw body.
///
/// # Routes
/// - `POST /webhook` - Handle payment processor webhook events
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/webhook", post(handle_webhook))
}

/// Create the complete billing module router.
///
/// Mounts account routes and the webhook route under `/subscription`.
///
/// # Example
///
/// ```ignore
/// use axum::Router;
/// use crate::adapters::http::billing::{billing_router, BillingAppState};
///
/// let app_state = BillingAppState { /* ... */ };
/// let app = billing_router().with_state(app_state);
/// ```
pub fn billing_router() -> Router<BillingAppState> {
    Router::new().nest("/subscription", subscription_routes().merge(webhook_routes()))
}
