//! Billing handlers.
//!
//! Command and query handlers for the subscription purchase and renewal
//! lifecycle:
//!
//! ## Commands
//! - Starting a checkout session for a tier purchase
//! - Confirming a completed checkout (sole creator of subscriptions)
//! - Cancelling a pending checkout
//! - Processing payment processor webhooks
//! - Cancelling and resuming auto-renewal
//! - Running the reconciliation sweep
//!
//! ## Queries
//! - Get an account's billing status

mod cancel_auto_renewal;
mod cancel_checkout;
mod confirm_checkout;
mod get_billing_status;
mod process_webhook;
mod resume_auto_renewal;
mod run_reconciliation;
mod start_checkout;

// Commands
pub use cancel_auto_renewal::{
    CancelAutoRenewalCommand, CancelAutoRenewalHandler, CancelAutoRenewalResult,
};
pub use cancel_checkout::{CancelCheckoutCommand, CancelCheckoutHandler, CancelCheckoutResult};
pub use confirm_checkout::{ConfirmCheckoutCommand, ConfirmCheckoutHandler, ConfirmCheckoutResult};
pub use process_webhook::{ProcessWebhookCommand, ProcessWebhookHandler, ProcessWebhookResult};
pub use resume_auto_renewal::{
    ResumeAutoRenewalCommand, ResumeAutoRenewalHandler, ResumeAutoRenewalResult,
};
pub use run_reconciliation::{
    ReconciliationReport, RunReconciliationCommand, RunReconciliationHandler,
    RunReconciliationResult,
};
pub use start_checkout::{StartCheckoutCommand, StartCheckoutHandler, StartCheckoutResult};

// Queries
pub use get_billing_status::{BillingStatus, GetBillingStatusHandler, GetBillingStatusQuery};
