//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::billing::{
    // Checkout
    CancelCheckoutCommand, CancelCheckoutHandler, CancelCheckoutResult,
    ConfirmCheckoutCommand, ConfirmCheckoutHandler, ConfirmCheckoutResult,
    StartCheckoutCommand, StartCheckoutHandler, StartCheckoutResult,
    // Webhooks
    ProcessWebhookCommand, ProcessWebhookHandler, ProcessWebhookResult,
    // Renewal control
    CancelAutoRenewalCommand, CancelAutoRenewalHandler, CancelAutoRenewalResult,
    ResumeAutoRenewalCommand, ResumeAutoRenewalHandler, ResumeAutoRenewalResult,
    // Reconciliation
    ReconciliationReport, RunReconciliationCommand, RunReconciliationHandler,
    RunReconciliationResult,
    // Status
    BillingStatus, GetBillingStatusHandler, GetBillingStatusQuery,
};
