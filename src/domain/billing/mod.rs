//! Billing domain module.
//!
//! Handles paid subscription lifecycle: checkout, activation, renewal,
//! auto-renewal control, and the one-year renewal ceiling.
//!
//! # Module Structure
//!
//! - `account` - Account aggregate holding the processor customer link
//! - `payment` - Payment aggregate, one row per charge attempt
//! - `subscription` - Subscription aggregate and renewal arithmetic
//! - `tier` - SubscriptionTier levels
//! - `payment_status` / `subscription_status` - state machines
//! - `processor_event` - parsed webhook event envelope and payloads
//! - `webhook_verifier` - HMAC signature verification for webhook bodies

mod account;
mod errors;
mod payment;
mod payment_method;
mod payment_status;
mod processor_event;
mod subscription;
mod subscription_status;
mod tier;
mod webhook_errors;
mod webhook_verifier;

pub use account::Account;
pub use errors::BillingError;
pub use payment::{Payment, MAX_DURATION_MONTHS};
pub use payment_method::PaymentMethod;
pub use payment_status::PaymentStatus;
pub use processor_event::{
    BillingEventType, InvoicePayload, ProcessorEvent, ProcessorEventData, SubscriptionPayload,
};
pub use subscription::Subscription;
pub use subscription_status::SubscriptionStatus;
pub use tier::SubscriptionTier;
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{ProcessorWebhookVerifier, SignatureHeader};

#[cfg(test)]
pub use processor_event::ProcessorEventBuilder;
#[cfg(test)]
pub use webhook_verifier::compute_test_signature;
