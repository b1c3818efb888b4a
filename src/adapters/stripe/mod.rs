//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe integration, including:
//! - Customer creation
//! - Hosted checkout sessions for recurring subscription purchases
//! - Subscription cancellation and the cancel-at-period-end toggle
//!
//! Webhook signature verification and event parsing live in the domain layer;
//! this module is strictly the outbound API client plus a configurable mock.
//!
//! # Security
//!
//! - The API key is handled via `secrecy::SecretString`
//! - Requests carry a bounded timeout so a stalled provider can't pin a worker

mod api_types;
mod mock_payment_provider;
mod stripe_adapter;

pub use mock_payment_provider::MockPaymentProvider;
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
