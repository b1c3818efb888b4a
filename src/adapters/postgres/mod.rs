//! PostgreSQL adapters - Database implementations for the billing ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresAccountRepository` - Account rows and the current-subscription pointer
//! - `PostgresPaymentRepository` - Payment rows keyed on the correlation key
//! - `PostgresSubscriptionRepository` - Subscription rows plus the sweep queries
//! - `PostgresWebhookEventRepository` - Processed webhook audit with replay arbitration
//! - `PostgresBillingLedger` - Multi-aggregate transactions for activation and renewal

mod account_repository;
mod billing_ledger;
mod payment_repository;
mod subscription_repository;
mod webhook_event_repository;

pub use account_repository::PostgresAccountRepository;
pub use billing_ledger::PostgresBillingLedger;
pub use payment_repository::PostgresPaymentRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;
