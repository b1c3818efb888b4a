//! In-memory adapters - non-persistent implementations of the billing ports.
//!
//! These back integration tests and local development runs without a
//! database. Each store is a `Mutex`-guarded map shared across clones, and
//! each adapter mirrors the conflict semantics of its PostgreSQL counterpart
//! so flows behave the same against either.

mod account_repository;
mod billing_ledger;
mod notifier;
mod payment_repository;
mod subscription_repository;
mod webhook_event_repository;

pub use account_repository::InMemoryAccountRepository;
pub use billing_ledger::InMemoryBillingLedger;
pub use notifier::RecordingNotifier;
pub use payment_repository::InMemoryPaymentRepository;
pub use subscription_repository::InMemorySubscriptionRepository;
pub use webhook_event_repository::InMemoryWebhookEventRepository;
