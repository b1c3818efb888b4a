//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `AccountRepository` / `PaymentRepository` / `SubscriptionRepository` -
//!   aggregate persistence
//! - `BillingLedger` - multi-aggregate transactional commits
//! - `WebhookEventRepository` - webhook idempotency tracking
//!
//! ## Outbound Ports
//!
//! - `PaymentProvider` - payment gateway (checkout, subscription control)
//! - `Notifier` - customer-facing billing notices

mod account_repository;
mod billing_ledger;
mod notifier;
mod payment_provider;
mod payment_repository;
mod subscription_repository;
mod webhook_event_repository;

pub use account_repository::AccountRepository;
pub use billing_ledger::{ActivationCommit, BillingLedger, RenewalCommit};
pub use notifier::{Notice, Notifier, NotifyError};
pub use payment_provider::{
    CheckoutPaymentStatus, CheckoutSession, CheckoutState, CreateCheckoutRequest,
    CreateCustomerRequest, Customer, PaymentError, PaymentErrorCode, PaymentProvider,
};
pub use payment_repository::PaymentRepository;
pub use subscription_repository::SubscriptionRepository;
pub use webhook_event_repository::{SaveResult, WebhookEventRecord, WebhookEventRepository};
