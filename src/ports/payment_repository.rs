//! Payment repository port.
//!
//! Defines the contract for persisting Payment aggregates. Payments are the
//! audit trail of every charge attempt, so rows are only ever inserted and
//! settled, never deleted.
//!
//! # Idempotency
//!
//! The correlation key (checkout session id for initial purchases, invoice id
//! for renewals) carries a unique constraint. `save` must treat a conflicting
//! insert as a no-op so webhook and confirmation replays cannot duplicate a
//! payment row, and `settle_if_pending` must only flip a row that is still
//! pending so two concurrent settlements cannot both apply.

use crate::domain::billing::{BillingError, Payment};
use crate::domain::foundation::PaymentId;
use async_trait::async_trait;

/// Repository port for Payment aggregate persistence.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a payment row.
    ///
    /// If a row with the same correlation key already exists the call is a
    /// no-op; the existing row wins. This makes audit inserts safe under
    /// webhook redelivery.
    ///
    /// # Errors
    ///
    /// - `Infrastructure` on persistence failure
    async fn save(&self, payment: &Payment) -> Result<(), BillingError>;

    /// Find a payment by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, BillingError>;

    /// Find a payment by its correlation key.
    ///
    /// This is the lookup used by confirmation and cancellation, where the
    /// caller only knows the checkout session id.
    async fn find_by_correlation_key(&self, key: &str) -> Result<Option<Payment>, BillingError>;

    /// Persist a terminal state, but only if the stored row is still pending.
    ///
    /// Returns `true` when this call settled the row, `false` when another
    /// process settled it first. Callers treat `false` as "someone else won
    /// the race" and re-read the row for the outcome.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if no row exists for the payment id
    /// - `Infrastructure` on persistence failure
    async fn settle_if_pending(&self, payment: &Payment) -> Result<bool, BillingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn payment_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn PaymentRepository) {}
    }
}
