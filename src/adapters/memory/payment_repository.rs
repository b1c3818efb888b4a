//! In-memory payment repository.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::billing::{BillingError, Payment, PaymentStatus};
use crate::domain::foundation::PaymentId;
use crate::ports::PaymentRepository;

/// In-memory implementation of the PaymentRepository port.
///
/// Mirrors the database semantics the billing flows rely on: inserts are
/// no-ops on a conflicting correlation key, and settlement only applies to a
/// row that is still pending. Thread-safe via internal `Mutex`, shared across
/// clones.
#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: Arc<Mutex<HashMap<PaymentId, Payment>>>,
}

impl InMemoryPaymentRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all stored payments.
    ///
    /// Useful for testing and debugging.
    pub fn payments(&self) -> Vec<Payment> {
        self.payments.lock().unwrap().values().cloned().collect()
    }

    /// Returns the number of stored payments.
    pub fn len(&self) -> usize {
        self.payments.lock().unwrap().len()
    }

    /// Returns true if no payments are stored.
    pub fn is_empty(&self) -> bool {
        self.payments.lock().unwrap().is_empty()
    }

    /// Replace whatever row currently holds this payment's correlation key.
    ///
    /// This is the write the renewal ledger does when a failed invoice charge
    /// is retried by the processor and succeeds: the failed row gives way.
    pub fn overwrite(&self, payment: Payment) {
        let mut payments = self.payments.lock().unwrap();
        payments.retain(|_, p| p.correlation_key != payment.correlation_key);
        payments.insert(payment.id, payment);
    }
}

impl Clone for InMemoryPaymentRepository {
    fn clone(&self) -> Self {
        Self {
            payments: Arc::clone(&self.payments),
        }
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn save(&self, payment: &Payment) -> Result<(), BillingError> {
        let mut payments = self.payments.lock().unwrap();

        // The first writer of a correlation key wins; replays are no-ops.
        let duplicate = payments
            .values()
            .any(|p| p.correlation_key == payment.correlation_key);
        if duplicate {
            return Ok(());
        }

        payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, BillingError> {
        Ok(self.payments.lock().unwrap().get(id).cloned())
    }

    async fn find_by_correlation_key(
        &self,
        key: &str,
    ) -> Result<Option<Payment>, BillingError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .values()
            .find(|p| p.correlation_key == key)
            .cloned())
    }

    async fn settle_if_pending(&self, payment: &Payment) -> Result<bool, BillingError> {
        let mut payments = self.payments.lock().unwrap();

        match payments.get(&payment.id) {
            None => Err(BillingError::payment_not_found(&payment.correlation_key)),
            Some(stored) if stored.status != PaymentStatus::Pending => Ok(false),
            Some(_) => {
                payments.insert(payment.id, payment.clone());
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::SubscriptionTier;
    use crate::domain::foundation::{AccountId, Money};

    fn pending_payment(session_id: &str) -> Payment {
        Payment::checkout(
            PaymentId::new(),
            session_id,
            AccountId::new(),
            SubscriptionTier::Platinum,
            1,
            Money::from_eur(80.0).unwrap(),
            Money::ZERO,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn save_is_a_noop_on_duplicate_correlation_key() {
        let repo = InMemoryPaymentRepository::new();
        let first = pending_payment("cs_dup");
        let second = pending_payment("cs_dup");

        repo.save(&first).await.unwrap();
        repo.save(&second).await.unwrap();

        assert_eq!(repo.len(), 1);
        let stored = repo
            .find_by_correlation_key("cs_dup")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, first.id);
    }

    #[tokio::test]
    async fn settle_if_pending_flips_a_pending_row_once() {
        let repo = InMemoryPaymentRepository::new();
        let payment = pending_payment("cs_settle");
        repo.save(&payment).await.unwrap();

        let mut settled = payment.clone();
        settled.status = PaymentStatus::Success;

        assert!(repo.settle_if_pending(&settled).await.unwrap());
        assert!(!repo.settle_if_pending(&settled).await.unwrap());
    }

    #[tokio::test]
    async fn settle_if_pending_errors_for_unknown_payment() {
        let repo = InMemoryPaymentRepository::new();
        let payment = pending_payment("cs_missing");

        let result = repo.settle_if_pending(&payment).await;

        assert!(matches!(result, Err(BillingError::PaymentNotFound(_))));
    }

    #[tokio::test]
    async fn overwrite_replaces_the_correlation_key_holder() {
        let repo = InMemoryPaymentRepository::new();
        let mut failed = pending_payment("in_retry");
        failed.status = PaymentStatus::Failed;
        repo.save(&failed).await.unwrap();

        let mut retried = pending_payment("in_retry");
        retried.status = PaymentStatus::Success;
        repo.overwrite(retried.clone());

        assert_eq!(repo.len(), 1);
        let stored = repo
            .find_by_correlation_key("in_retry")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, retried.id);
        assert_eq!(stored.status, PaymentStatus::Success);
    }
}
