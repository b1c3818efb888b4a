//! Billing ledger port - transactional commits spanning multiple aggregates.
//!
//! Confirmation and renewal each mutate more than one aggregate and must land
//! atomically: a settled payment without its subscription (or the reverse)
//! would corrupt the books. Repositories persist one aggregate at a time, so
//! this port owns the two multi-aggregate commits and pushes the transaction
//! boundary into the adapter.
//!
//! Both commits double as race arbiters. The database decides who wins a
//! concurrent confirmation or a redelivered invoice, and the loser gets a
//! distinct outcome value instead of an error so callers can short-circuit
//! idempotently.

use crate::domain::billing::{Account, BillingError, Payment, Subscription};
use async_trait::async_trait;

/// Outcome of an activation commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationCommit {
    /// This call settled the payment and created the subscription.
    Applied,
    /// The payment was no longer pending; another confirmation won the race.
    /// Nothing was written.
    AlreadySettled,
}

/// Outcome of a renewal commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalCommit {
    /// The renewal payment was recorded and the subscription advanced.
    Applied,
    /// A successful payment for this invoice already exists; the invoice was
    /// already applied. Nothing was written.
    DuplicateInvoice,
}

/// Port for multi-aggregate billing transactions.
#[async_trait]
pub trait BillingLedger: Send + Sync {
    /// Atomically settle a checkout payment, create its subscription, and
    /// re-point the account, in one transaction.
    ///
    /// The payment settle is guarded on the stored row still being pending.
    /// If it is not, the whole transaction rolls back and the call returns
    /// [`ActivationCommit::AlreadySettled`].
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if no row exists for the payment
    /// - `Infrastructure` on persistence failure
    async fn commit_activation(
        &self,
        payment: &Payment,
        subscription: &Subscription,
        account: &Account,
    ) -> Result<ActivationCommit, BillingError>;

    /// Atomically record a renewal payment and advance its subscription, in
    /// one transaction.
    ///
    /// The payment insert is deduplicated on the correlation key (the
    /// processor invoice id). A pre-existing successful row for the same
    /// invoice rolls the transaction back and returns
    /// [`RenewalCommit::DuplicateInvoice`]. A pre-existing *failed* row for
    /// the invoice is superseded: the processor retried the charge and it
    /// went through, so the row flips to success and the renewal applies.
    ///
    /// The subscription write is guarded on the stored row still holding
    /// the renewal count this renewal was computed from and not having
    /// been cancelled meanwhile (an expired row may be re-activated). A
    /// mismatch rolls the transaction back with a retryable error; the
    /// processor redelivers the invoice and the retry runs against fresh
    /// state.
    ///
    /// # Errors
    ///
    /// - `Infrastructure` on persistence failure or a lost concurrent-update
    ///   race on the subscription row
    async fn commit_renewal(
        &self,
        payment: &Payment,
        subscription: &Subscription,
    ) -> Result<RenewalCommit, BillingError>;
}
