//! In-memory billing ledger.

use async_trait::async_trait;

use crate::domain::billing::{
    Account, BillingError, Payment, PaymentStatus, Subscription, SubscriptionStatus,
};
use crate::ports::{
    AccountRepository, ActivationCommit, BillingLedger, PaymentRepository, RenewalCommit,
    SubscriptionRepository,
};

use super::{InMemoryAccountRepository, InMemoryPaymentRepository, InMemorySubscriptionRepository};

/// In-memory implementation of the BillingLedger port.
///
/// Operates on the same shared stores as the repositories it is built from,
/// so handler flows and assertions see one consistent state. There is no
/// real transaction; instead every precondition is checked before the first
/// write, which gives the same no-partial-commit behavior in a single
/// process.
pub struct InMemoryBillingLedger {
    accounts: InMemoryAccountRepository,
    payments: InMemoryPaymentRepository,
    subscriptions: InMemorySubscriptionRepository,
}

impl InMemoryBillingLedger {
    /// Creates a ledger over the given stores.
    ///
    /// Pass clones of the repositories the handlers use; clones share state.
    pub fn new(
        accounts: InMemoryAccountRepository,
        payments: InMemoryPaymentRepository,
        subscriptions: InMemorySubscriptionRepository,
    ) -> Self {
        Self {
            accounts,
            payments,
            subscriptions,
        }
    }
}

#[async_trait]
impl BillingLedger for InMemoryBillingLedger {
    async fn commit_activation(
        &self,
        payment: &Payment,
        subscription: &Subscription,
        account: &Account,
    ) -> Result<ActivationCommit, BillingError> {
        if self.accounts.find_by_id(&account.id).await?.is_none() {
            return Err(BillingError::AccountNotFound(account.id));
        }

        // settle_if_pending is the race arbiter: false means another
        // confirmation settled the row first and nothing may be written.
        if !self.payments.settle_if_pending(payment).await? {
            return Ok(ActivationCommit::AlreadySettled);
        }

        self.subscriptions.save(subscription).await?;
        self.accounts.update(account).await?;

        Ok(ActivationCommit::Applied)
    }

    async fn commit_renewal(
        &self,
        payment: &Payment,
        subscription: &Subscription,
    ) -> Result<RenewalCommit, BillingError> {
        let existing = self
            .payments
            .find_by_correlation_key(&payment.correlation_key)
            .await?;
        if let Some(existing) = &existing {
            if existing.status != PaymentStatus::Failed {
                return Ok(RenewalCommit::DuplicateInvoice);
            }
        }

        // Same precondition the SQL adapter enforces in its UPDATE: the
        // stored row must still hold the renewal count this renewal was
        // computed from and must not have been cancelled meanwhile. A
        // renewal may legally re-activate an expired row. A mismatch means
        // a concurrent writer moved the subscription first; report a
        // retryable error so the invoice is redelivered.
        let expected_renewals = subscription.renewal_count.saturating_sub(1);
        match self.subscriptions.find_by_id(&subscription.id).await? {
            Some(stored)
                if stored.status != SubscriptionStatus::Cancelled
                    && stored.renewal_count == expected_renewals => {}
            Some(_) => {
                return Err(BillingError::infrastructure(format!(
                    "Renewal of subscription {} lost a concurrent update",
                    subscription.id
                )));
            }
            None => {
                return Err(BillingError::infrastructure(format!(
                    "Renewal for unknown subscription {}",
                    subscription.id
                )));
            }
        }

        // A pre-existing row at this point can only be a failed charge the
        // processor retried; the successful payment supersedes it.
        match existing {
            Some(_) => self.payments.overwrite(payment.clone()),
            None => self.payments.save(payment).await?,
        }
        self.subscriptions.update(subscription).await?;

        Ok(RenewalCommit::Applied)
    }
}
