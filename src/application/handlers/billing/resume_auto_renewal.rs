//! ResumeAutoRenewalHandler - Command handler for turning auto-renewal back on.
//!
//! Resumption is refused once the subscription year has ended: the hard
//! ceiling in `year_end_date` is checked before anything is sent to the
//! processor, so a rejected resume leaves no side effects anywhere.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription};
use crate::domain::foundation::{AccountId, SubscriptionId, Timestamp};
use crate::ports::{AccountRepository, PaymentProvider, SubscriptionRepository};

/// Command to resume auto-renewal for an account's current subscription.
#[derive(Debug, Clone)]
pub struct ResumeAutoRenewalCommand {
    pub account_id: AccountId,
}

/// Result of resuming auto-renewal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeAutoRenewalResult {
    pub subscription_id: SubscriptionId,
    pub auto_renewal: bool,
    /// Renewals keep running until this date at the latest.
    pub year_end_date: Timestamp,
}

/// Handler for resuming auto-renewal.
pub struct ResumeAutoRenewalHandler {
    accounts: Arc<dyn AccountRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl ResumeAutoRenewalHandler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            accounts,
            subscriptions,
            payment_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: ResumeAutoRenewalCommand,
    ) -> Result<ResumeAutoRenewalResult, BillingError> {
        // 1. Resolve the account's current subscription
        let mut subscription = self.load_current_subscription(cmd.account_id).await?;

        // 2. Only an active subscription can resume billing
        if !subscription.is_active() {
            return Err(BillingError::invalid_state(
                subscription.status.as_str(),
                "resume auto-renewal",
            ));
        }

        let Some(subscription_ref) = subscription.processor_subscription_ref.clone() else {
            return Err(BillingError::NoProcessorSubscription);
        };

        // 3. The year ceiling is checked before touching the processor; past
        //    it the request is refused with nothing changed
        if subscription.has_reached_year_end(Timestamp::now()) {
            return Err(BillingError::RenewalWindowClosed);
        }

        // 4. Processor first, then the local flag
        self.payment_provider
            .set_cancel_at_period_end(&subscription_ref, false)
            .await?;

        subscription.enable_auto_renewal()?;
        self.subscriptions.update(&subscription).await?;

        tracing::info!(
            account_id = %cmd.account_id,
            subscription_id = %subscription.id,
            year_end_date = %subscription.year_end_date,
            "Auto-renewal resumed"
        );

        Ok(ResumeAutoRenewalResult {
            subscription_id: subscription.id,
            auto_renewal: subscription.auto_renewal,
            year_end_date: subscription.year_end_date,
        })
    }

    async fn load_current_subscription(
        &self,
        account_id: AccountId,
    ) -> Result<Subscription, BillingError> {
        let account = self
            .accounts
            .find_by_id(&account_id)
            .await?
            .ok_or(BillingError::AccountNotFound(account_id))?;

        let subscription_id = account
            .current_subscription_id
            .ok_or(BillingError::SubscriptionNotFound(account_id))?;

        self.subscriptions
            .find_by_id(&subscription_id)
            .await?
            .ok_or(BillingError::SubscriptionNotFound(account_id))
    }
}
