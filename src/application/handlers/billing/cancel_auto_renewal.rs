//! CancelAutoRenewalHandler - Command handler for turning auto-renewal off.
//!
//! The processor is told to stop billing at the period end first; the local
//! flag follows only after that call succeeds. Until `expire_date` the account
//! keeps everything it paid for.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription};
use crate::domain::foundation::{AccountId, SubscriptionId, Timestamp};
use crate::ports::{AccountRepository, PaymentProvider, SubscriptionRepository};

/// Command to stop auto-renewal for an account's current subscription.
#[derive(Debug, Clone)]
pub struct CancelAutoRenewalCommand {
    pub account_id: AccountId,
}

/// Result of cancelling auto-renewal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelAutoRenewalResult {
    pub subscription_id: SubscriptionId,
    pub auto_renewal: bool,
    /// Paid-for access continues until this date.
    pub expire_date: Timestamp,
}

/// Handler for cancelling auto-renewal.
pub struct CancelAutoRenewalHandler {
    accounts: Arc<dyn AccountRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl CancelAutoRenewalHandler {
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
        cmd: CancelAutoRenewalCommand,
    ) -> Result<CancelAutoRenewalResult, BillingError> {
        // 1. Resolve the account's current subscription
        let mut subscription = self.load_current_subscription(cmd.account_id).await?;

        // 2. Only an active subscription has renewals to stop
        if !subscription.is_active() {
            return Err(BillingError::invalid_state(
                subscription.status.as_str(),
                "cancel auto-renewal",
            ));
        }

        let Some(subscription_ref) = subscription.processor_subscription_ref.clone() else {
            return Err(BillingError::NoProcessorSubscription);
        };

        // 3. Processor first. If this fails the local flag stays untouched and
        //    the caller can retry.
        self.payment_provider
            .set_cancel_at_period_end(&subscription_ref, true)
            .await?;

        // 4. Mirror the change locally
        subscription.disable_auto_renewal();
        self.subscriptions.update(&subscription).await?;

        tracing::info!(
            account_id = %cmd.account_id,
            subscription_id = %subscription.id,
            expire_date = %subscription.expire_date,
            "Auto-renewal cancelled"
        );

        Ok(CancelAutoRenewalResult {
            subscription_id: subscription.id,
            auto_renewal: subscription.auto_renewal,
            expire_date: subscription.expire_date,
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
