//! GetBillingStatusHandler - Query handler for the account billing summary.
//!
//! Read-only snapshot used by the account settings page: current tier, how
//! long the paid period runs, and whether auto-renewal can still be toggled.
//! Day counts round partial days up so "expires in 1 day" never shows zero.

use std::sync::Arc;

use crate::domain::billing::{BillingError, SubscriptionTier};
use crate::domain::foundation::{AccountId, Timestamp};
use crate::ports::{AccountRepository, SubscriptionRepository};

/// Query for an account's billing status.
#[derive(Debug, Clone)]
pub struct GetBillingStatusQuery {
    pub account_id: AccountId,
}

/// Snapshot of an account's subscription state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingStatus {
    pub has_active_subscription: bool,
    pub tier: Option<SubscriptionTier>,
    pub expire_date: Option<Timestamp>,
    pub auto_renewal: bool,
    pub days_until_expiry: Option<i64>,
    pub year_end_date: Option<Timestamp>,
    pub days_until_year_end: Option<i64>,
    pub renewal_count: u32,
    pub max_renewals: u32,
    pub can_cancel_auto_renewal: bool,
}

impl BillingStatus {
    /// Status for an account with no active subscription.
    fn inactive(max_renewals: u32) -> Self {
        Self {
            has_active_subscription: false,
            tier: None,
            expire_date: None,
            auto_renewal: false,
            days_until_expiry: None,
            year_end_date: None,
            days_until_year_end: None,
            renewal_count: 0,
            max_renewals,
            can_cancel_auto_renewal: false,
        }
    }
}

/// Handler for the billing status query.
pub struct GetBillingStatusHandler {
    accounts: Arc<dyn AccountRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    max_renewals: u32,
}

impl GetBillingStatusHandler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        max_renewals: u32,
    ) -> Self {
        Self {
            accounts,
            subscriptions,
            max_renewals,
        }
    }

    pub async fn handle(&self, query: GetBillingStatusQuery) -> Result<BillingStatus, BillingError> {
        let account = self
            .accounts
            .find_by_id(&query.account_id)
            .await?
            .ok_or(BillingError::AccountNotFound(query.account_id))?;

        // No subscription pointer, a dangling pointer, or a terminated
        // subscription all read as "nothing active"
        let Some(subscription_id) = account.current_subscription_id else {
            return Ok(BillingStatus::inactive(self.max_renewals));
        };
        let Some(subscription) = self.subscriptions.find_by_id(&subscription_id).await? else {
            return Ok(BillingStatus::inactive(self.max_renewals));
        };
        if !subscription.is_active() {
            return Ok(BillingStatus::inactive(self.max_renewals));
        }

        let now = Timestamp::now();
        Ok(BillingStatus {
            has_active_subscription: true,
            tier: Some(subscription.tier),
            expire_date: Some(subscription.expire_date),
            auto_renewal: subscription.auto_renewal,
            days_until_expiry: Some(subscription.days_until_expiry(now)),
            year_end_date: Some(subscription.year_end_date),
            days_until_year_end: Some(subscription.days_until_year_end(now)),
            renewal_count: subscription.renewal_count,
            max_renewals: self.max_renewals,
            can_cancel_auto_renewal: subscription.can_cancel_auto_renewal(now),
        })
    }
}
