//! Subscription aggregate entity.
//!
//! A Subscription tracks one purchased term and its renewal cycles for an
//! employer account. The confirmation flow is the only writer that creates
//! one; webhooks and the reconciliation sweep only advance or terminate it.
//!
//! # Design Decisions
//!
//! - **Hard year ceiling**: `year_end_date` is fixed at purchase time and
//!   never moves. No renewal is recorded at or past it.
//! - **Monotonic renewal**: `renewal_count` and `expire_date` only ever grow.
//! - **Status-terminated**: rows are never deleted; `expired` and `cancelled`
//!   are reached through the status state machine.

use crate::domain::foundation::{AccountId, StateMachine, SubscriptionId, Timestamp};
use serde::{Deserialize, Serialize};

use super::{BillingError, SubscriptionStatus, SubscriptionTier};

/// Employer subscription with its renewal bookkeeping.
///
/// # Invariants
///
/// - `auto_renewal == true` implies `processor_subscription_ref` is present
/// - `expire_date` and `renewal_count` never decrease
/// - `year_end_date` never changes after construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier for this subscription.
    pub id: SubscriptionId,

    /// Account that owns this subscription.
    pub account_id: AccountId,

    /// Purchased tier.
    pub tier: SubscriptionTier,

    /// Length of the initial purchased term in months.
    pub duration_months: u32,

    /// Current lifecycle status.
    pub status: SubscriptionStatus,

    /// Whether the processor will keep billing monthly cycles.
    pub auto_renewal: bool,

    /// End of the currently paid-for period; advances one term per renewal.
    pub expire_date: Timestamp,

    /// Purchase time plus one year. Renewals stop here, whatever happens.
    pub year_end_date: Timestamp,

    /// Number of renewal cycles recorded so far.
    pub renewal_count: u32,

    /// Processor subscription id backing auto-renewal, when one exists.
    pub processor_subscription_ref: Option<String>,

    /// When the subscription was created.
    pub created_at: Timestamp,

    /// When the subscription was last updated.
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates an active subscription from a confirmed checkout.
    ///
    /// Auto-renewal is on exactly when the processor opened a recurring
    /// subscription alongside the checkout session.
    pub fn start(
        id: SubscriptionId,
        account_id: AccountId,
        tier: SubscriptionTier,
        duration_months: u32,
        processor_subscription_ref: Option<String>,
        purchased_at: Timestamp,
    ) -> Self {
        let auto_renewal = processor_subscription_ref.is_some();
        Self {
            id,
            account_id,
            tier,
            duration_months,
            status: SubscriptionStatus::Active,
            auto_renewal,
            expire_date: purchased_at.add_months(duration_months),
            year_end_date: purchased_at.add_years(1),
            renewal_count: 0,
            processor_subscription_ref,
            created_at: purchased_at,
            updated_at: purchased_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// True once the hard ceiling has been reached (`now >= year_end_date`).
    pub fn has_reached_year_end(&self, now: Timestamp) -> bool {
        !now.is_before(&self.year_end_date)
    }

    /// True when the paid-for period is over (`expire_date < now`).
    pub fn has_lapsed(&self, now: Timestamp) -> bool {
        self.expire_date.is_before(&now)
    }

    /// Days left in the paid-for period, partial days rounded up.
    pub fn days_until_expiry(&self, now: Timestamp) -> i64 {
        now.days_until(&self.expire_date)
    }

    /// Days left until the hard year ceiling, partial days rounded up.
    pub fn days_until_year_end(&self, now: Timestamp) -> i64 {
        now.days_until(&self.year_end_date)
    }

    /// Whether the account can still turn auto-renewal off through us.
    pub fn can_cancel_auto_renewal(&self, now: Timestamp) -> bool {
        self.auto_renewal && now.is_before(&self.year_end_date)
    }

    /// Records one paid renewal cycle.
    ///
    /// The processor bills on the purchased term, so each paid invoice
    /// advances `expire_date` by `duration_months` from its current value
    /// (not from `now`), increments `renewal_count`, and re-activates an
    /// expired subscription. Callers enforce the year ceiling before
    /// recording.
    ///
    /// # Errors
    ///
    /// Returns an invalid-state error on a cancelled subscription.
    pub fn renew(&mut self) -> Result<(), BillingError> {
        self.transition_to(SubscriptionStatus::Active, "renew subscription")?;
        self.expire_date = self.expire_date.add_months(self.duration_months);
        self.renewal_count += 1;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Marks the subscription expired. A no-op when already expired.
    ///
    /// # Errors
    ///
    /// Returns an invalid-state error on a cancelled subscription.
    pub fn expire(&mut self) -> Result<(), BillingError> {
        if self.status == SubscriptionStatus::Expired {
            return Ok(());
        }
        self.transition_to(SubscriptionStatus::Expired, "expire subscription")?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Marks the subscription cancelled and turns auto-renewal off.
    /// A no-op when already cancelled, so redelivered deletion events are
    /// harmless.
    pub fn cancel(&mut self) -> Result<(), BillingError> {
        if self.status == SubscriptionStatus::Cancelled {
            return Ok(());
        }
        self.transition_to(SubscriptionStatus::Cancelled, "cancel subscription")?;
        self.auto_renewal = false;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Turns auto-renewal off locally.
    pub fn disable_auto_renewal(&mut self) {
        self.auto_renewal = false;
        self.updated_at = Timestamp::now();
    }

    /// Turns auto-renewal back on.
    ///
    /// # Errors
    ///
    /// Returns an error when there is no processor subscription to bill
    /// through; local auto-renewal without one would never fire.
    pub fn enable_auto_renewal(&mut self) -> Result<(), BillingError> {
        if self.processor_subscription_ref.is_none() {
            return Err(BillingError::NoProcessorSubscription);
        }
        self.auto_renewal = true;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Syncs the auto-renewal flag from processor subscription state.
    ///
    /// # Errors
    ///
    /// Returns an error when enabling without a processor reference.
    pub fn sync_auto_renewal(&mut self, enabled: bool) -> Result<(), BillingError> {
        if enabled {
            self.enable_auto_renewal()
        } else {
            self.disable_auto_renewal();
            Ok(())
        }
    }

    /// Transition to a new status using the state machine.
    fn transition_to(
        &mut self,
        target: SubscriptionStatus,
        attempted: &str,
    ) -> Result<(), BillingError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|_| BillingError::invalid_state(self.status.as_str(), attempted))?;
        Ok(())
    }
}
