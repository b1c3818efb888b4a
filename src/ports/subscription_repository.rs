//! Subscription repository port.
//!
//! Defines the contract for persisting Subscription aggregates and for the
//! scan queries the reconciliation sweep runs. Subscriptions are never
//! deleted; they transition to expired or cancelled and stay queryable.

use crate::domain::billing::{BillingError, Subscription};
use crate::domain::foundation::{SubscriptionId, Timestamp};
use async_trait::async_trait;

/// Repository port for Subscription aggregate persistence.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Save a new subscription.
    ///
    /// # Errors
    ///
    /// - `Infrastructure` on persistence failure
    async fn save(&self, subscription: &Subscription) -> Result<(), BillingError>;

    /// Update an existing subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the subscription doesn't exist
    /// - `Infrastructure` on persistence failure
    async fn update(&self, subscription: &Subscription) -> Result<(), BillingError>;

    /// Find a subscription by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &SubscriptionId)
        -> Result<Option<Subscription>, BillingError>;

    /// Find a subscription by its processor subscription reference.
    ///
    /// This is the lookup webhook handlers use: renewal invoices and
    /// subscription lifecycle events only carry the processor's id.
    /// Returns `None` if no local subscription holds that reference.
    async fn find_by_processor_ref(
        &self,
        processor_ref: &str,
    ) -> Result<Option<Subscription>, BillingError>;

    /// Find active subscriptions without auto-renewal whose expire date has
    /// passed.
    ///
    /// Feeds the lapsed pass of the reconciliation sweep.
    async fn find_lapsed(&self, now: Timestamp) -> Result<Vec<Subscription>, BillingError>;

    /// Find active auto-renewing subscriptions that have reached their
    /// one-year ceiling.
    ///
    /// Feeds the ceiling pass of the reconciliation sweep.
    async fn find_past_year_end(&self, now: Timestamp)
        -> Result<Vec<Subscription>, BillingError>;
}
