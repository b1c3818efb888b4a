//! In-memory subscription repository.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::billing::{BillingError, Subscription};
use crate::domain::foundation::{SubscriptionId, Timestamp};
use crate::ports::SubscriptionRepository;

/// In-memory implementation of the SubscriptionRepository port.
///
/// Answers the same sweep queries the PostgreSQL adapter does, by filtering
/// over the stored rows. Thread-safe via internal `Mutex`, shared across
/// clones.
#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: Arc<Mutex<HashMap<SubscriptionId, Subscription>>>,
}

impl InMemorySubscriptionRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all stored subscriptions.
    ///
    /// Useful for testing and debugging.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect()
    }

    /// Returns the number of stored subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    /// Returns true if no subscriptions are stored.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.lock().unwrap().is_empty()
    }
}

impl Clone for InMemorySubscriptionRepository {
    fn clone(&self) -> Self {
        Self {
            subscriptions: Arc::clone(&self.subscriptions),
        }
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), BillingError> {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), BillingError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if !subscriptions.contains_key(&subscription.id) {
            return Err(BillingError::SubscriptionNotFound(subscription.account_id));
        }
        subscriptions.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, BillingError> {
        Ok(self.subscriptions.lock().unwrap().get(id).cloned())
    }

    async fn find_by_processor_ref(
        &self,
        processor_ref: &str,
    ) -> Result<Option<Subscription>, BillingError> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .find(|s| s.processor_subscription_ref.as_deref() == Some(processor_ref))
            .cloned())
    }

    async fn find_lapsed(&self, now: Timestamp) -> Result<Vec<Subscription>, BillingError> {
        let mut lapsed: Vec<Subscription> = self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.is_active() && !s.auto_renewal && s.has_lapsed(now))
            .cloned()
            .collect();
        lapsed.sort_by_key(|s| *s.expire_date.as_datetime());
        Ok(lapsed)
    }

    async fn find_past_year_end(
        &self,
        now: Timestamp,
    ) -> Result<Vec<Subscription>, BillingError> {
        let mut at_ceiling: Vec<Subscription> = self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.is_active() && s.auto_renewal && s.has_reached_year_end(now))
            .cloned()
            .collect();
        at_ceiling.sort_by_key(|s| *s.year_end_date.as_datetime());
        Ok(at_ceiling)
    }
}
