//! In-memory webhook event repository.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::billing::BillingError;
use crate::domain::foundation::Timestamp;
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

/// In-memory implementation of the WebhookEventRepository port.
///
/// Applies the same conflict rule as the PostgreSQL adapter: a settled record
/// wins over any replay, a failed record is replaced by the retry. Thread-safe
/// via internal `Mutex`, shared across clones.
#[derive(Default)]
pub struct InMemoryWebhookEventRepository {
    events: Arc<Mutex<HashMap<String, WebhookEventRecord>>>,
}

impl InMemoryWebhookEventRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all stored records.
    ///
    /// Useful for testing and debugging.
    pub fn records(&self) -> Vec<WebhookEventRecord> {
        self.events.lock().unwrap().values().cloned().collect()
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Returns true if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}

impl Clone for InMemoryWebhookEventRepository {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, BillingError> {
        Ok(self.events.lock().unwrap().get(event_id).cloned())
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, BillingError> {
        let mut events = self.events.lock().unwrap();

        if let Some(existing) = events.get(&record.event_id) {
            if existing.is_settled() {
                return Ok(SaveResult::AlreadyExists);
            }
        }

        events.insert(record.event_id.clone(), record);
        Ok(SaveResult::Inserted)
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, BillingError> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|_, record| !record.processed_at.is_before(&cutoff));
        Ok((before - events.len()) as u64)
    }
}
