//! WebhookEventRepository port - tracking of processed payment webhooks.
//!
//! The payment processor may deliver the same webhook more than once: network
//! timeouts, a 5xx from our endpoint, or a success we returned that never
//! arrived. Handlers key their idempotency on the processor event id, and this
//! port is where those ids live. The full payload and outcome are stored too,
//! for auditing and for replaying a dead letter by hand.

use async_trait::async_trait;

use crate::domain::billing::BillingError;
use crate::domain::foundation::Timestamp;

/// Record of a processed webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEventRecord {
    /// Processor event ID (evt_xxx format).
    pub event_id: String,

    /// Type of event (e.g., "invoice.payment_succeeded").
    pub event_type: String,

    /// When the event was processed.
    pub processed_at: Timestamp,

    /// Result of processing: "success", "ignored", or "failed".
    pub result: String,

    /// Reason or error message for ignored and failed outcomes.
    pub error_message: Option<String>,

    /// Original event payload for debugging.
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    /// Creates a new success record.
    pub fn success(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Timestamp::now(),
            result: "success".to_string(),
            error_message: None,
            payload,
        }
    }

    /// Creates a new ignored record.
    pub fn ignored(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Timestamp::now(),
            result: "ignored".to_string(),
            error_message: Some(reason.into()),
            payload,
        }
    }

    /// Creates a new failure record.
    pub fn failed(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Timestamp::now(),
            result: "failed".to_string(),
            error_message: Some(error.into()),
            payload,
        }
    }

    /// Whether this record closes the event.
    ///
    /// Success and ignored records do; a failed record means we returned a
    /// retryable status, so a redelivered copy of the same event must run the
    /// handler again instead of short-circuiting.
    pub fn is_settled(&self) -> bool {
        self.result != "failed"
    }
}

/// Result of attempting to save a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was written (first sighting, or a failed record was superseded).
    Inserted,
    /// A settled record already exists (duplicate event).
    AlreadyExists,
}

/// Port for storing and retrieving processed webhook events.
///
/// Implementations should use database constraints (PRIMARY KEY on event_id)
/// to arbitrate concurrent deliveries of the same event.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Find a previously processed event by its processor event ID.
    ///
    /// Returns `None` if the event hasn't been processed yet.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, BillingError>;

    /// Attempt to save a webhook event record.
    ///
    /// A conflicting row that is settled wins and the call returns
    /// [`SaveResult::AlreadyExists`]. A conflicting row with result "failed"
    /// is replaced, since failed outcomes are retried on redelivery.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, BillingError>;

    /// Delete records processed before the given timestamp.
    ///
    /// Returns the number of records deleted. Used by the retention sweep so
    /// the audit table doesn't grow without bound.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, BillingError>;
}
