//! PostgreSQL implementation of WebhookEventRepository.
//!
//! The event_id primary key arbitrates concurrent deliveries of the same
//! processor event. The save statement only overwrites rows whose result is
//! "failed", so a settled outcome can never be clobbered by a replay.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::BillingError;
use crate::domain::foundation::Timestamp;
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

/// PostgreSQL implementation of the WebhookEventRepository port.
pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a processed webhook event.
#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    event_id: String,
    event_type: String,
    processed_at: DateTime<Utc>,
    result: String,
    error_message: Option<String>,
    payload: serde_json::Value,
}

impl From<WebhookEventRow> for WebhookEventRecord {
    fn from(row: WebhookEventRow) -> Self {
        WebhookEventRecord {
            event_id: row.event_id,
            event_type: row.event_type,
            processed_at: Timestamp::from_datetime(row.processed_at),
            result: row.result,
            error_message: row.error_message,
            payload: row.payload,
        }
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, BillingError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, processed_at, result, error_message, payload
            FROM webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            BillingError::infrastructure(format!("Failed to find webhook event: {}", e))
        })?;

        Ok(row.map(WebhookEventRecord::from))
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, BillingError> {
        // Failed rows are retried on redelivery, so the upsert replaces them.
        // Settled rows win the conflict and report AlreadyExists.
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (
                event_id, event_type, processed_at, result, error_message, payload
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (event_id) DO UPDATE SET
                event_type = EXCLUDED.event_type,
                processed_at = EXCLUDED.processed_at,
                result = EXCLUDED.result,
                error_message = EXCLUDED.error_message,
                payload = EXCLUDED.payload
            WHERE webhook_events.result = 'failed'
            "#,
        )
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(record.processed_at.as_datetime())
        .bind(&record.result)
        .bind(&record.error_message)
        .bind(&record.payload)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            BillingError::infrastructure(format!("Failed to save webhook event: {}", e))
        })?;

        if result.rows_affected() == 1 {
            Ok(SaveResult::Inserted)
        } else {
            Ok(SaveResult::AlreadyExists)
        }
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, BillingError> {
        let result = sqlx::query(
            r#"
            DELETE FROM webhook_events
            WHERE processed_at < $1
            "#,
        )
        .bind(cutoff.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            BillingError::infrastructure(format!("Failed to prune webhook events: {}", e))
        })?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_maps_onto_record() {
        let now = Utc::now();
        let row = WebhookEventRow {
            event_id: "evt_123".to_string(),
            event_type: "invoice.payment_succeeded".to_string(),
            processed_at: now,
            result: "success".to_string(),
            error_message: None,
            payload: serde_json::json!({"id": "in_123"}),
        };

        let record = WebhookEventRecord::from(row);

        assert_eq!(record.event_id, "evt_123");
        assert_eq!(record.event_type, "invoice.payment_succeeded");
        assert_eq!(record.result, "success");
        assert!(record.error_message.is_none());
        assert_eq!(record.payload["id"], "in_123");
        assert!(record.is_settled());
    }

    #[test]
    fn failed_row_maps_onto_unsettled_record() {
        let row = WebhookEventRow {
            event_id: "evt_456".to_string(),
            event_type: "invoice.payment_failed".to_string(),
            processed_at: Utc::now(),
            result: "failed".to_string(),
            error_message: Some("Database connection failed".to_string()),
            payload: serde_json::Value::Null,
        };

        let record = WebhookEventRecord::from(row);

        assert!(!record.is_settled());
        assert_eq!(
            record.error_message.as_deref(),
            Some("Database connection failed")
        );
    }
}
