//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Besides the usual lookups, this adapter answers the two reconciliation
//! sweep queries. Both are indexed scans over active rows only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{BillingError, Subscription, SubscriptionStatus, SubscriptionTier};
use crate::domain::foundation::{AccountId, SubscriptionId, Timestamp};
use crate::ports::SubscriptionRepository;

/// PostgreSQL implementation of the SubscriptionRepository port.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    account_id: Uuid,
    tier: String,
    duration_months: i32,
    status: String,
    auto_renewal: bool,
    expire_date: DateTime<Utc>,
    year_end_date: DateTime<Utc>,
    renewal_count: i32,
    processor_subscription_ref: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = BillingError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            account_id: AccountId::from_uuid(row.account_id),
            tier: row.tier.parse()?,
            duration_months: row.duration_months as u32,
            status: parse_status(&row.status)?,
            auto_renewal: row.auto_renewal,
            expire_date: Timestamp::from_datetime(row.expire_date),
            year_end_date: Timestamp::from_datetime(row.year_end_date),
            renewal_count: row.renewal_count as u32,
            processor_subscription_ref: row.processor_subscription_ref,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, BillingError> {
    match s {
        "active" => Ok(SubscriptionStatus::Active),
        "expired" => Ok(SubscriptionStatus::Expired),
        "cancelled" => Ok(SubscriptionStatus::Cancelled),
        other => Err(BillingError::infrastructure(format!(
            "Invalid subscription status value: {}",
            other
        ))),
    }
}

fn tier_to_str(tier: SubscriptionTier) -> &'static str {
    match tier {
        SubscriptionTier::Bronze => "bronze",
        SubscriptionTier::Platinum => "platinum",
        SubscriptionTier::Diamond => "diamond",
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, account_id, tier, duration_months, status, auto_renewal,
           expire_date, year_end_date, renewal_count, processor_subscription_ref,
           created_at, updated_at
    FROM subscriptions
"#;

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), BillingError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, account_id, tier, duration_months, status, auto_renewal,
                expire_date, year_end_date, renewal_count,
                processor_subscription_ref, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.account_id.as_uuid())
        .bind(tier_to_str(subscription.tier))
        .bind(subscription.duration_months as i32)
        .bind(subscription.status.as_str())
        .bind(subscription.auto_renewal)
        .bind(subscription.expire_date.as_datetime())
        .bind(subscription.year_end_date.as_datetime())
        .bind(subscription.renewal_count as i32)
        .bind(&subscription.processor_subscription_ref)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            BillingError::infrastructure(format!("Failed to save subscription: {}", e))
        })?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), BillingError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                tier = $2,
                status = $3,
                auto_renewal = $4,
                expire_date = $5,
                renewal_count = $6,
                processor_subscription_ref = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(tier_to_str(subscription.tier))
        .bind(subscription.status.as_str())
        .bind(subscription.auto_renewal)
        .bind(subscription.expire_date.as_datetime())
        .bind(subscription.renewal_count as i32)
        .bind(&subscription.processor_subscription_ref)
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            BillingError::infrastructure(format!("Failed to update subscription: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(BillingError::SubscriptionNotFound(subscription.account_id));
        }

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, BillingError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    BillingError::infrastructure(format!("Failed to find subscription: {}", e))
                })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_processor_ref(
        &self,
        processor_ref: &str,
    ) -> Result<Option<Subscription>, BillingError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE processor_subscription_ref = $1",
            SELECT_COLUMNS
        ))
        .bind(processor_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            BillingError::infrastructure(format!("Failed to find subscription: {}", e))
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_lapsed(&self, now: Timestamp) -> Result<Vec<Subscription>, BillingError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE status = 'active'
              AND auto_renewal = FALSE
              AND expire_date < $1
            ORDER BY expire_date ASC
            "#,
            SELECT_COLUMNS
        ))
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            BillingError::infrastructure(format!("Failed to find lapsed subscriptions: {}", e))
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn find_past_year_end(
        &self,
        now: Timestamp,
    ) -> Result<Vec<Subscription>, BillingError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE status = 'active'
              AND auto_renewal = TRUE
              AND year_end_date <= $1
            ORDER BY year_end_date ASC
            "#,
            SELECT_COLUMNS
        ))
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            BillingError::infrastructure(format!(
                "Failed to find subscriptions past year end: {}",
                e
            ))
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}
