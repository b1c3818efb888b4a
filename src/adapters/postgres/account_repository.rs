//! PostgreSQL implementation of AccountRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Account, BillingError};
use crate::domain::foundation::{AccountId, SubscriptionId, Timestamp};
use crate::ports::AccountRepository;

/// PostgreSQL implementation of the AccountRepository port.
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a billing account.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    name: String,
    processor_customer_ref: Option<String>,
    current_subscription_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: AccountId::from_uuid(row.id),
            email: row.email,
            name: row.name,
            processor_customer_ref: row.processor_customer_ref,
            current_subscription_id: row.current_subscription_id.map(SubscriptionId::from_uuid),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn save(&self, account: &Account) -> Result<(), BillingError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, email, name, processor_customer_ref, current_subscription_id,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.email)
        .bind(&account.name)
        .bind(&account.processor_customer_ref)
        .bind(account.current_subscription_id.map(|id| *id.as_uuid()))
        .bind(account.created_at.as_datetime())
        .bind(account.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| BillingError::infrastructure(format!("Failed to save account: {}", e)))?;

        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<(), BillingError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                email = $2,
                name = $3,
                processor_customer_ref = $4,
                current_subscription_id = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.email)
        .bind(&account.name)
        .bind(&account.processor_customer_ref)
        .bind(account.current_subscription_id.map(|id| *id.as_uuid()))
        .bind(account.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| BillingError::infrastructure(format!("Failed to update account: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(BillingError::AccountNotFound(account.id));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, BillingError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, email, name, processor_customer_ref, current_subscription_id,
                   created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BillingError::infrastructure(format!("Failed to find account: {}", e)))?;

        Ok(row.map(Account::from))
    }
}
