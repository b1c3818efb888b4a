//! PostgreSQL implementation of PaymentRepository.
//!
//! The `payments.correlation_key` unique constraint is what makes checkout
//! confirmation and webhook replay idempotent; everything here leans on it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{BillingError, Payment, PaymentMethod, PaymentStatus, SubscriptionTier};
use crate::domain::foundation::{AccountId, Money, PaymentId, SubscriptionId, Timestamp};
use crate::ports::PaymentRepository;

/// PostgreSQL implementation of the PaymentRepository port.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    correlation_key: String,
    account_id: Uuid,
    tier: String,
    duration_months: i32,
    amount_cents: i64,
    discount_cents: i64,
    final_amount_cents: i64,
    status: String,
    payment_method: Option<String>,
    is_renewal: bool,
    processor_invoice_ref: Option<String>,
    subscription_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = BillingError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            correlation_key: row.correlation_key,
            account_id: AccountId::from_uuid(row.account_id),
            tier: row.tier.parse()?,
            duration_months: row.duration_months as u32,
            amount: cents(row.amount_cents, "amount_cents")?,
            discount: cents(row.discount_cents, "discount_cents")?,
            final_amount: cents(row.final_amount_cents, "final_amount_cents")?,
            status: parse_status(&row.status)?,
            payment_method: row.payment_method.as_deref().map(parse_method),
            is_renewal: row.is_renewal,
            processor_invoice_ref: row.processor_invoice_ref,
            subscription_id: row.subscription_id.map(SubscriptionId::from_uuid),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn cents(value: i64, column: &str) -> Result<Money, BillingError> {
    Money::from_cents(value)
        .map_err(|_| BillingError::infrastructure(format!("Negative {} in payments row", column)))
}

fn tier_to_str(tier: SubscriptionTier) -> &'static str {
    match tier {
        SubscriptionTier::Bronze => "bronze",
        SubscriptionTier::Platinum => "platinum",
        SubscriptionTier::Diamond => "diamond",
    }
}

fn parse_status(s: &str) -> Result<PaymentStatus, BillingError> {
    match s {
        "pending" => Ok(PaymentStatus::Pending),
        "success" => Ok(PaymentStatus::Success),
        "failed" => Ok(PaymentStatus::Failed),
        "cancelled" => Ok(PaymentStatus::Cancelled),
        other => Err(BillingError::infrastructure(format!(
            "Invalid payment status value: {}",
            other
        ))),
    }
}

fn parse_method(s: &str) -> PaymentMethod {
    // Stored values come from PaymentMethod::as_str, which from_processor
    // also accepts ("card", "bank_transfer"); anything else lands on Other
    match s {
        "wallet" => PaymentMethod::Wallet,
        other => PaymentMethod::from_processor(other),
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn save(&self, payment: &Payment) -> Result<(), BillingError> {
        // A concurrent save of the same correlation key is a replay, not an
        // error; the first writer's row stands
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, correlation_key, account_id, tier, duration_months,
                amount_cents, discount_cents, final_amount_cents, status,
                payment_method, is_renewal, processor_invoice_ref,
                subscription_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (correlation_key) DO NOTHING
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(&payment.correlation_key)
        .bind(payment.account_id.as_uuid())
        .bind(tier_to_str(payment.tier))
        .bind(payment.duration_months as i32)
        .bind(payment.amount.cents())
        .bind(payment.discount.cents())
        .bind(payment.final_amount.cents())
        .bind(payment.status.as_str())
        .bind(payment.payment_method.map(|m| m.as_str()))
        .bind(payment.is_renewal)
        .bind(&payment.processor_invoice_ref)
        .bind(payment.subscription_id.map(|id| *id.as_uuid()))
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| BillingError::infrastructure(format!("Failed to save payment: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, BillingError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, correlation_key, account_id, tier, duration_months,
                   amount_cents, discount_cents, final_amount_cents, status,
                   payment_method, is_renewal, processor_invoice_ref,
                   subscription_id, created_at, updated_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BillingError::infrastructure(format!("Failed to find payment: {}", e)))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_correlation_key(&self, key: &str) -> Result<Option<Payment>, BillingError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, correlation_key, account_id, tier, duration_months,
                   amount_cents, discount_cents, final_amount_cents, status,
                   payment_method, is_renewal, processor_invoice_ref,
                   subscription_id, created_at, updated_at
            FROM payments
            WHERE correlation_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BillingError::infrastructure(format!("Failed to find payment: {}", e)))?;

        row.map(Payment::try_from).transpose()
    }

    async fn settle_if_pending(&self, payment: &Payment) -> Result<bool, BillingError> {
        // Status guard in the WHERE clause makes the database arbitrate
        // concurrent settlements of one payment
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = $2,
                payment_method = $3,
                subscription_id = $4,
                updated_at = $5
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.status.as_str())
        .bind(payment.payment_method.map(|m| m.as_str()))
        .bind(payment.subscription_id.map(|id| *id.as_uuid()))
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| BillingError::infrastructure(format!("Failed to settle payment: {}", e)))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Zero rows: either the row is already settled or it never existed.
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM payments WHERE id = $1")
            .bind(payment.id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                BillingError::infrastructure(format!("Failed to check payment row: {}", e))
            })?;

        match exists {
            Some(_) => Ok(false),
            None => Err(BillingError::payment_not_found(&payment.correlation_key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(status: &str) -> PaymentRow {
        let now = Utc::now();
        PaymentRow {
            id: Uuid::new_v4(),
            correlation_key: "cs_test_123".to_string(),
            account_id: Uuid::new_v4(),
            tier: "platinum".to_string(),
            duration_months: 1,
            amount_cents: 10000,
            discount_cents: 2000,
            final_amount_cents: 8000,
            status: status.to_string(),
            payment_method: Some("card".to_string()),
            is_renewal: false,
            processor_invoice_ref: None,
            subscription_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_maps_onto_payment() {
        let payment = Payment::try_from(sample_row("success")).unwrap();

        assert_eq!(payment.correlation_key, "cs_test_123");
        assert_eq!(payment.tier, SubscriptionTier::Platinum);
        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.final_amount, Money::from_cents(8000).unwrap());
        assert_eq!(payment.payment_method, Some(PaymentMethod::Card));
    }

    #[test]
    fn parse_status_covers_the_state_machine() {
        assert_eq!(parse_status("pending").unwrap(), PaymentStatus::Pending);
        assert_eq!(parse_status("success").unwrap(), PaymentStatus::Success);
        assert_eq!(parse_status("failed").unwrap(), PaymentStatus::Failed);
        assert_eq!(parse_status("cancelled").unwrap(), PaymentStatus::Cancelled);
    }

    #[test]
    fn parse_status_rejects_unknown_values() {
        assert!(parse_status("refunded").is_err());
        assert!(parse_status("").is_err());
    }

    #[test]
    fn parse_method_roundtrips_stored_values() {
        for method in [
            PaymentMethod::Card,
            PaymentMethod::BankTransfer,
            PaymentMethod::Wallet,
            PaymentMethod::Other,
        ] {
            assert_eq!(parse_method(method.as_str()), method);
        }
    }

    #[test]
    fn tier_to_str_roundtrips_through_parse() {
        for tier in [
            SubscriptionTier::Bronze,
            SubscriptionTier::Platinum,
            SubscriptionTier::Diamond,
        ] {
            let parsed: SubscriptionTier = tier_to_str(tier).parse().unwrap();
            assert_eq!(parsed, tier);
        }
    }

    #[test]
    fn bad_tier_value_is_an_error() {
        let mut row = sample_row("success");
        row.tier = "titanium".to_string();
        assert!(Payment::try_from(row).is_err());
    }

    #[test]
    fn negative_amount_is_an_error() {
        let mut row = sample_row("success");
        row.amount_cents = -1;
        assert!(Payment::try_from(row).is_err());
    }
}
