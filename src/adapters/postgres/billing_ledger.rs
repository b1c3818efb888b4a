//! PostgreSQL implementation of the BillingLedger port.
//!
//! Both commits run in a single database transaction and let PostgreSQL
//! arbitrate races. The activation commit is guarded on the payment row still
//! being pending; the renewal commit is deduplicated on the correlation key
//! and guarded on the subscription row's status and renewal count.
//! Losing either race rolls everything back and reports a distinct outcome so
//! callers can short-circuit instead of failing.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::{Account, BillingError, Payment, Subscription, SubscriptionTier};
use crate::ports::{ActivationCommit, BillingLedger, RenewalCommit};

/// PostgreSQL implementation of the BillingLedger port.
pub struct PostgresBillingLedger {
    pool: PgPool,
}

impl PostgresBillingLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn tier_to_str(tier: SubscriptionTier) -> &'static str {
    match tier {
        SubscriptionTier::Bronze => "bronze",
        SubscriptionTier::Platinum => "platinum",
        SubscriptionTier::Diamond => "diamond",
    }
}

#[async_trait]
impl BillingLedger for PostgresBillingLedger {
    async fn commit_activation(
        &self,
        payment: &Payment,
        subscription: &Subscription,
        account: &Account,
    ) -> Result<ActivationCommit, BillingError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            BillingError::infrastructure(format!("Failed to begin transaction: {}", e))
        })?;

        // 1. Settle the payment, guarded on the stored row still being
        //    pending. Zero rows means another confirmation or a cancellation
        //    got there first.
        let settled = sqlx::query(
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
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            BillingError::infrastructure(format!("Failed to settle payment: {}", e))
        })?;

        if settled.rows_affected() == 0 {
            // Distinguish a lost race from a payment that was never stored.
            // Dropping the transaction rolls it back.
            let exists: Option<(uuid::Uuid,)> =
                sqlx::query_as("SELECT id FROM payments WHERE id = $1")
                    .bind(payment.id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| {
                        BillingError::infrastructure(format!(
                            "Failed to check payment row: {}",
                            e
                        ))
                    })?;

            return match exists {
                Some(_) => Ok(ActivationCommit::AlreadySettled),
                None => Err(BillingError::payment_not_found(&payment.correlation_key)),
            };
        }

        // 2. Create the subscription.
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
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            BillingError::infrastructure(format!("Failed to create subscription: {}", e))
        })?;

        // 3. Point the account at its new subscription and remember the
        //    processor customer for future checkouts.
        sqlx::query(
            r#"
            UPDATE accounts SET
                processor_customer_ref = $2,
                current_subscription_id = $3,
                updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.processor_customer_ref)
        .bind(account.current_subscription_id.map(|id| *id.as_uuid()))
        .bind(account.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            BillingError::infrastructure(format!("Failed to update account: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            BillingError::infrastructure(format!("Failed to commit activation: {}", e))
        })?;

        Ok(ActivationCommit::Applied)
    }

    async fn commit_renewal(
        &self,
        payment: &Payment,
        subscription: &Subscription,
    ) -> Result<RenewalCommit, BillingError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            BillingError::infrastructure(format!("Failed to begin transaction: {}", e))
        })?;

        // 1. Record the renewal payment, keyed on the processor invoice id.
        //    An existing successful row means the invoice was already applied;
        //    an existing failed row is superseded because the processor
        //    retried the charge and it went through.
        let inserted = sqlx::query(
            r#"
            INSERT INTO payments (
                id, correlation_key, account_id, tier, duration_months,
                amount_cents, discount_cents, final_amount_cents, status,
                payment_method, is_renewal, processor_invoice_ref,
                subscription_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (correlation_key) DO UPDATE SET
                status = EXCLUDED.status,
                payment_method = EXCLUDED.payment_method,
                amount_cents = EXCLUDED.amount_cents,
                discount_cents = EXCLUDED.discount_cents,
                final_amount_cents = EXCLUDED.final_amount_cents,
                updated_at = EXCLUDED.updated_at
            WHERE payments.status = 'failed'
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
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            BillingError::infrastructure(format!("Failed to record renewal payment: {}", e))
        })?;

        if inserted.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Ok(RenewalCommit::DuplicateInvoice);
        }

        // 2. Advance the subscription one term, guarded on the row still
        //    holding the renewal count this renewal was computed from and
        //    not having been cancelled meanwhile. A renewal may legally
        //    re-activate an expired row, so only 'cancelled' is fenced off.
        //    Zero rows means a concurrent writer moved the subscription
        //    first; roll back and report a retryable error so the processor
        //    redelivers against fresh state.
        let expected_renewals = subscription.renewal_count.saturating_sub(1);
        let advanced = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $2,
                expire_date = $3,
                renewal_count = $4,
                auto_renewal = $5,
                updated_at = $6
            WHERE id = $1 AND status <> 'cancelled' AND renewal_count = $7
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.status.as_str())
        .bind(subscription.expire_date.as_datetime())
        .bind(subscription.renewal_count as i32)
        .bind(subscription.auto_renewal)
        .bind(subscription.updated_at.as_datetime())
        .bind(expected_renewals as i32)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            BillingError::infrastructure(format!("Failed to advance subscription: {}", e))
        })?;

        if advanced.rows_affected() == 0 {
            return Err(BillingError::infrastructure(format!(
                "Renewal of subscription {} lost a concurrent update",
                subscription.id
            )));
        }

        tx.commit().await.map_err(|e| {
            BillingError::infrastructure(format!("Failed to commit renewal: {}", e))
        })?;

        Ok(RenewalCommit::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_strings_match_repository_encoding() {
        assert_eq!(tier_to_str(SubscriptionTier::Bronze), "bronze");
        assert_eq!(tier_to_str(SubscriptionTier::Platinum), "platinum");
        assert_eq!(tier_to_str(SubscriptionTier::Diamond), "diamond");
    }
}
