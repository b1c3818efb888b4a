//! CancelCheckoutHandler - Command handler for an abandoned checkout.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Payment, PaymentStatus};
use crate::ports::{PaymentProvider, PaymentRepository};

/// Command to cancel an open checkout session.
#[derive(Debug, Clone)]
pub struct CancelCheckoutCommand {
    pub session_id: String,
}

/// Result of checkout cancellation.
#[derive(Debug, Clone)]
pub struct CancelCheckoutResult {
    pub payment: Payment,
}

/// Handler for the checkout cancel leg.
///
/// The customer backed out of the hosted checkout. The local payment flips to
/// cancelled; expiring the session at the provider is a courtesy so the stale
/// URL stops working, and its failure never blocks the cancellation.
pub struct CancelCheckoutHandler {
    payments: Arc<dyn PaymentRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl CancelCheckoutHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            payments,
            payment_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelCheckoutCommand,
    ) -> Result<CancelCheckoutResult, BillingError> {
        // 1. Resolve the payment for this session
        let mut payment = self
            .payments
            .find_by_correlation_key(&cmd.session_id)
            .await?
            .ok_or_else(|| BillingError::payment_not_found(&cmd.session_id))?;

        // 2. Only a pending payment can be abandoned
        if payment.status != PaymentStatus::Pending {
            return Err(BillingError::invalid_state(
                payment.status.as_str(),
                "cancel checkout",
            ));
        }

        // 3. Best-effort expiry of the hosted session
        if let Err(e) = self
            .payment_provider
            .expire_checkout_session(&cmd.session_id)
            .await
        {
            tracing::warn!(
                session_id = %cmd.session_id,
                error = %e,
                "Could not expire checkout session at provider"
            );
        }

        // 4. Settle locally, conceding to any concurrent confirmation
        payment.mark_cancelled()?;
        if !self.payments.settle_if_pending(&payment).await? {
            let fresh = self
                .payments
                .find_by_correlation_key(&cmd.session_id)
                .await?
                .ok_or_else(|| BillingError::payment_not_found(&cmd.session_id))?;
            return Err(BillingError::invalid_state(
                fresh.status.as_str(),
                "cancel checkout",
            ));
        }

        tracing::info!(
            payment_id = %payment.id,
            session_id = %cmd.session_id,
            "Checkout cancelled"
        );

        Ok(CancelCheckoutResult { payment })
    }
}
