//! ProcessWebhookHandler - Command handler for payment processor webhooks.
//!
//! Everything that happens to a subscription after its first purchase arrives
//! through here: renewal invoices, failed charges, processor-side
//! cancellations, and auto-renewal flag changes. The handler verifies the
//! signature before reading anything else from the body, deduplicates on the
//! processor event id, and records every outcome for audit.
//!
//! The renewal path also enforces the one-year ceiling: an invoice that lands
//! on or after `year_end_date` force-cancels the processor subscription and
//! expires the local one instead of recording another term.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, BillingEventType, InvoicePayload, Payment, ProcessorEvent,
    ProcessorWebhookVerifier, Subscription, SubscriptionPayload, WebhookError,
};
use crate::domain::foundation::{Money, PaymentId, SubscriptionId, Timestamp};
use crate::ports::{
    AccountRepository, BillingLedger, Notice, Notifier, PaymentProvider, PaymentRepository,
    RenewalCommit, SaveResult, SubscriptionRepository, WebhookEventRecord,
    WebhookEventRepository,
};

/// Command to process a raw webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// Signature header value.
    pub signature: String,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessWebhookResult {
    /// A renewal invoice was applied and the subscription advanced one term.
    Renewed {
        subscription_id: SubscriptionId,
        renewal_count: u32,
    },
    /// The one-year ceiling was reached; the subscription was force-expired
    /// and no renewal was recorded.
    ForcedExpiry { subscription_id: SubscriptionId },
    /// A failed renewal charge was recorded for audit.
    RenewalFailed { subscription_id: SubscriptionId },
    /// The processor deleted the subscription; the local one is cancelled.
    Cancelled { subscription_id: SubscriptionId },
    /// The auto-renewal flag was synced from processor state.
    AutoRenewalSynced {
        subscription_id: SubscriptionId,
        auto_renewal: bool,
    },
    /// Event acknowledged without any state change.
    Ignored { reason: String },
    /// Event was already processed (idempotent skip).
    AlreadyProcessed,
}

/// Handler for payment processor webhooks.
pub struct ProcessWebhookHandler {
    verifier: ProcessorWebhookVerifier,
    webhook_events: Arc<dyn WebhookEventRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentRepository>,
    accounts: Arc<dyn AccountRepository>,
    ledger: Arc<dyn BillingLedger>,
    payment_provider: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn Notifier>,
}

impl ProcessWebhookHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        verifier: ProcessorWebhookVerifier,
        webhook_events: Arc<dyn WebhookEventRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        payments: Arc<dyn PaymentRepository>,
        accounts: Arc<dyn AccountRepository>,
        ledger: Arc<dyn BillingLedger>,
        payment_provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            verifier,
            webhook_events,
            subscriptions,
            payments,
            accounts,
            ledger,
            payment_provider,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessWebhookCommand,
    ) -> Result<ProcessWebhookResult, WebhookError> {
        // 1. Verify the signature before trusting a single byte of the body
        let event = match self.verifier.verify_and_parse(&cmd.payload, &cmd.signature) {
            Ok(event) => event,
            Err(e) => {
                if e.is_security_event() {
                    tracing::warn!(error = %e, "Webhook rejected: signature verification failed");
                }
                return Err(e);
            }
        };

        // 2. Deduplicate on the processor event id; a failed record means we
        //    returned a retryable status last time, so run the handler again
        if let Some(existing) = self.webhook_events.find_by_event_id(&event.id).await? {
            if existing.is_settled() {
                tracing::debug!(event_id = %event.id, "Webhook already processed");
                return Ok(ProcessWebhookResult::AlreadyProcessed);
            }
        }

        // 3. Route on event type
        let outcome = self.dispatch(&event).await;

        // 4. Record the outcome before acknowledging
        let payload = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);
        let record = match &outcome {
            Ok(ProcessWebhookResult::Ignored { reason }) => {
                WebhookEventRecord::ignored(&event.id, &event.event_type, reason, payload)
            }
            Ok(_) => WebhookEventRecord::success(&event.id, &event.event_type, payload),
            Err(e) => {
                WebhookEventRecord::failed(&event.id, &event.event_type, e.to_string(), payload)
            }
        };

        match self.webhook_events.save(record).await? {
            SaveResult::Inserted => outcome,
            // A concurrent delivery of the same event settled it first
            SaveResult::AlreadyExists => Ok(ProcessWebhookResult::AlreadyProcessed),
        }
    }

    async fn dispatch(
        &self,
        event: &ProcessorEvent,
    ) -> Result<ProcessWebhookResult, WebhookError> {
        match event.parsed_type() {
            BillingEventType::InvoicePaymentSucceeded => self.on_invoice_paid(event).await,
            BillingEventType::InvoicePaymentFailed => self.on_invoice_failed(event).await,
            BillingEventType::SubscriptionDeleted => self.on_subscription_deleted(event).await,
            BillingEventType::SubscriptionUpdated => self.on_subscription_updated(event).await,
            BillingEventType::Unknown => Ok(ProcessWebhookResult::Ignored {
                reason: format!("unhandled event type {}", event.event_type),
            }),
        }
    }

    async fn on_invoice_paid(
        &self,
        event: &ProcessorEvent,
    ) -> Result<ProcessWebhookResult, WebhookError> {
        let invoice: InvoicePayload = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let Some(subscription_ref) = invoice.subscription.clone() else {
            return Ok(ProcessWebhookResult::Ignored {
                reason: "invoice has no subscription reference".to_string(),
            });
        };

        let Some(mut subscription) = self.resolve(&subscription_ref).await? else {
            tracing::warn!(
                subscription_ref = %subscription_ref,
                invoice = %invoice.id,
                "Invoice for unknown subscription; ignoring"
            );
            return Ok(ProcessWebhookResult::Ignored {
                reason: format!("no subscription for processor ref {}", subscription_ref),
            });
        };

        if let Some(claimed) = invoice.claimed_account_id() {
            if claimed != subscription.account_id.to_string() {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    claimed_account = %claimed,
                    actual_account = %subscription.account_id,
                    "Invoice metadata names a different account; ignoring"
                );
                return Ok(ProcessWebhookResult::Ignored {
                    reason: "invoice metadata does not match local subscription".to_string(),
                });
            }
        }

        // The ceiling check comes first: an invoice landing past year end
        // must never be recorded as a renewal
        let now = Timestamp::now();
        if subscription.has_reached_year_end(now) {
            return self
                .force_expire_at_ceiling(&mut subscription, &subscription_ref)
                .await;
        }

        if !invoice.is_renewal_cycle() {
            return Ok(ProcessWebhookResult::Ignored {
                reason: format!(
                    "billing reason {} is not a renewal cycle",
                    invoice.billing_reason.as_deref().unwrap_or("absent")
                ),
            });
        }

        self.apply_renewal(subscription, &invoice).await
    }

    /// A paid invoice arriving at or past `year_end_date` stops billing
    /// instead of extending it. The processor cancel must succeed before any
    /// local mutation: if it fails we return a retryable error and let the
    /// redelivery try again.
    async fn force_expire_at_ceiling(
        &self,
        subscription: &mut Subscription,
        subscription_ref: &str,
    ) -> Result<ProcessWebhookResult, WebhookError> {
        self.payment_provider
            .cancel_subscription(subscription_ref)
            .await
            .map_err(|e| WebhookError::Provider(e.to_string()))?;

        subscription.disable_auto_renewal();
        subscription.expire()?;
        self.subscriptions.update(subscription).await?;

        tracing::info!(
            subscription_id = %subscription.id,
            account_id = %subscription.account_id,
            "Subscription reached its one-year ceiling; force-expired"
        );

        Ok(ProcessWebhookResult::ForcedExpiry {
            subscription_id: subscription.id,
        })
    }

    async fn apply_renewal(
        &self,
        subscription: Subscription,
        invoice: &InvoicePayload,
    ) -> Result<ProcessWebhookResult, WebhookError> {
        let amount = Money::from_cents(invoice.amount_paid)
            .map_err(|_| WebhookError::ParseError("invoice amount_paid is negative".to_string()))?;

        let payment = Payment::successful_renewal(
            PaymentId::new(),
            invoice.id.clone(),
            subscription.account_id,
            subscription.tier,
            amount,
            None,
            subscription.id,
        );

        let mut renewed = subscription;
        renewed.renew()?;

        match self.ledger.commit_renewal(&payment, &renewed).await? {
            RenewalCommit::Applied => {}
            RenewalCommit::DuplicateInvoice => {
                return Ok(ProcessWebhookResult::Ignored {
                    reason: format!("invoice {} already applied", invoice.id),
                });
            }
        }

        tracing::info!(
            subscription_id = %renewed.id,
            account_id = %renewed.account_id,
            renewal_count = renewed.renewal_count,
            expire_date = %renewed.expire_date,
            "Subscription renewed"
        );

        if renewed.tier.notifies_on_purchase() {
            self.send_renewal_notice(&renewed).await;
        }

        Ok(ProcessWebhookResult::Renewed {
            subscription_id: renewed.id,
            renewal_count: renewed.renewal_count,
        })
    }

    async fn on_invoice_failed(
        &self,
        event: &ProcessorEvent,
    ) -> Result<ProcessWebhookResult, WebhookError> {
        let invoice: InvoicePayload = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let Some(subscription_ref) = invoice.subscription.clone() else {
            return Ok(ProcessWebhookResult::Ignored {
                reason: "invoice has no subscription reference".to_string(),
            });
        };

        let Some(subscription) = self.resolve(&subscription_ref).await? else {
            return Ok(ProcessWebhookResult::Ignored {
                reason: format!("no subscription for processor ref {}", subscription_ref),
            });
        };

        // Audit row only. The subscription keeps its current state; the
        // processor retries the charge on its own schedule.
        let amount_due = Money::from_cents(invoice.amount_due)
            .map_err(|_| WebhookError::ParseError("invoice amount_due is negative".to_string()))?;
        let payment = Payment::failed_renewal(
            PaymentId::new(),
            invoice.id.clone(),
            subscription.account_id,
            subscription.tier,
            amount_due,
            subscription.id,
        );
        self.payments.save(&payment).await?;

        tracing::warn!(
            subscription_id = %subscription.id,
            account_id = %subscription.account_id,
            invoice = %invoice.id,
            "Renewal charge failed"
        );

        self.send_failure_notice(&subscription).await;

        Ok(ProcessWebhookResult::RenewalFailed {
            subscription_id: subscription.id,
        })
    }

    async fn on_subscription_deleted(
        &self,
        event: &ProcessorEvent,
    ) -> Result<ProcessWebhookResult, WebhookError> {
        let payload: SubscriptionPayload = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let Some(mut subscription) = self.resolve(&payload.id).await? else {
            return Ok(ProcessWebhookResult::Ignored {
                reason: format!("no subscription for processor ref {}", payload.id),
            });
        };

        subscription.cancel()?;
        self.subscriptions.update(&subscription).await?;

        tracing::info!(
            subscription_id = %subscription.id,
            account_id = %subscription.account_id,
            "Subscription cancelled by processor"
        );

        Ok(ProcessWebhookResult::Cancelled {
            subscription_id: subscription.id,
        })
    }

    async fn on_subscription_updated(
        &self,
        event: &ProcessorEvent,
    ) -> Result<ProcessWebhookResult, WebhookError> {
        let payload: SubscriptionPayload = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let Some(mut subscription) = self.resolve(&payload.id).await? else {
            return Ok(ProcessWebhookResult::Ignored {
                reason: format!("no subscription for processor ref {}", payload.id),
            });
        };

        let auto_renewal = !payload.cancel_at_period_end;
        subscription.sync_auto_renewal(auto_renewal)?;
        self.subscriptions.update(&subscription).await?;

        tracing::info!(
            subscription_id = %subscription.id,
            auto_renewal,
            "Auto-renewal synced from processor"
        );

        Ok(ProcessWebhookResult::AutoRenewalSynced {
            subscription_id: subscription.id,
            auto_renewal,
        })
    }

    async fn resolve(
        &self,
        subscription_ref: &str,
    ) -> Result<Option<Subscription>, BillingError> {
        self.subscriptions
            .find_by_processor_ref(subscription_ref)
            .await
    }

    async fn send_renewal_notice(&self, subscription: &Subscription) {
        let Ok(Some(account)) = self.accounts.find_by_id(&subscription.account_id).await else {
            tracing::warn!(
                account_id = %subscription.account_id,
                "No account for renewal notice"
            );
            return;
        };
        let notice = Notice::subscription_renewed(
            &account.email,
            subscription.tier.display_name(),
            &subscription.expire_date.to_string(),
            subscription.renewal_count,
        );
        if let Err(e) = self.notifier.send(&notice).await {
            tracing::warn!(error = %e, account_id = %account.id, "Renewal notice failed");
        }
    }

    async fn send_failure_notice(&self, subscription: &Subscription) {
        let Ok(Some(account)) = self.accounts.find_by_id(&subscription.account_id).await else {
            tracing::warn!(
                account_id = %subscription.account_id,
                "No account for renewal failure notice"
            );
            return;
        };
        let notice =
            Notice::renewal_payment_failed(&account.email, subscription.tier.display_name());
        if let Err(e) = self.notifier.send(&notice).await {
            tracing::warn!(error = %e, account_id = %account.id, "Failure notice failed");
        }
    }
}
