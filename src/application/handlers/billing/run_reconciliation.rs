//! RunReconciliationHandler - Safety-net sweep for subscription lifetimes.
//!
//! Webhooks are the primary lifecycle driver, but they can be missed. The
//! sweep closes the gap in two passes:
//!
//! 1. **Lapsed pass**: active subscriptions with auto-renewal off whose paid
//!    period is over are marked expired, with a best-effort expiry notice.
//! 2. **Ceiling pass**: active subscriptions with auto-renewal on that have
//!    reached `year_end_date` are cancelled at the processor (best effort)
//!    and expired locally.
//!
//! Each row is handled independently; a failure is logged and counted, never
//! allowed to stop the sweep. A sweep that finds the previous run still going
//! skips instead of stacking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription};
use crate::domain::foundation::Timestamp;
use crate::ports::{
    AccountRepository, Notice, Notifier, PaymentProvider, SubscriptionRepository,
    WebhookEventRepository,
};

/// Command to run one reconciliation sweep.
#[derive(Debug, Clone, Copy)]
pub struct RunReconciliationCommand {
    /// The sweep's idea of "now"; row selection and expiry both use it.
    pub now: Timestamp,
}

/// Counters from one completed sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Subscriptions expired because their paid period lapsed.
    pub lapsed_expired: u32,
    /// Subscriptions expired at the one-year ceiling.
    pub ceiling_expired: u32,
    /// Rows that could not be transitioned this run.
    pub failures: u32,
}

/// Result of a sweep request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunReconciliationResult {
    Completed(ReconciliationReport),
    /// The previous sweep is still running; nothing was done.
    AlreadyRunning,
}

/// Handler for the reconciliation sweep.
pub struct RunReconciliationHandler {
    accounts: Arc<dyn AccountRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn Notifier>,
    audit_pruning: Option<(Arc<dyn WebhookEventRepository>, u32)>,
    running: AtomicBool,
}

/// Clears the running flag when a sweep exits, on any path.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl RunReconciliationHandler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            accounts,
            subscriptions,
            payment_provider,
            notifier,
            audit_pruning: None,
            running: AtomicBool::new(false),
        }
    }

    /// Also prune processed webhook audit records older than
    /// `retention_days` at the end of each sweep.
    pub fn with_audit_pruning(
        mut self,
        webhook_events: Arc<dyn WebhookEventRepository>,
        retention_days: u32,
    ) -> Self {
        self.audit_pruning = Some((webhook_events, retention_days));
        self
    }

    pub async fn handle(
        &self,
        cmd: RunReconciliationCommand,
    ) -> Result<RunReconciliationResult, BillingError> {
        // 1. Re-entrancy guard
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Reconciliation sweep already running; skipping");
            return Ok(RunReconciliationResult::AlreadyRunning);
        }
        let _guard = SweepGuard(&self.running);

        let mut report = ReconciliationReport::default();

        // 2. Lapsed pass
        self.expire_lapsed(cmd.now, &mut report).await?;

        // 3. Ceiling pass
        self.expire_past_year_end(cmd.now, &mut report).await?;

        // 4. Webhook audit retention, best effort
        self.prune_webhook_audit(cmd.now).await;

        tracing::info!(
            lapsed_expired = report.lapsed_expired,
            ceiling_expired = report.ceiling_expired,
            failures = report.failures,
            "Reconciliation sweep finished"
        );

        Ok(RunReconciliationResult::Completed(report))
    }

    async fn expire_lapsed(
        &self,
        now: Timestamp,
        report: &mut ReconciliationReport,
    ) -> Result<(), BillingError> {
        let lapsed = self.subscriptions.find_lapsed(now).await?;

        for mut subscription in lapsed {
            let outcome = match subscription.expire() {
                Ok(()) => self.subscriptions.update(&subscription).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => {
                    tracing::info!(
                        subscription_id = %subscription.id,
                        account_id = %subscription.account_id,
                        expire_date = %subscription.expire_date,
                        "Lapsed subscription expired"
                    );
                    report.lapsed_expired += 1;
                    self.send_expiry_notice(&subscription).await;
                }
                Err(e) => {
                    tracing::error!(
                        subscription_id = %subscription.id,
                        error = %e,
                        "Failed to expire lapsed subscription"
                    );
                    report.failures += 1;
                }
            }
        }

        Ok(())
    }

    async fn expire_past_year_end(
        &self,
        now: Timestamp,
        report: &mut ReconciliationReport,
    ) -> Result<(), BillingError> {
        let at_ceiling = self.subscriptions.find_past_year_end(now).await?;

        for mut subscription in at_ceiling {
            // Best-effort processor cancel. A miss here is only logged: the
            // next invoice webhook hits the ceiling branch and cancels again.
            if let Some(subscription_ref) = subscription.processor_subscription_ref.as_deref() {
                if let Err(e) = self.payment_provider.cancel_subscription(subscription_ref).await
                {
                    tracing::warn!(
                        subscription_id = %subscription.id,
                        subscription_ref,
                        error = %e,
                        "Processor cancel failed during ceiling sweep"
                    );
                }
            }

            subscription.disable_auto_renewal();
            let outcome = match subscription.expire() {
                Ok(()) => self.subscriptions.update(&subscription).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => {
                    tracing::info!(
                        subscription_id = %subscription.id,
                        account_id = %subscription.account_id,
                        year_end_date = %subscription.year_end_date,
                        "Subscription expired at the one-year ceiling"
                    );
                    report.ceiling_expired += 1;
                    self.send_expiry_notice(&subscription).await;
                }
                Err(e) => {
                    tracing::error!(
                        subscription_id = %subscription.id,
                        error = %e,
                        "Failed to expire subscription at the ceiling"
                    );
                    report.failures += 1;
                }
            }
        }

        Ok(())
    }

    async fn prune_webhook_audit(&self, now: Timestamp) {
        let Some((webhook_events, retention_days)) = &self.audit_pruning else {
            return;
        };
        let cutoff = now.minus_days(i64::from(*retention_days));
        match webhook_events.delete_before(cutoff).await {
            Ok(0) => {}
            Ok(pruned) => {
                tracing::info!(pruned, "Old webhook audit records deleted");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Webhook audit pruning failed");
            }
        }
    }

    /// Best-effort expiry notice; every failure path is log-and-continue.
    async fn send_expiry_notice(&self, subscription: &Subscription) {
        let email = match self.accounts.find_by_id(&subscription.account_id).await {
            Ok(Some(account)) => account.email,
            Ok(None) => {
                tracing::warn!(
                    account_id = %subscription.account_id,
                    "Account missing for expiry notice"
                );
                return;
            }
            Err(e) => {
                tracing::warn!(
                    account_id = %subscription.account_id,
                    error = %e,
                    "Account lookup failed for expiry notice"
                );
                return;
            }
        };

        let notice = Notice::subscription_expired(
            email,
            subscription.tier.display_name(),
            &subscription.expire_date.to_string(),
        );
        if let Err(e) = self.notifier.send(&notice).await {
            tracing::warn!(
                subscription_id = %subscription.id,
                error = %e,
                "Expiry notice delivery failed"
            );
        }
    }
}
