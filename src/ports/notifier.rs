//! Notifier port for customer-facing billing notices.
//!
//! Purchase and renewal notices are a courtesy, not part of the transaction:
//! they are sent after commit and a delivery failure is logged, never
//! propagated. The port stays narrow so implementations can be a real mail
//! API in production and a tracing sink in development.

use async_trait::async_trait;
use thiserror::Error;

/// A notice ready to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Recipient email address.
    pub to: String,

    /// Subject line.
    pub subject: String,

    /// Plain-text body.
    pub body: String,
}

impl Notice {
    /// Notice for a freshly activated subscription.
    pub fn subscription_activated(to: impl Into<String>, tier: &str, expires_on: &str) -> Self {
        Self {
            to: to.into(),
            subject: format!("Your TalentHub {} subscription is active", tier),
            body: format!(
                "Welcome aboard! Your {} subscription is now active and runs until {}. \
                 You can manage auto-renewal at any time from your account settings.",
                tier, expires_on
            ),
        }
    }

    /// Notice for a completed renewal.
    pub fn subscription_renewed(
        to: impl Into<String>,
        tier: &str,
        expires_on: &str,
        renewal_count: u32,
    ) -> Self {
        Self {
            to: to.into(),
            subject: format!("Your TalentHub {} subscription has renewed", tier),
            body: format!(
                "Renewal #{} of your {} subscription went through. \
                 Your subscription now runs until {}.",
                renewal_count, tier, expires_on
            ),
        }
    }

    /// Notice for a failed renewal charge.
    pub fn renewal_payment_failed(to: impl Into<String>, tier: &str) -> Self {
        Self {
            to: to.into(),
            subject: format!("Payment problem with your TalentHub {} subscription", tier),
            body: format!(
                "We could not collect the renewal payment for your {} subscription. \
                 The payment provider will retry automatically; please check that \
                 your payment method is up to date.",
                tier
            ),
        }
    }

    /// Notice for a subscription expired by the reconciliation sweep.
    pub fn subscription_expired(to: impl Into<String>, tier: &str, expired_on: &str) -> Self {
        Self {
            to: to.into(),
            subject: format!("Your TalentHub {} subscription has expired", tier),
            body: format!(
                "Your {} subscription ended on {}. You can pick a new package any \
                 time to keep your job postings visible to candidates.",
                tier, expired_on
            ),
        }
    }
}

/// Errors from notice delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The delivery channel rejected or failed the send.
    #[error("notice delivery failed: {0}")]
    Delivery(String),

    /// The notifier is misconfigured (bad key, missing sender address).
    #[error("notifier misconfigured: {0}")]
    Config(String),
}

/// Port for delivering billing notices.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notice.
    ///
    /// Callers fire this after commit and treat errors as log-and-continue.
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn notifier_is_object_safe() {
        fn _accepts_dyn(_notifier: &dyn Notifier) {}
    }

    #[test]
    fn activation_notice_names_tier_and_expiry() {
        let notice = Notice::subscription_activated("jo@example.com", "Platinum", "2026-03-01");

        assert_eq!(notice.to, "jo@example.com");
        assert!(notice.subject.contains("Platinum"));
        assert!(notice.body.contains("2026-03-01"));
    }

    #[test]
    fn renewal_notice_carries_renewal_number() {
        let notice =
            Notice::subscription_renewed("jo@example.com", "Diamond", "2026-04-01", 3);

        assert!(notice.body.contains("Renewal #3"));
        assert!(notice.subject.contains("renewed"));
    }

    #[test]
    fn failure_notice_asks_for_payment_method_check() {
        let notice = Notice::renewal_payment_failed("jo@example.com", "Platinum");

        assert!(notice.subject.contains("Payment problem"));
        assert!(notice.body.contains("payment method"));
    }

    #[test]
    fn expiry_notice_points_back_to_packages() {
        let notice = Notice::subscription_expired("jo@example.com", "Bronze", "2026-05-01");

        assert!(notice.subject.contains("expired"));
        assert!(notice.body.contains("2026-05-01"));
        assert!(notice.body.contains("package"));
    }
}
