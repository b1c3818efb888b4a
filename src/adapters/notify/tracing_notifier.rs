//! Log-only notifier for development.
//!
//! Writes each notice to the tracing log instead of delivering it. Useful
//! when no mail API key is configured; the full notice body lands in the
//! log at debug level so local runs can still inspect what would be sent.

use async_trait::async_trait;

use crate::ports::{Notice, Notifier, NotifyError};

/// Notifier that logs notices instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Create a new tracing notifier.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError> {
        tracing::info!(
            to = %notice.to,
            subject = %notice.subject,
            "Billing notice (log only)"
        );
        tracing::debug!(body = %notice.body, "Billing notice body");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_always_succeeds() {
        let notifier = TracingNotifier::new();
        let notice = Notice::subscription_activated("jo@example.com", "Platinum", "2026-03-01");

        assert!(notifier.send(&notice).await.is_ok());
    }
}
