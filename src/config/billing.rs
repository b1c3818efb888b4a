//! Billing policy configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Billing policy configuration
///
/// Governs the renewal ceiling, the reconciliation sweep cadence, and how
/// long processed webhook audit records are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Renewal ceiling within the service year
    #[serde(default = "default_max_renewals")]
    pub max_renewals: u32,

    /// Seconds between reconciliation sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Run a sweep immediately at boot
    #[serde(default = "default_sweep_on_startup")]
    pub sweep_on_startup: bool,

    /// Days to keep processed webhook audit records before the sweep prunes
    /// them
    #[serde(default = "default_webhook_retention_days")]
    pub webhook_retention_days: u32,
}

impl BillingConfig {
    /// Get the sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_renewals == 0 {
            return Err(ValidationError::InvalidMaxRenewals);
        }
        if self.sweep_interval_secs < 60 {
            return Err(ValidationError::InvalidSweepInterval);
        }
        if self.webhook_retention_days == 0 {
            return Err(ValidationError::InvalidWebhookRetention);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            max_renewals: default_max_renewals(),
            sweep_interval_secs: default_sweep_interval_secs(),
            sweep_on_startup: default_sweep_on_startup(),
            webhook_retention_days: default_webhook_retention_days(),
        }
    }
}

fn default_max_renewals() -> u32 {
    12
}

fn default_sweep_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_sweep_on_startup() -> bool {
    true
}

fn default_webhook_retention_days() -> u32 {
    90
}
