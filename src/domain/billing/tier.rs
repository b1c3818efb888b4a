//! Subscription tier definitions.
//!
//! Represents the employer subscription levels sold on the TalentHub
//! marketplace.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::BillingError;

/// Employer subscription tier.
///
/// Determines job-posting limits and candidate-search features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    /// Entry tier.
    /// - 5 active job postings
    /// - Standard listing placement
    Bronze,

    /// Mid tier.
    /// - 25 active job postings
    /// - Featured listing placement
    /// - Candidate search
    Platinum,

    /// Top tier.
    /// - Unlimited job postings
    /// - Featured placement and priority support
    /// - Full candidate search and outreach
    Diamond,
}

impl SubscriptionTier {
    /// Returns the display name for this tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionTier::Bronze => "Bronze",
            SubscriptionTier::Platinum => "Platinum",
            SubscriptionTier::Diamond => "Diamond",
        }
    }

    /// Returns the numeric rank of this tier for comparison.
    ///
    /// Higher rank = more features.
    pub fn rank(&self) -> u8 {
        match self {
            SubscriptionTier::Bronze => 0,
            SubscriptionTier::Platinum => 1,
            SubscriptionTier::Diamond => 2,
        }
    }

    /// Returns true for tiers whose purchases and renewals trigger an
    /// account notification. Bronze is the quiet tier.
    pub fn notifies_on_purchase(&self) -> bool {
        !matches!(self, SubscriptionTier::Bronze)
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for SubscriptionTier {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bronze" => Ok(SubscriptionTier::Bronze),
            "platinum" => Ok(SubscriptionTier::Platinum),
            "diamond" => Ok(SubscriptionTier::Diamond),
            other => Err(BillingError::invalid_tier(other)),
        }
    }
}
