//! Subscription lifecycle status.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Status of a subscription.
///
/// Subscriptions are never deleted; they terminate by status. `Expired` is
/// recoverable while the subscription year is still open (a late renewal
/// invoice re-activates), `Cancelled` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Paid up and granting access.
    Active,

    /// Lapsed or past the subscription year.
    Expired,

    /// Terminated on the processor side or by the account.
    Cancelled,
}

impl SubscriptionStatus {
    /// Returns the lowercase wire/storage name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // Active -> Active models a renewal cycle
            (Active, Active)
                | (Active, Expired)
                | (Active, Cancelled)
                | (Expired, Active)
                | (Expired, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Active => vec![Active, Expired, Cancelled],
            Expired => vec![Active, Cancelled],
            Cancelled => vec![],
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
