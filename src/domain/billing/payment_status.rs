//! Payment lifecycle status.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Status of a payment record.
///
/// Every payment starts `Pending` and settles exactly once into `Success`,
/// `Failed`, or `Cancelled`. Settled states are absorbing; a settled payment
/// is never mutated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Checkout started, outcome unknown.
    Pending,

    /// The processor confirmed the charge.
    Success,

    /// The processor reported the charge as unpaid or declined.
    Failed,

    /// The buyer abandoned checkout before paying.
    Cancelled,
}

impl PaymentStatus {
    /// Returns the lowercase wire/storage name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    /// Returns true once the payment has settled into a terminal state.
    pub fn is_settled(&self) -> bool {
        self.is_terminal()
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Success) | (Pending, Failed) | (Pending, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Success, Failed, Cancelled],
            Success => vec![],
            Failed => vec![],
            Cancelled => vec![],
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
