//! Payment method captured on settled payments.

use serde::{Deserialize, Serialize};

/// How a settled payment was funded, as reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    Wallet,
    Other,
}

impl PaymentMethod {
    /// Maps a processor payment-method type string onto our coarse set.
    ///
    /// Unknown types land on `Other` rather than failing; the method is an
    /// audit detail, never a correctness input.
    pub fn from_processor(method_type: &str) -> Self {
        match method_type {
            "card" => PaymentMethod::Card,
            "sepa_debit" | "bank_transfer" | "sofort" | "ideal" => PaymentMethod::BankTransfer,
            "paypal" | "link" | "apple_pay" | "google_pay" => PaymentMethod::Wallet,
            _ => PaymentMethod::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Other => "other",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
