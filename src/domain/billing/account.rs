//! Employer account entity.
//!
//! The billing engine only owns the billing-facing slice of an account: the
//! processor customer it bills against and the pointer to its current
//! subscription. Account registration itself lives in the marketplace core.

use crate::domain::foundation::{AccountId, SubscriptionId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

/// Billing view of an employer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for this account.
    pub id: AccountId,

    /// Contact email, also handed to the processor as the customer email.
    pub email: String,

    /// Company or contact name.
    pub name: String,

    /// Processor customer id; created lazily on first checkout.
    pub processor_customer_ref: Option<String>,

    /// The account's current subscription, re-pointed on each confirmed
    /// purchase.
    pub current_subscription_id: Option<SubscriptionId>,

    /// When the account was created.
    pub created_at: Timestamp,

    /// When the account was last updated.
    pub updated_at: Timestamp,
}

impl Account {
    /// Creates a billing account record.
    ///
    /// # Errors
    ///
    /// Returns a validation error on an empty or malformed email.
    pub fn new(
        id: AccountId,
        email: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let email = email.into();
        if email.is_empty() {
            return Err(ValidationError::empty_field("email"));
        }
        if !email.contains('@') {
            return Err(ValidationError::invalid_format("email", "missing @ symbol"));
        }

        let now = Timestamp::now();
        Ok(Self {
            id,
            email,
            name: name.into(),
            processor_customer_ref: None,
            current_subscription_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Stores the lazily created processor customer id.
    pub fn attach_customer_ref(&mut self, customer_ref: impl Into<String>) {
        self.processor_customer_ref = Some(customer_ref.into());
        self.updated_at = Timestamp::now();
    }

    /// Points the account at its newest subscription.
    pub fn point_to_subscription(&mut self, subscription_id: SubscriptionId) {
        self.current_subscription_id = Some(subscription_id);
        self.updated_at = Timestamp::now();
    }
}
