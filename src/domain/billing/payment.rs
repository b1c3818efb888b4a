//! Payment aggregate entity.
//!
//! A Payment records one attempt to move money: either a checkout started by
//! an employer or a renewal invoice reported by the processor. Payments are
//! append-only evidence; settled rows are never rewritten.
//!
//! # Design Decisions
//!
//! - **Correlation key**: the processor checkout-session id (or invoice id
//!   for renewals) is stored with a unique constraint and anchors all
//!   idempotent processing.
//! - **Money in cents**: all monetary values are integer cents.
//! - **One-way settlement**: `pending` settles exactly once into `success`,
//!   `failed`, or `cancelled`.

use crate::domain::foundation::{
    AccountId, Money, PaymentId, StateMachine, SubscriptionId, Timestamp, ValidationError,
};
use serde::{Deserialize, Serialize};

use super::{BillingError, PaymentMethod, PaymentStatus, SubscriptionTier};

/// Longest purchasable initial term, bounded by the subscription year.
pub const MAX_DURATION_MONTHS: u32 = 12;

/// Payment record for a checkout or a renewal invoice.
///
/// # Invariants
///
/// - `correlation_key` is unique across all payments
/// - `final_amount == amount - discount` and is never negative
/// - `status` follows the `PaymentStatus` state machine
/// - renewal payments carry `is_renewal = true` and a `processor_invoice_ref`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier for this payment.
    pub id: PaymentId,

    /// Processor-side id this payment is keyed on: the checkout-session id
    /// for purchases, the invoice id for renewals.
    pub correlation_key: String,

    /// Account that is paying.
    pub account_id: AccountId,

    /// Tier being purchased or renewed.
    pub tier: SubscriptionTier,

    /// Length of the purchased term in months (1 for renewal cycles).
    pub duration_months: u32,

    /// Gross amount before discount.
    pub amount: Money,

    /// Discount applied at checkout.
    pub discount: Money,

    /// Amount actually charged: `amount - discount`.
    pub final_amount: Money,

    /// Current settlement status.
    pub status: PaymentStatus,

    /// Funding method, known once the processor confirms the charge.
    pub payment_method: Option<PaymentMethod>,

    /// True for payments recorded from renewal invoices.
    pub is_renewal: bool,

    /// Processor invoice id, set for renewal payments.
    pub processor_invoice_ref: Option<String>,

    /// Subscription this payment created or renewed, once known.
    pub subscription_id: Option<SubscriptionId>,

    /// When the payment record was created.
    pub created_at: Timestamp,

    /// When the payment record was last updated.
    pub updated_at: Timestamp,
}

impl Payment {
    /// Creates a pending payment for a new checkout session.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the session id is empty, the duration
    /// is outside `1..=12` months, or the discount exceeds the amount.
    pub fn checkout(
        id: PaymentId,
        session_id: impl Into<String>,
        account_id: AccountId,
        tier: SubscriptionTier,
        duration_months: u32,
        amount: Money,
        discount: Money,
    ) -> Result<Self, BillingError> {
        let session_id = session_id.into();
        if session_id.is_empty() {
            return Err(ValidationError::empty_field("sessionId").into());
        }
        if duration_months == 0 || duration_months > MAX_DURATION_MONTHS {
            return Err(ValidationError::out_of_range(
                "durationMonths",
                1,
                MAX_DURATION_MONTHS as i64,
                duration_months as i64,
            )
            .into());
        }
        let final_amount = amount.subtract(discount)?;

        let now = Timestamp::now();
        Ok(Self {
            id,
            correlation_key: session_id,
            account_id,
            tier,
            duration_months,
            amount,
            discount,
            final_amount,
            status: PaymentStatus::Pending,
            payment_method: None,
            is_renewal: false,
            processor_invoice_ref: None,
            subscription_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Records a paid renewal invoice as an already-successful payment.
    ///
    /// Renewals cover one billing cycle, carry no discount, and are keyed on
    /// the invoice id so a redelivered invoice cannot be recorded twice.
    pub fn successful_renewal(
        id: PaymentId,
        invoice_ref: impl Into<String>,
        account_id: AccountId,
        tier: SubscriptionTier,
        amount: Money,
        payment_method: Option<PaymentMethod>,
        subscription_id: SubscriptionId,
    ) -> Self {
        Self::renewal_with_status(
            id,
            invoice_ref,
            account_id,
            tier,
            amount,
            payment_method,
            Some(subscription_id),
            PaymentStatus::Success,
        )
    }

    /// Records a failed renewal invoice for the audit trail.
    ///
    /// The subscription itself is not touched by a failed renewal; the
    /// processor retries on its own schedule.
    pub fn failed_renewal(
        id: PaymentId,
        invoice_ref: impl Into<String>,
        account_id: AccountId,
        tier: SubscriptionTier,
        amount_due: Money,
        subscription_id: SubscriptionId,
    ) -> Self {
        Self::renewal_with_status(
            id,
            invoice_ref,
            account_id,
            tier,
            amount_due,
            None,
            Some(subscription_id),
            PaymentStatus::Failed,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn renewal_with_status(
        id: PaymentId,
        invoice_ref: impl Into<String>,
        account_id: AccountId,
        tier: SubscriptionTier,
        amount: Money,
        payment_method: Option<PaymentMethod>,
        subscription_id: Option<SubscriptionId>,
        status: PaymentStatus,
    ) -> Self {
        let invoice_ref = invoice_ref.into();
        let now = Timestamp::now();
        Self {
            id,
            correlation_key: invoice_ref.clone(),
            account_id,
            tier,
            duration_months: 1,
            amount,
            discount: Money::ZERO,
            final_amount: amount,
            status,
            payment_method,
            is_renewal: true,
            processor_invoice_ref: Some(invoice_ref),
            subscription_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true once the payment has settled into a terminal state.
    pub fn is_settled(&self) -> bool {
        self.status.is_settled()
    }

    /// Marks the payment as confirmed paid.
    ///
    /// # Errors
    ///
    /// Returns an invalid-state error if the payment already settled.
    pub fn mark_succeeded(
        &mut self,
        payment_method: Option<PaymentMethod>,
    ) -> Result<(), BillingError> {
        self.transition_to(PaymentStatus::Success, "confirm payment")?;
        if payment_method.is_some() {
            self.payment_method = payment_method;
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Marks the payment as unpaid or declined.
    ///
    /// # Errors
    ///
    /// Returns an invalid-state error if the payment already settled.
    pub fn mark_failed(&mut self) -> Result<(), BillingError> {
        self.transition_to(PaymentStatus::Failed, "fail payment")?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Marks the payment as abandoned by the buyer.
    ///
    /// # Errors
    ///
    /// Returns an invalid-state error if the payment already settled.
    pub fn mark_cancelled(&mut self) -> Result<(), BillingError> {
        self.transition_to(PaymentStatus::Cancelled, "cancel payment")?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Links the payment to the subscription it created or renewed.
    pub fn link_subscription(&mut self, subscription_id: SubscriptionId) {
        self.subscription_id = Some(subscription_id);
        self.updated_at = Timestamp::now();
    }

    /// Transition to a new status using the state machine.
    fn transition_to(
        &mut self,
        target: PaymentStatus,
        attempted: &str,
    ) -> Result<(), BillingError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|_| BillingError::invalid_state(self.status.as_str(), attempted))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eur(amount: f64) -> Money {
        Money::from_eur(amount).unwrap()
    }

    fn pending_checkout() -> Payment {
        Payment::checkout(
            PaymentId::new(),
            "cs_test_123",
            AccountId::new(),
            SubscriptionTier::Platinum,
            1,
            eur(100.0),
            eur(20.0),
        )
        .unwrap()
    }

    // ============================================================
    // Construction Tests
    // ============================================================

    #[test]
    fn checkout_starts_pending_with_net_amount() {
        let payment = pending_checkout();

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.final_amount, eur(80.0));
        assert_eq!(payment.correlation_key, "cs_test_123");
        assert!(!payment.is_renewal);
        assert!(payment.subscription_id.is_none());
        assert!(payment.payment_method.is_none());
    }

    #[test]
    fn checkout_rejects_discount_above_amount() {
        let result = Payment::checkout(
            PaymentId::new(),
            "cs_test_123",
            AccountId::new(),
            SubscriptionTier::Bronze,
            1,
            eur(10.0),
            eur(25.0),
        );
        assert!(matches!(result, Err(BillingError::ValidationFailed { .. })));
    }

    #[test]
    fn checkout_rejects_zero_duration() {
        let result = Payment::checkout(
            PaymentId::new(),
            "cs_test_123",
            AccountId::new(),
            SubscriptionTier::Bronze,
            0,
            eur(10.0),
            Money::ZERO,
        );
        assert!(matches!(result, Err(BillingError::ValidationFailed { .. })));
    }

    #[test]
    fn checkout_rejects_empty_session_id() {
        let result = Payment::checkout(
            PaymentId::new(),
            "",
            AccountId::new(),
            SubscriptionTier::Bronze,
            1,
            eur(10.0),
            Money::ZERO,
        );
        assert!(matches!(result, Err(BillingError::ValidationFailed { .. })));
    }

    #[test]
    fn successful_renewal_is_keyed_on_invoice() {
        let subscription_id = SubscriptionId::new();
        let payment = Payment::successful_renewal(
            PaymentId::new(),
            "in_test_456",
            AccountId::new(),
            SubscriptionTier::Diamond,
            eur(250.0),
            Some(PaymentMethod::Card),
            subscription_id,
        );

        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.correlation_key, "in_test_456");
        assert_eq!(payment.processor_invoice_ref.as_deref(), Some("in_test_456"));
        assert_eq!(payment.duration_months, 1);
        assert_eq!(payment.final_amount, eur(250.0));
        assert!(payment.is_renewal);
        assert_eq!(payment.subscription_id, Some(subscription_id));
    }

    #[test]
    fn failed_renewal_records_amount_due() {
        let payment = Payment::failed_renewal(
            PaymentId::new(),
            "in_test_789",
            AccountId::new(),
            SubscriptionTier::Platinum,
            eur(100.0),
            SubscriptionId::new(),
        );

        assert_eq!(payment.status, PaymentStatus::Failed);
        assert!(payment.is_renewal);
        assert!(payment.payment_method.is_none());
    }

    // ============================================================
    // Settlement Tests
    // ============================================================

    #[test]
    fn pending_payment_can_succeed_and_capture_method() {
        let mut payment = pending_checkout();
        payment.mark_succeeded(Some(PaymentMethod::Card)).unwrap();

        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.payment_method, Some(PaymentMethod::Card));
        assert!(payment.is_settled());
    }

    #[test]
    fn pending_payment_can_fail() {
        let mut payment = pending_checkout();
        payment.mark_failed().unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
    }

    #[test]
    fn pending_payment_can_be_cancelled() {
        let mut payment = pending_checkout();
        payment.mark_cancelled().unwrap();
        assert_eq!(payment.status, PaymentStatus::Cancelled);
    }

    #[test]
    fn settled_payment_rejects_further_transitions() {
        let mut payment = pending_checkout();
        payment.mark_succeeded(Some(PaymentMethod::Card)).unwrap();

        let result = payment.mark_cancelled();
        assert!(matches!(
            result,
            Err(BillingError::InvalidState { ref current, .. }) if current == "success"
        ));
        assert_eq!(payment.status, PaymentStatus::Success);
    }

    #[test]
    fn cancelled_payment_cannot_succeed_later() {
        let mut payment = pending_checkout();
        payment.mark_cancelled().unwrap();
        assert!(payment.mark_succeeded(Some(PaymentMethod::Card)).is_err());
    }

    #[test]
    fn link_subscription_sets_reference() {
        let mut payment = pending_checkout();
        let subscription_id = SubscriptionId::new();
        payment.link_subscription(subscription_id);
        assert_eq!(payment.subscription_id, Some(subscription_id));
    }

    #[test]
    fn succeed_without_method_keeps_it_unset() {
        let mut payment = pending_checkout();
        payment.mark_succeeded(None).unwrap();
        assert!(payment.payment_method.is_none());
    }
}
