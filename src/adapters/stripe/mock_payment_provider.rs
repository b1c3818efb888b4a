//! Mock payment provider for testing.
//!
//! Provides a configurable mock implementation of `PaymentProvider` for unit
//! and integration tests. Supports:
//! - Pre-configured responses
//! - Error injection
//! - Call tracking
//! - Checkout session state simulation (open, paid, expired)

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ports::{
    CheckoutPaymentStatus, CheckoutSession, CheckoutState, CreateCheckoutRequest,
    CreateCustomerRequest, Customer, PaymentError, PaymentProvider,
};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
///
/// // Start a checkout, then simulate the customer paying
/// let session = mock.create_checkout_session(request).await?;
/// mock.mark_session_paid(&session.id, Some("sub_mock_1"));
///
/// // Inject a failure
/// mock.set_method_error("cancel_subscription", PaymentError::network("down"));
/// ```
#[derive(Default)]
pub struct MockPaymentProvider {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// Checkout session states by session id, as get_checkout_session sees them.
    sessions: HashMap<String, CheckoutState>,

    /// Next customer to return from create_customer.
    next_customer: Option<Customer>,

    /// Next checkout session to return from create_checkout_session.
    next_checkout: Option<CheckoutSession>,

    /// Error to return on the next call to any method.
    next_error: Option<PaymentError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, PaymentError>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,

    /// Subscription refs cancelled immediately.
    cancelled_subscriptions: Vec<String>,

    /// (subscription ref, cancel flag) pairs from set_cancel_at_period_end.
    period_end_flags: Vec<(String, bool)>,

    /// Session ids that were expired.
    expired_sessions: Vec<String>,

    /// Counter for generated ids.
    next_id: u64,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    /// Create a new mock provider with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Set the customer to return on the next `create_customer` call.
    pub fn set_customer(&self, customer: Customer) {
        self.inner.lock().unwrap().next_customer = Some(customer);
    }

    /// Set the checkout session to return on the next
    /// `create_checkout_session` call.
    pub fn set_checkout_session(&self, session: CheckoutSession) {
        self.inner.lock().unwrap().next_checkout = Some(session);
    }

    /// Register a session state directly, bypassing create.
    pub fn add_session_state(&self, state: CheckoutState) {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .insert(state.id.clone(), state);
    }

    /// Simulate the customer completing checkout.
    ///
    /// Flips the session to paid, attaches the recurring subscription ref if
    /// one is given, and records "card" as the method used.
    pub fn mark_session_paid(&self, session_id: &str, subscription_ref: Option<&str>) {
        let mut state = self.inner.lock().unwrap();
        if let Some(session) = state.sessions.get_mut(session_id) {
            session.payment_status = CheckoutPaymentStatus::Paid;
            session.subscription_ref = subscription_ref.map(String::from);
            session.payment_method = Some("card".to_string());
        }
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.inner.lock().unwrap().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.inner
            .lock()
            .unwrap()
            .method_errors
            .insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.inner.lock().unwrap();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.inner.lock().unwrap().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .any(|c| c.method == method)
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Subscription refs that were cancelled immediately.
    pub fn cancelled_subscriptions(&self) -> Vec<String> {
        self.inner.lock().unwrap().cancelled_subscriptions.clone()
    }

    /// (subscription ref, cancel flag) pairs seen by set_cancel_at_period_end.
    pub fn period_end_flags(&self) -> Vec<(String, bool)> {
        self.inner.lock().unwrap().period_end_flags.clone()
    }

    /// Session ids that were expired.
    pub fn expired_sessions(&self) -> Vec<String> {
        self.inner.lock().unwrap().expired_sessions.clone()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().call_log.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.inner.lock().unwrap().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.inner.lock().unwrap();

        // Check method-specific error first
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        // Check global error (consumes it)
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }

    fn fresh_id(&self, prefix: &str) -> String {
        let mut state = self.inner.lock().unwrap();
        state.next_id += 1;
        format!("{}_mock_{}", prefix, state.next_id)
    }
}

impl Clone for MockPaymentProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        self.record_call(
            "create_customer",
            vec![request.account_id.to_string(), request.email.clone()],
        );
        self.check_error("create_customer")?;

        let configured = self.inner.lock().unwrap().next_customer.take();
        Ok(configured.unwrap_or_else(|| Customer {
            id: self.fresh_id("cus"),
            email: request.email,
        }))
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.record_call(
            "create_checkout_session",
            vec![
                request.customer_ref.clone(),
                request.tier.to_string(),
                request.duration_months.to_string(),
            ],
        );
        self.check_error("create_checkout_session")?;

        let configured = self.inner.lock().unwrap().next_checkout.take();
        let session = configured.unwrap_or_else(|| {
            let id = self.fresh_id("cs");
            CheckoutSession {
                url: format!("https://checkout.mock/pay/{}", id),
                id,
                expires_at: chrono::Utc::now().timestamp() + 24 * 60 * 60,
            }
        });

        // Register an open, unpaid state so get_checkout_session finds the
        // session until a test marks it paid.
        self.add_session_state(CheckoutState {
            id: session.id.clone(),
            payment_status: CheckoutPaymentStatus::Unpaid,
            subscription_ref: None,
            customer_ref: Some(request.customer_ref),
            payment_method: None,
        });

        Ok(session)
    }

    async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutState>, PaymentError> {
        self.record_call("get_checkout_session", vec![session_id.to_string()]);
        self.check_error("get_checkout_session")?;

        Ok(self.inner.lock().unwrap().sessions.get(session_id).cloned())
    }

    async fn expire_checkout_session(&self, session_id: &str) -> Result<(), PaymentError> {
        self.record_call("expire_checkout_session", vec![session_id.to_string()]);
        self.check_error("expire_checkout_session")?;

        self.inner
            .lock()
            .unwrap()
            .expired_sessions
            .push(session_id.to_string());
        Ok(())
    }

    async fn cancel_subscription(&self, subscription_ref: &str) -> Result<(), PaymentError> {
        self.record_call("cancel_subscription", vec![subscription_ref.to_string()]);
        self.check_error("cancel_subscription")?;

        self.inner
            .lock()
            .unwrap()
            .cancelled_subscriptions
            .push(subscription_ref.to_string());
        Ok(())
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_ref: &str,
        cancel: bool,
    ) -> Result<(), PaymentError> {
        self.record_call(
            "set_cancel_at_period_end",
            vec![subscription_ref.to_string(), cancel.to_string()],
        );
        self.check_error("set_cancel_at_period_end")?;

        self.inner
            .lock()
            .unwrap()
            .period_end_flags
            .push((subscription_ref.to_string(), cancel));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::SubscriptionTier;
    use crate::domain::foundation::{AccountId, Money};

    fn checkout_request(customer_ref: &str) -> CreateCheckoutRequest {
        CreateCheckoutRequest {
            customer_ref: customer_ref.to_string(),
            account_id: AccountId::new(),
            tier: SubscriptionTier::Platinum,
            duration_months: 1,
            amount: Money::from_eur(80.0).unwrap(),
            success_url: "https://app.test/billing/confirm?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "https://app.test/billing/cancelled".to_string(),
        }
    }

    #[tokio::test]
    async fn created_session_starts_unpaid() {
        let mock = MockPaymentProvider::new();

        let session = mock
            .create_checkout_session(checkout_request("cus_1"))
            .await
            .unwrap();

        let state = mock
            .get_checkout_session(&session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.payment_status, CheckoutPaymentStatus::Unpaid);
        assert!(state.subscription_ref.is_none());
        assert_eq!(state.customer_ref.as_deref(), Some("cus_1"));
    }

    #[tokio::test]
    async fn marking_paid_attaches_subscription_ref() {
        let mock = MockPaymentProvider::new();
        let session = mock
            .create_checkout_session(checkout_request("cus_1"))
            .await
            .unwrap();

        mock.mark_session_paid(&session.id, Some("sub_mock_9"));

        let state = mock
            .get_checkout_session(&session.id)
            .await
            .unwrap()
            .unwrap();
        assert!(state.payment_status.is_paid());
        assert_eq!(state.subscription_ref.as_deref(), Some("sub_mock_9"));
        assert_eq!(state.payment_method.as_deref(), Some("card"));
    }

    #[tokio::test]
    async fn unknown_session_reads_as_none() {
        let mock = MockPaymentProvider::new();
        let state = mock.get_checkout_session("cs_unknown").await.unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn method_error_is_sticky_until_cleared() {
        let mock = MockPaymentProvider::new();
        mock.set_method_error("cancel_subscription", PaymentError::network("down"));

        assert!(mock.cancel_subscription("sub_1").await.is_err());
        assert!(mock.cancel_subscription("sub_1").await.is_err());

        mock.clear_errors();
        assert!(mock.cancel_subscription("sub_1").await.is_ok());
        assert_eq!(mock.cancelled_subscriptions(), vec!["sub_1"]);
    }

    #[tokio::test]
    async fn global_error_is_consumed_by_one_call() {
        let mock = MockPaymentProvider::new();
        mock.set_error(PaymentError::provider("hiccup"));

        assert!(mock
            .create_customer(CreateCustomerRequest {
                account_id: AccountId::new(),
                email: "jobs@acme.test".to_string(),
                name: None,
            })
            .await
            .is_err());

        assert!(mock
            .create_customer(CreateCustomerRequest {
                account_id: AccountId::new(),
                email: "jobs@acme.test".to_string(),
                name: None,
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn call_log_records_period_end_toggles() {
        let mock = MockPaymentProvider::new();

        mock.set_cancel_at_period_end("sub_1", true).await.unwrap();
        mock.set_cancel_at_period_end("sub_1", false).await.unwrap();

        assert_eq!(mock.call_count("set_cancel_at_period_end"), 2);
        assert_eq!(
            mock.period_end_flags(),
            vec![("sub_1".to_string(), true), ("sub_1".to_string(), false)]
        );
    }
}
