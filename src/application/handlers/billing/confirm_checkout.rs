//! ConfirmCheckoutHandler - Command handler for the checkout return leg.
//!
//! The customer lands back here after the provider's hosted checkout. The
//! provider's session state is the only source of truth for whether money
//! moved; local state only decides idempotency. This flow is the sole creator
//! of a subscription's first term.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, Payment, PaymentMethod, PaymentStatus, Subscription,
};
use crate::domain::foundation::{SubscriptionId, Timestamp};
use crate::ports::{
    AccountRepository, ActivationCommit, BillingLedger, Notice, Notifier, PaymentProvider,
    PaymentRepository,
};

/// Command to confirm a checkout session.
#[derive(Debug, Clone)]
pub struct ConfirmCheckoutCommand {
    pub session_id: String,
}

/// Result of checkout confirmation.
#[derive(Debug, Clone)]
pub enum ConfirmCheckoutResult {
    /// Payment settled and the subscription was created.
    Activated {
        payment: Payment,
        subscription: Subscription,
    },
    /// Provider reported the session as unpaid; payment marked failed.
    Declined { payment: Payment },
    /// The payment was already settled by an earlier confirmation.
    AlreadyConfirmed { status: PaymentStatus },
}

/// Handler for confirming a checkout session.
pub struct ConfirmCheckoutHandler {
    accounts: Arc<dyn AccountRepository>,
    payments: Arc<dyn PaymentRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
    ledger: Arc<dyn BillingLedger>,
    notifier: Arc<dyn Notifier>,
}

impl ConfirmCheckoutHandler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        payments: Arc<dyn PaymentRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
        ledger: Arc<dyn BillingLedger>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            accounts,
            payments,
            payment_provider,
            ledger,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: ConfirmCheckoutCommand,
    ) -> Result<ConfirmCheckoutResult, BillingError> {
        // 1. A session we never issued is a hard error, not a no-op
        let mut payment = self
            .payments
            .find_by_correlation_key(&cmd.session_id)
            .await?
            .ok_or_else(|| BillingError::payment_not_found(&cmd.session_id))?;

        // 2. Idempotent short-circuit for replays and double-sends
        if payment.is_settled() {
            return Ok(ConfirmCheckoutResult::AlreadyConfirmed {
                status: payment.status,
            });
        }

        // 3. Re-fetch the session; the provider decides whether money moved
        let state = self
            .payment_provider
            .get_checkout_session(&cmd.session_id)
            .await?
            .ok_or_else(|| {
                BillingError::provider(format!(
                    "checkout session {} unknown at provider",
                    cmd.session_id
                ))
            })?;

        if !state.payment_status.is_paid() {
            return self.settle_declined(payment).await;
        }

        // 4. Paid: build the first subscription term and settle atomically
        let mut account = self
            .accounts
            .find_by_id(&payment.account_id)
            .await?
            .ok_or_else(|| BillingError::account_not_found(payment.account_id))?;

        let now = Timestamp::now();
        let subscription = Subscription::start(
            SubscriptionId::new(),
            payment.account_id,
            payment.tier,
            payment.duration_months,
            state.subscription_ref.clone(),
            now,
        );

        let method = state.payment_method.as_deref().map(PaymentMethod::from_processor);
        payment.mark_succeeded(method)?;
        payment.link_subscription(subscription.id);

        if account.processor_customer_ref.is_none() {
            if let Some(customer_ref) = state.customer_ref.clone() {
                account.attach_customer_ref(customer_ref);
            }
        }
        account.point_to_subscription(subscription.id);

        match self
            .ledger
            .commit_activation(&payment, &subscription, &account)
            .await?
        {
            ActivationCommit::Applied => {}
            ActivationCommit::AlreadySettled => return self.reread_settled(&cmd.session_id).await,
        }

        tracing::info!(
            account_id = %account.id,
            subscription_id = %subscription.id,
            tier = %subscription.tier,
            "Subscription activated"
        );

        // 5. Post-commit courtesy notice; delivery failures never bubble up
        if payment.tier.notifies_on_purchase() {
            let notice = Notice::subscription_activated(
                &account.email,
                payment.tier.display_name(),
                &subscription.expire_date.to_string(),
            );
            if let Err(e) = self.notifier.send(&notice).await {
                tracing::warn!(error = %e, account_id = %account.id, "Activation notice failed");
            }
        }

        Ok(ConfirmCheckoutResult::Activated {
            payment,
            subscription,
        })
    }

    async fn settle_declined(
        &self,
        mut payment: Payment,
    ) -> Result<ConfirmCheckoutResult, BillingError> {
        payment.mark_failed()?;
        if self.payments.settle_if_pending(&payment).await? {
            tracing::info!(
                payment_id = %payment.id,
                session_id = %payment.correlation_key,
                "Checkout declined by provider"
            );
            return Ok(ConfirmCheckoutResult::Declined { payment });
        }
        // Lost the race; report whatever the winner wrote
        self.reread_settled(&payment.correlation_key.clone()).await
    }

    async fn reread_settled(
        &self,
        session_id: &str,
    ) -> Result<ConfirmCheckoutResult, BillingError> {
        let fresh = self
            .payments
            .find_by_correlation_key(session_id)
            .await?
            .ok_or_else(|| BillingError::payment_not_found(session_id))?;
        Ok(ConfirmCheckoutResult::AlreadyConfirmed {
            status: fresh.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{Account, SubscriptionStatus, SubscriptionTier};
    use crate::domain::foundation::{AccountId, Money, PaymentId};
    use crate::ports::{
        CheckoutPaymentStatus, CheckoutSession, CheckoutState, CreateCheckoutRequest,
        CreateCustomerRequest, Customer, NotifyError, PaymentError, RenewalCommit,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    struct MockAccountRepository {
        accounts: Mutex<Vec<Account>>,
    }

    impl MockAccountRepository {
        fn with_account(account: Account) -> Self {
            Self {
                accounts: Mutex::new(vec![account]),
            }
        }
    }

    #[async_trait]
    impl AccountRepository for MockAccountRepository {
        async fn save(&self, account: &Account) -> Result<(), BillingError> {
            self.accounts.lock().unwrap().push(account.clone());
            Ok(())
        }

        async fn update(&self, account: &Account) -> Result<(), BillingError> {
            let mut accounts = self.accounts.lock().unwrap();
            if let Some(a) = accounts.iter_mut().find(|a| a.id == account.id) {
                *a = account.clone();
            }
            Ok(())
        }

        async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, BillingError> {
            let accounts = self.accounts.lock().unwrap();
            Ok(accounts.iter().find(|a| &a.id == id).cloned())
        }
    }

    struct MockPaymentRepository {
        payments: Mutex<Vec<Payment>>,
        settle_races_lost: Mutex<u32>,
    }

    impl MockPaymentRepository {
        fn with_payment(payment: Payment) -> Self {
            Self {
                payments: Mutex::new(vec![payment]),
                settle_races_lost: Mutex::new(0),
            }
        }

        /// Next `n` settle attempts report that another process won.
        fn losing_races(payment: Payment, n: u32) -> Self {
            Self {
                payments: Mutex::new(vec![payment]),
                settle_races_lost: Mutex::new(n),
            }
        }

        fn payments(&self) -> Vec<Payment> {
            self.payments.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentRepository for MockPaymentRepository {
        async fn save(&self, payment: &Payment) -> Result<(), BillingError> {
            self.payments.lock().unwrap().push(payment.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, BillingError> {
            let payments = self.payments.lock().unwrap();
            Ok(payments.iter().find(|p| &p.id == id).cloned())
        }

        async fn find_by_correlation_key(
            &self,
            key: &str,
        ) -> Result<Option<Payment>, BillingError> {
            let payments = self.payments.lock().unwrap();
            Ok(payments.iter().find(|p| p.correlation_key == key).cloned())
        }

        async fn settle_if_pending(&self, payment: &Payment) -> Result<bool, BillingError> {
            let mut lost = self.settle_races_lost.lock().unwrap();
            if *lost > 0 {
                *lost -= 1;
                return Ok(false);
            }
            let mut payments = self.payments.lock().unwrap();
            if let Some(p) = payments.iter_mut().find(|p| p.id == payment.id) {
                *p = payment.clone();
            }
            Ok(true)
        }
    }

    struct MockPaymentProvider {
        session_state: Mutex<Option<CheckoutState>>,
    }

    impl MockPaymentProvider {
        fn reporting(state: CheckoutState) -> Self {
            Self {
                session_state: Mutex::new(Some(state)),
            }
        }

        fn session_unknown() -> Self {
            Self {
                session_state: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl PaymentProvider for MockPaymentProvider {
        async fn create_customer(
            &self,
            _request: CreateCustomerRequest,
        ) -> Result<Customer, PaymentError> {
            Err(PaymentError::provider("not used in this test"))
        }

        async fn create_checkout_session(
            &self,
            _request: CreateCheckoutRequest,
        ) -> Result<CheckoutSession, PaymentError> {
            Err(PaymentError::provider("not used in this test"))
        }

        async fn get_checkout_session(
            &self,
            _session_id: &str,
        ) -> Result<Option<CheckoutState>, PaymentError> {
            Ok(self.session_state.lock().unwrap().clone())
        }

        async fn expire_checkout_session(&self, _session_id: &str) -> Result<(), PaymentError> {
            Ok(())
        }

        async fn cancel_subscription(&self, _subscription_ref: &str) -> Result<(), PaymentError> {
            Ok(())
        }

        async fn set_cancel_at_period_end(
            &self,
            _subscription_ref: &str,
            _cancel: bool,
        ) -> Result<(), PaymentError> {
            Ok(())
        }
    }

    struct MockBillingLedger {
        commits: Mutex<Vec<(Payment, Subscription, Account)>>,
        already_settled: bool,
    }

    impl MockBillingLedger {
        fn new() -> Self {
            Self {
                commits: Mutex::new(Vec::new()),
                already_settled: false,
            }
        }

        fn already_settled() -> Self {
            Self {
                commits: Mutex::new(Vec::new()),
                already_settled: true,
            }
        }

        fn commits(&self) -> Vec<(Payment, Subscription, Account)> {
            self.commits.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BillingLedger for MockBillingLedger {
        async fn commit_activation(
            &self,
            payment: &Payment,
            subscription: &Subscription,
            account: &Account,
        ) -> Result<ActivationCommit, BillingError> {
            if self.already_settled {
                return Ok(ActivationCommit::AlreadySettled);
            }
            self.commits.lock().unwrap().push((
                payment.clone(),
                subscription.clone(),
                account.clone(),
            ));
            Ok(ActivationCommit::Applied)
        }

        async fn commit_renewal(
            &self,
            _payment: &Payment,
            _subscription: &Subscription,
        ) -> Result<RenewalCommit, BillingError> {
            Ok(RenewalCommit::Applied)
        }
    }

    struct MockNotifier {
        sent: Mutex<Vec<Notice>>,
    }

    impl MockNotifier {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<Notice> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, notice: &Notice) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(notice.clone());
            Ok(())
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn test_account() -> Account {
        Account::new(AccountId::new(), "recruiter@example.com", "Test Recruiter").unwrap()
    }

    fn pending_payment(account_id: AccountId, tier: SubscriptionTier) -> Payment {
        Payment::checkout(
            PaymentId::new(),
            "cs_test_123",
            account_id,
            tier,
            1,
            Money::from_cents(10_000).unwrap(),
            Money::from_cents(2_000).unwrap(),
        )
        .unwrap()
    }

    fn paid_state() -> CheckoutState {
        CheckoutState {
            id: "cs_test_123".to_string(),
            payment_status: CheckoutPaymentStatus::Paid,
            subscription_ref: Some("sub_abc".to_string()),
            customer_ref: Some("cus_abc".to_string()),
            payment_method: Some("card".to_string()),
        }
    }

    fn unpaid_state() -> CheckoutState {
        CheckoutState {
            id: "cs_test_123".to_string(),
            payment_status: CheckoutPaymentStatus::Unpaid,
            subscription_ref: None,
            customer_ref: Some("cus_abc".to_string()),
            payment_method: None,
        }
    }

    struct Fixture {
        accounts: Arc<MockAccountRepository>,
        payments: Arc<MockPaymentRepository>,
        ledger: Arc<MockBillingLedger>,
        notifier: Arc<MockNotifier>,
        handler: ConfirmCheckoutHandler,
    }

    fn fixture(
        payments: MockPaymentRepository,
        provider: MockPaymentProvider,
        ledger: MockBillingLedger,
        account: Account,
    ) -> Fixture {
        let accounts = Arc::new(MockAccountRepository::with_account(account));
        let payments = Arc::new(payments);
        let ledger = Arc::new(ledger);
        let notifier = Arc::new(MockNotifier::new());
        let handler = ConfirmCheckoutHandler::new(
            accounts.clone(),
            payments.clone(),
            Arc::new(provider),
            ledger.clone(),
            notifier.clone(),
        );
        Fixture {
            accounts,
            payments,
            ledger,
            notifier,
            handler,
        }
    }

    fn cmd() -> ConfirmCheckoutCommand {
        ConfirmCheckoutCommand {
            session_id: "cs_test_123".to_string(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Paid Session Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn paid_session_activates_subscription() {
        let account = test_account();
        let payment = pending_payment(account.id, SubscriptionTier::Platinum);
        let f = fixture(
            MockPaymentRepository::with_payment(payment),
            MockPaymentProvider::reporting(paid_state()),
            MockBillingLedger::new(),
            account,
        );

        let result = f.handler.handle(cmd()).await.unwrap();

        let ConfirmCheckoutResult::Activated {
            payment,
            subscription,
        } = result
        else {
            panic!("expected activation");
        };
        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.subscription_id, Some(subscription.id));
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(subscription.renewal_count, 0);
        assert!(subscription.auto_renewal);
        assert_eq!(
            subscription.processor_subscription_ref,
            Some("sub_abc".to_string())
        );
    }

    #[tokio::test]
    async fn paid_session_commits_all_three_aggregates() {
        let account = test_account();
        let account_id = account.id;
        let payment = pending_payment(account_id, SubscriptionTier::Platinum);
        let f = fixture(
            MockPaymentRepository::with_payment(payment),
            MockPaymentProvider::reporting(paid_state()),
            MockBillingLedger::new(),
            account,
        );

        f.handler.handle(cmd()).await.unwrap();

        let commits = f.ledger.commits();
        assert_eq!(commits.len(), 1);
        let (payment, subscription, account) = &commits[0];
        assert_eq!(payment.payment_method, Some(PaymentMethod::Card));
        assert_eq!(account.current_subscription_id, Some(subscription.id));
        assert_eq!(account.id, account_id);
    }

    #[tokio::test]
    async fn year_end_is_one_year_after_purchase() {
        let account = test_account();
        let payment = pending_payment(account.id, SubscriptionTier::Platinum);
        let f = fixture(
            MockPaymentRepository::with_payment(payment),
            MockPaymentProvider::reporting(paid_state()),
            MockBillingLedger::new(),
            account,
        );

        let result = f.handler.handle(cmd()).await.unwrap();

        let ConfirmCheckoutResult::Activated { subscription, .. } = result else {
            panic!("expected activation");
        };
        assert!(subscription.expire_date.is_before(&subscription.year_end_date));
        // One-month term: eleven calendar months between expiry and ceiling
        let gap_days = subscription
            .expire_date
            .days_until(&subscription.year_end_date);
        assert!((330..=340).contains(&gap_days), "gap was {}", gap_days);
    }

    #[tokio::test]
    async fn session_without_subscription_ref_disables_auto_renewal() {
        let account = test_account();
        let payment = pending_payment(account.id, SubscriptionTier::Platinum);
        let mut state = paid_state();
        state.subscription_ref = None;
        let f = fixture(
            MockPaymentRepository::with_payment(payment),
            MockPaymentProvider::reporting(state),
            MockBillingLedger::new(),
            account,
        );

        let result = f.handler.handle(cmd()).await.unwrap();

        let ConfirmCheckoutResult::Activated { subscription, .. } = result else {
            panic!("expected activation");
        };
        assert!(!subscription.auto_renewal);
        assert!(subscription.processor_subscription_ref.is_none());
    }

    #[tokio::test]
    async fn platinum_activation_sends_notice() {
        let account = test_account();
        let payment = pending_payment(account.id, SubscriptionTier::Platinum);
        let f = fixture(
            MockPaymentRepository::with_payment(payment),
            MockPaymentProvider::reporting(paid_state()),
            MockBillingLedger::new(),
            account,
        );

        f.handler.handle(cmd()).await.unwrap();

        let sent = f.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "recruiter@example.com");
        assert!(sent[0].subject.contains("Platinum"));
    }

    #[tokio::test]
    async fn bronze_activation_sends_no_notice() {
        let account = test_account();
        let payment = pending_payment(account.id, SubscriptionTier::Bronze);
        let f = fixture(
            MockPaymentRepository::with_payment(payment),
            MockPaymentProvider::reporting(paid_state()),
            MockBillingLedger::new(),
            account,
        );

        f.handler.handle(cmd()).await.unwrap();

        assert!(f.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn backfills_customer_ref_from_session() {
        let account = test_account();
        let payment = pending_payment(account.id, SubscriptionTier::Platinum);
        let f = fixture(
            MockPaymentRepository::with_payment(payment),
            MockPaymentProvider::reporting(paid_state()),
            MockBillingLedger::new(),
            account,
        );

        f.handler.handle(cmd()).await.unwrap();

        let commits = f.ledger.commits();
        let (_, _, account) = &commits[0];
        assert_eq!(account.processor_customer_ref, Some("cus_abc".to_string()));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Unpaid Session Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unpaid_session_marks_payment_failed() {
        let account = test_account();
        let payment = pending_payment(account.id, SubscriptionTier::Platinum);
        let f = fixture(
            MockPaymentRepository::with_payment(payment),
            MockPaymentProvider::reporting(unpaid_state()),
            MockBillingLedger::new(),
            account,
        );

        let result = f.handler.handle(cmd()).await.unwrap();

        let ConfirmCheckoutResult::Declined { payment } = result else {
            panic!("expected declined");
        };
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert!(f.ledger.commits().is_empty());

        let stored = f.payments.payments();
        assert_eq!(stored[0].status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn unpaid_session_creates_no_subscription() {
        let account = test_account();
        let payment = pending_payment(account.id, SubscriptionTier::Platinum);
        let f = fixture(
            MockPaymentRepository::with_payment(payment),
            MockPaymentProvider::reporting(unpaid_state()),
            MockBillingLedger::new(),
            account,
        );

        f.handler.handle(cmd()).await.unwrap();

        assert!(f.ledger.commits().is_empty());
        assert!(f.notifier.sent().is_empty());
        let accounts = f.accounts.accounts.lock().unwrap();
        assert!(accounts[0].current_subscription_id.is_none());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Idempotency Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn settled_payment_short_circuits_without_provider_call() {
        let account = test_account();
        let mut payment = pending_payment(account.id, SubscriptionTier::Platinum);
        payment.mark_failed().unwrap();
        let f = fixture(
            MockPaymentRepository::with_payment(payment),
            // A provider error here would fail the test if the handler called it
            MockPaymentProvider::session_unknown(),
            MockBillingLedger::new(),
            account,
        );

        let result = f.handler.handle(cmd()).await.unwrap();

        assert!(matches!(
            result,
            ConfirmCheckoutResult::AlreadyConfirmed {
                status: PaymentStatus::Failed
            }
        ));
    }

    #[tokio::test]
    async fn activation_race_loser_rereads_winner_outcome() {
        let account = test_account();
        let payment = pending_payment(account.id, SubscriptionTier::Platinum);
        let f = fixture(
            MockPaymentRepository::with_payment(payment),
            MockPaymentProvider::reporting(paid_state()),
            MockBillingLedger::already_settled(),
            account,
        );

        let result = f.handler.handle(cmd()).await.unwrap();

        // The stored row is still pending in this mock, but the contract is
        // that the caller reports the re-read status rather than claiming the
        // activation for itself.
        assert!(matches!(
            result,
            ConfirmCheckoutResult::AlreadyConfirmed { .. }
        ));
    }

    #[tokio::test]
    async fn declined_race_loser_rereads_winner_outcome() {
        let account = test_account();
        let payment = pending_payment(account.id, SubscriptionTier::Platinum);
        let f = fixture(
            MockPaymentRepository::losing_races(payment, 1),
            MockPaymentProvider::reporting(unpaid_state()),
            MockBillingLedger::new(),
            account,
        );

        let result = f.handler.handle(cmd()).await.unwrap();

        assert!(matches!(
            result,
            ConfirmCheckoutResult::AlreadyConfirmed { .. }
        ));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_session_is_fatal() {
        let account = test_account();
        let f = fixture(
            MockPaymentRepository::with_payment(pending_payment(
                AccountId::new(),
                SubscriptionTier::Platinum,
            )),
            MockPaymentProvider::reporting(paid_state()),
            MockBillingLedger::new(),
            account,
        );

        let result = f
            .handler
            .handle(ConfirmCheckoutCommand {
                session_id: "cs_never_issued".to_string(),
            })
            .await;

        assert!(matches!(result, Err(BillingError::PaymentNotFound(_))));
    }

    #[tokio::test]
    async fn provider_losing_the_session_is_an_upstream_error() {
        let account = test_account();
        let payment = pending_payment(account.id, SubscriptionTier::Platinum);
        let f = fixture(
            MockPaymentRepository::with_payment(payment),
            MockPaymentProvider::session_unknown(),
            MockBillingLedger::new(),
            account,
        );

        let result = f.handler.handle(cmd()).await;

        assert!(matches!(result, Err(BillingError::ProviderFailed { .. })));
        // Payment must remain pending so a later confirmation can settle it
        let stored = f.payments.payments();
        assert_eq!(stored[0].status, PaymentStatus::Pending);
    }
}
