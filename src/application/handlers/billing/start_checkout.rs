//! StartCheckoutHandler - Command handler for initiating a subscription checkout.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Payment, SubscriptionTier, MAX_DURATION_MONTHS};
use crate::domain::foundation::{AccountId, Money, PaymentId, ValidationError};
use crate::ports::{
    AccountRepository, CreateCheckoutRequest, CreateCustomerRequest, PaymentProvider,
    PaymentRepository,
};

/// Command to initiate a subscription checkout.
#[derive(Debug, Clone)]
pub struct StartCheckoutCommand {
    pub account_id: AccountId,
    pub tier: SubscriptionTier,
    pub duration_months: u32,
    /// Gross price in EUR.
    pub amount_eur: f64,
    /// Discount in EUR, already resolved by the caller.
    pub discount_eur: f64,
    pub success_url: String,
    pub cancel_url: String,
}

/// Result of successful checkout initiation.
#[derive(Debug, Clone)]
pub struct StartCheckoutResult {
    pub payment: Payment,
    pub checkout_url: String,
}

/// Handler for initiating a subscription checkout.
///
/// Creates a hosted checkout session at the payment provider and records a
/// pending payment keyed on the session id. Nothing is activated here; the
/// confirmation and webhook flows settle the payment later.
pub struct StartCheckoutHandler {
    accounts: Arc<dyn AccountRepository>,
    payments: Arc<dyn PaymentRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl StartCheckoutHandler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        payments: Arc<dyn PaymentRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            accounts,
            payments,
            payment_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: StartCheckoutCommand,
    ) -> Result<StartCheckoutResult, BillingError> {
        // 1. Validate the priced request before touching the provider
        let (amount, discount) = parse_amounts(cmd.amount_eur, cmd.discount_eur)?;
        let final_amount = amount.subtract(discount)?;
        if cmd.duration_months < 1 || cmd.duration_months > MAX_DURATION_MONTHS {
            return Err(ValidationError::out_of_range(
                "duration_months",
                1,
                i64::from(MAX_DURATION_MONTHS),
                i64::from(cmd.duration_months),
            )
            .into());
        }

        // 2. Load the account
        let mut account = self
            .accounts
            .find_by_id(&cmd.account_id)
            .await?
            .ok_or_else(|| BillingError::account_not_found(cmd.account_id))?;

        // 3. Lazily provision the processor customer
        let customer_ref = match &account.processor_customer_ref {
            Some(existing) => existing.clone(),
            None => {
                let customer = self
                    .payment_provider
                    .create_customer(CreateCustomerRequest {
                        account_id: account.id,
                        email: account.email.clone(),
                        name: Some(account.name.clone()),
                    })
                    .await?;

                // Persist immediately so a later checkout attempt reuses the
                // same customer even if this one never completes.
                account.attach_customer_ref(customer.id.clone());
                self.accounts.update(&account).await?;
                customer.id
            }
        };

        // 4. Create the hosted checkout session
        let session = self
            .payment_provider
            .create_checkout_session(CreateCheckoutRequest {
                customer_ref,
                account_id: account.id,
                tier: cmd.tier,
                duration_months: cmd.duration_months,
                amount: final_amount,
                success_url: cmd.success_url,
                cancel_url: cmd.cancel_url,
            })
            .await?;

        // 5. Record the pending payment, keyed on the session id
        let payment = Payment::checkout(
            PaymentId::new(),
            session.id.clone(),
            account.id,
            cmd.tier,
            cmd.duration_months,
            amount,
            discount,
        )?;
        self.payments.save(&payment).await?;

        tracing::info!(
            account_id = %account.id,
            payment_id = %payment.id,
            tier = %cmd.tier,
            amount = %final_amount,
            "Checkout session created"
        );

        Ok(StartCheckoutResult {
            payment,
            checkout_url: session.url,
        })
    }
}

fn parse_amounts(amount_eur: f64, discount_eur: f64) -> Result<(Money, Money), BillingError> {
    let amount = Money::from_eur(amount_eur)
        .map_err(|_| BillingError::validation("amount", "must be a non-negative amount"))?;
    let discount = Money::from_eur(discount_eur)
        .map_err(|_| BillingError::validation("discount", "must be a non-negative amount"))?;
    Ok((amount, discount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::Account;
    use crate::ports::{
        CheckoutSession, CheckoutState, Customer, PaymentError, PaymentErrorCode,
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

        fn empty() -> Self {
            Self {
                accounts: Mutex::new(Vec::new()),
            }
        }

        fn accounts(&self) -> Vec<Account> {
            self.accounts.lock().unwrap().clone()
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
        saved: Mutex<Vec<Payment>>,
    }

    impl MockPaymentRepository {
        fn new() -> Self {
            Self {
                saved: Mutex::new(Vec::new()),
            }
        }

        fn saved(&self) -> Vec<Payment> {
            self.saved.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentRepository for MockPaymentRepository {
        async fn save(&self, payment: &Payment) -> Result<(), BillingError> {
            self.saved.lock().unwrap().push(payment.clone());
            Ok(())
        }

        async fn find_by_id(&self, _id: &PaymentId) -> Result<Option<Payment>, BillingError> {
            Ok(None)
        }

        async fn find_by_correlation_key(
            &self,
            _key: &str,
        ) -> Result<Option<Payment>, BillingError> {
            Ok(None)
        }

        async fn settle_if_pending(&self, _payment: &Payment) -> Result<bool, BillingError> {
            Ok(true)
        }
    }

    struct MockPaymentProvider {
        fail_create_customer: bool,
        fail_create_checkout: bool,
        customer_requests: Mutex<Vec<CreateCustomerRequest>>,
        checkout_requests: Mutex<Vec<CreateCheckoutRequest>>,
    }

    impl MockPaymentProvider {
        fn new() -> Self {
            Self {
                fail_create_customer: false,
                fail_create_checkout: false,
                customer_requests: Mutex::new(Vec::new()),
                checkout_requests: Mutex::new(Vec::new()),
            }
        }

        fn failing_customer() -> Self {
            Self {
                fail_create_customer: true,
                ..Self::new()
            }
        }

        fn failing_checkout() -> Self {
            Self {
                fail_create_checkout: true,
                ..Self::new()
            }
        }

        fn customer_requests(&self) -> Vec<CreateCustomerRequest> {
            self.customer_requests.lock().unwrap().clone()
        }

        fn checkout_requests(&self) -> Vec<CreateCheckoutRequest> {
            self.checkout_requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentProvider for MockPaymentProvider {
        async fn create_customer(
            &self,
            request: CreateCustomerRequest,
        ) -> Result<Customer, PaymentError> {
            if self.fail_create_customer {
                return Err(PaymentError::new(
                    PaymentErrorCode::ProviderError,
                    "Customer creation failed",
                ));
            }
            self.customer_requests.lock().unwrap().push(request.clone());
            Ok(Customer {
                id: format!("cus_{}", request.account_id),
                email: request.email,
            })
        }

        async fn create_checkout_session(
            &self,
            request: CreateCheckoutRequest,
        ) -> Result<CheckoutSession, PaymentError> {
            if self.fail_create_checkout {
                return Err(PaymentError::new(
                    PaymentErrorCode::ProviderError,
                    "Checkout session creation failed",
                ));
            }
            self.checkout_requests.lock().unwrap().push(request);
            Ok(CheckoutSession {
                id: "cs_test_123".to_string(),
                url: "https://checkout.stripe.com/pay/cs_test_123".to_string(),
                expires_at: 1_700_003_600,
            })
        }

        async fn get_checkout_session(
            &self,
            _session_id: &str,
        ) -> Result<Option<CheckoutState>, PaymentError> {
            Ok(None)
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

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn test_account() -> Account {
        Account::new(AccountId::new(), "recruiter@example.com", "Test Recruiter").unwrap()
    }

    fn account_with_customer_ref() -> Account {
        let mut account = test_account();
        account.attach_customer_ref("cus_existing".to_string());
        account
    }

    fn test_command(account_id: AccountId) -> StartCheckoutCommand {
        StartCheckoutCommand {
            account_id,
            tier: SubscriptionTier::Platinum,
            duration_months: 1,
            amount_eur: 100.0,
            discount_eur: 20.0,
            success_url: "https://app.example.com/confirm?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "https://app.example.com/cancel".to_string(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn creates_pending_payment_and_returns_checkout_url() {
        let account = test_account();
        let account_id = account.id;
        let accounts = Arc::new(MockAccountRepository::with_account(account));
        let payments = Arc::new(MockPaymentRepository::new());
        let provider = Arc::new(MockPaymentProvider::new());

        let handler = StartCheckoutHandler::new(accounts, payments.clone(), provider);

        let result = handler.handle(test_command(account_id)).await.unwrap();

        assert!(result.checkout_url.contains("checkout.stripe.com"));
        let saved = payments.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].correlation_key, "cs_test_123");
        assert_eq!(saved[0].final_amount, Money::from_cents(8000).unwrap());
        assert!(!saved[0].is_renewal);
    }

    #[tokio::test]
    async fn provisions_customer_when_account_has_none() {
        let account = test_account();
        let account_id = account.id;
        let accounts = Arc::new(MockAccountRepository::with_account(account));
        let payments = Arc::new(MockPaymentRepository::new());
        let provider = Arc::new(MockPaymentProvider::new());

        let handler = StartCheckoutHandler::new(accounts.clone(), payments, provider.clone());

        handler.handle(test_command(account_id)).await.unwrap();

        assert_eq!(provider.customer_requests().len(), 1);
        let stored = accounts.accounts();
        assert!(stored[0].processor_customer_ref.is_some());
    }

    #[tokio::test]
    async fn reuses_existing_customer_ref() {
        let account = account_with_customer_ref();
        let account_id = account.id;
        let accounts = Arc::new(MockAccountRepository::with_account(account));
        let payments = Arc::new(MockPaymentRepository::new());
        let provider = Arc::new(MockPaymentProvider::new());

        let handler = StartCheckoutHandler::new(accounts, payments, provider.clone());

        handler.handle(test_command(account_id)).await.unwrap();

        assert!(provider.customer_requests().is_empty());
        let requests = provider.checkout_requests();
        assert_eq!(requests[0].customer_ref, "cus_existing");
    }

    #[tokio::test]
    async fn passes_metadata_through_checkout_request() {
        let account = account_with_customer_ref();
        let account_id = account.id;
        let accounts = Arc::new(MockAccountRepository::with_account(account));
        let payments = Arc::new(MockPaymentRepository::new());
        let provider = Arc::new(MockPaymentProvider::new());

        let handler = StartCheckoutHandler::new(accounts, payments, provider.clone());

        handler.handle(test_command(account_id)).await.unwrap();

        let requests = provider.checkout_requests();
        assert_eq!(requests[0].account_id, account_id);
        assert_eq!(requests[0].tier, SubscriptionTier::Platinum);
        assert_eq!(requests[0].duration_months, 1);
        assert_eq!(requests[0].amount, Money::from_cents(8000).unwrap());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn fails_when_account_missing() {
        let accounts = Arc::new(MockAccountRepository::empty());
        let payments = Arc::new(MockPaymentRepository::new());
        let provider = Arc::new(MockPaymentProvider::new());

        let handler = StartCheckoutHandler::new(accounts, payments.clone(), provider);

        let result = handler.handle(test_command(AccountId::new())).await;

        assert!(matches!(result, Err(BillingError::AccountNotFound(_))));
        assert!(payments.saved().is_empty());
    }

    #[tokio::test]
    async fn rejects_discount_exceeding_amount() {
        let account = account_with_customer_ref();
        let account_id = account.id;
        let accounts = Arc::new(MockAccountRepository::with_account(account));
        let payments = Arc::new(MockPaymentRepository::new());
        let provider = Arc::new(MockPaymentProvider::new());

        let handler = StartCheckoutHandler::new(accounts, payments, provider.clone());

        let mut cmd = test_command(account_id);
        cmd.amount_eur = 50.0;
        cmd.discount_eur = 80.0;

        let result = handler.handle(cmd).await;

        assert!(matches!(result, Err(BillingError::ValidationFailed { .. })));
        assert!(provider.checkout_requests().is_empty());
    }

    #[tokio::test]
    async fn rejects_zero_duration() {
        let account = account_with_customer_ref();
        let account_id = account.id;
        let accounts = Arc::new(MockAccountRepository::with_account(account));
        let payments = Arc::new(MockPaymentRepository::new());
        let provider = Arc::new(MockPaymentProvider::new());

        let handler = StartCheckoutHandler::new(accounts, payments, provider);

        let mut cmd = test_command(account_id);
        cmd.duration_months = 0;

        let result = handler.handle(cmd).await;
        assert!(matches!(result, Err(BillingError::ValidationFailed { .. })));
    }

    #[tokio::test]
    async fn rejects_duration_beyond_one_year() {
        let account = account_with_customer_ref();
        let account_id = account.id;
        let accounts = Arc::new(MockAccountRepository::with_account(account));
        let payments = Arc::new(MockPaymentRepository::new());
        let provider = Arc::new(MockPaymentProvider::new());

        let handler = StartCheckoutHandler::new(accounts, payments, provider);

        let mut cmd = test_command(account_id);
        cmd.duration_months = 13;

        let result = handler.handle(cmd).await;
        assert!(matches!(result, Err(BillingError::ValidationFailed { .. })));
    }

    #[tokio::test]
    async fn fails_when_customer_creation_fails() {
        let account = test_account();
        let account_id = account.id;
        let accounts = Arc::new(MockAccountRepository::with_account(account));
        let payments = Arc::new(MockPaymentRepository::new());
        let provider = Arc::new(MockPaymentProvider::failing_customer());

        let handler = StartCheckoutHandler::new(accounts, payments.clone(), provider);

        let result = handler.handle(test_command(account_id)).await;

        assert!(matches!(result, Err(BillingError::ProviderFailed { .. })));
        assert!(payments.saved().is_empty());
    }

    #[tokio::test]
    async fn fails_when_checkout_creation_fails() {
        let account = account_with_customer_ref();
        let account_id = account.id;
        let accounts = Arc::new(MockAccountRepository::with_account(account));
        let payments = Arc::new(MockPaymentRepository::new());
        let provider = Arc::new(MockPaymentProvider::failing_checkout());

        let handler = StartCheckoutHandler::new(accounts, payments.clone(), provider);

        let result = handler.handle(test_command(account_id)).await;

        assert!(matches!(result, Err(BillingError::ProviderFailed { .. })));
        assert!(payments.saved().is_empty());
    }
}
