//! HTTP handlers for the subscription endpoints.
//!
//! These handlers connect Axum routes to application layer command/query
//! handlers. The confirm and cancel routes are browser redirect landings and
//! answer with 303s; everything else speaks JSON.

use std::sync::Arc;

use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use uuid::Uuid;

use crate::application::handlers::billing::{
    CancelAutoRenewalCommand, CancelAutoRenewalHandler, CancelCheckoutCommand,
    CancelCheckoutHandler, ConfirmCheckoutCommand, ConfirmCheckoutHandler, ConfirmCheckoutResult,
    GetBillingStatusHandler, GetBillingStatusQuery, ProcessWebhookCommand, ProcessWebhookHandler,
    ResumeAutoRenewalCommand, ResumeAutoRenewalHandler, StartCheckoutCommand, StartCheckoutHandler,
};
use crate::domain::billing::{
    BillingError, PaymentStatus, ProcessorWebhookVerifier, SubscriptionTier, WebhookError,
};
use crate::domain::foundation::AccountId;
use crate::ports::{
    AccountRepository, BillingLedger, Notifier, PaymentProvider, PaymentRepository,
    SubscriptionRepository, WebhookEventRepository,
};

use super::dto::{
    BillingStatusResponse, CheckoutResponse, ErrorResponse, MessageResponse, SessionQuery,
    StartCheckoutRequest, WebhookAck,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Redirect targets for the checkout flow.
///
/// The first pair is handed to the processor as callback URLs and points back
/// at this service's confirm/cancel routes (the `{CHECKOUT_SESSION_ID}`
/// placeholder is filled in by the processor). The second pair is where those
/// routes then send the browser.
#[derive(Debug, Clone)]
pub struct RedirectUrls {
    /// Processor callback after a completed checkout.
    pub checkout_success_url: String,
    /// Processor callback after an abandoned checkout.
    pub checkout_cancel_url: String,
    /// Frontend page for a settled purchase.
    pub success_page_url: String,
    /// Frontend packages page for declined or abandoned checkouts.
    pub packages_page_url: String,
}

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped
/// dependencies for efficient sharing across handlers.
#[derive(Clone)]
pub struct BillingAppState {
    pub accounts: Arc<dyn AccountRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub ledger: Arc<dyn BillingLedger>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub webhook_verifier: ProcessorWebhookVerifier,
    pub redirects: RedirectUrls,
    pub max_renewals: u32,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn start_checkout_handler(&self) -> StartCheckoutHandler {
        StartCheckoutHandler::new(
            self.accounts.clone(),
            self.payments.clone(),
            self.payment_provider.clone(),
        )
    }

    pub fn confirm_checkout_handler(&self) -> ConfirmCheckoutHandler {
        ConfirmCheckoutHandler::new(
            self.accounts.clone(),
            self.payments.clone(),
            self.payment_provider.clone(),
            self.ledger.clone(),
            self.notifier.clone(),
        )
    }

    pub fn cancel_checkout_handler(&self) -> CancelCheckoutHandler {
        CancelCheckoutHandler::new(self.payments.clone(), self.payment_provider.clone())
    }

    pub fn webhook_handler(&self) -> ProcessWebhookHandler {
        ProcessWebhookHandler::new(
            self.webhook_verifier.clone(),
            self.webhook_events.clone(),
            self.subscriptions.clone(),
            self.payments.clone(),
            self.accounts.clone(),
            self.ledger.clone(),
            self.payment_provider.clone(),
            self.notifier.clone(),
        )
    }

    pub fn cancel_auto_renewal_handler(&self) -> CancelAutoRenewalHandler {
        CancelAutoRenewalHandler::new(
            self.accounts.clone(),
            self.subscriptions.clone(),
            self.payment_provider.clone(),
        )
    }

    pub fn resume_auto_renewal_handler(&self) -> ResumeAutoRenewalHandler {
        ResumeAutoRenewalHandler::new(
            self.accounts.clone(),
            self.subscriptions.clone(),
            self.payment_provider.clone(),
        )
    }

    pub fn billing_status_handler(&self) -> GetBillingStatusHandler {
        GetBillingStatusHandler::new(
            self.accounts.clone(),
            self.subscriptions.clone(),
            self.max_renewals,
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Account Context (set by the auth gateway in production)
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated account context extracted from the request.
///
/// In production a JWT gateway fronts this service and injects the account id
/// as an X-Account-Id header after validating the token.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub account_id: AccountId,
}

/// Rejection type for AuthenticatedAccount extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedAccount
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let account_id = parts
                .headers
                .get("X-Account-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| Uuid::parse_str(s).ok())
                .map(AccountId::from_uuid)
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedAccount { account_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Checkout Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /subscription/checkout - Start a hosted checkout for a tier purchase
pub async fn start_checkout(
    State(state): State<BillingAppState>,
    account: AuthenticatedAccount,
    Json(request): Json<StartCheckoutRequest>,
) -> Result<Json<CheckoutResponse>, BillingApiError> {
    let tier: SubscriptionTier = request.tier.parse()?;

    let handler = state.start_checkout_handler();
    let cmd = StartCheckoutCommand {
        account_id: account.account_id,
        tier,
        duration_months: request.duration_months,
        amount_eur: request.amount,
        discount_eur: request.discount.unwrap_or(0.0),
        success_url: state.redirects.checkout_success_url.clone(),
        cancel_url: state.redirects.checkout_cancel_url.clone(),
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(CheckoutResponse {
        checkout_url: result.checkout_url,
        payment_id: result.payment.id.to_string(),
    }))
}

/// GET /subscription/confirm?session_id= - Checkout return landing
///
/// The processor sends the customer's browser here after checkout. The
/// handler settles the payment against provider truth, then forwards the
/// browser to the success page (paid) or the packages page (anything else).
pub async fn confirm_checkout(
    State(state): State<BillingAppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Redirect, BillingApiError> {
    let session_id = require_session_id(query)?;

    let handler = state.confirm_checkout_handler();
    let result = handler.handle(ConfirmCheckoutCommand { session_id }).await?;

    let target = match result {
        ConfirmCheckoutResult::Activated { .. } => &state.redirects.success_page_url,
        ConfirmCheckoutResult::AlreadyConfirmed {
            status: PaymentStatus::Success,
        } => &state.redirects.success_page_url,
        ConfirmCheckoutResult::Declined { .. } | ConfirmCheckoutResult::AlreadyConfirmed { .. } => {
            &state.redirects.packages_page_url
        }
    };

    Ok(Redirect::to(target))
}

/// GET /subscription/cancel?session_id= - Checkout abandon landing
pub async fn cancel_checkout(
    State(state): State<BillingAppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Redirect, BillingApiError> {
    let session_id = require_session_id(query)?;

    let handler = state.cancel_checkout_handler();
    handler.handle(CancelCheckoutCommand { session_id }).await?;

    Ok(Redirect::to(&state.redirects.packages_page_url))
}

fn require_session_id(query: SessionQuery) -> Result<String, BillingApiError> {
    query
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BillingError::validation("session_id", "query parameter is required").into())
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Handler
// ════════════════════════════════════════════════════════════════════════════════

/// POST /subscription/webhook - Handle payment processor webhook events
///
/// No account authentication; trust comes from the signature over the raw
/// body. The response status tells the processor whether to redeliver.
pub async fn handle_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let Some(signature) = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
    else {
        // No header means no way to verify; same rejection as a bad signature
        return webhook_error_response(&WebhookError::InvalidSignature);
    };

    let handler = state.webhook_handler();
    let cmd = ProcessWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    match handler.handle(cmd).await {
        Ok(_) => (StatusCode::OK, Json(WebhookAck { received: true })).into_response(),
        Err(e) => webhook_error_response(&e),
    }
}

fn webhook_error_response(error: &WebhookError) -> Response {
    let status = StatusCode::from_u16(error.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_success() {
        return (status, Json(WebhookAck { received: true })).into_response();
    }

    let body = ErrorResponse::new(error.code(), error.to_string());
    (status, Json(body)).into_response()
}

// ════════════════════════════════════════════════════════════════════════════════
// Renewal Control Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /subscription/auto-renewal/cancel - Stop auto-renewal at period end
pub async fn cancel_auto_renewal(
    State(state): State<BillingAppState>,
    account: AuthenticatedAccount,
) -> Result<Json<MessageResponse>, BillingApiError> {
    let handler = state.cancel_auto_renewal_handler();
    let cmd = CancelAutoRenewalCommand {
        account_id: account.account_id,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(MessageResponse {
        message: format!(
            "Auto-renewal cancelled. Your subscription stays active until {}.",
            result.expire_date
        ),
    }))
}

/// POST /subscription/auto-renewal/resume - Turn auto-renewal back on
pub async fn resume_auto_renewal(
    State(state): State<BillingAppState>,
    account: AuthenticatedAccount,
) -> Result<Json<MessageResponse>, BillingApiError> {
    let handler = state.resume_auto_renewal_handler();
    let cmd = ResumeAutoRenewalCommand {
        account_id: account.account_id,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(MessageResponse {
        message: format!(
            "Auto-renewal resumed. Renewals continue until {} at the latest.",
            result.year_end_date
        ),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Status Handler
// ════════════════════════════════════════════════════════════════════════════════

/// GET /subscription/status - Billing snapshot for the calling account
pub async fn get_billing_status(
    State(state): State<BillingAppState>,
    account: AuthenticatedAccount,
) -> Result<Json<BillingStatusResponse>, BillingApiError> {
    let handler = state.billing_status_handler();
    let query = GetBillingStatusQuery {
        account_id: account.account_id,
    };

    let status = handler.handle(query).await?;

    Ok(Json(BillingStatusResponse::from(status)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BillingError::AccountNotFound(_)
            | BillingError::PaymentNotFound(_)
            | BillingError::SubscriptionNotFound(_) => StatusCode::NOT_FOUND,
            BillingError::InvalidTier(_) | BillingError::ValidationFailed { .. } => {
                StatusCode::BAD_REQUEST
            }
            BillingError::InvalidState { .. }
            | BillingError::NoProcessorSubscription
            | BillingError::RenewalWindowClosed => StatusCode::CONFLICT,
            BillingError::ProviderFailed { .. } => StatusCode::BAD_GATEWAY,
            BillingError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let body = ErrorResponse::new(self.0.code(), self.0.message());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryAccountRepository, InMemoryBillingLedger, InMemoryPaymentRepository,
        InMemorySubscriptionRepository, InMemoryWebhookEventRepository, RecordingNotifier,
    };
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::billing::{Account, Subscription};
    use crate::domain::foundation::{SubscriptionId, Timestamp};

    // ════════════════════════════════════════════════════════════════════════════
    // Test Harness
    // ════════════════════════════════════════════════════════════════════════════

    struct TestHarness {
        state: BillingAppState,
        accounts: InMemoryAccountRepository,
        payments: InMemoryPaymentRepository,
        subscriptions: InMemorySubscriptionRepository,
        provider: MockPaymentProvider,
    }

    fn test_redirects() -> RedirectUrls {
        RedirectUrls {
            checkout_success_url:
                "http://localhost:8080/subscription/confirm?session_id={CHECKOUT_SESSION_ID}"
                    .to_string(),
            checkout_cancel_url:
                "http://localhost:8080/subscription/cancel?session_id={CHECKOUT_SESSION_ID}"
                    .to_string(),
            success_page_url: "https://app.talenthub.test/subscription/success".to_string(),
            packages_page_url: "https://app.talenthub.test/packages".to_string(),
        }
    }

    fn harness() -> TestHarness {
        let accounts = InMemoryAccountRepository::new();
        let payments = InMemoryPaymentRepository::new();
        let subscriptions = InMemorySubscriptionRepository::new();
        let provider = MockPaymentProvider::new();

        let state = BillingAppState {
            accounts: Arc::new(accounts.clone()),
            payments: Arc::new(payments.clone()),
            subscriptions: Arc::new(subscriptions.clone()),
            webhook_events: Arc::new(InMemoryWebhookEventRepository::new()),
            ledger: Arc::new(InMemoryBillingLedger::new(
                accounts.clone(),
                payments.clone(),
                subscriptions.clone(),
            )),
            payment_provider: Arc::new(provider.clone()),
            notifier: Arc::new(RecordingNotifier::new()),
            webhook_verifier: ProcessorWebhookVerifier::new("whsec_test_secret"),
            redirects: test_redirects(),
            max_renewals: 12,
        };

        TestHarness {
            state,
            accounts,
            payments,
            subscriptions,
            provider,
        }
    }

    async fn seed_account(harness: &TestHarness) -> AccountId {
        let account =
            Account::new(AccountId::new(), "recruiter@example.com", "Acme Recruiting").unwrap();
        let id = account.id;
        harness.accounts.save(&account).await.unwrap();
        id
    }

    async fn seed_active_subscription(harness: &TestHarness, account_id: AccountId) -> Subscription {
        let subscription = Subscription::start(
            SubscriptionId::new(),
            account_id,
            SubscriptionTier::Platinum,
            1,
            Some("sub_live_1".to_string()),
            Timestamp::now(),
        );
        harness.subscriptions.save(&subscription).await.unwrap();

        let mut account = harness
            .accounts
            .find_by_id(&account_id)
            .await
            .unwrap()
            .unwrap();
        account.point_to_subscription(subscription.id);
        harness.accounts.update(&account).await.unwrap();

        subscription
    }

    fn checkout_request(tier: &str) -> StartCheckoutRequest {
        StartCheckoutRequest {
            tier: tier.to_string(),
            duration_months: 1,
            amount: 80.0,
            discount: None,
        }
    }

    fn location_of(response: Response) -> String {
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Checkout Handler Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn start_checkout_returns_url_and_records_pending_payment() {
        let harness = harness();
        let account_id = seed_account(&harness).await;

        let result = start_checkout(
            State(harness.state.clone()),
            AuthenticatedAccount { account_id },
            Json(checkout_request("platinum")),
        )
        .await
        .unwrap();

        assert!(!result.0.checkout_url.is_empty());
        assert_eq!(harness.payments.len(), 1);
        assert_eq!(harness.payments.payments()[0].status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn start_checkout_rejects_unknown_tier() {
        let harness = harness();
        let account_id = seed_account(&harness).await;

        let err = start_checkout(
            State(harness.state.clone()),
            AuthenticatedAccount { account_id },
            Json(checkout_request("titanium")),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn start_checkout_for_unknown_account_is_not_found() {
        let harness = harness();

        let err = start_checkout(
            State(harness.state.clone()),
            AuthenticatedAccount {
                account_id: AccountId::new(),
            },
            Json(checkout_request("platinum")),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn confirm_checkout_redirects_to_success_page_when_paid() {
        let harness = harness();
        let account_id = seed_account(&harness).await;

        start_checkout(
            State(harness.state.clone()),
            AuthenticatedAccount { account_id },
            Json(checkout_request("platinum")),
        )
        .await
        .unwrap();

        let session_id = harness.payments.payments()[0].correlation_key.clone();
        harness
            .provider
            .mark_session_paid(&session_id, Some("sub_live_1"));

        let redirect = confirm_checkout(
            State(harness.state.clone()),
            Query(SessionQuery {
                session_id: Some(session_id),
            }),
        )
        .await
        .unwrap();

        let response = redirect.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location_of(response),
            "https://app.talenthub.test/subscription/success"
        );
        assert_eq!(harness.subscriptions.len(), 1);
    }

    #[tokio::test]
    async fn confirm_checkout_without_session_id_is_bad_request() {
        let harness = harness();

        let err = confirm_checkout(
            State(harness.state.clone()),
            Query(SessionQuery { session_id: None }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cancel_checkout_redirects_to_packages_page() {
        let harness = harness();
        let account_id = seed_account(&harness).await;

        start_checkout(
            State(harness.state.clone()),
            AuthenticatedAccount { account_id },
            Json(checkout_request("bronze")),
        )
        .await
        .unwrap();

        let session_id = harness.payments.payments()[0].correlation_key.clone();

        let redirect = cancel_checkout(
            State(harness.state.clone()),
            Query(SessionQuery {
                session_id: Some(session_id),
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            location_of(redirect.into_response()),
            "https://app.talenthub.test/packages"
        );
        assert_eq!(
            harness.payments.payments()[0].status,
            PaymentStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn cancel_checkout_for_unknown_session_is_not_found() {
        let harness = harness();

        let err = cancel_checkout(
            State(harness.state.clone()),
            Query(SessionQuery {
                session_id: Some("cs_never_issued".to_string()),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Webhook Handler Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn webhook_without_signature_header_is_unauthorized() {
        let harness = harness();

        let response = handle_webhook(
            State(harness.state.clone()),
            axum::http::HeaderMap::new(),
            axum::body::Bytes::from_static(b"{}"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_with_forged_signature_is_unauthorized() {
        let harness = harness();

        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "Stripe-Signature",
            format!("t={},v1=deadbeef", Timestamp::now().as_unix_secs())
                .parse()
                .unwrap(),
        );

        let response = handle_webhook(
            State(harness.state.clone()),
            headers,
            axum::body::Bytes::from_static(b"{\"id\":\"evt_1\"}"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Renewal Control Handler Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn cancel_auto_renewal_returns_message_and_flips_flag() {
        let harness = harness();
        let account_id = seed_account(&harness).await;
        seed_active_subscription(&harness, account_id).await;

        let result = cancel_auto_renewal(
            State(harness.state.clone()),
            AuthenticatedAccount { account_id },
        )
        .await
        .unwrap();

        assert!(result.0.message.contains("Auto-renewal cancelled"));
        assert!(!harness.subscriptions.subscriptions()[0].auto_renewal);
        assert_eq!(
            harness.provider.period_end_flags(),
            vec![("sub_live_1".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn resume_auto_renewal_without_subscription_is_not_found() {
        let harness = harness();
        let account_id = seed_account(&harness).await;

        let err = resume_auto_renewal(
            State(harness.state.clone()),
            AuthenticatedAccount { account_id },
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Status Handler Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn billing_status_reports_active_subscription() {
        let harness = harness();
        let account_id = seed_account(&harness).await;
        seed_active_subscription(&harness, account_id).await;

        let result = get_billing_status(
            State(harness.state.clone()),
            AuthenticatedAccount { account_id },
        )
        .await
        .unwrap();

        assert!(result.0.has_active_subscription);
        assert_eq!(result.0.tier.as_deref(), Some("Platinum"));
        assert_eq!(result.0.max_renewals, 12);
    }

    #[tokio::test]
    async fn billing_status_for_fresh_account_is_inactive() {
        let harness = harness();
        let account_id = seed_account(&harness).await;

        let result = get_billing_status(
            State(harness.state.clone()),
            AuthenticatedAccount { account_id },
        )
        .await
        .unwrap();

        assert!(!result.0.has_active_subscription);
        assert!(result.0.tier.is_none());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn api_error_maps_account_not_found_to_404() {
        let err = BillingApiError(BillingError::account_not_found(AccountId::new()));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn api_error_maps_payment_not_found_to_404() {
        let err = BillingApiError(BillingError::payment_not_found("cs_missing"));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn api_error_maps_invalid_tier_to_400() {
        let err = BillingApiError(BillingError::invalid_tier("titanium"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_maps_validation_to_400() {
        let err = BillingApiError(BillingError::validation("amount", "must be positive"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_maps_invalid_state_to_409() {
        let err = BillingApiError(BillingError::invalid_state("success", "cancel checkout"));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn api_error_maps_renewal_window_closed_to_409() {
        let err = BillingApiError(BillingError::RenewalWindowClosed);
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn api_error_maps_provider_failure_to_502() {
        let err = BillingApiError(BillingError::provider("gateway timeout"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn api_error_maps_infrastructure_to_500() {
        let err = BillingApiError(BillingError::infrastructure("pool exhausted"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn webhook_error_response_asks_processor_to_retry_on_db_faults() {
        let response = webhook_error_response(&WebhookError::Database("pool timeout".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn webhook_error_response_acknowledges_ignored_events() {
        let response = webhook_error_response(&WebhookError::Ignored("unknown sub".into()));
        assert_eq!(response.status(), StatusCode::OK);
    }
}
