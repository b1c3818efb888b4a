//! TalentHub Billing service binary.
//!
//! Wires configuration, the PostgreSQL pool, the payment processor client,
//! and the notifier into the HTTP API, then runs the server next to the
//! reconciliation sweep until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use talenthub_billing::adapters::http::billing::{billing_router, BillingAppState, RedirectUrls};
use talenthub_billing::adapters::notify::{EmailNotifier, EmailNotifierConfig, TracingNotifier};
use talenthub_billing::adapters::postgres::{
    PostgresAccountRepository, PostgresBillingLedger, PostgresPaymentRepository,
    PostgresSubscriptionRepository, PostgresWebhookEventRepository,
};
use talenthub_billing::adapters::scheduler::{SweepScheduler, SweepSchedulerConfig};
use talenthub_billing::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use talenthub_billing::application::handlers::billing::RunReconciliationHandler;
use talenthub_billing::config::{AppConfig, ServerConfig};
use talenthub_billing::domain::billing::ProcessorWebhookVerifier;
use talenthub_billing::ports::Notifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);
    tracing::info!(
        environment = ?config.server.environment,
        test_mode = config.payment.is_test_mode(),
        "Starting TalentHub billing service"
    );

    // Database pool and schema
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;
    tracing::info!("Database pool created");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    // Outbound adapters
    let accounts = Arc::new(PostgresAccountRepository::new(pool.clone()));
    let payments = Arc::new(PostgresPaymentRepository::new(pool.clone()));
    let subscriptions = Arc::new(PostgresSubscriptionRepository::new(pool.clone()));
    let webhook_events = Arc::new(PostgresWebhookEventRepository::new(pool.clone()));
    let ledger = Arc::new(PostgresBillingLedger::new(pool.clone()));

    let payment_provider = Arc::new(StripePaymentAdapter::new(StripeConfig::new(
        config.payment.stripe_api_key.expose_secret().clone(),
    )));

    let notifier: Arc<dyn Notifier> = match &config.notification.resend_api_key {
        Some(key) if config.notification.email_enabled() => {
            tracing::info!("Email notices enabled via Resend");
            Arc::new(EmailNotifier::new(
                EmailNotifierConfig::new(
                    key.expose_secret().clone(),
                    config.notification.from_email.clone(),
                )
                    .with_from_name(config.notification.from_name.clone()),
            ))
        }
        _ => {
            tracing::info!("No Resend key configured; notices are log-only");
            Arc::new(TracingNotifier::new())
        }
    };

    // HTTP state
    let state = BillingAppState {
        accounts: accounts.clone(),
        payments: payments.clone(),
        subscriptions: subscriptions.clone(),
        webhook_events: webhook_events.clone(),
        ledger,
        payment_provider: payment_provider.clone(),
        notifier: notifier.clone(),
        webhook_verifier: ProcessorWebhookVerifier::new(
            config.payment.stripe_webhook_secret.expose_secret().as_str(),
        ),
        redirects: RedirectUrls {
            checkout_success_url: config.payment.checkout_success_url.clone(),
            checkout_cancel_url: config.payment.checkout_cancel_url.clone(),
            success_page_url: config.payment.success_page_url.clone(),
            packages_page_url: config.payment.packages_page_url.clone(),
        },
        max_renewals: config.billing.max_renewals,
    };

    // Reconciliation sweep, stopped through the watch channel at shutdown
    let sweep_handler = Arc::new(
        RunReconciliationHandler::new(accounts, subscriptions, payment_provider, notifier)
            .with_audit_pruning(webhook_events, config.billing.webhook_retention_days),
    );
    let scheduler = SweepScheduler::with_config(
        sweep_handler,
        SweepSchedulerConfig::default()
            .with_interval(config.billing.sweep_interval())
            .with_run_on_startup(config.billing.sweep_on_startup),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep_task = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    // HTTP server
    let app = build_router(state, &config.server);
    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Server is down; stop the sweep loop before exiting
    let _ = shutdown_tx.send(true);
    let _ = sweep_task.await;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.is_production() {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn build_router(state: BillingAppState, server: &ServerConfig) -> Router {
    // Order matters: trace outermost, timeout closest to the handlers
    let middleware = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(server))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )));

    Router::new()
        .merge(billing_router())
        .layer(middleware)
        // Health stays outside the middleware stack so probes always answer
        .route("/health", get(health))
        .with_state(state)
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins = server.cors_origins_list();
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
