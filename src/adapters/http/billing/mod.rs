//! HTTP adapter for subscription endpoints.
//!
//! Exposes the billing domain via REST API:
//! - `POST /subscription/checkout` - Start a hosted checkout for a tier purchase
//! - `GET /subscription/confirm` - Checkout return landing (303 redirect)
//! - `GET /subscription/cancel` - Checkout abandon landing (303 redirect)
//! - `POST /subscription/webhook` - Handle payment processor webhooks
//! - `POST /subscription/auto-renewal/cancel` - Stop auto-renewal at period end
//! - `POST /subscription/auto-renewal/resume` - Turn auto-renewal back on
//! - `GET /subscription/status` - Billing snapshot for the calling account

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{AuthenticatedAccount, BillingAppState, RedirectUrls};
pub use routes::{billing_router, subscription_routes, webhook_routes};
