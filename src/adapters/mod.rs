//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum REST API for the subscription endpoints
//! - `memory` - In-memory repositories for tests and local development
//! - `notify` - Email delivery via Resend, plus a log-only fallback
//! - `postgres` - SQLx-backed repositories and the transactional ledger
//! - `scheduler` - Daily reconciliation sweep loop
//! - `stripe` - Payment provider client and webhook types

pub mod http;
pub mod memory;
pub mod notify;
pub mod postgres;
pub mod scheduler;
pub mod stripe;
