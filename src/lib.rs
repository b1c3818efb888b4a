//! TalentHub Billing - Subscription and Billing Reconciliation Engine
//!
//! This crate runs the paid-subscription lifecycle for the TalentHub
//! recruitment marketplace: hosted checkout, webhook-driven renewals,
//! auto-renewal control, and the daily reconciliation sweep that expires
//! lapsed subscriptions.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
