//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the TalentHub billing domain.

mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{AccountId, PaymentId, SubscriptionId};
pub use money::Money;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
