//! Account repository port.
//!
//! Defines the contract for persisting and retrieving Account aggregates.
//! Implementations handle the actual database operations.

use crate::domain::billing::{Account, BillingError};
use crate::domain::foundation::AccountId;
use async_trait::async_trait;

/// Repository port for Account aggregate persistence.
///
/// Accounts are created by the identity system before any billing flow runs,
/// so this port only needs lookup and update on the billing side. `save` exists
/// for tests and bootstrap tooling.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Save a new account.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if an account with this id already exists
    /// - `Infrastructure` on persistence failure
    async fn save(&self, account: &Account) -> Result<(), BillingError>;

    /// Update an existing account.
    ///
    /// Used to attach the processor customer reference and to re-point the
    /// current subscription after activation.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account doesn't exist
    /// - `Infrastructure` on persistence failure
    async fn update(&self, account: &Account) -> Result<(), BillingError>;

    /// Find an account by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, BillingError>;
}
