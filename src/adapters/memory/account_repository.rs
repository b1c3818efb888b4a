//! In-memory account repository.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::billing::{Account, BillingError};
use crate::domain::foundation::AccountId;
use crate::ports::AccountRepository;

/// In-memory implementation of the AccountRepository port.
///
/// Thread-safe via internal `Mutex`, shared across clones. Suitable for tests
/// and development wiring; does not persist across restarts.
#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: Arc<Mutex<HashMap<AccountId, Account>>>,
}

impl InMemoryAccountRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored accounts.
    pub fn len(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    /// Returns true if no accounts are stored.
    pub fn is_empty(&self) -> bool {
        self.accounts.lock().unwrap().is_empty()
    }
}

impl Clone for InMemoryAccountRepository {
    fn clone(&self) -> Self {
        Self {
            accounts: Arc::clone(&self.accounts),
        }
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn save(&self, account: &Account) -> Result<(), BillingError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(&account.id) {
            return Err(BillingError::validation(
                "account_id",
                format!("Account {} already exists", account.id),
            ));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<(), BillingError> {
        let mut accounts = self.accounts.lock().unwrap();
        if !accounts.contains_key(&account.id) {
            return Err(BillingError::AccountNotFound(account.id));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, BillingError> {
        Ok(self.accounts.lock().unwrap().get(id).cloned())
    }
}
