//! Repository for account data

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::decimal::Amount;
use common::error::{Error, Result};
use common::model::account::Account;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

/// Account repository trait defining the interface for account storage
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Create a new account iff no account with the same id exists
    async fn create_account(&self, account: Account) -> Result<()>;

    /// Get a snapshot of an account by id; never blocks on exclusivity
    async fn get_account(&self, id: &str) -> Result<Option<Account>>;

    /// Set the exclusivity marker for an account.
    ///
    /// With `true`, atomically transitions the marker from free to held and
    /// returns whether the transition happened (`Ok(false)` means the marker
    /// was already held and the caller should back off). With `false`,
    /// releases the marker and returns `Ok(true)`.
    ///
    /// This is a coordination primitive, not a business mutation. It must be
    /// a single compare-and-swap; a separate read-then-write of a plain flag
    /// would let two callers both observe "free" and both proceed.
    async fn set_exclusive(&self, id: &str, exclusive: bool) -> Result<bool>;

    /// Write a new balance for an account.
    ///
    /// Callers must hold the account's exclusivity marker.
    async fn update_balance(&self, id: &str, balance: Amount) -> Result<()>;

    /// Number of accounts in the store
    fn account_count(&self) -> usize;
}

/// Mutable per-account state guarded by the slot's read-write lock
#[derive(Debug)]
struct AccountState {
    balance: Amount,
    updated_at: DateTime<Utc>,
}

/// Storage slot for one account.
///
/// The `exclusive` marker serializes transfers touching this account; the
/// inner lock only makes the snapshot/update pair memory-safe and is never
/// held across an await point.
#[derive(Debug)]
struct AccountSlot {
    created_at: DateTime<Utc>,
    state: RwLock<AccountState>,
    exclusive: AtomicBool,
}

impl AccountSlot {
    fn from_account(account: &Account) -> Self {
        Self {
            created_at: account.created_at,
            state: RwLock::new(AccountState {
                balance: account.balance,
                updated_at: account.updated_at,
            }),
            exclusive: AtomicBool::new(false),
        }
    }

    fn snapshot(&self, id: &str) -> Account {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Account {
            id: id.to_string(),
            balance: state.balance,
            created_at: self.created_at,
            updated_at: state.updated_at,
        }
    }
}

/// In-memory repository for account data
pub struct InMemoryAccountRepository {
    /// Account slots by id
    accounts: DashMap<String, Arc<AccountSlot>>,
}

impl InMemoryAccountRepository {
    /// Create a new in-memory account repository
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    fn slot(&self, id: &str) -> Result<Arc<AccountSlot>> {
        self.accounts
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::AccountNotFound(format!("Account id {} does not exist!", id)))
    }
}

impl Default for InMemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    /// Create a new account; exactly one concurrent creator of an id wins
    async fn create_account(&self, account: Account) -> Result<()> {
        match self.accounts.entry(account.id.clone()) {
            Entry::Occupied(_) => Err(Error::DuplicateAccountId(format!(
                "Account id {} already exists!",
                account.id
            ))),
            Entry::Vacant(entry) => {
                debug!("Creating account {}", account.id);
                entry.insert(Arc::new(AccountSlot::from_account(&account)));
                Ok(())
            }
        }
    }

    /// Get a snapshot of an account by id
    async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .get(id)
            .map(|entry| entry.value().snapshot(id)))
    }

    /// Set the exclusivity marker through a compare-and-swap
    async fn set_exclusive(&self, id: &str, exclusive: bool) -> Result<bool> {
        let slot = self.slot(id)?;
        if exclusive {
            Ok(slot
                .exclusive
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok())
        } else {
            slot.exclusive.store(false, Ordering::Release);
            Ok(true)
        }
    }

    /// Write a new balance for an account
    async fn update_balance(&self, id: &str, balance: Amount) -> Result<()> {
        let slot = self.slot(id)?;
        let mut state = slot.state.write().unwrap_or_else(|e| e.into_inner());
        state.balance = balance;
        state.updated_at = Utc::now();
        Ok(())
    }

    fn account_count(&self) -> usize {
        self.accounts.len()
    }
}
