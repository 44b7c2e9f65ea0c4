//! In-process store.
//!
//! Same semantics as the RocksDB backend, kept in a single mutex-guarded
//! table set. Nothing survives a restart. Supports fault injection so the
//! wager pipeline's failure paths can be exercised.

use super::{Account, AccountStore, CasinoStore, GameStateStore, StorageResult};
use crate::errors::StorageError;
use crate::games::GameState;
use crate::money::Money;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    accounts: HashMap<u64, Account>,
    keys: HashMap<String, u64>,
    game_states: HashMap<(u64, String), GameState>,
    next_account_id: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing_commits: AtomicU32,
    failing_reads: AtomicU32,
    commit_delay_ms: AtomicU64,
    commits: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` wager commits fail without writing anything
    pub fn fail_next_commits(&self, n: u32) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` account reads fail
    pub fn fail_next_reads(&self, n: u32) {
        self.failing_reads.store(n, Ordering::SeqCst);
    }

    /// Hold every wager commit for `delay` before applying it
    pub fn set_commit_delay(&self, delay: Duration) {
        self.commit_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of successful wager commits
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    pub async fn account_count(&self) -> usize {
        self.tables.lock().await.accounts.len()
    }

    pub async fn game_state_count(&self) -> usize {
        self.tables.lock().await.game_states.len()
    }

    fn take_fault(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn check_read(&self) -> StorageResult<()> {
        if Self::take_fault(&self.failing_reads) {
            return Err(StorageError::ReadFailed("injected read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get_account(&self, key: &str) -> StorageResult<Option<Account>> {
        self.check_read()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .keys
            .get(key)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn get_account_by_id(&self, account_id: u64) -> StorageResult<Option<Account>> {
        self.check_read()?;
        Ok(self.tables.lock().await.accounts.get(&account_id).cloned())
    }

    async fn create_account(&self, username: &str, balance: Money, key: &str) -> StorageResult<Account> {
        let mut tables = self.tables.lock().await;
        if tables.keys.contains_key(key) {
            return Err(StorageError::WriteFailed(format!("account key already exists: {}", key)));
        }

        tables.next_account_id += 1;
        let account = Account {
            id: tables.next_account_id,
            username: username.to_string(),
            balance,
            key: key.to_string(),
            last_login: None,
        };
        tables.keys.insert(account.key.clone(), account.id);
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update_balance(&self, account_id: u64, balance: Money) -> StorageResult<()> {
        let mut tables = self.tables.lock().await;
        let account = tables
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| StorageError::WriteFailed(format!("no account {}", account_id)))?;
        account.balance = balance;
        Ok(())
    }

    async fn record_login(&self, account_id: u64, at_millis: i64) -> StorageResult<()> {
        let mut tables = self.tables.lock().await;
        if let Some(account) = tables.accounts.get_mut(&account_id) {
            account.last_login = Some(at_millis);
        }
        Ok(())
    }
}

#[async_trait]
impl GameStateStore for MemoryStore {
    async fn get_game_state(&self, account_id: u64, game_id: &str) -> StorageResult<Option<GameState>> {
        let tables = self.tables.lock().await;
        Ok(tables.game_states.get(&(account_id, game_id.to_string())).cloned())
    }

    async fn insert_game_state_if_absent(&self, state: GameState) -> StorageResult<GameState> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .game_states
            .entry((state.account_id, state.game_id.clone()))
            .or_insert(state);
        Ok(stored.clone())
    }

    async fn update_game_state(&self, state: &GameState) -> StorageResult<()> {
        let mut tables = self.tables.lock().await;
        tables
            .game_states
            .insert((state.account_id, state.game_id.clone()), state.clone());
        Ok(())
    }
}

#[async_trait]
impl CasinoStore for MemoryStore {
    async fn commit_wager(&self, account_id: u64, balance: Money, state: &GameState) -> StorageResult<()> {
        let delay = self.commit_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if Self::take_fault(&self.failing_commits) {
            return Err(StorageError::WriteFailed("injected commit failure".to_string()));
        }

        // Both rows change under one lock acquisition, or neither does
        let mut tables = self.tables.lock().await;
        let account = tables
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| StorageError::WriteFailed(format!("no account {}", account_id)))?;
        account.balance = balance;
        tables
            .game_states
            .insert((state.account_id, state.game_id.clone()), state.clone());
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}
