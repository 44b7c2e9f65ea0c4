//! Persistence for accounts and per-(account, game) state.
//!
//! Two backends implement the same traits: `RocksStore` for production and
//! `MemoryStore` for tests and throwaway runs. All methods are async; the
//! RocksDB backend moves blocking calls onto the blocking thread pool.

pub mod memory;
pub mod rocks;

pub use memory::MemoryStore;
pub use rocks::RocksStore;

use crate::config::{StorageBackend, StorageConfig};
use crate::errors::StorageError;
use crate::games::{GameConfig, GameState, ReelSource};
use crate::money::Money;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A player account. Never deleted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub username: String,
    pub balance: Money,
    /// Opaque session credential, unique across accounts
    pub key: String,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub last_login: Option<i64>,
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look an account up by its session key
    async fn get_account(&self, key: &str) -> StorageResult<Option<Account>>;

    async fn get_account_by_id(&self, account_id: u64) -> StorageResult<Option<Account>>;

    /// Insert a new account. Fails if `key` is already taken.
    async fn create_account(&self, username: &str, balance: Money, key: &str) -> StorageResult<Account>;

    async fn update_balance(&self, account_id: u64, balance: Money) -> StorageResult<()>;

    async fn record_login(&self, account_id: u64, at_millis: i64) -> StorageResult<()>;
}

#[async_trait]
pub trait GameStateStore: Send + Sync {
    async fn get_game_state(&self, account_id: u64, game_id: &str) -> StorageResult<Option<GameState>>;

    /// Insert `state` unless a row for its pair exists; returns whichever row
    /// is stored afterwards.
    async fn insert_game_state_if_absent(&self, state: GameState) -> StorageResult<GameState>;

    /// Overwrite the row for `state`'s pair
    async fn update_game_state(&self, state: &GameState) -> StorageResult<()>;
}

/// Full repository used by the wager pipeline
#[async_trait]
pub trait CasinoStore: AccountStore + GameStateStore {
    /// Persist a settled wager: the new balance and the new game state are
    /// written as one all-or-nothing unit.
    async fn commit_wager(&self, account_id: u64, balance: Money, state: &GameState) -> StorageResult<()>;

    /// Flush and release the backend. Called once on shutdown.
    async fn close(&self) -> StorageResult<()>;
}

/// Shared handle to the configured backend
pub type SharedStore = Arc<dyn CasinoStore>;

/// Open the backend selected in `config`
pub fn open_store(config: &StorageConfig) -> StorageResult<SharedStore> {
    match config.backend {
        StorageBackend::Rocksdb => Ok(Arc::new(RocksStore::open(config)?)),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; nothing will survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Return the stored state for the pair, creating it with the game defaults
/// and a fresh draw the first time the pair is seen.
pub async fn get_or_create_game_state<S, R>(
    store: &S,
    account_id: u64,
    config: &GameConfig,
    reels: &R,
) -> StorageResult<GameState>
where
    S: GameStateStore + ?Sized,
    R: ReelSource + ?Sized,
{
    if let Some(existing) = store.get_game_state(account_id, &config.id).await? {
        return Ok(existing);
    }

    let initial = GameState::initial(account_id, config, reels.draw(config));
    let stored = store.insert_game_state_if_absent(initial).await?;
    tracing::debug!(account_id, game_id = %config.id, "Created game state");
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{GameCatalog, ReelGenerator};

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = MemoryStore::new();
        let catalog = GameCatalog::embedded().unwrap();
        let config = catalog.get("rock-climber").unwrap();
        let reels = ReelGenerator::from_entropy();

        let first = get_or_create_game_state(&store, 1, &config, &reels).await.unwrap();
        let second = get_or_create_game_state(&store, 1, &config, &reels).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.bet, config.default_bet);
        assert_eq!(first.coin_value, config.default_coin_value);
        assert_eq!(store.game_state_count().await, 1);
    }

    #[tokio::test]
    async fn test_states_are_per_pair() {
        let store = MemoryStore::new();
        let catalog = GameCatalog::embedded().unwrap();
        let rock = catalog.get("rock-climber").unwrap();
        let egypt = catalog.get("egyptian-treasures").unwrap();
        let reels = ReelGenerator::seeded(3);

        get_or_create_game_state(&store, 1, &rock, &reels).await.unwrap();
        get_or_create_game_state(&store, 1, &egypt, &reels).await.unwrap();
        get_or_create_game_state(&store, 2, &rock, &reels).await.unwrap();

        assert_eq!(store.game_state_count().await, 3);
    }
}
