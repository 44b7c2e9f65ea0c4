//! RocksDB-backed store.
//!
//! Rows are JSON values under prefixed keys:
//!
//! | key                               | value            |
//! |-----------------------------------|------------------|
//! | `account:id:<id>`                 | `Account`        |
//! | `account:key:<key>`               | id (u64, BE)     |
//! | `gamestate:<account_id>:<game_id>`| `GameState`      |
//! | `meta:next_account_id`            | counter (u64, BE)|
//!
//! Multi-row changes go through a single `WriteBatch`, which RocksDB applies
//! atomically. Every read-modify-write of an account row holds the write
//! guard, so a login stamp can never write back a stale balance.

use super::{Account, AccountStore, CasinoStore, GameStateStore, StorageResult};
use crate::config::{CompressionType, StorageConfig};
use crate::errors::StorageError;
use crate::games::GameState;
use crate::money::Money;
use async_trait::async_trait;
use rocksdb::{Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const NEXT_ACCOUNT_ID_KEY: &[u8] = b"meta:next_account_id";

fn account_key(account_id: u64) -> Vec<u8> {
    format!("account:id:{}", account_id).into_bytes()
}

fn account_index_key(key: &str) -> Vec<u8> {
    format!("account:key:{}", key).into_bytes()
}

fn game_state_key(account_id: u64, game_id: &str) -> Vec<u8> {
    format!("gamestate:{}:{}", account_id, game_id).into_bytes()
}

fn decode_u64(bytes: &[u8], what: &str) -> StorageResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::CorruptedData(format!("Invalid {} bytes", what)))?;
    Ok(u64::from_be_bytes(raw))
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8], what: &str) -> StorageResult<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| StorageError::CorruptedData(format!("Failed to decode {}: {}", what, e)))
}

fn encode_json<T: Serialize>(value: &T, what: &str) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| StorageError::WriteFailed(format!("Failed to encode {}: {}", what, e)))
}

#[derive(Clone)]
pub struct RocksStore {
    db: Arc<DB>,
    /// Serializes read-modify-write sequences (id allocation, account rows, insert-if-absent)
    write_guard: Arc<Mutex<()>>,
}

impl RocksStore {
    /// Open (or create) the database described by `config`
    pub fn open(config: &StorageConfig) -> StorageResult<Self> {
        let path = Path::new(&config.data_directory);
        if config.clear_on_start && path.exists() {
            info!("Clearing database at {}", path.display());
            DB::destroy(&Options::default(), path)
                .map_err(|e| StorageError::DatabaseOpenFailed(e.to_string()))?;
        }

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);
        opts.set_compression_type(match config.compression_type {
            CompressionType::None => rocksdb::DBCompressionType::None,
            CompressionType::Snappy => rocksdb::DBCompressionType::Snappy,
            CompressionType::Lz4 => rocksdb::DBCompressionType::Lz4,
            CompressionType::Zstd => rocksdb::DBCompressionType::Zstd,
        });

        let db = DB::open(&opts, path).map_err(|e| {
            StorageError::DatabaseOpenFailed(format!("{}: {}", path.display(), e))
        })?;
        info!("Opened database at {}", path.display());

        Ok(Self {
            db: Arc::new(db),
            write_guard: Arc::new(Mutex::new(())),
        })
    }

    /// Run a blocking closure against this store on the blocking pool
    async fn blocking<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&RocksStore) -> StorageResult<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store)).await?
    }

    fn read_bytes(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| StorageError::ReadFailed(e.to_string()))
    }

    fn read_account(&self, account_id: u64) -> StorageResult<Option<Account>> {
        match self.read_bytes(&account_key(account_id))? {
            Some(bytes) => decode_json(&bytes, "account").map(Some),
            None => Ok(None),
        }
    }

    fn read_game_state(&self, account_id: u64, game_id: &str) -> StorageResult<Option<GameState>> {
        match self.read_bytes(&game_state_key(account_id, game_id))? {
            Some(bytes) => decode_json(&bytes, "game state").map(Some),
            None => Ok(None),
        }
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        self.db
            .write(batch)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))
    }

    fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AccountStore for RocksStore {
    async fn get_account(&self, key: &str) -> StorageResult<Option<Account>> {
        let key = key.to_string();
        self.blocking(move |store| {
            let Some(id_bytes) = store.read_bytes(&account_index_key(&key))? else {
                return Ok(None);
            };
            let account_id = decode_u64(&id_bytes, "account index")?;
            store.read_account(account_id)
        })
        .await
    }

    async fn get_account_by_id(&self, account_id: u64) -> StorageResult<Option<Account>> {
        self.blocking(move |store| store.read_account(account_id)).await
    }

    async fn create_account(&self, username: &str, balance: Money, key: &str) -> StorageResult<Account> {
        let username = username.to_string();
        let key = key.to_string();
        self.blocking(move |store| {
            let _guard = store.lock_writes();

            let index_key = account_index_key(&key);
            if store.read_bytes(&index_key)?.is_some() {
                return Err(StorageError::WriteFailed(format!("account key already exists: {}", key)));
            }

            let last_id = match store.read_bytes(NEXT_ACCOUNT_ID_KEY)? {
                Some(bytes) => decode_u64(&bytes, "account counter")?,
                None => 0,
            };
            let account = Account {
                id: last_id + 1,
                username,
                balance,
                key,
                last_login: None,
            };

            let mut batch = WriteBatch::default();
            batch.put(account_key(account.id), encode_json(&account, "account")?);
            batch.put(index_key, account.id.to_be_bytes());
            batch.put(NEXT_ACCOUNT_ID_KEY, account.id.to_be_bytes());
            store.write_batch(batch)?;

            debug!(account_id = account.id, "Created account");
            Ok(account)
        })
        .await
    }

    async fn update_balance(&self, account_id: u64, balance: Money) -> StorageResult<()> {
        self.blocking(move |store| {
            let _guard = store.lock_writes();
            let mut account = store
                .read_account(account_id)?
                .ok_or_else(|| StorageError::WriteFailed(format!("no account {}", account_id)))?;
            account.balance = balance;

            let mut batch = WriteBatch::default();
            batch.put(account_key(account_id), encode_json(&account, "account")?);
            store.write_batch(batch)
        })
        .await
    }

    async fn record_login(&self, account_id: u64, at_millis: i64) -> StorageResult<()> {
        self.blocking(move |store| {
            let _guard = store.lock_writes();
            let Some(mut account) = store.read_account(account_id)? else {
                return Ok(());
            };
            account.last_login = Some(at_millis);

            let mut batch = WriteBatch::default();
            batch.put(account_key(account_id), encode_json(&account, "account")?);
            store.write_batch(batch)
        })
        .await
    }
}

#[async_trait]
impl GameStateStore for RocksStore {
    async fn get_game_state(&self, account_id: u64, game_id: &str) -> StorageResult<Option<GameState>> {
        let game_id = game_id.to_string();
        self.blocking(move |store| store.read_game_state(account_id, &game_id)).await
    }

    async fn insert_game_state_if_absent(&self, state: GameState) -> StorageResult<GameState> {
        self.blocking(move |store| {
            let _guard = store.lock_writes();
            if let Some(existing) = store.read_game_state(state.account_id, &state.game_id)? {
                return Ok(existing);
            }

            let mut batch = WriteBatch::default();
            batch.put(
                game_state_key(state.account_id, &state.game_id),
                encode_json(&state, "game state")?,
            );
            store.write_batch(batch)?;
            Ok(state)
        })
        .await
    }

    async fn update_game_state(&self, state: &GameState) -> StorageResult<()> {
        let state = state.clone();
        self.blocking(move |store| {
            let mut batch = WriteBatch::default();
            batch.put(
                game_state_key(state.account_id, &state.game_id),
                encode_json(&state, "game state")?,
            );
            store.write_batch(batch)
        })
        .await
    }
}

#[async_trait]
impl CasinoStore for RocksStore {
    async fn commit_wager(&self, account_id: u64, balance: Money, state: &GameState) -> StorageResult<()> {
        let state = state.clone();
        self.blocking(move |store| {
            let _guard = store.lock_writes();
            let mut account = store
                .read_account(account_id)?
                .ok_or_else(|| StorageError::WriteFailed(format!("no account {}", account_id)))?;
            account.balance = balance;

            let mut batch = WriteBatch::default();
            batch.put(account_key(account_id), encode_json(&account, "account")?);
            batch.put(
                game_state_key(state.account_id, &state.game_id),
                encode_json(&state, "game state")?,
            );
            store.write_batch(batch)
        })
        .await
    }

    async fn close(&self) -> StorageResult<()> {
        self.blocking(|store| {
            store
                .db
                .flush()
                .map_err(|e| StorageError::WriteFailed(format!("flush on close failed: {}", e)))
        })
        .await?;
        info!("Database flushed and closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::ReelGrid;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, RocksStore) {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            data_directory: dir.path().join("db").to_string_lossy().to_string(),
            ..Default::default()
        };
        let store = RocksStore::open(&config).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_account_roundtrip_by_key() {
        let (_dir, store) = open_temp();
        let a = store.create_account("Guest", Money::from_cents(1_000_000), "key-a").await.unwrap();
        let b = store.create_account("Guest", Money::from_cents(500), "key-b").await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(store.get_account("key-b").await.unwrap(), Some(b));
        assert_eq!(store.get_account("nope").await.unwrap(), None);
        assert!(store.create_account("Guest", Money::ZERO, "key-a").await.is_err());
    }

    #[tokio::test]
    async fn test_commit_writes_both_rows() {
        let (_dir, store) = open_temp();
        let account = store.create_account("Guest", Money::from_cents(1000), "k").await.unwrap();
        let state = GameState {
            account_id: account.id,
            game_id: "rock-climber".to_string(),
            reels: ReelGrid(vec![vec![5, 5, 5, 5]; 5]),
            bet: 2.0,
            coin_value: 0.05,
        };

        store.commit_wager(account.id, Money::from_cents(900), &state).await.unwrap();

        let account = store.get_account("k").await.unwrap().unwrap();
        assert_eq!(account.balance, Money::from_cents(900));
        let stored = store.get_game_state(account.id, "rock-climber").await.unwrap();
        assert_eq!(stored, Some(state));
    }

    #[tokio::test]
    async fn test_update_balance_and_game_state() {
        let (_dir, store) = open_temp();
        let account = store.create_account("Guest", Money::from_cents(1000), "k").await.unwrap();

        store.update_balance(account.id, Money::from_cents(250)).await.unwrap();
        store.record_login(account.id, 1_700_000_000_000).await.unwrap();

        let stored = store.get_account_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Money::from_cents(250));
        assert_eq!(stored.last_login, Some(1_700_000_000_000));
        assert!(store.update_balance(999, Money::ZERO).await.is_err());

        let mut state = GameState {
            account_id: account.id,
            game_id: "egyptian-treasures".to_string(),
            reels: ReelGrid(vec![vec![1, 2, 3, 4]; 5]),
            bet: 1.0,
            coin_value: 0.01,
        };
        store.update_game_state(&state).await.unwrap();
        state.bet = 3.0;
        state.reels = ReelGrid(vec![vec![9, 9, 9, 9]; 5]);
        store.update_game_state(&state).await.unwrap();

        let stored = store.get_game_state(account.id, "egyptian-treasures").await.unwrap();
        assert_eq!(stored, Some(state));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_login_stamps_never_clobber_commits() {
        let (_dir, store) = open_temp();
        let store = Arc::new(store);
        let account_id = store.create_account("Guest", Money::from_cents(10_000), "k").await.unwrap().id;
        let state = GameState {
            account_id,
            game_id: "rock-climber".to_string(),
            reels: ReelGrid(vec![vec![1, 2, 3, 4]; 5]),
            bet: 1.0,
            coin_value: 0.01,
        };

        // Commits land in order, as they do under the account lock; logins race them
        let committer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 1..=200 {
                    store
                        .commit_wager(account_id, Money::from_cents(10_000 - 10 * i), &state)
                        .await
                        .unwrap();
                }
            })
        };
        let logins: Vec<_> = (0..200)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.record_login(account_id, i).await.unwrap() })
            })
            .collect();

        committer.await.unwrap();
        for login in logins {
            login.await.unwrap();
        }

        let stored = store.get_account_by_id(account_id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Money::from_cents(8_000));
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            data_directory: dir.path().join("db").to_string_lossy().to_string(),
            ..Default::default()
        };

        {
            let store = RocksStore::open(&config).unwrap();
            store.create_account("Guest", Money::from_cents(4242), "persist").await.unwrap();
            store.close().await.unwrap();
        }

        let reopened = RocksStore::open(&config).unwrap();
        let account = reopened.get_account("persist").await.unwrap().unwrap();
        assert_eq!(account.balance, Money::from_cents(4242));

        // Counter continues after restart
        let next = reopened.create_account("Guest", Money::ZERO, "second").await.unwrap();
        assert_eq!(next.id, account.id + 1);
    }
}
