//! The four client operations, wired to storage, sessions and wagers.

use crate::config::CasinoConfig;
use crate::errors::{CasinoError, CasinoResult, StorageError};
use crate::games::{GameCatalog, ReelGenerator, ReelGrid, ReelSource};
use crate::money::Money;
use crate::session::SessionGateway;
use crate::storage::{self, Account, CasinoStore, SharedStore};
use crate::wager::{WagerProcessor, WagerReceipt, WagerRequest};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Snapshot returned by the `gamestate` operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub balance: Money,
    pub bet: f64,
    pub coin_value: f64,
    pub reels: ReelGrid,
}

pub struct CasinoService {
    store: SharedStore,
    sessions: SessionGateway<dyn CasinoStore>,
    wagers: Arc<WagerProcessor<dyn CasinoStore>>,
    timeout: Duration,
}

impl CasinoService {
    pub fn new(
        store: SharedStore,
        catalog: Arc<GameCatalog>,
        reels: Arc<dyn ReelSource>,
        config: &CasinoConfig,
    ) -> Self {
        Self {
            sessions: SessionGateway::new(store.clone(), config.session.clone()),
            wagers: Arc::new(WagerProcessor::new(store.clone(), catalog, reels)),
            store,
            timeout: config.wager.timeout(),
        }
    }

    /// Load the catalog and open storage as configured. Either failing is
    /// a startup error.
    pub fn from_config(config: &CasinoConfig) -> CasinoResult<Self> {
        let catalog = match config.games_path {
            Some(ref path) => GameCatalog::load(path)?,
            None => GameCatalog::embedded()?,
        };
        info!(games = ?catalog.ids(), "Game catalog loaded");

        let store = storage::open_store(&config.storage)?;
        Ok(Self::new(
            store,
            Arc::new(catalog),
            Arc::new(ReelGenerator::from_entropy()),
            config,
        ))
    }

    pub fn catalog(&self) -> &GameCatalog {
        self.wagers.catalog()
    }

    pub async fn login(&self, key: Option<&str>) -> CasinoResult<Account> {
        self.bounded(self.sessions.login(key)).await
    }

    pub async fn balance(&self, key: &str) -> CasinoResult<Money> {
        let account = self.bounded(self.sessions.resolve(key)).await?;
        Ok(account.balance)
    }

    pub async fn game_state(&self, key: &str, game_id: &str) -> CasinoResult<GameStateView> {
        let account = self.bounded(self.sessions.resolve(key)).await?;
        let (account, state) = self.bounded(self.wagers.game_state(account.id, game_id)).await?;
        Ok(GameStateView {
            balance: account.balance,
            bet: state.bet,
            coin_value: state.coin_value,
            reels: state.reels,
        })
    }

    /// Settle a bet. The settlement runs as its own task so that a caller
    /// giving up (disconnect, timeout) never interrupts a commit.
    pub async fn bet(&self, key: &str, request: WagerRequest) -> CasinoResult<WagerReceipt> {
        let account = self.bounded(self.sessions.resolve(key)).await?;

        let wagers = self.wagers.clone();
        let handle = tokio::spawn(async move { wagers.place_bet(account.id, &request).await });

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(joined) => joined.map_err(StorageError::from)?,
            Err(_) => Err(CasinoError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    /// Flush and release storage
    pub async fn shutdown(&self) -> CasinoResult<()> {
        self.store.close().await?;
        Ok(())
    }

    async fn bounded<T, F>(&self, operation: F) -> CasinoResult<T>
    where
        F: Future<Output = CasinoResult<T>>,
    {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| CasinoError::Timeout(self.timeout.as_millis() as u64))?
    }
}
