//! Wager settlement.
//!
//! A bet moves through `Idle -> Validating -> FundsChecked -> Resolved ->
//! Committed`, or ends in `Rejected`. Everything from the balance read to
//! the commit runs under the account's lock, so concurrent bets from one
//! account are linearized while different accounts proceed in parallel.

use crate::errors::{CasinoError, CasinoResult};
use crate::games::{self, GameCatalog, GameState, LineResult, ReelGrid, ReelSource};
use crate::money::Money;
use crate::storage::{get_or_create_game_state, Account, CasinoStore};
use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WagerState {
    Idle,
    Validating,
    FundsChecked,
    Resolved,
    Committed,
    Rejected,
}

impl fmt::Display for WagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WagerState::Idle => "idle",
            WagerState::Validating => "validating",
            WagerState::FundsChecked => "funds-checked",
            WagerState::Resolved => "resolved",
            WagerState::Committed => "committed",
            WagerState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// A bet as submitted by the client
#[derive(Debug, Clone, PartialEq)]
pub struct WagerRequest {
    pub game_id: String,
    pub bet: f64,
    pub coin_value: f64,
}

/// Settled bet, as reported back to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WagerReceipt {
    pub balance: Money,
    pub reels: ReelGrid,
    pub is_win: bool,
    pub win: Vec<LineResult>,
}

/// `round(bet * 10 * coin_value, 2)`, rejecting negative or non-finite input
pub fn stake_amount(bet: f64, coin_value: f64) -> CasinoResult<Money> {
    if !bet.is_finite() || bet < 0.0 {
        return Err(CasinoError::InvalidWager(format!("bet {} is not a non-negative number", bet)));
    }
    if !coin_value.is_finite() || coin_value < 0.0 {
        return Err(CasinoError::InvalidWager(format!(
            "coin value {} is not a non-negative number",
            coin_value
        )));
    }

    Money::round_from_f64(bet * 10.0 * coin_value)
        .filter(|amount| !amount.is_negative())
        .ok_or_else(|| CasinoError::InvalidWager(format!("bet amount out of range ({} x {})", bet, coin_value)))
}

/// One bet's progress through settlement
pub struct WagerTransaction<'a> {
    account_id: u64,
    request: &'a WagerRequest,
    state: WagerState,
}

impl<'a> WagerTransaction<'a> {
    pub fn new(account_id: u64, request: &'a WagerRequest) -> Self {
        Self {
            account_id,
            request,
            state: WagerState::Idle,
        }
    }

    pub fn state(&self) -> WagerState {
        self.state
    }

    fn advance(&mut self, next: WagerState) {
        debug!(
            account_id = self.account_id,
            game_id = %self.request.game_id,
            from = %self.state,
            to = %next,
            "Wager transition"
        );
        self.state = next;
    }

    fn validate(&mut self) -> CasinoResult<Money> {
        self.advance(WagerState::Validating);
        stake_amount(self.request.bet, self.request.coin_value)
    }

    fn check_funds(&mut self, account: &Account, bet_amount: Money) -> CasinoResult<()> {
        if account.balance < bet_amount {
            return Err(CasinoError::InsufficientFunds {
                balance: account.balance,
                required: bet_amount,
            });
        }
        self.advance(WagerState::FundsChecked);
        Ok(())
    }
}

/// Per-account critical sections
#[derive(Default)]
pub struct AccountLocks {
    locks: DashMap<u64, Arc<Mutex<()>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `account_id`
    pub async fn lock(&self, account_id: u64) -> OwnedMutexGuard<()> {
        // Clone the mutex out first so the shard guard is not held across the await
        let mutex = self.locks.entry(account_id).or_default().clone();
        mutex.lock_owned().await
    }
}

/// Runs wagers and game-state reads against a store
pub struct WagerProcessor<S: CasinoStore + ?Sized> {
    store: Arc<S>,
    catalog: Arc<GameCatalog>,
    reels: Arc<dyn ReelSource>,
    locks: AccountLocks,
}

impl<S: CasinoStore + ?Sized> WagerProcessor<S> {
    pub fn new(store: Arc<S>, catalog: Arc<GameCatalog>, reels: Arc<dyn ReelSource>) -> Self {
        Self {
            store,
            catalog,
            reels,
            locks: AccountLocks::new(),
        }
    }

    pub fn catalog(&self) -> &GameCatalog {
        &self.catalog
    }

    /// Settle one bet for `account_id`
    pub async fn place_bet(&self, account_id: u64, request: &WagerRequest) -> CasinoResult<WagerReceipt> {
        let mut tx = WagerTransaction::new(account_id, request);
        let result = self.settle(&mut tx).await;

        if let Err(ref e) = result {
            let failed_at = tx.state();
            tx.advance(WagerState::Rejected);
            warn!(
                account_id,
                game_id = %request.game_id,
                failed_at = %failed_at,
                code = e.code(),
                error = %e,
                "Wager rejected"
            );
        }
        result
    }

    async fn settle(&self, tx: &mut WagerTransaction<'_>) -> CasinoResult<WagerReceipt> {
        let bet_amount = tx.validate()?;
        let config = self.catalog.get(&tx.request.game_id)?;

        let _guard = self.locks.lock(tx.account_id).await;

        // Re-read under the lock; a concurrent bet may have just committed
        let account = self
            .store
            .get_account_by_id(tx.account_id)
            .await?
            .ok_or_else(|| CasinoError::NotFound(format!("account {}", tx.account_id)))?;
        tx.check_funds(&account, bet_amount)?;

        let outcome = games::spin(self.reels.as_ref(), &config, bet_amount)?;
        tx.advance(WagerState::Resolved);

        let total_win = outcome.total_win();
        let new_balance = account
            .balance
            .checked_sub(bet_amount)
            .and_then(|b| b.checked_add(total_win))
            .ok_or_else(|| CasinoError::InvalidWager("balance overflow".to_string()))?;

        let state = GameState {
            account_id: account.id,
            game_id: config.id.clone(),
            reels: outcome.grid.clone(),
            bet: tx.request.bet,
            coin_value: tx.request.coin_value,
        };
        self.store.commit_wager(account.id, new_balance, &state).await?;
        tx.advance(WagerState::Committed);

        info!(
            account_id = account.id,
            game_id = %config.id,
            bet_amount = %bet_amount,
            win = %total_win,
            balance = %new_balance,
            "Wager settled"
        );

        Ok(WagerReceipt {
            balance: new_balance,
            is_win: outcome.is_win(),
            reels: outcome.grid,
            win: outcome.lines,
        })
    }

    /// Current state for the pair, created on first access, with the account
    /// as of the same moment. Serialized with the account's wagers.
    pub async fn game_state(&self, account_id: u64, game_id: &str) -> CasinoResult<(Account, GameState)> {
        let config = self.catalog.get(game_id)?;
        let _guard = self.locks.lock(account_id).await;

        let account = self
            .store
            .get_account_by_id(account_id)
            .await?
            .ok_or_else(|| CasinoError::NotFound(format!("account {}", account_id)))?;
        let state = get_or_create_game_state(self.store.as_ref(), account_id, &config, self.reels.as_ref()).await?;
        Ok((account, state))
    }
}
