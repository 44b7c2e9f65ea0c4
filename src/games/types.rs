use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Symbol id, always in `1..=symbols_count`
pub type Symbol = u32;

/// Shortest run that pays
pub const MIN_PAYING_RUN: usize = 3;

/// Reel-major symbol matrix: `reels[reel][row]`.
///
/// Each reel carries `reel_positions + 1` rows; the extra row only exists so
/// the client can animate a scroll. Paylines decide which rows are scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReelGrid(pub Vec<Vec<Symbol>>);

impl ReelGrid {
    pub fn reels(&self) -> &[Vec<Symbol>] {
        &self.0
    }

    pub fn symbol_at(&self, reel: usize, row: usize) -> Option<Symbol> {
        self.0.get(reel).and_then(|r| r.get(row)).copied()
    }
}

/// Boolean mask over the grid marking the cells of one payline.
///
/// Stored reel-major like the grid, with `1` for an active cell. The wire
/// format keeps the raw 0/1 matrix so clients can draw the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaylineMask(pub Vec<Vec<u8>>);

impl PaylineMask {
    /// Active cells as `(reel, row)`, left to right by reel, then by row
    pub fn active_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.iter().enumerate().flat_map(|(reel, rows)| {
            rows.iter()
                .enumerate()
                .filter(|(_, cell)| **cell == 1)
                .map(move |(row, _)| (reel, row))
        })
    }
}

/// Immutable per-game configuration, validated by the catalog on load
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub id: String,
    pub reels_count: usize,
    /// Visible rows per reel
    pub reel_positions: usize,
    pub symbols_count: u32,
    /// Line number of a payline is its 1-based position in this list
    pub paylines: Vec<PaylineMask>,
    /// symbol -> multipliers indexed by `count - 3`; never empty
    pub multipliers: HashMap<Symbol, Vec<f64>>,
    pub default_bet: f64,
    pub default_coin_value: f64,
}

impl GameConfig {
    /// Rows drawn per reel, including the scroll row
    pub fn rows_per_reel(&self) -> usize {
        self.reel_positions + 1
    }
}

/// A payline that qualified, before it is priced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineCandidate {
    /// 1-based payline number
    pub number: usize,
    pub symbol: Symbol,
    pub count: usize,
    pub mask: PaylineMask,
}

/// A paying line as reported to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineResult {
    pub number: usize,
    pub symbol: Symbol,
    pub count: usize,
    #[serde(rename = "map")]
    pub mask: PaylineMask,
    pub amount: Money,
}

/// Outcome of one spin: the grid and every paying line
#[derive(Debug, Clone, PartialEq)]
pub struct BetResult {
    pub grid: ReelGrid,
    pub lines: Vec<LineResult>,
}

impl BetResult {
    pub fn total_win(&self) -> Money {
        self.lines.iter().map(|line| line.amount).sum()
    }

    pub fn is_win(&self) -> bool {
        !self.lines.is_empty()
    }
}

/// Persisted reel and stake settings for one (account, game) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub account_id: u64,
    pub game_id: String,
    pub reels: ReelGrid,
    pub bet: f64,
    pub coin_value: f64,
}

impl GameState {
    /// Fresh state for a pair that has never been seen
    pub fn initial(account_id: u64, config: &GameConfig, reels: ReelGrid) -> Self {
        Self {
            account_id,
            game_id: config.id.clone(),
            reels,
            bet: config.default_bet,
            coin_value: config.default_coin_value,
        }
    }
}
