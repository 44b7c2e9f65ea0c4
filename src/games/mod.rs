pub mod catalog;
pub mod paylines;
pub mod payout;
pub mod reels;
pub mod types;

pub use catalog::GameCatalog;
pub use reels::{ReelGenerator, ReelSource, ScriptedReels};
pub use types::*;

use crate::errors::CasinoResult;
use crate::money::Money;

/// Draw, evaluate and price one spin. Touches no stored state.
pub fn spin(source: &dyn ReelSource, config: &GameConfig, bet_amount: Money) -> CasinoResult<BetResult> {
    let grid = source.draw(config);
    let candidates = paylines::evaluate(&grid, config);
    let lines = payout::price_lines(candidates, bet_amount, config)?;
    Ok(BetResult { grid, lines })
}
