//! Line pricing: `amount = round(bet_amount * multiplier[symbol][count - 3], 2)`.
//!
//! Runs longer than a symbol's table are clamped to the last entry.

use crate::errors::{CasinoError, CasinoResult, ConfigurationError};
use crate::games::types::{GameConfig, LineCandidate, LineResult, Symbol, MIN_PAYING_RUN};
use crate::money::Money;

/// Multiplier for a run of `count` symbols, clamped to the table's range
pub fn multiplier_for(config: &GameConfig, symbol: Symbol, count: usize) -> Option<f64> {
    let table = config.multipliers.get(&symbol)?;
    let index = count.checked_sub(MIN_PAYING_RUN)?;
    table.get(index.min(table.len().checked_sub(1)?)).copied()
}

/// Price one qualifying line
pub fn payout(candidate: &LineCandidate, bet_amount: Money, config: &GameConfig) -> CasinoResult<Money> {
    let multiplier = multiplier_for(config, candidate.symbol, candidate.count).ok_or_else(|| {
        CasinoError::Configuration(ConfigurationError::InvalidCatalog(format!(
            "game '{}' has no multiplier for symbol {} x{}",
            config.id, candidate.symbol, candidate.count
        )))
    })?;

    bet_amount.scale(multiplier).ok_or_else(|| {
        CasinoError::InvalidWager(format!(
            "payout overflow for line {} ({} x {})",
            candidate.number, bet_amount, multiplier
        ))
    })
}

/// Price every candidate, keeping payline order
pub fn price_lines(
    candidates: Vec<LineCandidate>,
    bet_amount: Money,
    config: &GameConfig,
) -> CasinoResult<Vec<LineResult>> {
    candidates
        .into_iter()
        .map(|candidate| {
            let amount = payout(&candidate, bet_amount, config)?;
            Ok(LineResult {
                number: candidate.number,
                symbol: candidate.symbol,
                count: candidate.count,
                mask: candidate.mask,
                amount,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::PaylineMask;
    use std::collections::HashMap;

    fn config() -> GameConfig {
        let mut multipliers = HashMap::new();
        multipliers.insert(3, vec![5.0, 10.0]);
        multipliers.insert(4, vec![0.5, 1.0, 2.5]);
        GameConfig {
            id: "test".to_string(),
            reels_count: 5,
            reel_positions: 3,
            symbols_count: 4,
            paylines: vec![],
            multipliers,
            default_bet: 1.0,
            default_coin_value: 0.01,
        }
    }

    fn candidate(symbol: Symbol, count: usize) -> LineCandidate {
        LineCandidate {
            number: 1,
            symbol,
            count,
            mask: PaylineMask(vec![vec![1]; 5]),
        }
    }

    #[test]
    fn test_documented_example_amount() {
        // bet=1, coin=0.01 -> 0.10; three 3s at x5 -> 0.50
        let amount = payout(&candidate(3, 3), Money::from_cents(10), &config()).unwrap();
        assert_eq!(amount, Money::from_cents(50));
    }

    #[test]
    fn test_rounds_to_cents() {
        // 0.15 * 0.5 = 0.075 -> 0.08
        let amount = payout(&candidate(4, 3), Money::from_cents(15), &config()).unwrap();
        assert_eq!(amount, Money::from_cents(8));
    }

    #[test]
    fn test_long_run_clamps_to_last_entry() {
        assert_eq!(multiplier_for(&config(), 3, 4), Some(10.0));
        assert_eq!(multiplier_for(&config(), 3, 5), Some(10.0));
        assert_eq!(multiplier_for(&config(), 4, 5), Some(2.5));
    }

    #[test]
    fn test_missing_table_is_an_error() {
        assert_eq!(multiplier_for(&config(), 1, 3), None);
        assert!(payout(&candidate(1, 3), Money::from_cents(10), &config()).is_err());
    }

    #[test]
    fn test_price_lines_keeps_order_and_totals() {
        let mut second = candidate(4, 5);
        second.number = 7;
        let lines = price_lines(vec![candidate(3, 3), second], Money::from_cents(100), &config()).unwrap();

        assert_eq!(lines.iter().map(|l| l.number).collect::<Vec<_>>(), vec![1, 7]);
        let total: Money = lines.iter().map(|l| l.amount).sum();
        assert_eq!(total, Money::from_cents(500 + 250));
    }
}
