//! Payline evaluation: run-length matching of each payline against a grid.

use crate::games::types::{GameConfig, LineCandidate, PaylineMask, ReelGrid, Symbol, MIN_PAYING_RUN};

/// Symbols under the active cells of `mask`, in scoring order.
///
/// Cells outside the grid end the sequence; a validated catalog never
/// produces them for a grid drawn from the same config.
pub fn line_symbols(grid: &ReelGrid, mask: &PaylineMask) -> Vec<Symbol> {
    mask.active_cells()
        .map_while(|(reel, row)| grid.symbol_at(reel, row))
        .collect()
}

/// Length of the run of `symbols[0]` starting at index 0
pub fn leading_run(symbols: &[Symbol]) -> usize {
    match symbols.first() {
        Some(&first) => symbols.iter().take_while(|&&s| s == first).count(),
        None => 0,
    }
}

/// Score a single payline. `number` is the 1-based line number.
pub fn evaluate_line(grid: &ReelGrid, mask: &PaylineMask, number: usize) -> Option<LineCandidate> {
    let symbols = line_symbols(grid, mask);
    let count = leading_run(&symbols);
    if count < MIN_PAYING_RUN {
        return None;
    }

    Some(LineCandidate {
        number,
        symbol: symbols[0],
        count,
        mask: mask.clone(),
    })
}

/// Every qualifying payline of `config`, in payline order.
///
/// Lines are independent; several may pay on the same grid.
pub fn evaluate(grid: &ReelGrid, config: &GameConfig) -> Vec<LineCandidate> {
    config
        .paylines
        .iter()
        .enumerate()
        .filter_map(|(index, mask)| evaluate_line(grid, mask, index + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn straight(row: usize, reels: usize, rows: usize) -> PaylineMask {
        PaylineMask(
            (0..reels)
                .map(|_| (0..rows).map(|r| u8::from(r == row)).collect())
                .collect(),
        )
    }

    fn config_with(paylines: Vec<PaylineMask>) -> GameConfig {
        GameConfig {
            id: "test".to_string(),
            reels_count: 5,
            reel_positions: 3,
            symbols_count: 9,
            paylines,
            multipliers: (1..=9).map(|s| (s, vec![1.0, 2.0, 3.0])).collect::<HashMap<_, _>>(),
            default_bet: 1.0,
            default_coin_value: 0.01,
        }
    }

    /// Grid whose row `row` reads `line` left to right, everything else filler
    fn grid_with_row(row: usize, line: [Symbol; 5]) -> ReelGrid {
        ReelGrid(
            line.iter()
                .enumerate()
                .map(|(reel, &s)| {
                    (0..4)
                        .map(|r| if r == row { s } else { 9 - (reel as Symbol % 2) - r as Symbol })
                        .collect()
                })
                .collect(),
        )
    }

    #[test]
    fn test_leading_run() {
        assert_eq!(leading_run(&[3, 3, 3, 7, 2]), 3);
        assert_eq!(leading_run(&[3, 3, 7, 3, 3]), 2);
        assert_eq!(leading_run(&[5, 5, 5, 5, 5]), 5);
        assert_eq!(leading_run(&[]), 0);
    }

    #[test]
    fn test_three_of_a_kind_qualifies() {
        let mask = straight(1, 5, 3);
        let grid = grid_with_row(1, [3, 3, 3, 7, 2]);

        let candidate = evaluate_line(&grid, &mask, 1).expect("line should pay");
        assert_eq!(candidate.symbol, 3);
        assert_eq!(candidate.count, 3);
        assert_eq!(candidate.number, 1);
    }

    #[test]
    fn test_run_stops_at_first_mismatch() {
        // Matching symbols after a gap do not extend the run
        let mask = straight(0, 5, 3);
        let grid = grid_with_row(0, [4, 4, 1, 4, 4]);
        assert!(evaluate_line(&grid, &mask, 1).is_none());
    }

    #[test]
    fn test_multiple_lines_pay_independently() {
        let config = config_with(vec![straight(0, 5, 3), straight(1, 5, 3), straight(2, 5, 3)]);
        let grid = ReelGrid(vec![
            vec![2, 6, 5, 1],
            vec![2, 6, 5, 1],
            vec![2, 6, 5, 1],
            vec![2, 6, 4, 1],
            vec![3, 6, 4, 1],
        ]);

        let lines = evaluate(&grid, &config);
        let summary: Vec<_> = lines.iter().map(|l| (l.number, l.symbol, l.count)).collect();
        assert_eq!(summary, vec![(1, 2, 4), (2, 6, 5), (3, 5, 3)]);
    }

    #[test]
    fn test_scroll_row_ignored_unless_masked() {
        // Row 3 is the scroll row; five 8s there must not pay on row 0
        let config = config_with(vec![straight(0, 5, 3)]);
        let grid = ReelGrid(vec![vec![1, 2, 3, 8], vec![2, 3, 1, 8], vec![1, 2, 3, 8], vec![2, 1, 3, 8], vec![1, 2, 3, 8]]);
        assert!(evaluate(&grid, &config).is_empty());
    }

    #[test]
    fn test_mask_row_order_within_reel() {
        // Two active cells on reel 0 are read top to bottom before reel 1
        let mask = PaylineMask(vec![vec![1, 1, 0], vec![1, 0, 0], vec![0, 0, 1]]);
        let grid = ReelGrid(vec![vec![7, 7, 1, 1], vec![7, 2, 2, 2], vec![3, 3, 4, 3]]);

        assert_eq!(line_symbols(&grid, &mask), vec![7, 7, 7, 4]);
        let candidate = evaluate_line(&grid, &mask, 9).unwrap();
        assert_eq!((candidate.number, candidate.count), (9, 3));
    }
}
