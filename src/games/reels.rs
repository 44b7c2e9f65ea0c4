//! Reel generation.
//!
//! `ReelSource` is the seam the wager pipeline draws through. Production uses
//! `ReelGenerator` over OS-seeded `StdRng`; tests inject a seeded generator or
//! `ScriptedReels` to pin the exact grid.

use crate::games::types::{GameConfig, ReelGrid};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Anything that can produce a grid for a game
pub trait ReelSource: Send + Sync {
    fn draw(&self, config: &GameConfig) -> ReelGrid;
}

/// Draw a grid from `rng`: every cell independently uniform in `1..=symbols_count`
pub fn draw_with<R: Rng + ?Sized>(rng: &mut R, config: &GameConfig) -> ReelGrid {
    let rows = config.rows_per_reel();
    let reels = (0..config.reels_count)
        .map(|_| (0..rows).map(|_| rng.gen_range(1..=config.symbols_count)).collect())
        .collect();
    ReelGrid(reels)
}

/// RNG-backed reel source
pub struct ReelGenerator {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl ReelGenerator {
    /// Non-deterministic generator for production
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible generator
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng<R: RngCore + Send + 'static>(rng: R) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }
}

impl Default for ReelGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl ReelSource for ReelGenerator {
    fn draw(&self, config: &GameConfig) -> ReelGrid {
        // A poisoned lock only means another draw panicked; the RNG itself is still usable
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        draw_with(&mut **rng, config)
    }
}

/// Replays a fixed sequence of grids, then falls back to an inner source
pub struct ScriptedReels {
    queue: Mutex<VecDeque<ReelGrid>>,
    fallback: ReelGenerator,
}

impl ScriptedReels {
    pub fn new(grids: impl IntoIterator<Item = ReelGrid>) -> Self {
        Self {
            queue: Mutex::new(grids.into_iter().collect()),
            fallback: ReelGenerator::seeded(0),
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

impl ReelSource for ScriptedReels {
    fn draw(&self, config: &GameConfig) -> ReelGrid {
        let next = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        next.unwrap_or_else(|| self.fallback.draw(config))
    }
}
