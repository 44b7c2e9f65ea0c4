//! Reelhouse - slot-machine wagering backend
//!
//! Draws reel grids, scores paylines, prices wins and settles each bet
//! against the player's balance in one atomic commit. Clients talk to it
//! over a WebSocket session channel (see [`api`]).

pub mod api;
pub mod casino;
pub mod config;
pub mod errors;
pub mod games;
pub mod money;
pub mod session;
pub mod storage;
pub mod wager;

pub use casino::CasinoService;
pub use errors::{CasinoError, CasinoResult};
pub use money::Money;
