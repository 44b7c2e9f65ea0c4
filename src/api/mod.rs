//! Client-facing service
//!
//! WebSocket session channel carrying the login / balance / gamestate / bet
//! operations, plus a health check.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::{ApiConfig, ApiServer};
