//! Wire Models
//!
//! Every WebSocket frame is a JSON envelope `{"event": ..., "data": ...}`.
//! Request payloads use the client's camelCase field names.

use crate::money::Money;
use crate::storage::Account;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client request event names
pub const LOGIN: &str = "login";
pub const BALANCE: &str = "balance";
pub const GAMESTATE: &str = "gamestate";
pub const BET: &str = "bet";

/// Reply event for frames that can't be attributed to an operation
pub const ERROR: &str = "error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: impl Serialize) -> Self {
        Self {
            event: event.into(),
            // Serializing our own payload types cannot fail
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    /// `<event>-error {message}`
    pub fn error_for(event: &str, message: impl Into<String>) -> Self {
        Self::new(
            format!("{}-error", event),
            ErrorPayload {
                message: message.into(),
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceRequest {
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateRequest {
    pub key: String,
    pub game_id: String,
}

/// `bet` and `coinValue` arrive as numbers or numeric strings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRequest {
    pub key: String,
    pub game_id: String,
    #[serde(default)]
    pub bet: Value,
    #[serde(default)]
    pub coin_value: Value,
}

/// Read a JSON number or numeric string. Anything else is `None`.
pub fn wire_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub status: String,
    pub key: String,
    pub username: String,
    pub balance: Money,
}

impl From<Account> for LoginResponse {
    fn from(account: Account) -> Self {
        Self {
            status: "logged-in".to_string(),
            key: account.key,
            username: account.username,
            balance: account.balance,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
