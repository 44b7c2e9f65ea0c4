//! Request Handlers
//!
//! One async function per client operation. Each returns the reply envelope,
//! success or `<event>-error`.

use super::{
    errors::{operation_error, ProtocolError},
    models::*,
    websocket::SessionHub,
};
use crate::casino::CasinoService;
use crate::errors::CasinoError;
use crate::wager::WagerRequest;
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub hub: Arc<SessionHub>,
}

/// Health check handler
/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

fn payload<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|e| ProtocolError::InvalidPayload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

/// Route one decoded envelope to its operation
pub async fn dispatch(service: &CasinoService, envelope: Envelope) -> Envelope {
    let Envelope { event, data } = envelope;
    let reply = match event.as_str() {
        LOGIN => login(service, data).await,
        BALANCE => balance(service, data).await,
        GAMESTATE => gamestate(service, data).await,
        BET => bet(service, data).await,
        _ => Err(ProtocolError::UnknownEvent(event.clone())),
    };
    reply.unwrap_or_else(ProtocolError::into_envelope)
}

/// login {key: string | null}
async fn login(service: &CasinoService, data: Value) -> Result<Envelope, ProtocolError> {
    let request: LoginRequest = if data.is_null() {
        LoginRequest::default()
    } else {
        payload(LOGIN, data)?
    };

    Ok(match service.login(request.key.as_deref()).await {
        Ok(account) => Envelope::new(LOGIN, LoginResponse::from(account)),
        Err(e) => operation_error(LOGIN, &e),
    })
}

/// balance {key}
async fn balance(service: &CasinoService, data: Value) -> Result<Envelope, ProtocolError> {
    let request: BalanceRequest = payload(BALANCE, data)?;
    Ok(match service.balance(&request.key).await {
        Ok(balance) => Envelope::new(BALANCE, balance),
        Err(e) => operation_error(BALANCE, &e),
    })
}

/// gamestate {key, gameId}
async fn gamestate(service: &CasinoService, data: Value) -> Result<Envelope, ProtocolError> {
    let request: GameStateRequest = payload(GAMESTATE, data)?;
    Ok(match service.game_state(&request.key, &request.game_id).await {
        Ok(view) => Envelope::new(GAMESTATE, view),
        Err(e) => operation_error(GAMESTATE, &e),
    })
}

/// bet {key, gameId, bet, coinValue}
async fn bet(service: &CasinoService, data: Value) -> Result<Envelope, ProtocolError> {
    let request: BetRequest = payload(BET, data)?;

    let (Some(bet), Some(coin_value)) = (wire_number(&request.bet), wire_number(&request.coin_value)) else {
        let err = CasinoError::InvalidWager(format!(
            "non-numeric bet {} / coin value {}",
            request.bet, request.coin_value
        ));
        return Ok(operation_error(BET, &err));
    };

    let wager = WagerRequest {
        game_id: request.game_id,
        bet,
        coin_value,
    };
    Ok(match service.bet(&request.key, wager).await {
        Ok(receipt) => Envelope::new(BET, receipt),
        Err(e) => operation_error(BET, &e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CasinoConfig;
    use crate::games::{GameCatalog, ReelGenerator};
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn service() -> CasinoService {
        service_on(Arc::new(MemoryStore::new()))
    }

    fn service_on(store: Arc<MemoryStore>) -> CasinoService {
        CasinoService::new(
            store,
            Arc::new(GameCatalog::embedded().unwrap()),
            Arc::new(ReelGenerator::seeded(11)),
            &CasinoConfig::default(),
        )
    }

    fn frame(event: &str, data: Value) -> Envelope {
        Envelope {
            event: event.to_string(),
            data,
        }
    }

    async fn guest_key(service: &CasinoService) -> String {
        let reply = dispatch(service, frame("login", Value::Null)).await;
        assert_eq!(reply.event, "login");
        assert_eq!(reply.data["status"], "logged-in");
        assert_eq!(reply.data["username"], "Guest");
        assert_eq!(reply.data["balance"], json!(10000.0));
        reply.data["key"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_login_then_balance() {
        let service = service();
        let key = guest_key(&service).await;

        let reply = dispatch(&service, frame("balance", json!({ "key": key }))).await;
        assert_eq!(reply, Envelope::new("balance", 10000.0));
    }

    #[tokio::test]
    async fn test_gamestate_shape() {
        let service = service();
        let key = guest_key(&service).await;

        let reply = dispatch(&service, frame("gamestate", json!({"key": key, "gameId": "rock-climber"}))).await;
        assert_eq!(reply.event, "gamestate");
        assert_eq!(reply.data["bet"], json!(1.0));
        assert_eq!(reply.data["coinValue"], json!(0.01));
        assert_eq!(reply.data["reels"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_bet_accepts_string_numbers() {
        let service = service();
        let key = guest_key(&service).await;

        let reply = dispatch(
            &service,
            frame("bet", json!({"key": key, "gameId": "rock-climber", "bet": "1", "coinValue": "0.01"})),
        )
        .await;
        assert_eq!(reply.event, "bet");
        assert!(reply.data["isWin"].is_boolean());
        assert!(reply.data["win"].is_array());
    }

    #[tokio::test]
    async fn test_bet_errors() {
        let service = service();
        let key = guest_key(&service).await;

        let reply = dispatch(
            &service,
            frame("bet", json!({"key": key, "gameId": "rock-climber", "bet": "abc", "coinValue": 0.01})),
        )
        .await;
        assert_eq!(reply, Envelope::error_for("bet", "Invalid bet or coin value."));

        let reply = dispatch(
            &service,
            frame("bet", json!({"key": key, "gameId": "rock-climber", "bet": 1e9, "coinValue": 1})),
        )
        .await;
        assert_eq!(reply, Envelope::error_for("bet", "Insufficient balance."));

        let reply = dispatch(
            &service,
            frame("bet", json!({"key": key, "gameId": "nope", "bet": 1, "coinValue": 0.01})),
        )
        .await;
        assert_eq!(reply, Envelope::error_for("bet", "Unknown game 'nope'."));
    }

    #[tokio::test]
    async fn test_unknown_key_and_event() {
        let service = service();

        let reply = dispatch(&service, frame("balance", json!({"key": "ghost"}))).await;
        assert_eq!(reply, Envelope::error_for("balance", "Account not found."));

        let reply = dispatch(&service, frame("spin", json!({}))).await;
        assert_eq!(reply.event, "error");

        let reply = dispatch(&service, frame("gamestate", json!({"key": 5}))).await;
        assert_eq!(reply.event, "gamestate-error");
    }

    #[tokio::test]
    async fn test_storage_read_failures_become_error_events() {
        let store = Arc::new(MemoryStore::new());
        let service = service_on(store.clone());
        let key = guest_key(&service).await;
        let unavailable = "Storage is unavailable, please retry.";

        store.fail_next_reads(1);
        let reply = dispatch(&service, frame("balance", json!({ "key": key }))).await;
        assert_eq!(reply, Envelope::error_for("balance", unavailable));

        store.fail_next_reads(1);
        let reply = dispatch(&service, frame("gamestate", json!({"key": key, "gameId": "rock-climber"}))).await;
        assert_eq!(reply, Envelope::error_for("gamestate", unavailable));

        store.fail_next_reads(1);
        let reply = dispatch(
            &service,
            frame("bet", json!({"key": key, "gameId": "rock-climber", "bet": 1, "coinValue": 0.01})),
        )
        .await;
        assert_eq!(reply, Envelope::error_for("bet", unavailable));

        // Nothing was settled; the next read goes through
        let reply = dispatch(&service, frame("balance", json!({ "key": key }))).await;
        assert_eq!(reply, Envelope::new("balance", 10000.0));
        assert_eq!(store.commit_count(), 0);
    }
}
