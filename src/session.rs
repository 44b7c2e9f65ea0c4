//! Session gateway: resolves client keys to accounts and issues guests.

use crate::config::SessionConfig;
use crate::errors::{CasinoError, CasinoResult};
use crate::storage::{Account, AccountStore};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Length of an issued session key, in hex characters
pub const SESSION_KEY_LEN: usize = 32;

/// Fresh opaque session key: the leading hex digits of sha256 over a v4 uuid
pub fn generate_key() -> String {
    let digest = Sha256::digest(Uuid::new_v4().as_bytes());
    let mut key = hex::encode(digest);
    key.truncate(SESSION_KEY_LEN);
    key
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct SessionGateway<S: AccountStore + ?Sized> {
    store: Arc<S>,
    config: SessionConfig,
}

impl<S: AccountStore + ?Sized> SessionGateway<S> {
    pub fn new(store: Arc<S>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// Log a client in.
    ///
    /// `None` issues a new guest. A known key returns its account with
    /// `last_login` refreshed. An unknown key gets a new guest or `NotFound`,
    /// depending on `create_on_unknown_key`.
    pub async fn login(&self, key: Option<&str>) -> CasinoResult<Account> {
        let key = match key {
            Some(key) if !key.is_empty() => key,
            _ => return self.create_guest().await,
        };

        match self.store.get_account(key).await? {
            Some(mut account) => {
                let now = now_millis();
                self.store.record_login(account.id, now).await?;
                account.last_login = Some(now);
                debug!(account_id = account.id, "Account logged in");
                Ok(account)
            }
            None if self.config.create_on_unknown_key => {
                debug!("Unknown session key, issuing a new guest");
                self.create_guest().await
            }
            None => Err(CasinoError::NotFound(format!("no account for key {}", key))),
        }
    }

    /// Account for an existing key
    pub async fn resolve(&self, key: &str) -> CasinoResult<Account> {
        self.store
            .get_account(key)
            .await?
            .ok_or_else(|| CasinoError::NotFound(format!("no account for key {}", key)))
    }

    async fn create_guest(&self) -> CasinoResult<Account> {
        let mut account = self
            .store
            .create_account(&self.config.guest_username, self.config.starting_balance, &generate_key())
            .await?;

        let now = now_millis();
        self.store.record_login(account.id, now).await?;
        account.last_login = Some(now);

        info!(account_id = account.id, balance = %account.balance, "Created guest account");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::storage::MemoryStore;

    fn gateway(create_on_unknown_key: bool) -> (Arc<MemoryStore>, SessionGateway<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config = SessionConfig {
            create_on_unknown_key,
            ..Default::default()
        };
        (store.clone(), SessionGateway::new(store, config))
    }

    #[test]
    fn test_generated_keys_are_hex_and_distinct() {
        let a = generate_key();
        let b = generate_key();
        assert_eq!(a.len(), SESSION_KEY_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_null_key_creates_guest() {
        let (store, gateway) = gateway(true);
        let account = gateway.login(None).await.unwrap();

        assert_eq!(account.username, "Guest");
        assert_eq!(account.balance, Money::from_cents(1_000_000));
        assert!(account.last_login.is_some());
        assert_eq!(store.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_known_key_returns_same_account() {
        let (store, gateway) = gateway(true);
        let guest = gateway.login(None).await.unwrap();
        let again = gateway.login(Some(&guest.key)).await.unwrap();

        assert_eq!(again.id, guest.id);
        assert_eq!(again.key, guest.key);
        assert_eq!(store.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_key_policy() {
        let (store, lenient) = gateway(true);
        let issued = lenient.login(Some("not-a-key")).await.unwrap();
        assert_ne!(issued.key, "not-a-key");
        assert_eq!(store.account_count().await, 1);

        let (_, strict) = gateway(false);
        let err = strict.login(Some("not-a-key")).await.unwrap_err();
        assert!(matches!(err, CasinoError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_unknown_is_not_found() {
        let (_, gateway) = gateway(true);
        assert!(matches!(gateway.resolve("nope").await, Err(CasinoError::NotFound(_))));
    }
}
