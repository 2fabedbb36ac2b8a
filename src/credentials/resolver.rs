//! Credential resolution
//!
//! Maps a logical (user, platform) pair to a valid access token,
//! refreshing ahead of expiry. Refreshes for the same pair are
//! serialized on a per-key lock with a re-check after acquisition, so
//! two concurrent publishes produce exactly one token-endpoint call.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::PlatformRegistry;
use crate::core::{Credential, PlatformId, PublishError};
use crate::credentials::TokenRefresher;
use crate::storage::CredentialStore;

/// Refresh tokens expiring within this window ahead of time
const DEFAULT_REFRESH_WINDOW_DAYS: i64 = 3;

pub struct CredentialResolver {
    registry: Arc<PlatformRegistry>,
    store: Arc<dyn CredentialStore>,
    refresher: TokenRefresher,
    refresh_window: chrono::Duration,
    inflight: Mutex<HashMap<(String, PlatformId), Arc<Mutex<()>>>>,
}

impl CredentialResolver {
    pub fn new(registry: Arc<PlatformRegistry>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            registry,
            store,
            refresher: TokenRefresher::new(),
            refresh_window: chrono::Duration::days(DEFAULT_REFRESH_WINDOW_DAYS),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_refresh_window(mut self, window: chrono::Duration) -> Self {
        self.refresh_window = window;
        self
    }

    /// Resolve a valid, non-expired credential, refreshing if imminent
    pub async fn resolve(
        &self,
        user_id: &str,
        platform: PlatformId,
    ) -> Result<Credential, PublishError> {
        let credential = self
            .store
            .get(user_id, platform)
            .await?
            .ok_or_else(|| not_connected(platform))?;

        if !credential.expires_within(self.refresh_window) {
            return Ok(credential);
        }

        self.refresh_serialized(user_id, platform, None).await
    }

    /// Unconditional refresh after a 401, skipped when another caller
    /// already rotated the token we saw fail
    pub async fn force_refresh(
        &self,
        user_id: &str,
        platform: PlatformId,
        stale_token: &str,
    ) -> Result<Credential, PublishError> {
        self.refresh_serialized(user_id, platform, Some(stale_token))
            .await
    }

    /// Remove the stored credential on explicit disconnect
    pub async fn disconnect(
        &self,
        user_id: &str,
        platform: PlatformId,
    ) -> Result<bool, PublishError> {
        tracing::info!("[Credentials] disconnecting {} for user {}", platform, user_id);
        self.store.delete(user_id, platform).await
    }

    async fn refresh_serialized(
        &self,
        user_id: &str,
        platform: PlatformId,
        stale_token: Option<&str>,
    ) -> Result<Credential, PublishError> {
        let key_lock = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry((user_id.to_string(), platform))
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = key_lock.lock().await;

        // Re-read under the lock: a concurrent caller may have already
        // refreshed while we waited.
        let current = self
            .store
            .get(user_id, platform)
            .await?
            .ok_or_else(|| not_connected(platform))?;

        let already_fresh = match stale_token {
            Some(stale) => current.access_token != stale,
            None => !current.expires_within(self.refresh_window),
        };
        if already_fresh {
            return Ok(current);
        }

        let config = self.registry.get(platform).ok_or_else(|| {
            PublishError::InvalidInput(format!("no configuration for {platform}"))
        })?;

        tracing::info!("[Refresh] refreshing {} token for user {}", platform, user_id);
        let refreshed = self.refresher.refresh(config, &current).await?;
        self.store.put(&refreshed).await?;
        tracing::info!(
            "[Refresh] {} token for user {} now expires at {}",
            platform,
            user_id,
            refreshed.expires_at
        );
        Ok(refreshed)
    }
}

fn not_connected(platform: PlatformId) -> PublishError {
    PublishError::ReauthRequired(format!(
        "no credential stored for {platform}; connect the account first"
    ))
}
