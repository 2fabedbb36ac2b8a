//! Token refresh against each platform's token endpoint
//!
//! Refresh shapes differ per platform: TikTok takes a JSON body and
//! answers inside a `data` envelope, Google takes a form body and
//! answers flat, Instagram refreshes its long-lived token with a GET.

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::PlatformConfig;
use crate::core::{Credential, PlatformId, PublishError};

/// Seconds a refreshed token lives when the platform omits expires_in
const TIKTOK_DEFAULT_EXPIRY_SECS: i64 = 7200;
const GOOGLE_DEFAULT_EXPIRY_SECS: i64 = 3600;

pub struct TokenRefresher {
    client: Client,
}

impl Default for TokenRefresher {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenRefresher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    /// Exchange the stored refresh token for a fresh credential
    ///
    /// Any refusal from the token endpoint means the grant itself is
    /// gone and the user must re-run the consent flow, so every
    /// failure surfaces as `ReauthRequired`.
    pub async fn refresh(
        &self,
        config: &PlatformConfig,
        credential: &Credential,
    ) -> Result<Credential, PublishError> {
        match credential.platform {
            PlatformId::TikTok => self.refresh_tiktok(config, credential).await,
            PlatformId::YouTube => self.refresh_google(config, credential).await,
            PlatformId::Instagram => self.refresh_instagram(config, credential).await,
        }
    }

    async fn refresh_tiktok(
        &self,
        config: &PlatformConfig,
        credential: &Credential,
    ) -> Result<Credential, PublishError> {
        let refresh_token = require_refresh_token(credential)?;
        let body = json!({
            "client_key": config.oauth.client_id,
            "client_secret": config.oauth.client_secret,
            "refresh_token": refresh_token,
            "grant_type": "refresh_token",
        });

        let response = self
            .client
            .post(&config.token_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::ReauthRequired(format!("token endpoint unreachable: {e}")))?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(PublishError::ReauthRequired(format!(
                "refresh rejected: HTTP {status}: {text}"
            )));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| PublishError::ReauthRequired(format!("unparseable refresh response: {e}")))?;
        let data = value
            .get("data")
            .ok_or_else(|| PublishError::ReauthRequired("missing data in refresh response".to_string()))?;
        let access_token = data
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PublishError::ReauthRequired("missing access_token in refresh response".to_string())
            })?;
        let expires_in = data
            .get("expires_in")
            .and_then(Value::as_i64)
            .unwrap_or(TIKTOK_DEFAULT_EXPIRY_SECS);
        // TikTok may rotate the refresh token; keep the old one otherwise
        let new_refresh = data
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| credential.refresh_token.clone());

        Ok(Credential {
            access_token: access_token.to_string(),
            refresh_token: new_refresh,
            expires_at: Utc::now() + Duration::seconds(expires_in),
            ..credential.clone()
        })
    }

    async fn refresh_google(
        &self,
        config: &PlatformConfig,
        credential: &Credential,
    ) -> Result<Credential, PublishError> {
        let refresh_token = require_refresh_token(credential)?;
        let form = [
            ("client_id", config.oauth.client_id.as_str()),
            ("client_secret", config.oauth.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| PublishError::ReauthRequired(format!("token endpoint unreachable: {e}")))?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(PublishError::ReauthRequired(format!(
                "refresh rejected: HTTP {status}: {text}"
            )));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| PublishError::ReauthRequired(format!("unparseable refresh response: {e}")))?;
        let access_token = value
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PublishError::ReauthRequired("missing access_token in refresh response".to_string())
            })?;
        let expires_in = value
            .get("expires_in")
            .and_then(Value::as_i64)
            .unwrap_or(GOOGLE_DEFAULT_EXPIRY_SECS);

        // Google does not return a new refresh token on refresh grants
        Ok(Credential {
            access_token: access_token.to_string(),
            expires_at: Utc::now() + Duration::seconds(expires_in),
            ..credential.clone()
        })
    }

    async fn refresh_instagram(
        &self,
        config: &PlatformConfig,
        credential: &Credential,
    ) -> Result<Credential, PublishError> {
        // Long-lived tokens refresh against themselves, no client secret
        let url = format!(
            "{}?grant_type=ig_refresh_token&access_token={}",
            config.token_url,
            urlencoding::encode(&credential.access_token),
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PublishError::ReauthRequired(format!("token endpoint unreachable: {e}")))?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(PublishError::ReauthRequired(format!(
                "refresh rejected: HTTP {status}: {text}"
            )));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| PublishError::ReauthRequired(format!("unparseable refresh response: {e}")))?;
        let access_token = value
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PublishError::ReauthRequired("missing access_token in refresh response".to_string())
            })?;
        let expires_in = value
            .get("expires_in")
            .and_then(Value::as_i64)
            .unwrap_or(TIKTOK_DEFAULT_EXPIRY_SECS);

        Ok(Credential {
            access_token: access_token.to_string(),
            expires_at: Utc::now() + Duration::seconds(expires_in),
            ..credential.clone()
        })
    }
}

fn require_refresh_token(credential: &Credential) -> Result<&str, PublishError> {
    credential
        .refresh_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            PublishError::ReauthRequired("no refresh token stored for this account".to_string())
        })
}
