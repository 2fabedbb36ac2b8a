//! OAuth authorization URL building
//!
//! The code-for-token exchange happens in the caller's web layer; this
//! module only builds the consent redirect URL from configuration. The
//! `state` parameter carries the base64-encoded user id so the
//! callback can route the resulting tokens.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use url::Url;

use crate::config::PlatformConfig;
use crate::core::{PlatformId, PublishError};

/// Build the consent redirect URL for one platform
pub fn authorization_url(
    platform: PlatformId,
    config: &PlatformConfig,
    user_id: &str,
) -> Result<String, PublishError> {
    if !config.oauth.is_configured() {
        return Err(PublishError::InvalidInput(format!(
            "OAuth client not configured for {platform}"
        )));
    }

    let mut url = Url::parse(&config.authorize_url)
        .map_err(|e| PublishError::InvalidInput(format!("bad authorize URL: {e}")))?;
    let state = BASE64.encode(user_id);

    {
        let mut query = url.query_pairs_mut();
        match platform {
            PlatformId::TikTok => {
                query
                    .append_pair("client_key", &config.oauth.client_id)
                    .append_pair("redirect_uri", &config.oauth.redirect_uri)
                    .append_pair("scope", "user.info.basic")
                    .append_pair("response_type", "code")
                    .append_pair("state", &state);
            }
            PlatformId::YouTube => {
                query
                    .append_pair("client_id", &config.oauth.client_id)
                    .append_pair("redirect_uri", &config.oauth.redirect_uri)
                    .append_pair("response_type", "code")
                    .append_pair("scope", "https://www.googleapis.com/auth/youtube")
                    .append_pair("access_type", "offline")
                    .append_pair("prompt", "consent")
                    .append_pair("state", &state);
            }
            PlatformId::Instagram => {
                query
                    .append_pair("client_id", &config.oauth.client_id)
                    .append_pair("redirect_uri", &config.oauth.redirect_uri)
                    .append_pair("scope", "user_profile,user_media")
                    .append_pair("response_type", "code")
                    .append_pair("state", &state);
            }
        }
    }

    Ok(url.into())
}

/// Recover the user id from the `state` of an OAuth callback
pub fn user_id_from_state(state: &str) -> Result<String, PublishError> {
    let bytes = BASE64
        .decode(state)
        .map_err(|e| PublishError::InvalidInput(format!("bad OAuth state: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| PublishError::InvalidInput(format!("bad OAuth state: {e}")))
}
