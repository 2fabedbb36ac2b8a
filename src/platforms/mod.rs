// Platforms module - one adapter per platform plus the adapter table

pub mod instagram;
pub mod tiktok;
mod traits;
pub mod youtube;

pub use instagram::InstagramAdapter;
pub use tiktok::TikTokAdapter;
pub use traits::PlatformAdapter;
pub use youtube::YouTubeAdapter;

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::StatusCode;

use crate::config::PlatformRegistry;
use crate::core::{Credential, PlatformId, PublishError};

/// Adapter table built once at startup
///
/// Explicit instance state, deliberately not a process-wide registry:
/// two orchestrators with different configurations can coexist.
#[derive(Default)]
pub struct AdapterSet {
    adapters: HashMap<PlatformId, Arc<dyn PlatformAdapter>>,
}

impl AdapterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the default adapters for every platform in the registry
    pub fn for_registry(registry: &PlatformRegistry) -> Self {
        let mut set = Self::new();
        for (platform, config) in registry.platforms() {
            let adapter: Arc<dyn PlatformAdapter> = match platform {
                PlatformId::YouTube => Arc::new(YouTubeAdapter::new(config.clone())),
                PlatformId::TikTok => Arc::new(TikTokAdapter::new(config.clone())),
                PlatformId::Instagram => Arc::new(InstagramAdapter::new(config.clone())),
            };
            set.register(adapter);
        }
        set
    }

    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        let platform = adapter.platform();
        tracing::info!("[Adapters] registered adapter for {}", platform);
        self.adapters.insert(platform, adapter);
    }

    pub fn get(&self, platform: PlatformId) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.get(&platform).cloned()
    }

    pub fn is_supported(&self, platform: PlatformId) -> bool {
        self.adapters.contains_key(&platform)
    }

    pub fn supported_platforms(&self) -> Vec<PlatformId> {
        self.adapters.keys().copied().collect()
    }
}

// ============================================================================
// Shared helpers used by every adapter
// ============================================================================

/// Reject empty tokens before any network call
pub(crate) fn require_token(credential: &Credential) -> Result<&str, PublishError> {
    if credential.access_token.is_empty() {
        return Err(PublishError::InvalidToken("access token is empty".to_string()));
    }
    Ok(&credential.access_token)
}

/// Map a non-2xx publish/upload response to the error taxonomy
pub(crate) fn publish_error_for(status: StatusCode, body: &str) -> PublishError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        PublishError::InvalidToken(format!("HTTP {status}: {body}"))
    } else {
        PublishError::PublishFailed(format!("HTTP {status}: {body}"))
    }
}

/// Map a non-2xx read-only query response to the error taxonomy
pub(crate) fn fetch_error_for(status: StatusCode, body: &str) -> PublishError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        PublishError::InvalidToken(format!("HTTP {status}: {body}"))
    } else {
        PublishError::FetchFailed(format!("HTTP {status}: {body}"))
    }
}

/// Parse a counter that some platforms encode as a JSON string
///
/// Falls back to 0 on absence or a malformed value rather than failing
/// the whole query, matching observed platform behavior.
pub(crate) fn count_field(value: &serde_json::Value, field: &str) -> i64 {
    match value.get(field) {
        Some(v) if v.is_i64() || v.is_u64() => v.as_i64().unwrap_or(0),
        Some(v) => v.as_str().and_then(|s| s.parse::<i64>().ok()).unwrap_or(0),
        None => 0,
    }
}
