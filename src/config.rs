// Platform registry - per-platform limits and endpoints
//
// Built once at startup and passed into the orchestrator and adapters;
// limits and URLs are configuration, never hardcoded at call sites.

use std::time::Duration;

use indexmap::IndexMap;

use crate::core::{MediaKind, PlatformId};

/// Default chunk size for chunked uploads (5 MiB)
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Default per-request timeout for upload-capable platforms
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// OAuth application registration for one platform
#[derive(Debug, Clone, Default)]
pub struct OAuthAppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl OAuthAppConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.redirect_uri.is_empty()
    }
}

/// Per-platform configuration
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// REST API base URL, overridable for tests
    pub api_base_url: String,
    /// OAuth authorize endpoint (user consent redirect)
    pub authorize_url: String,
    /// OAuth token endpoint (refresh grants)
    pub token_url: String,
    pub oauth: OAuthAppConfig,
    /// Maximum caption length in characters
    pub max_caption_len: usize,
    /// Maximum size of a single media file in bytes
    pub max_media_bytes: u64,
    /// Media kinds the platform accepts
    pub supported_media: Vec<MediaKind>,
    /// True when the platform cannot publish a bare text post
    pub requires_media: bool,
    /// True when the platform accepts a native scheduled-publish request
    pub native_scheduling: bool,
    /// Chunk size for chunked upload protocols
    pub chunk_size: u64,
    pub timeout: Duration,
}

impl PlatformConfig {
    pub fn supports(&self, kind: MediaKind) -> bool {
        self.supported_media.contains(&kind)
    }
}

/// Immutable registry of configured platforms, in registration order
#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    platforms: IndexMap<PlatformId, PlatformConfig>,
}

impl PlatformRegistry {
    pub fn new(platforms: IndexMap<PlatformId, PlatformConfig>) -> Self {
        Self { platforms }
    }

    pub fn get(&self, platform: PlatformId) -> Option<&PlatformConfig> {
        self.platforms.get(&platform)
    }

    pub fn contains(&self, platform: PlatformId) -> bool {
        self.platforms.contains_key(&platform)
    }

    pub fn platforms(&self) -> impl Iterator<Item = (PlatformId, &PlatformConfig)> {
        self.platforms.iter().map(|(id, cfg)| (*id, cfg))
    }

    /// Replace one platform's configuration, e.g. to point a test at a
    /// local server
    pub fn with_config(mut self, platform: PlatformId, config: PlatformConfig) -> Self {
        self.platforms.insert(platform, config);
        self
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        let mut platforms = IndexMap::new();

        platforms.insert(
            PlatformId::YouTube,
            PlatformConfig {
                api_base_url: "https://www.googleapis.com/youtube/v3".to_string(),
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                oauth: OAuthAppConfig::default(),
                max_caption_len: 5000,
                max_media_bytes: 2 * 1024 * 1024 * 1024,
                supported_media: vec![MediaKind::Video],
                requires_media: true,
                native_scheduling: false,
                chunk_size: DEFAULT_CHUNK_SIZE,
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            },
        );

        platforms.insert(
            PlatformId::TikTok,
            PlatformConfig {
                api_base_url: "https://open.tiktok.com/v1".to_string(),
                authorize_url: "https://www.tiktok.com/v1/oauth/authorize".to_string(),
                token_url: "https://open.tiktokapis.com/v1/oauth/token".to_string(),
                oauth: OAuthAppConfig::default(),
                max_caption_len: 2200,
                max_media_bytes: 1024 * 1024 * 1024,
                supported_media: vec![MediaKind::Video],
                requires_media: true,
                native_scheduling: true,
                chunk_size: DEFAULT_CHUNK_SIZE,
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            },
        );

        platforms.insert(
            PlatformId::Instagram,
            PlatformConfig {
                api_base_url: "https://graph.facebook.com/v18.0".to_string(),
                authorize_url: "https://api.instagram.com/oauth/authorize".to_string(),
                token_url: "https://graph.instagram.com/refresh_access_token".to_string(),
                oauth: OAuthAppConfig::default(),
                max_caption_len: 2200,
                max_media_bytes: 100 * 1024 * 1024,
                supported_media: vec![MediaKind::Image, MediaKind::Video],
                requires_media: true,
                native_scheduling: false,
                chunk_size: DEFAULT_CHUNK_SIZE,
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            },
        );

        Self { platforms }
    }
}
