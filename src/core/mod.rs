// Core module - shared domain types and error taxonomy

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Platform type enumeration
///
/// Closed set of supported platforms; adapters are registered per
/// variant at startup, there is no runtime string-based lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    YouTube,
    TikTok,
    Instagram,
}

impl PlatformId {
    /// Get platform display name
    pub fn display_name(&self) -> &'static str {
        match self {
            PlatformId::YouTube => "YouTube",
            PlatformId::TikTok => "TikTok",
            PlatformId::Instagram => "Instagram",
        }
    }

    /// Stable lowercase identifier, also used as the storage key
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformId::YouTube => "youtube",
            PlatformId::TikTok => "tiktok",
            PlatformId::Instagram => "instagram",
        }
    }

    pub fn parse(s: &str) -> Option<PlatformId> {
        match s.to_lowercase().as_str() {
            "youtube" => Some(PlatformId::YouTube),
            "tiktok" => Some(PlatformId::TikTok),
            "instagram" => Some(PlatformId::Instagram),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlatformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared kind of a media attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Where the media bytes live
///
/// Chunked and multipart uploads need a local file; container-style
/// platforms (Instagram) need a hosted URL instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaSource {
    File(PathBuf),
    Url(String),
}

/// Media attachment of a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub source: MediaSource,
    pub kind: MediaKind,
}

impl MediaItem {
    pub fn file(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        Self { source: MediaSource::File(path.into()), kind }
    }

    pub fn url(url: impl Into<String>, kind: MediaKind) -> Self {
        Self { source: MediaSource::Url(url.into()), kind }
    }

    /// Local file path, if the media is file-backed
    pub fn file_path(&self) -> Option<&Path> {
        match &self.source {
            MediaSource::File(path) => Some(path),
            MediaSource::Url(_) => None,
        }
    }

    /// Hosted URL, if the media is URL-backed
    pub fn hosted_url(&self) -> Option<&str> {
        match &self.source {
            MediaSource::Url(url) => Some(url),
            MediaSource::File(_) => None,
        }
    }
}

/// Content unit handed to the orchestrator
///
/// Immutable once handed over for a publish attempt; the orchestrator
/// never mutates the caller's copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub caption: String,
    pub media: Vec<MediaItem>,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn new(caption: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            caption: caption.into(),
            media: Vec::new(),
            created_at: Utc::now(),
            scheduled_at: None,
        }
    }

    pub fn with_media(mut self, media: MediaItem) -> Self {
        self.media.push(media);
        self
    }

    pub fn with_schedule(mut self, when: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(when);
        self
    }

    /// First video attachment, if any
    pub fn first_video(&self) -> Option<&MediaItem> {
        self.media.iter().find(|m| m.kind == MediaKind::Video)
    }
}

/// Per-(user, platform) OAuth credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub user_id: String,
    pub platform: PlatformId,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    /// Platform-specific extras, e.g. TikTok `open_id`, Instagram `account_id`
    pub metadata: HashMap<String, String>,
}

impl Credential {
    pub fn new(
        user_id: impl Into<String>,
        platform: PlatformId,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            platform,
            access_token: access_token.into(),
            refresh_token,
            expires_at,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// True when the token expires within `window` from now
    pub fn expires_within(&self, window: chrono::Duration) -> bool {
        self.expires_at <= Utc::now() + window
    }
}

/// Uniform profile shape across platforms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub id: String,
    pub display_name: String,
    pub avatar_url: String,
    pub followers: i64,
    pub following: i64,
    pub post_count: i64,
    pub likes: i64,
}

/// Uniform per-post metrics shape across platforms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostMetrics {
    pub external_id: String,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}

/// Outcome of one (post, platform) publish attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResult {
    pub platform: PlatformId,
    pub success: bool,
    pub external_id: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl PublishResult {
    pub fn ok(platform: PlatformId, external_id: impl Into<String>) -> Self {
        Self {
            platform,
            success: true,
            external_id: Some(external_id.into()),
            error_code: None,
            error_message: None,
            completed_at: Utc::now(),
        }
    }

    /// Accepted for later client-side publishing; no external id yet
    pub fn accepted(platform: PlatformId) -> Self {
        Self {
            platform,
            success: true,
            external_id: None,
            error_code: None,
            error_message: None,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(platform: PlatformId, error: &PublishError) -> Self {
        Self {
            platform,
            success: false,
            external_id: None,
            error_code: Some(error.code()),
            error_message: Some(error.to_string()),
            completed_at: Utc::now(),
        }
    }
}

/// Wire-level error codes surfaced in `PublishResult`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidToken,
    InvalidInput,
    FileNotFound,
    InvalidScheduleTime,
    ValidationFailed,
    UploadInitFailed,
    ChunkUploadFailed,
    PublishFailed,
    FetchFailed,
    MalformedResponse,
    NetworkError,
    Cancelled,
    NotSupported,
    ReauthRequired,
    StorageError,
}

/// Platform errors
///
/// Every expected failure mode is a tagged variant; adapters never
/// panic for platform or transport failures.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid or expired access token: {0}")]
    InvalidToken(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("file not found or empty: {0}")]
    FileNotFound(PathBuf),

    #[error("schedule time must be in the future")]
    InvalidScheduleTime,

    #[error("platform constraint violated: {0}")]
    ValidationFailed(String),

    #[error("upload initialization failed: {0}")]
    UploadInitFailed(String),

    #[error("chunk {chunk} upload failed: {message}")]
    ChunkUploadFailed { chunk: u32, message: String },

    #[error("publish rejected: {0}")]
    PublishFailed(String),

    #[error("fetch rejected: {0}")]
    FetchFailed(String),

    #[error("unparseable response body: {0}")]
    MalformedResponse(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("{0} not supported by this platform")]
    NotSupported(&'static str),

    #[error("re-authorization required: {0}")]
    ReauthRequired(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl PublishError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PublishError::InvalidToken(_) => ErrorCode::InvalidToken,
            PublishError::InvalidInput(_) => ErrorCode::InvalidInput,
            PublishError::FileNotFound(_) => ErrorCode::FileNotFound,
            PublishError::InvalidScheduleTime => ErrorCode::InvalidScheduleTime,
            PublishError::ValidationFailed(_) => ErrorCode::ValidationFailed,
            PublishError::UploadInitFailed(_) => ErrorCode::UploadInitFailed,
            PublishError::ChunkUploadFailed { .. } => ErrorCode::ChunkUploadFailed,
            PublishError::PublishFailed(_) => ErrorCode::PublishFailed,
            PublishError::FetchFailed(_) => ErrorCode::FetchFailed,
            PublishError::MalformedResponse(_) => ErrorCode::MalformedResponse,
            PublishError::NetworkError(_) => ErrorCode::NetworkError,
            PublishError::Cancelled => ErrorCode::Cancelled,
            PublishError::NotSupported(_) => ErrorCode::NotSupported,
            PublishError::ReauthRequired(_) => ErrorCode::ReauthRequired,
            PublishError::StorageError(_) => ErrorCode::StorageError,
        }
    }

    /// Only transport-level failures are retried by the orchestrator
    pub fn is_retryable(&self) -> bool {
        matches!(self, PublishError::NetworkError(_))
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(e: reqwest::Error) -> Self {
        // A decode error means the platform answered 2xx with a body we
        // could not parse; that will not change on retry.
        if e.is_decode() {
            PublishError::MalformedResponse(e.to_string())
        } else {
            PublishError::NetworkError(e.to_string())
        }
    }
}

impl From<rusqlite::Error> for PublishError {
    fn from(e: rusqlite::Error) -> Self {
        PublishError::StorageError(e.to_string())
    }
}

impl From<std::io::Error> for PublishError {
    fn from(e: std::io::Error) -> Self {
        PublishError::InvalidInput(e.to_string())
    }
}
