//! Platform adapter trait
//!
//! Every platform implements the same publish/query surface; the
//! orchestrator only ever talks to this interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::core::{Credential, PlatformId, Post, PostMetrics, ProfileInfo, PublishError};

/// Uniform contract one platform integration must satisfy
///
/// Expected failures come back as tagged `PublishError` values, never
/// as panics. 401/403 responses map to `InvalidToken` so the
/// orchestrator can run its single refresh-and-retry; adapters do not
/// retry on their own.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Platform this adapter serves
    fn platform(&self) -> PlatformId;

    /// Publish the post now, returning the platform-assigned id
    async fn publish(
        &self,
        credential: &Credential,
        post: &Post,
        cancel: &CancellationToken,
    ) -> Result<String, PublishError>;

    /// Publish at `publish_at` using the platform's native scheduler
    ///
    /// Platforms without native scheduling return
    /// `PublishError::NotSupported`; the orchestrator falls back to
    /// client-side delayed publishing.
    async fn schedule(
        &self,
        credential: &Credential,
        post: &Post,
        publish_at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<String, PublishError>;

    /// Fetch follower counts, display name and avatar
    async fn fetch_profile(&self, credential: &Credential) -> Result<ProfileInfo, PublishError>;

    /// Fetch per-post metrics, mapped into the uniform shape
    async fn fetch_post_metrics(
        &self,
        credential: &Credential,
        external_id: &str,
    ) -> Result<PostMetrics, PublishError>;
}
