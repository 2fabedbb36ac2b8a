//! Publish orchestrator
//!
//! Fans one post out to every requested platform, collects one
//! `PublishResult` per platform in request order, and owns the retry
//! policy:
//!
//! - credential resolution failure fails that platform only
//! - registry constraints are validated before any network call
//! - `InvalidToken` triggers exactly one refresh plus one retry
//! - `NetworkError` is retried exactly once
//! - everything else is terminal for that attempt
//!
//! Per-platform attempts run concurrently and independently; the call
//! always waits for all of them. A mixed outcome is the expected
//! steady state of a multi-platform publish, not an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{PlatformConfig, PlatformRegistry};
use crate::core::{
    Credential, PlatformId, Post, PostMetrics, ProfileInfo, PublishError, PublishResult,
};
use crate::credentials::CredentialResolver;
use crate::platforms::AdapterSet;
use crate::storage::CredentialStore;

pub struct PublishOrchestrator {
    registry: Arc<PlatformRegistry>,
    adapters: Arc<AdapterSet>,
    resolver: Arc<CredentialResolver>,
}

impl PublishOrchestrator {
    /// Build with the default adapter per configured platform
    pub fn new(registry: PlatformRegistry, store: Arc<dyn CredentialStore>) -> Self {
        let adapters = Arc::new(AdapterSet::for_registry(&registry));
        let registry = Arc::new(registry);
        let resolver = Arc::new(CredentialResolver::new(registry.clone(), store));
        Self { registry, adapters, resolver }
    }

    /// Build from explicit parts, e.g. with custom adapters
    pub fn from_parts(
        registry: Arc<PlatformRegistry>,
        adapters: Arc<AdapterSet>,
        resolver: Arc<CredentialResolver>,
    ) -> Self {
        Self { registry, adapters, resolver }
    }

    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    /// Publish to every requested platform now
    ///
    /// Returns exactly one result per requested platform, in request
    /// order; no platform is dropped and no failure short-circuits the
    /// others.
    pub async fn publish(
        &self,
        post: &Post,
        platforms: &[PlatformId],
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Vec<PublishResult> {
        tracing::info!(
            "[Publish] post {} fanning out to {} platform(s)",
            post.id,
            platforms.len()
        );

        let mut handles: Vec<(PlatformId, JoinHandle<Result<String, PublishError>>)> =
            Vec::with_capacity(platforms.len());

        for &platform in platforms {
            let registry = self.registry.clone();
            let adapters = self.adapters.clone();
            let resolver = self.resolver.clone();
            let post = post.clone();
            let user_id = user_id.to_string();
            let cancel = cancel.child_token();

            handles.push((
                platform,
                tokio::spawn(async move {
                    attempt_publish(&registry, &adapters, &resolver, &post, platform, &user_id, &cancel)
                        .await
                }),
            ));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (platform, handle) in handles {
            results.push(join_to_result(platform, handle.await));
        }
        results
    }

    /// Schedule the post for `when_utc` on every requested platform
    ///
    /// Platforms with native scheduling get the platform-side schedule
    /// call; the rest are accepted and published by an internal timer
    /// task at `when_utc` (no external id until it fires).
    pub async fn schedule(
        &self,
        post: &Post,
        platforms: &[PlatformId],
        when_utc: DateTime<Utc>,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Vec<PublishResult> {
        if when_utc <= Utc::now() {
            return platforms
                .iter()
                .map(|&p| PublishResult::failed(p, &PublishError::InvalidScheduleTime))
                .collect();
        }

        enum Pending {
            Task(JoinHandle<Result<String, PublishError>>),
            Ready(PublishResult),
        }

        let mut pending: Vec<(PlatformId, Pending)> = Vec::with_capacity(platforms.len());

        for &platform in platforms {
            let native = self
                .registry
                .get(platform)
                .map(|c| c.native_scheduling)
                .unwrap_or(false);

            let registry = self.registry.clone();
            let adapters = self.adapters.clone();
            let resolver = self.resolver.clone();
            let post = post.clone();
            let user_id = user_id.to_string();
            let child = cancel.child_token();

            if native {
                pending.push((
                    platform,
                    Pending::Task(tokio::spawn(async move {
                        attempt_schedule(
                            &registry, &adapters, &resolver, &post, platform, when_utc, &user_id,
                            &child,
                        )
                        .await
                    })),
                ));
            } else {
                // Client-side fallback: validate up front, then publish
                // from a timer task
                let config = match registry.get(platform) {
                    Some(config) => config,
                    None => {
                        pending.push((
                            platform,
                            Pending::Ready(PublishResult::failed(platform, &no_config(platform))),
                        ));
                        continue;
                    }
                };
                if let Err(e) = validate_post(config, &post) {
                    pending.push((platform, Pending::Ready(PublishResult::failed(platform, &e))));
                    continue;
                }

                let delay = (when_utc - Utc::now()).to_std().unwrap_or_default();
                tracing::info!(
                    "[Schedule] {} lacks native scheduling, delaying publish of {} by {:?}",
                    platform,
                    post.id,
                    delay
                );
                tokio::spawn(async move {
                    tokio::select! {
                        _ = child.cancelled() => {
                            tracing::info!(
                                "[Schedule] delayed publish of {} to {} cancelled",
                                post.id,
                                platform
                            );
                        }
                        _ = tokio::time::sleep(delay) => {
                            match attempt_publish(
                                &registry, &adapters, &resolver, &post, platform, &user_id, &child,
                            )
                            .await
                            {
                                Ok(id) => tracing::info!(
                                    "[Schedule] delayed publish of {} to {} succeeded as {}",
                                    post.id, platform, id
                                ),
                                Err(e) => tracing::error!(
                                    "[Schedule] delayed publish of {} to {} failed: {}",
                                    post.id, platform, e
                                ),
                            }
                        }
                    }
                });
                pending.push((platform, Pending::Ready(PublishResult::accepted(platform))));
            }
        }

        let mut results = Vec::with_capacity(pending.len());
        for (platform, entry) in pending {
            match entry {
                Pending::Task(handle) => results.push(join_to_result(platform, handle.await)),
                Pending::Ready(result) => results.push(result),
            }
        }
        results
    }

    /// Profile for one connected platform account
    pub async fn fetch_profile(
        &self,
        user_id: &str,
        platform: PlatformId,
    ) -> Result<ProfileInfo, PublishError> {
        let adapter = self
            .adapters
            .get(platform)
            .ok_or_else(|| no_adapter(platform))?;
        let credential = self.resolver.resolve(user_id, platform).await?;
        require_stored_token(&credential)?;

        match adapter.fetch_profile(&credential).await {
            Err(PublishError::InvalidToken(_)) => {
                let refreshed = self
                    .resolver
                    .force_refresh(user_id, platform, &credential.access_token)
                    .await?;
                adapter.fetch_profile(&refreshed).await
            }
            Err(ref e) if e.is_retryable() => adapter.fetch_profile(&credential).await,
            other => other,
        }
    }

    /// Metrics for one previously published post
    pub async fn fetch_post_metrics(
        &self,
        user_id: &str,
        platform: PlatformId,
        external_id: &str,
    ) -> Result<PostMetrics, PublishError> {
        if external_id.is_empty() {
            return Err(PublishError::InvalidInput("external post id is empty".to_string()));
        }
        let adapter = self
            .adapters
            .get(platform)
            .ok_or_else(|| no_adapter(platform))?;
        let credential = self.resolver.resolve(user_id, platform).await?;
        require_stored_token(&credential)?;

        match adapter.fetch_post_metrics(&credential, external_id).await {
            Err(PublishError::InvalidToken(_)) => {
                let refreshed = self
                    .resolver
                    .force_refresh(user_id, platform, &credential.access_token)
                    .await?;
                adapter.fetch_post_metrics(&refreshed, external_id).await
            }
            Err(ref e) if e.is_retryable() => {
                adapter.fetch_post_metrics(&credential, external_id).await
            }
            other => other,
        }
    }
}

// ============================================================================
// Per-platform attempt pipeline
// ============================================================================

async fn attempt_publish(
    registry: &PlatformRegistry,
    adapters: &AdapterSet,
    resolver: &CredentialResolver,
    post: &Post,
    platform: PlatformId,
    user_id: &str,
    cancel: &CancellationToken,
) -> Result<String, PublishError> {
    if cancel.is_cancelled() {
        return Err(PublishError::Cancelled);
    }

    let adapter = adapters.get(platform).ok_or_else(|| no_adapter(platform))?;
    let config = registry.get(platform).ok_or_else(|| no_config(platform))?;
    validate_post(config, post)?;

    let credential = resolver.resolve(user_id, platform).await?;
    require_stored_token(&credential)?;

    let first = with_cancel(cancel, adapter.publish(&credential, post, cancel)).await;
    match first {
        Err(PublishError::InvalidToken(reason)) => {
            tracing::info!(
                "[Publish] {} rejected the token ({reason}), refreshing once",
                platform
            );
            let refreshed = resolver
                .force_refresh(user_id, platform, &credential.access_token)
                .await?;
            with_cancel(cancel, adapter.publish(&refreshed, post, cancel)).await
        }
        Err(ref e) if e.is_retryable() => {
            tracing::info!("[Publish] {} transport failure ({e}), retrying once", platform);
            with_cancel(cancel, adapter.publish(&credential, post, cancel)).await
        }
        other => other,
    }
}

async fn attempt_schedule(
    registry: &PlatformRegistry,
    adapters: &AdapterSet,
    resolver: &CredentialResolver,
    post: &Post,
    platform: PlatformId,
    when_utc: DateTime<Utc>,
    user_id: &str,
    cancel: &CancellationToken,
) -> Result<String, PublishError> {
    if cancel.is_cancelled() {
        return Err(PublishError::Cancelled);
    }

    let adapter = adapters.get(platform).ok_or_else(|| no_adapter(platform))?;
    let config = registry.get(platform).ok_or_else(|| no_config(platform))?;
    validate_post(config, post)?;

    let credential = resolver.resolve(user_id, platform).await?;
    require_stored_token(&credential)?;

    let first = with_cancel(cancel, adapter.schedule(&credential, post, when_utc, cancel)).await;
    match first {
        Err(PublishError::InvalidToken(reason)) => {
            tracing::info!(
                "[Schedule] {} rejected the token ({reason}), refreshing once",
                platform
            );
            let refreshed = resolver
                .force_refresh(user_id, platform, &credential.access_token)
                .await?;
            with_cancel(cancel, adapter.schedule(&refreshed, post, when_utc, cancel)).await
        }
        Err(ref e) if e.is_retryable() => {
            tracing::info!("[Schedule] {} transport failure ({e}), retrying once", platform);
            with_cancel(cancel, adapter.schedule(&credential, post, when_utc, cancel)).await
        }
        other => other,
    }
}

/// Check the post against one platform's configured constraints
fn validate_post(config: &PlatformConfig, post: &Post) -> Result<(), PublishError> {
    if post.caption.chars().count() > config.max_caption_len {
        return Err(PublishError::ValidationFailed(format!(
            "caption exceeds the platform limit of {} characters",
            config.max_caption_len
        )));
    }
    if config.requires_media && post.media.is_empty() {
        return Err(PublishError::ValidationFailed(
            "platform requires a media attachment".to_string(),
        ));
    }
    for media in &post.media {
        if !config.supports(media.kind) {
            return Err(PublishError::ValidationFailed(format!(
                "{:?} media is not accepted by this platform",
                media.kind
            )));
        }
        if let Some(path) = media.file_path() {
            match std::fs::metadata(path) {
                Ok(meta) if meta.len() > 0 => {
                    if meta.len() > config.max_media_bytes {
                        return Err(PublishError::ValidationFailed(format!(
                            "media file exceeds the platform limit of {} bytes",
                            config.max_media_bytes
                        )));
                    }
                }
                _ => return Err(PublishError::FileNotFound(path.to_path_buf())),
            }
        }
    }
    Ok(())
}

async fn with_cancel<F>(cancel: &CancellationToken, fut: F) -> Result<String, PublishError>
where
    F: std::future::Future<Output = Result<String, PublishError>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(PublishError::Cancelled),
        result = fut => result,
    }
}

fn join_to_result(
    platform: PlatformId,
    joined: Result<Result<String, PublishError>, tokio::task::JoinError>,
) -> PublishResult {
    match joined {
        Ok(Ok(external_id)) => PublishResult::ok(platform, external_id),
        Ok(Err(e)) => {
            tracing::warn!("[Publish] {} attempt failed: {}", platform, e);
            PublishResult::failed(platform, &e)
        }
        Err(e) => PublishResult::failed(
            platform,
            &PublishError::PublishFailed(format!("publish task failed: {e}")),
        ),
    }
}

/// An empty stored token can never succeed and must not trigger a
/// refresh round-trip; reject it before any network call
fn require_stored_token(credential: &Credential) -> Result<(), PublishError> {
    if credential.access_token.is_empty() {
        return Err(PublishError::InvalidToken("stored access token is empty".to_string()));
    }
    Ok(())
}

fn no_adapter(platform: PlatformId) -> PublishError {
    PublishError::InvalidInput(format!("no adapter registered for {platform}"))
}

fn no_config(platform: PlatformId) -> PublishError {
    PublishError::InvalidInput(format!("no configuration for {platform}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorCode, MediaItem, MediaKind};
    use crate::storage::MemoryCredentialStore;
    use mockito::Matcher;
    use std::io::Write;
    use std::time::Duration;

    struct Fixture {
        orchestrator: PublishOrchestrator,
        _file: tempfile::NamedTempFile,
        post: Post,
    }

    /// Registry with every platform pointed at the mock server and a
    /// tiny chunk size so small fixture files span multiple chunks
    fn test_registry(server_url: &str) -> PlatformRegistry {
        let mut registry = PlatformRegistry::default();
        for platform in [PlatformId::YouTube, PlatformId::TikTok, PlatformId::Instagram] {
            let mut config = registry.get(platform).unwrap().clone();
            config.api_base_url = server_url.to_string();
            config.token_url = format!("{server_url}/oauth/token");
            config.oauth.client_id = "app-id".to_string();
            config.oauth.client_secret = "app-secret".to_string();
            config.oauth.redirect_uri = "https://example.com/callback".to_string();
            config.chunk_size = 4;
            config.timeout = Duration::from_secs(5);
            registry = registry.with_config(platform, config);
        }
        registry
    }

    fn fresh_credential(platform: PlatformId, token: &str) -> Credential {
        Credential::new(
            "u1",
            platform,
            token,
            Some("refresh-1".to_string()),
            Utc::now() + chrono::Duration::days(30),
        )
        .with_metadata("account_id", "ig-acct")
    }

    async fn fixture(server_url: &str, tokens: &[(PlatformId, &str)]) -> Fixture {
        let store = Arc::new(MemoryCredentialStore::new());
        for (platform, token) in tokens {
            store.put(&fresh_credential(*platform, token)).await.unwrap();
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![9u8; 7]).unwrap();
        file.flush().unwrap();
        let post = Post::new("cross-platform hello")
            .with_media(MediaItem::file(file.path(), MediaKind::Video));

        let orchestrator =
            PublishOrchestrator::new(test_registry(server_url), store as Arc<dyn CredentialStore>);
        Fixture { orchestrator, _file: file, post }
    }

    #[tokio::test]
    async fn test_one_result_per_platform_in_request_order() {
        let mut server = mockito::Server::new_async().await;
        let fx = fixture(
            &server.url(),
            &[(PlatformId::TikTok, "tt-tok"), (PlatformId::YouTube, "yt-tok")],
        )
        .await;

        // TikTok init blows up; YouTube succeeds
        let _m = server
            .mock("POST", "/video/upload/init/")
            .with_status(500)
            .with_body("init exploded")
            .create_async()
            .await;
        let _m = server
            .mock("POST", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id":"yt-1"}"#)
            .create_async()
            .await;

        let results = fx
            .orchestrator
            .publish(
                &fx.post,
                &[PlatformId::TikTok, PlatformId::YouTube],
                "u1",
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].platform, PlatformId::TikTok);
        assert!(!results[0].success);
        assert_eq!(results[0].error_code, Some(ErrorCode::UploadInitFailed));
        assert_eq!(results[1].platform, PlatformId::YouTube);
        assert!(results[1].success);
        assert_eq!(results[1].external_id.as_deref(), Some("yt-1"));
    }

    #[tokio::test]
    async fn test_empty_token_fails_without_network() {
        let mut server = mockito::Server::new_async().await;
        let fx = fixture(&server.url(), &[(PlatformId::TikTok, "")]).await;

        let any = server
            .mock("POST", Matcher::Regex(".*".into()))
            .expect(0)
            .create_async()
            .await;

        let results = fx
            .orchestrator
            .publish(&fx.post, &[PlatformId::TikTok], "u1", &CancellationToken::new())
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].error_code, Some(ErrorCode::InvalidToken));
        any.assert_async().await;
    }

    #[tokio::test]
    async fn test_unconnected_platform_fails_that_platform_only() {
        let mut server = mockito::Server::new_async().await;
        // only YouTube is connected
        let fx = fixture(&server.url(), &[(PlatformId::YouTube, "yt-tok")]).await;

        let _m = server
            .mock("POST", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id":"yt-2"}"#)
            .create_async()
            .await;

        let results = fx
            .orchestrator
            .publish(
                &fx.post,
                &[PlatformId::TikTok, PlatformId::YouTube],
                "u1",
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(results[0].error_code, Some(ErrorCode::ReauthRequired));
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn test_caption_over_limit_is_validation_failed() {
        let mut server = mockito::Server::new_async().await;
        let fx = fixture(&server.url(), &[(PlatformId::TikTok, "tt-tok")]).await;

        let any = server
            .mock("POST", Matcher::Regex(".*".into()))
            .expect(0)
            .create_async()
            .await;

        let mut post = fx.post.clone();
        post.caption = "x".repeat(3000); // over TikTok's 2200
        let results = fx
            .orchestrator
            .publish(&post, &[PlatformId::TikTok], "u1", &CancellationToken::new())
            .await;

        assert_eq!(results[0].error_code, Some(ErrorCode::ValidationFailed));
        any.assert_async().await;
    }

    #[tokio::test]
    async fn test_persistent_401_refreshes_exactly_once() {
        let mut server = mockito::Server::new_async().await;
        let fx = fixture(&server.url(), &[(PlatformId::TikTok, "tt-tok")]).await;

        let _m = server
            .mock("POST", "/video/upload/init/")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error":"expired"}"#)
            .expect(2)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_body(
                r#"{"data":{"access_token":"tt-tok-2","expires_in":86400,
                    "refresh_token":"refresh-2"}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let results = fx
            .orchestrator
            .publish(&fx.post, &[PlatformId::TikTok], "u1", &CancellationToken::new())
            .await;

        assert!(!results[0].success);
        assert_eq!(results[0].error_code, Some(ErrorCode::InvalidToken));
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_schedule_in_past_rejects_all_platforms_without_network() {
        let mut server = mockito::Server::new_async().await;
        let fx = fixture(
            &server.url(),
            &[(PlatformId::TikTok, "tt-tok"), (PlatformId::YouTube, "yt-tok")],
        )
        .await;

        let any = server
            .mock("POST", Matcher::Regex(".*".into()))
            .expect(0)
            .create_async()
            .await;

        let results = fx
            .orchestrator
            .schedule(
                &fx.post,
                &[PlatformId::TikTok, PlatformId::YouTube],
                Utc::now() - chrono::Duration::seconds(1),
                "u1",
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(results.len(), 2);
        for result in &results {
            assert_eq!(result.error_code, Some(ErrorCode::InvalidScheduleTime));
        }
        any.assert_async().await;
    }

    #[tokio::test]
    async fn test_schedule_native_and_fallback_mix() {
        let mut server = mockito::Server::new_async().await;

        let store = Arc::new(MemoryCredentialStore::new());
        store
            .put(&fresh_credential(PlatformId::TikTok, "tt-tok"))
            .await
            .unwrap();
        store
            .put(&fresh_credential(PlatformId::Instagram, "ig-tok"))
            .await
            .unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![9u8; 3]).unwrap();
        file.flush().unwrap();
        let post = Post::new("later")
            .with_media(MediaItem::file(file.path(), MediaKind::Video))
            .with_media(MediaItem::url("https://cdn.example.com/v.mp4", MediaKind::Video));

        let orchestrator = PublishOrchestrator::new(
            test_registry(&server.url()),
            store as Arc<dyn CredentialStore>,
        );

        // TikTok: native scheduled publish
        let _m = server
            .mock("POST", "/video/upload/init/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data":{"upload_id":"u1"}}"#)
            .create_async()
            .await;
        let _m = server
            .mock("POST", "/video/upload/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let _m = server
            .mock("POST", "/video/publish/")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "publish_type": "SCHEDULED_PUBLISH"
            })))
            .with_status(200)
            .with_body(r#"{"data":{"video_id":"scheduled-1"}}"#)
            .create_async()
            .await;
        // Instagram: fallback delayed publish fires later
        let container = server
            .mock("POST", "/ig-acct/media")
            .with_status(200)
            .with_body(r#"{"id":"container-1"}"#)
            .expect(1)
            .create_async()
            .await;
        let publish = server
            .mock("POST", "/ig-acct/media_publish")
            .with_status(200)
            .with_body(r#"{"id":"media-1"}"#)
            .expect(1)
            .create_async()
            .await;

        let when = Utc::now() + chrono::Duration::milliseconds(200);
        let results = orchestrator
            .schedule(
                &post,
                &[PlatformId::TikTok, PlatformId::Instagram],
                when,
                "u1",
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert_eq!(results[0].external_id.as_deref(), Some("scheduled-1"));
        // fallback platform is accepted without an external id yet
        assert!(results[1].success);
        assert!(results[1].external_id.is_none());

        // the delayed task publishes once the schedule time passes
        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        container.assert_async().await;
        publish.assert_async().await;
    }

    #[tokio::test]
    async fn test_cancelled_token_reports_cancelled_without_network() {
        let mut server = mockito::Server::new_async().await;
        let fx = fixture(
            &server.url(),
            &[(PlatformId::TikTok, "tt-tok"), (PlatformId::YouTube, "yt-tok")],
        )
        .await;

        let any = server
            .mock("POST", Matcher::Regex(".*".into()))
            .expect(0)
            .create_async()
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let results = fx
            .orchestrator
            .publish(
                &fx.post,
                &[PlatformId::TikTok, PlatformId::YouTube],
                "u1",
                &cancel,
            )
            .await;

        assert_eq!(results.len(), 2);
        for result in &results {
            assert_eq!(result.error_code, Some(ErrorCode::Cancelled));
        }
        any.assert_async().await;
    }

    #[tokio::test]
    async fn test_metrics_passes_through_adapter_mapping() {
        let mut server = mockito::Server::new_async().await;
        let fx = fixture(&server.url(), &[(PlatformId::YouTube, "yt-tok")]).await;

        let _m = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items":[{"statistics":{"viewCount":"11","likeCount":"2","commentCount":"1"}}]}"#)
            .create_async()
            .await;

        let metrics = fx
            .orchestrator
            .fetch_post_metrics("u1", PlatformId::YouTube, "yt-1")
            .await
            .unwrap();
        assert_eq!(metrics.views, 11);
        assert_eq!(metrics.likes, 2);
    }
}
