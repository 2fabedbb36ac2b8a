//! YouTube adapter
//!
//! Data API v3: a single multipart request uploads the video together
//! with its `snippet`/`status` metadata. Channel and video statistics
//! come back as string-encoded integers and are parsed with a
//! fallback of 0.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::config::PlatformConfig;
use crate::core::{
    Credential, PlatformId, Post, PostMetrics, ProfileInfo, PublishError,
};
use crate::platforms::{
    count_field, fetch_error_for, publish_error_for, require_token, PlatformAdapter,
};

pub struct YouTubeAdapter {
    config: PlatformConfig,
    client: Client,
}

impl YouTubeAdapter {
    pub fn new(config: PlatformConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }
}

#[async_trait]
impl PlatformAdapter for YouTubeAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::YouTube
    }

    async fn publish(
        &self,
        credential: &Credential,
        post: &Post,
        _cancel: &CancellationToken,
    ) -> Result<String, PublishError> {
        let token = require_token(credential)?;

        let media = post.first_video().ok_or_else(|| {
            PublishError::InvalidInput("YouTube publish requires a video attachment".to_string())
        })?;
        let path = media.file_path().ok_or_else(|| {
            PublishError::InvalidInput(
                "YouTube upload requires a local video file, not a hosted URL".to_string(),
            )
        })?;
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Err(PublishError::FileNotFound(path.to_path_buf())),
        }

        tracing::info!("[YouTube] uploading {} for post {}", path.display(), post.id);

        let metadata = json!({
            "snippet": {
                "title": post.caption,
                "description": post.caption,
                "tags": ["social-matrix"],
                "categoryId": "22",
            },
            "status": {
                "privacyStatus": "unlisted",
            }
        });

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|_| PublishError::FileNotFound(path.to_path_buf()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "video.mp4".to_string());

        let form = Form::new()
            .part("metadata", Part::text(metadata.to_string()))
            .part("video", Part::bytes(bytes).file_name(file_name));

        let url = format!(
            "{}/videos?part=snippet,status&access_token={}",
            self.config.api_base_url,
            urlencoding::encode(token),
        );

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::error!("[YouTube] upload failed: HTTP {} {}", status, body);
            return Err(publish_error_for(status, &body));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| PublishError::MalformedResponse(e.to_string()))?;
        let video_id = value
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PublishError::MalformedResponse("missing id in upload response".to_string())
            })?;

        tracing::info!("[YouTube] published post {} as video {}", post.id, video_id);
        Ok(video_id)
    }

    async fn schedule(
        &self,
        _credential: &Credential,
        _post: &Post,
        publish_at: DateTime<Utc>,
        _cancel: &CancellationToken,
    ) -> Result<String, PublishError> {
        if publish_at <= Utc::now() {
            return Err(PublishError::InvalidScheduleTime);
        }
        Err(PublishError::NotSupported("native scheduling"))
    }

    async fn fetch_profile(&self, credential: &Credential) -> Result<ProfileInfo, PublishError> {
        let token = require_token(credential)?;

        let url = format!(
            "{}/channels?part=snippet,statistics&mine=true&access_token={}",
            self.config.api_base_url,
            urlencoding::encode(token),
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(fetch_error_for(status, &body));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| PublishError::MalformedResponse(e.to_string()))?;
        let channel = value
            .get("items")
            .and_then(|items| items.get(0))
            .ok_or_else(|| PublishError::FetchFailed("no channel found".to_string()))?;

        let snippet = channel.get("snippet").cloned().unwrap_or(Value::Null);
        let statistics = channel.get("statistics").cloned().unwrap_or(Value::Null);

        Ok(ProfileInfo {
            id: channel
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            display_name: snippet
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            avatar_url: snippet
                .get("thumbnails")
                .and_then(|t| t.get("default"))
                .and_then(|d| d.get("url"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            followers: count_field(&statistics, "subscriberCount"),
            following: 0,
            post_count: count_field(&statistics, "videoCount"),
            likes: 0,
        })
    }

    async fn fetch_post_metrics(
        &self,
        credential: &Credential,
        external_id: &str,
    ) -> Result<PostMetrics, PublishError> {
        let token = require_token(credential)?;
        if external_id.is_empty() {
            return Err(PublishError::InvalidInput("video id is empty".to_string()));
        }

        let url = format!(
            "{}/videos?part=statistics&id={}&access_token={}",
            self.config.api_base_url,
            urlencoding::encode(external_id),
            urlencoding::encode(token),
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(fetch_error_for(status, &body));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| PublishError::MalformedResponse(e.to_string()))?;
        let statistics = value
            .get("items")
            .and_then(|items| items.get(0))
            .and_then(|item| item.get("statistics"))
            .ok_or_else(|| PublishError::FetchFailed("video not found".to_string()))?;

        Ok(PostMetrics {
            external_id: external_id.to_string(),
            views: count_field(statistics, "viewCount"),
            likes: count_field(statistics, "likeCount"),
            comments: count_field(statistics, "commentCount"),
            // not exposed by the API
            shares: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MediaItem, MediaKind};
    use mockito::Matcher;
    use std::io::Write;
    use std::time::Duration;

    fn test_config(base_url: &str) -> PlatformConfig {
        let mut config = crate::config::PlatformRegistry::default()
            .get(PlatformId::YouTube)
            .unwrap()
            .clone();
        config.api_base_url = base_url.to_string();
        config.timeout = Duration::from_secs(5);
        config
    }

    fn credential(token: &str) -> Credential {
        Credential::new(
            "u1",
            PlatformId::YouTube,
            token,
            Some("refresh".to_string()),
            Utc::now() + chrono::Duration::hours(1),
        )
    }

    #[tokio::test]
    async fn test_publish_returns_video_id() {
        let mut server = mockito::Server::new_async().await;
        let adapter = YouTubeAdapter::new(test_config(&server.url()));

        let upload = server
            .mock("POST", "/videos")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("part".into(), "snippet,status".into()),
                Matcher::UrlEncoded("access_token".into(), "tok".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"id":"yt-123"}"#)
            .expect(1)
            .create_async()
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"video-bytes").unwrap();
        let post = Post::new("my upload")
            .with_media(MediaItem::file(file.path(), MediaKind::Video));

        let id = adapter
            .publish(&credential("tok"), &post, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(id, "yt-123");
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_file_rejected_without_network() {
        let mut server = mockito::Server::new_async().await;
        let adapter = YouTubeAdapter::new(test_config(&server.url()));

        let any = server
            .mock("POST", Matcher::Regex(".*".into()))
            .expect(0)
            .create_async()
            .await;

        let post = Post::new("my upload")
            .with_media(MediaItem::file("/does/not/exist.mp4", MediaKind::Video));
        let err = adapter
            .publish(&credential("tok"), &post, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::FileNotFound(_)));
        any.assert_async().await;
    }

    #[tokio::test]
    async fn test_profile_parses_string_counters_with_fallback() {
        let mut server = mockito::Server::new_async().await;
        let adapter = YouTubeAdapter::new(test_config(&server.url()));

        let _m = server
            .mock("GET", "/channels")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"items":[{"id":"chan-1",
                    "snippet":{"title":"My Channel",
                               "thumbnails":{"default":{"url":"http://img"}}},
                    "statistics":{"subscriberCount":"1000",
                                  "videoCount":"garbage",
                                  "viewCount":"5000"}}]}"#,
            )
            .create_async()
            .await;

        let profile = adapter.fetch_profile(&credential("tok")).await.unwrap();
        assert_eq!(profile.id, "chan-1");
        assert_eq!(profile.display_name, "My Channel");
        assert_eq!(profile.followers, 1000);
        // malformed upstream counter degrades to zero
        assert_eq!(profile.post_count, 0);
    }

    #[tokio::test]
    async fn test_metrics_401_maps_to_invalid_token() {
        let mut server = mockito::Server::new_async().await;
        let adapter = YouTubeAdapter::new(test_config(&server.url()));

        let _m = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error":{"code":401}}"#)
            .create_async()
            .await;

        let err = adapter
            .fetch_post_metrics(&credential("tok"), "yt-123")
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_metrics_string_statistics() {
        let mut server = mockito::Server::new_async().await;
        let adapter = YouTubeAdapter::new(test_config(&server.url()));

        let _m = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"items":[{"statistics":{"viewCount":"42","likeCount":"7",
                    "commentCount":"3"}}]}"#,
            )
            .create_async()
            .await;

        let metrics = adapter
            .fetch_post_metrics(&credential("tok"), "yt-123")
            .await
            .unwrap();
        assert_eq!(metrics.views, 42);
        assert_eq!(metrics.likes, 7);
        assert_eq!(metrics.comments, 3);
        assert_eq!(metrics.shares, 0);
    }

    #[tokio::test]
    async fn test_schedule_not_supported() {
        let server = mockito::Server::new_async().await;
        let adapter = YouTubeAdapter::new(test_config(&server.url()));

        let post = Post::new("scheduled");
        let err = adapter
            .schedule(
                &credential("tok"),
                &post,
                Utc::now() + chrono::Duration::hours(1),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::NotSupported(_)));
    }
}
