//! Instagram adapter
//!
//! Graph API publishing is a two-step dance: create a media container
//! from a hosted media URL, then publish the container. The business
//! account id comes from the credential's `account_id` metadata.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::PlatformConfig;
use crate::core::{
    Credential, MediaKind, PlatformId, Post, PostMetrics, ProfileInfo, PublishError,
};
use crate::platforms::{fetch_error_for, publish_error_for, require_token, PlatformAdapter};

pub struct InstagramAdapter {
    config: PlatformConfig,
    client: Client,
}

impl InstagramAdapter {
    pub fn new(config: PlatformConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    fn account_id<'a>(&self, credential: &'a Credential) -> Result<&'a str, PublishError> {
        credential
            .metadata
            .get("account_id")
            .map(String::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                PublishError::InvalidInput(
                    "Instagram credential is missing the account_id metadata".to_string(),
                )
            })
    }

    /// Step 1: create a media container for a hosted image or video URL
    async fn create_media_container(
        &self,
        token: &str,
        account_id: &str,
        media_url: &str,
        kind: MediaKind,
        caption: &str,
    ) -> Result<String, PublishError> {
        let url = format!("{}/{}/media", self.config.api_base_url, account_id);
        let url_field = match kind {
            MediaKind::Image => "image_url",
            MediaKind::Video => "video_url",
        };
        let form = [
            (url_field, media_url),
            ("caption", caption),
            ("access_token", token),
        ];

        let response = self.client.post(&url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(publish_error_for(status, &body));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| PublishError::MalformedResponse(e.to_string()))?;
        value
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PublishError::MalformedResponse("missing id in container response".to_string())
            })
    }

    /// Step 2: publish the container
    async fn publish_media_container(
        &self,
        token: &str,
        account_id: &str,
        container_id: &str,
    ) -> Result<String, PublishError> {
        let url = format!("{}/{}/media_publish", self.config.api_base_url, account_id);
        let form = [("creation_id", container_id), ("access_token", token)];

        let response = self.client.post(&url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(publish_error_for(status, &body));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| PublishError::MalformedResponse(e.to_string()))?;
        value
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PublishError::MalformedResponse("missing id in publish response".to_string())
            })
    }
}

#[async_trait]
impl PlatformAdapter for InstagramAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::Instagram
    }

    async fn publish(
        &self,
        credential: &Credential,
        post: &Post,
        _cancel: &CancellationToken,
    ) -> Result<String, PublishError> {
        let token = require_token(credential)?;
        let account_id = self.account_id(credential)?;

        if post.media.is_empty() {
            return Err(PublishError::InvalidInput(
                "Instagram publish requires a media attachment".to_string(),
            ));
        }
        let (kind, media_url) = post
            .media
            .iter()
            .find_map(|m| m.hosted_url().map(|url| (m.kind, url)))
            .ok_or_else(|| {
                PublishError::InvalidInput(
                    "Instagram publish requires a hosted media URL, not a local file".to_string(),
                )
            })?;

        tracing::info!("[Instagram] publishing post {} to account {}", post.id, account_id);

        let container_id = self
            .create_media_container(token, account_id, media_url, kind, &post.caption)
            .await?;

        let media_id = self
            .publish_media_container(token, account_id, &container_id)
            .await?;

        tracing::info!("[Instagram] published post {} as media {}", post.id, media_id);
        Ok(media_id)
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
        let account_id = self.account_id(credential)?;

        let url = format!(
            "{}/{}?fields=id,username,name,profile_picture_url,followers_count,follows_count,\
             media_count&access_token={}",
            self.config.api_base_url,
            account_id,
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

        Ok(ProfileInfo {
            id: value
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            display_name: value
                .get("username")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            avatar_url: value
                .get("profile_picture_url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            followers: value.get("followers_count").and_then(Value::as_i64).unwrap_or(0),
            following: value.get("follows_count").and_then(Value::as_i64).unwrap_or(0),
            post_count: value.get("media_count").and_then(Value::as_i64).unwrap_or(0),
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
            return Err(PublishError::InvalidInput("media id is empty".to_string()));
        }

        let url = format!(
            "{}/{}/insights?metric=impressions,reach,engagement,likes,comments,saves,shares\
             &access_token={}",
            self.config.api_base_url,
            external_id,
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
        let data = value
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                PublishError::MalformedResponse("missing data array in insights".to_string())
            })?;

        Ok(PostMetrics {
            external_id: external_id.to_string(),
            views: metric_value(data, "impressions"),
            likes: metric_value(data, "likes"),
            comments: metric_value(data, "comments"),
            shares: metric_value(data, "shares"),
        })
    }
}

/// First value of a named insight metric; absent metrics count as 0
fn metric_value(data: &[Value], name: &str) -> i64 {
    data.iter()
        .find(|m| m.get("name").and_then(Value::as_str) == Some(name))
        .and_then(|m| m.get("values"))
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("value"))
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MediaItem;
    use mockito::Matcher;
    use std::time::Duration;

    fn test_config(base_url: &str) -> PlatformConfig {
        let mut config = crate::config::PlatformRegistry::default()
            .get(PlatformId::Instagram)
            .unwrap()
            .clone();
        config.api_base_url = base_url.to_string();
        config.timeout = Duration::from_secs(5);
        config
    }

    fn credential(token: &str) -> Credential {
        Credential::new(
            "u1",
            PlatformId::Instagram,
            token,
            None,
            Utc::now() + chrono::Duration::hours(1),
        )
        .with_metadata("account_id", "ig-acct")
    }

    fn image_post() -> Post {
        Post::new("sunset")
            .with_media(MediaItem::url("https://cdn.example.com/a.jpg", MediaKind::Image))
    }

    #[tokio::test]
    async fn test_publish_runs_container_then_publish() {
        let mut server = mockito::Server::new_async().await;
        let adapter = InstagramAdapter::new(test_config(&server.url()));

        let container = server
            .mock("POST", "/ig-acct/media")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("image_url".into(), "https://cdn.example.com/a.jpg".into()),
                Matcher::UrlEncoded("caption".into(), "sunset".into()),
                Matcher::UrlEncoded("access_token".into(), "tok".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"id":"container-1"}"#)
            .expect(1)
            .create_async()
            .await;
        let publish = server
            .mock("POST", "/ig-acct/media_publish")
            .match_body(Matcher::UrlEncoded("creation_id".into(), "container-1".into()))
            .with_status(200)
            .with_body(r#"{"id":"media-9"}"#)
            .expect(1)
            .create_async()
            .await;

        let id = adapter
            .publish(&credential("tok"), &image_post(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(id, "media-9");
        container.assert_async().await;
        publish.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_account_id_rejected_without_network() {
        let mut server = mockito::Server::new_async().await;
        let adapter = InstagramAdapter::new(test_config(&server.url()));

        let any = server
            .mock("POST", Matcher::Regex(".*".into()))
            .expect(0)
            .create_async()
            .await;

        let cred = Credential::new(
            "u1",
            PlatformId::Instagram,
            "tok",
            None,
            Utc::now() + chrono::Duration::hours(1),
        );
        let err = adapter
            .publish(&cred, &image_post(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::InvalidInput(_)));
        any.assert_async().await;
    }

    #[tokio::test]
    async fn test_local_file_media_rejected() {
        let server = mockito::Server::new_async().await;
        let adapter = InstagramAdapter::new(test_config(&server.url()));

        let post = Post::new("sunset")
            .with_media(MediaItem::file("/tmp/a.jpg", MediaKind::Image));
        let err = adapter
            .publish(&credential("tok"), &post, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_container_failure_skips_publish_step() {
        let mut server = mockito::Server::new_async().await;
        let adapter = InstagramAdapter::new(test_config(&server.url()));

        let _m = server
            .mock("POST", "/ig-acct/media")
            .with_status(400)
            .with_body(r#"{"error":"bad media"}"#)
            .create_async()
            .await;
        let publish = server
            .mock("POST", "/ig-acct/media_publish")
            .expect(0)
            .create_async()
            .await;

        let err = adapter
            .publish(&credential("tok"), &image_post(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::PublishFailed(_)));
        publish.assert_async().await;
    }

    #[tokio::test]
    async fn test_insights_missing_metric_degrades_to_zero() {
        let mut server = mockito::Server::new_async().await;
        let adapter = InstagramAdapter::new(test_config(&server.url()));

        let _m = server
            .mock("GET", "/media-9/insights")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"data":[
                    {"name":"impressions","values":[{"value":500}]},
                    {"name":"likes","values":[{"value":20}]},
                    {"name":"comments","values":[{"value":4}]}
                ]}"#,
            )
            .create_async()
            .await;

        let metrics = adapter
            .fetch_post_metrics(&credential("tok"), "media-9")
            .await
            .unwrap();
        assert_eq!(metrics.views, 500);
        assert_eq!(metrics.likes, 20);
        assert_eq!(metrics.comments, 4);
        assert_eq!(metrics.shares, 0);
    }

    #[tokio::test]
    async fn test_profile_maps_account_fields() {
        let mut server = mockito::Server::new_async().await;
        let adapter = InstagramAdapter::new(test_config(&server.url()));

        let _m = server
            .mock("GET", "/ig-acct")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"id":"ig-acct","username":"shutterbug",
                    "profile_picture_url":"http://img",
                    "followers_count":900,"follows_count":120,"media_count":33}"#,
            )
            .create_async()
            .await;

        let profile = adapter.fetch_profile(&credential("tok")).await.unwrap();
        assert_eq!(profile.display_name, "shutterbug");
        assert_eq!(profile.followers, 900);
        assert_eq!(profile.following, 120);
        assert_eq!(profile.post_count, 33);
    }
}
