//! TikTok adapter
//!
//! Publishes through the open-API v1 chunked upload protocol:
//!
//! 1. **Init** (`video/upload/init/`) - declare file name, size and
//!    chunk size, receive an `upload_id`
//! 2. **Chunks** (`video/upload/`) - POST each 5 MiB slice as a
//!    multipart `video` part with 1-based `chunk_num` /
//!    `total_chunk_num` query params, strictly in order
//! 3. **Publish** (`video/publish/`) - close the session with the post
//!    metadata, receive the `video_id`
//!
//! Native scheduling reuses the same upload and closes with
//! `publish_type: "SCHEDULED_PUBLISH"` plus a unix `publish_time`.

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
use crate::platforms::{fetch_error_for, publish_error_for, require_token, PlatformAdapter};
use crate::upload::{ChunkedUploadProtocol, UploadPipeline};

pub struct TikTokAdapter {
    config: PlatformConfig,
    client: Client,
}

impl TikTokAdapter {
    pub fn new(config: PlatformConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    /// Upload the post's video and close the session in the given mode
    async fn upload_and_close(
        &self,
        credential: &Credential,
        post: &Post,
        mode: FinalizeMode,
        cancel: &CancellationToken,
    ) -> Result<String, PublishError> {
        let token = require_token(credential)?;

        let media = post.first_video().ok_or_else(|| {
            PublishError::InvalidInput("TikTok publish requires a video attachment".to_string())
        })?;
        let path = media.file_path().ok_or_else(|| {
            PublishError::InvalidInput(
                "TikTok upload requires a local video file, not a hosted URL".to_string(),
            )
        })?;

        let protocol = TikTokUpload {
            client: &self.client,
            base_url: &self.config.api_base_url,
            access_token: token,
            caption: &post.caption,
            mode,
        };

        let pipeline = UploadPipeline::new(&protocol, self.config.chunk_size);
        pipeline.run(path, cancel).await
    }
}

#[async_trait]
impl PlatformAdapter for TikTokAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::TikTok
    }

    async fn publish(
        &self,
        credential: &Credential,
        post: &Post,
        cancel: &CancellationToken,
    ) -> Result<String, PublishError> {
        tracing::info!("[TikTok] publishing post {}", post.id);
        let video_id = self
            .upload_and_close(credential, post, FinalizeMode::Publish, cancel)
            .await?;
        tracing::info!("[TikTok] published post {} as video {}", post.id, video_id);
        Ok(video_id)
    }

    async fn schedule(
        &self,
        credential: &Credential,
        post: &Post,
        publish_at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<String, PublishError> {
        if publish_at <= Utc::now() {
            return Err(PublishError::InvalidScheduleTime);
        }

        tracing::info!("[TikTok] scheduling post {} for {}", post.id, publish_at);
        self.upload_and_close(
            credential,
            post,
            FinalizeMode::Schedule { publish_time: publish_at.timestamp() },
            cancel,
        )
        .await
    }

    async fn fetch_profile(&self, credential: &Credential) -> Result<ProfileInfo, PublishError> {
        let token = require_token(credential)?;

        let url = format!(
            "{}/user/info/?access_token={}&fields=open_id,union_id,user_id,display_name,\
             avatar_large_url,follower_count,following_count,video_count,like_count",
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
        let user = value
            .get("data")
            .and_then(|d| d.get("user"))
            .ok_or_else(|| {
                PublishError::MalformedResponse("missing data.user in user info".to_string())
            })?;

        Ok(ProfileInfo {
            id: str_field(user, "open_id"),
            display_name: str_field(user, "display_name"),
            avatar_url: str_field(user, "avatar_large_url"),
            followers: user.get("follower_count").and_then(Value::as_i64).unwrap_or(0),
            following: user.get("following_count").and_then(Value::as_i64).unwrap_or(0),
            post_count: user.get("video_count").and_then(Value::as_i64).unwrap_or(0),
            likes: user.get("like_count").and_then(Value::as_i64).unwrap_or(0),
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
            "{}/video/query/?access_token={}&fields=id,create_time,like_count,comment_count,\
             share_count,play_count,reach",
            self.config.api_base_url,
            urlencoding::encode(token),
        );
        let body = json!({ "filters": { "video_ids": [external_id] } });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(fetch_error_for(status, &text));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| PublishError::MalformedResponse(e.to_string()))?;
        let video = value
            .get("data")
            .and_then(|d| d.get("videos"))
            .and_then(|v| v.get(0))
            .ok_or_else(|| {
                PublishError::MalformedResponse("missing data.videos[0] in query".to_string())
            })?;

        Ok(PostMetrics {
            external_id: if str_field(video, "id").is_empty() {
                external_id.to_string()
            } else {
                str_field(video, "id")
            },
            views: video.get("play_count").and_then(Value::as_i64).unwrap_or(0),
            likes: video.get("like_count").and_then(Value::as_i64).unwrap_or(0),
            comments: video.get("comment_count").and_then(Value::as_i64).unwrap_or(0),
            shares: video.get("share_count").and_then(Value::as_i64).unwrap_or(0),
        })
    }
}

fn str_field(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// How the upload session is closed
#[derive(Clone, Copy)]
enum FinalizeMode {
    Publish,
    Schedule { publish_time: i64 },
}

/// TikTok's concrete wire protocol for the shared upload pipeline
struct TikTokUpload<'a> {
    client: &'a Client,
    base_url: &'a str,
    access_token: &'a str,
    caption: &'a str,
    mode: FinalizeMode,
}

#[async_trait]
impl ChunkedUploadProtocol for TikTokUpload<'_> {
    async fn init(
        &self,
        file_name: &str,
        file_size: u64,
        chunk_size: u64,
    ) -> Result<String, PublishError> {
        let url = format!(
            "{}/video/upload/init/?access_token={}",
            self.base_url,
            urlencoding::encode(self.access_token),
        );
        let body = json!({
            "source_info": {
                "source": "FILE_UPLOAD",
                "file_name": file_name,
                "file_size": file_size,
                "chunk_size": chunk_size,
            }
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(PublishError::InvalidToken(format!("HTTP {status}: {text}")));
            }
            return Err(PublishError::UploadInitFailed(format!("HTTP {status}: {text}")));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| PublishError::MalformedResponse(e.to_string()))?;
        value
            .get("data")
            .and_then(|d| d.get("upload_id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PublishError::MalformedResponse("missing data.upload_id in init".to_string())
            })
    }

    async fn upload_chunk(
        &self,
        upload_id: &str,
        chunk_num: u32,
        total_chunks: u32,
        data: Vec<u8>,
    ) -> Result<(), PublishError> {
        let url = format!(
            "{}/video/upload/?access_token={}&upload_id={}&chunk_num={}&total_chunk_num={}",
            self.base_url,
            urlencoding::encode(self.access_token),
            urlencoding::encode(upload_id),
            chunk_num,
            total_chunks,
        );

        let form = Form::new().part("video", Part::bytes(data).file_name("chunk"));
        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(PublishError::InvalidToken(format!("HTTP {status}: {text}")));
            }
            return Err(PublishError::ChunkUploadFailed {
                chunk: chunk_num,
                message: format!("HTTP {status}: {text}"),
            });
        }
        Ok(())
    }

    async fn finalize(&self, upload_id: &str) -> Result<String, PublishError> {
        let url = format!(
            "{}/video/publish/?access_token={}",
            self.base_url,
            urlencoding::encode(self.access_token),
        );
        let body = match self.mode {
            FinalizeMode::Publish => json!({
                "upload_id": upload_id,
                "video_title": self.caption,
                "disable_comment": false,
                "disable_duet": false,
                "disable_stitch": false,
            }),
            FinalizeMode::Schedule { publish_time } => json!({
                "upload_id": upload_id,
                "video_title": self.caption,
                "publish_type": "SCHEDULED_PUBLISH",
                "publish_time": publish_time,
            }),
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(publish_error_for(status, &text));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| PublishError::MalformedResponse(e.to_string()))?;
        value
            .get("data")
            .and_then(|d| d.get("video_id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PublishError::MalformedResponse("missing data.video_id in publish".to_string())
            })
    }
}
