// Chunked upload pipeline
//
// Shared state machine for platforms that upload large files as
// init -> sequential chunks -> finalize. The platform adapter supplies
// the wire protocol; the pipeline owns ordering, chunk slicing and
// failure semantics.
//
// Flow:
// 1. Validate the local file (exists, non-empty)
// 2. Init: platform assigns an upload_id
// 3. Upload chunks 1..=total strictly in order; any chunk failure
//    aborts the whole upload, there is no resume
// 4. Finalize: platform assigns the external post/video id

use std::io::SeekFrom;
use std::path::Path;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;

use crate::core::{ErrorCode, PublishError};

/// Wire protocol for one platform's chunked upload endpoints
#[async_trait]
pub trait ChunkedUploadProtocol: Send + Sync {
    /// Open an upload session, returning the platform-assigned upload id
    async fn init(
        &self,
        file_name: &str,
        file_size: u64,
        chunk_size: u64,
    ) -> Result<String, PublishError>;

    /// Upload one chunk; `chunk_num` is 1-based
    async fn upload_chunk(
        &self,
        upload_id: &str,
        chunk_num: u32,
        total_chunks: u32,
        data: Vec<u8>,
    ) -> Result<(), PublishError>;

    /// Close the session, returning the external post/video id
    async fn finalize(&self, upload_id: &str) -> Result<String, PublishError>;
}

/// Upload session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Initialized,
    Uploading(u32),
    Finalizing,
    Completed,
    Failed(ErrorCode),
}

/// Transient per-attempt session bookkeeping; never persisted
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub upload_id: String,
    pub total_bytes: u64,
    pub chunk_size: u64,
    pub total_chunks: u32,
    pub chunks_sent: u32,
    pub state: UploadState,
}

impl UploadSession {
    fn new(upload_id: String, total_bytes: u64, chunk_size: u64, total_chunks: u32) -> Self {
        Self {
            upload_id,
            total_bytes,
            chunk_size,
            total_chunks,
            chunks_sent: 0,
            state: UploadState::Initialized,
        }
    }
}

/// Drives one file through a platform's chunked upload protocol
pub struct UploadPipeline<'a> {
    protocol: &'a dyn ChunkedUploadProtocol,
    chunk_size: u64,
}

impl<'a> UploadPipeline<'a> {
    pub fn new(protocol: &'a dyn ChunkedUploadProtocol, chunk_size: u64) -> Self {
        Self { protocol, chunk_size }
    }

    /// Run the full upload, returning the external id from finalize
    pub async fn run(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<String, PublishError> {
        let file_size = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => return Err(PublishError::FileNotFound(path.to_path_buf())),
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.bin".to_string());

        let total_chunks = file_size.div_ceil(self.chunk_size) as u32;

        tracing::info!(
            "[Upload] init: file={} size={} chunk_size={} chunks={}",
            file_name,
            file_size,
            self.chunk_size,
            total_chunks
        );

        let upload_id = self
            .protocol
            .init(&file_name, file_size, self.chunk_size)
            .await?;

        let mut session =
            UploadSession::new(upload_id.clone(), file_size, self.chunk_size, total_chunks);

        let mut file = File::open(path)
            .await
            .map_err(|_| PublishError::FileNotFound(path.to_path_buf()))?;
        file.seek(SeekFrom::Start(0)).await?;

        for chunk_num in 1..=total_chunks {
            if cancel.is_cancelled() {
                tracing::warn!(
                    "[Upload] cancelled at chunk {}/{}, abandoning session {}",
                    chunk_num,
                    total_chunks,
                    session.upload_id
                );
                session.state = UploadState::Failed(ErrorCode::Cancelled);
                return Err(PublishError::Cancelled);
            }

            let remaining = file_size - u64::from(chunk_num - 1) * self.chunk_size;
            let this_chunk = remaining.min(self.chunk_size) as usize;

            let mut buffer = vec![0u8; this_chunk];
            file.read_exact(&mut buffer).await.map_err(|e| {
                PublishError::ChunkUploadFailed {
                    chunk: chunk_num,
                    message: format!("read failed: {e}"),
                }
            })?;

            session.state = UploadState::Uploading(chunk_num);

            if let Err(e) = self
                .protocol
                .upload_chunk(&session.upload_id, chunk_num, total_chunks, buffer)
                .await
            {
                tracing::error!(
                    "[Upload] chunk {}/{} failed: {}",
                    chunk_num,
                    total_chunks,
                    e
                );
                session.state = UploadState::Failed(e.code());
                return Err(e);
            }

            session.chunks_sent = chunk_num;
            tracing::debug!("[Upload] chunk {}/{} sent", chunk_num, total_chunks);
        }

        if cancel.is_cancelled() {
            session.state = UploadState::Failed(ErrorCode::Cancelled);
            return Err(PublishError::Cancelled);
        }

        session.state = UploadState::Finalizing;
        let external_id = match self.protocol.finalize(&session.upload_id).await {
            Ok(id) => id,
            Err(e) => {
                session.state = UploadState::Failed(e.code());
                return Err(e);
            }
        };

        session.state = UploadState::Completed;
        tracing::info!(
            "[Upload] completed: session={} external_id={}",
            session.upload_id,
            external_id
        );
        Ok(external_id)
    }
}
