// Core modules
pub mod config;
pub mod core;
pub mod credentials;
pub mod orchestrator;
pub mod platforms;
pub mod storage;
pub mod upload;

// Re-export the public surface for easy access
pub use crate::config::{OAuthAppConfig, PlatformConfig, PlatformRegistry};
pub use crate::core::{
    Credential, ErrorCode, MediaItem, MediaKind, MediaSource, PlatformId, Post, PostMetrics,
    ProfileInfo, PublishError, PublishResult,
};
pub use crate::credentials::{CredentialResolver, TokenRefresher};
pub use crate::orchestrator::PublishOrchestrator;
pub use crate::platforms::{AdapterSet, PlatformAdapter};
pub use crate::storage::{CredentialStore, MemoryCredentialStore, SqliteCredentialStore};
pub use crate::upload::{ChunkedUploadProtocol, UploadPipeline, UploadSession, UploadState};

/// Initialize tracing for logging
///
/// Embedders with their own subscriber should skip this.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_thread_ids(true)
        .with_target(false)
        .init();
}
