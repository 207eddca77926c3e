//! Uploader engine: transport adapter, batch submission and progress polling.
mod config;
mod engine;
mod poll;
mod transport;
mod types;
mod upload;

pub use config::ApiConfig;
pub use engine::EngineHandle;
pub use poll::{poll_progress, ProgressQuery};
pub use transport::ApiClient;
pub use types::{
    Ack, ApiError, BatchId, EngineEvent, FailureKind, ListQuery, Page, ProgressInfo,
    RemoteFileMeta, ServerStatus,
};
pub use upload::{upload_batch, ProgressSink, UploadSource};
