use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Identifies one submission (a set of files sharing a cancellation
/// handle) across the engine boundary.
pub type BatchId = u64;

/// Classified failure for any transport operation. The message is the
/// human-readable text surfaced on tracked entries and notifications.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// DNS, connection or protocol failure before a status line arrived.
    Network,
    /// The request hit its configured timeout.
    Timeout,
    /// Non-2xx response.
    HttpStatus(u16),
    /// A 2xx response whose envelope carried `success: false`, or an
    /// undecodable body.
    Rejected,
    /// The operation was aborted through its cancellation handle.
    Cancelled,
    /// A poll loop gave up after its consecutive-failure budget.
    PollingExhausted,
    /// The server reported a status value outside the known set.
    UnrecognizedStatus(String),
    /// The call was malformed and no request was issued.
    InvalidRequest,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Rejected => write!(f, "rejected by server"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::PollingExhausted => write!(f, "polling exhausted"),
            FailureKind::UnrecognizedStatus(raw) => {
                write!(f, "unrecognized server status {raw}")
            }
            FailureKind::InvalidRequest => write!(f, "invalid request"),
        }
    }
}

/// Server-side description of one stored file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFileMeta {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

/// One page of the stored-file listing.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default, alias = "items")]
    pub files: Vec<RemoteFileMeta>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}

/// Acknowledgement body for delete and batch calls; servers often send
/// an empty or null payload here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

/// Raw server-side processing progress for one file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressInfo {
    #[serde(default)]
    pub percentage: Option<f64>,
    pub status: String,
}

impl ProgressInfo {
    /// Percentage clamped into 0..=100; absent early in processing.
    pub fn percent(&self) -> u8 {
        self.percentage.unwrap_or(0.0).round().clamp(0.0, 100.0) as u8
    }

    pub fn phase(&self) -> ServerStatus {
        ServerStatus::parse(&self.status)
    }
}

/// Normalized processing status, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Uploading,
    Completed,
    Failed,
    Other(String),
}

impl ServerStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "uploading" => ServerStatus::Uploading,
            "completed" => ServerStatus::Completed,
            "failed" => ServerStatus::Failed,
            _ => ServerStatus::Other(raw.to_owned()),
        }
    }
}

/// Listing query; defaults to the first page of everything, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    pub media_type: String,
    pub sort_by: String,
    pub order: String,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            media_type: "all".to_string(),
            sort_by: "uploadedAt".to_string(),
            order: "desc".to_string(),
        }
    }
}

/// Events emitted by the engine back to the session shell.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Byte progress for a whole in-flight batch.
    TransferProgress { batch: BatchId, percentage: u8 },
    /// The batch transfer settled, one way or the other.
    TransferSettled {
        batch: BatchId,
        result: Result<Vec<RemoteFileMeta>, ApiError>,
    },
    /// One successful progress query for a polled file.
    PollUpdate {
        index: usize,
        file_id: String,
        percentage: u8,
        status: ServerStatus,
    },
    /// A poll loop exhausted its consecutive-failure budget.
    PollExhausted {
        index: usize,
        file_id: String,
        error: ApiError,
    },
}
