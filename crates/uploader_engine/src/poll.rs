use std::sync::mpsc;
use std::time::Duration;

use client_logging::{client_debug, client_warn};
use tokio_util::sync::CancellationToken;

use crate::transport::ApiClient;
use crate::types::{ApiError, EngineEvent, FailureKind, ProgressInfo, ServerStatus};

/// Seam for querying server-side processing progress, so poll loops can
/// be exercised without a live client.
#[async_trait::async_trait]
pub trait ProgressQuery: Send + Sync {
    async fn query(&self, file_id: &str) -> Result<ProgressInfo, ApiError>;
}

#[async_trait::async_trait]
impl ProgressQuery for ApiClient {
    async fn query(&self, file_id: &str) -> Result<ProgressInfo, ApiError> {
        self.get_progress(file_id).await
    }
}

/// Poll the processing status of one file until it reaches a terminal
/// state, the consecutive-failure budget runs out, or the token is
/// cancelled.
///
/// The first query fires immediately; later ones are spaced by
/// `interval`. Cancellation is observed between queries: a request that
/// is already on the wire completes and its result is discarded.
pub async fn poll_progress(
    source: &dyn ProgressQuery,
    index: usize,
    file_id: String,
    interval: Duration,
    max_retries: u32,
    events: mpsc::Sender<EngineEvent>,
    cancel: CancellationToken,
) {
    let mut consecutive_failures = 0u32;
    loop {
        let result = source.query(&file_id).await;
        if cancel.is_cancelled() {
            return;
        }
        match result {
            Ok(info) => {
                consecutive_failures = 0;
                let status = info.phase();
                if let ServerStatus::Other(raw) = &status {
                    client_warn!("file {file_id}: unrecognized server status {raw:?}, polling stopped");
                }
                let terminal = !matches!(status, ServerStatus::Uploading);
                let _ = events.send(EngineEvent::PollUpdate {
                    index,
                    file_id: file_id.clone(),
                    percentage: info.percent(),
                    status,
                });
                if terminal {
                    return;
                }
            }
            Err(err) => {
                consecutive_failures += 1;
                if consecutive_failures > max_retries {
                    let _ = events.send(EngineEvent::PollExhausted {
                        index,
                        file_id,
                        error: ApiError::new(
                            FailureKind::PollingExhausted,
                            format!("progress polling failed after {max_retries} retries: {err}"),
                        ),
                    });
                    return;
                }
                client_debug!(
                    "progress query for {file_id} failed ({err}), retry {consecutive_failures}/{max_retries}"
                );
            }
        }
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
