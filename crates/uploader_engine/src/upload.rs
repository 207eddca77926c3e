use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::transport::{decode_data, map_reqwest_error, ApiClient};
use crate::types::{ApiError, FailureKind, RemoteFileMeta};

/// Bytes handed to the transport per progress tick.
const CHUNK_SIZE: usize = 64 * 1024;

/// One file queued for transfer.
#[derive(Debug, Clone)]
pub struct UploadSource {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Receives batch-granular progress percentages while a transfer streams.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, percentage: u8);
}

#[derive(Debug, Deserialize)]
struct UploadData {
    files: Vec<RemoteFileMeta>,
}

/// Stream the batch to `POST {base}/files/upload` as one multipart
/// request, reporting percentages as body bytes are handed to the
/// transport.
///
/// The percentage covers the whole batch; one multipart body exposes no
/// per-file byte counts. On success the server's file list comes back in
/// submission order.
pub async fn upload_batch(
    client: &ApiClient,
    sources: Vec<UploadSource>,
    sink: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
) -> Result<Vec<RemoteFileMeta>, ApiError> {
    let total: u64 = sources.iter().map(|source| source.bytes.len() as u64).sum();
    let sent = Arc::new(AtomicU64::new(0));

    let mut form = Form::new();
    for source in &sources {
        let part = progress_part(source, total, Arc::clone(&sent), Arc::clone(&sink))?;
        form = form.part("files", part);
    }

    let request = client
        .upload_client()
        .post(client.url("files/upload"))
        .multipart(form);

    let response = tokio::select! {
        _ = cancel.cancelled() => {
            return Err(ApiError::new(FailureKind::Cancelled, "upload cancelled"));
        }
        result = request.send() => result.map_err(map_reqwest_error)?,
    };

    let data: UploadData = decode_data(response).await?;
    Ok(data.files)
}

/// Wrap one source as a multipart part whose chunks advance the shared
/// byte counter as the transport pulls them.
fn progress_part(
    source: &UploadSource,
    total: u64,
    sent: Arc<AtomicU64>,
    sink: Arc<dyn ProgressSink>,
) -> Result<Part, ApiError> {
    let payload = source.bytes.clone();
    let len = payload.len();
    let chunks = stream::iter((0..len).step_by(CHUNK_SIZE).map(move |offset| {
        let end = (offset + CHUNK_SIZE).min(len);
        let chunk = payload.slice(offset..end);
        let loaded = sent.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
        sink.emit(percentage(loaded, total));
        Ok::<Bytes, std::io::Error>(chunk)
    }));
    Part::stream_with_length(reqwest::Body::wrap_stream(chunks), len as u64)
        .file_name(source.name.clone())
        .mime_str(&source.mime_type)
        .map_err(|err| ApiError::new(FailureKind::InvalidRequest, err.to_string()))
}

fn percentage(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((loaded * 100 + total / 2) / total).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::percentage;

    #[test]
    fn percentage_rounds_to_nearest() {
        assert_eq!(percentage(0, 200), 0);
        assert_eq!(percentage(1, 200), 1);
        assert_eq!(percentage(99, 200), 50);
        assert_eq!(percentage(200, 200), 100);
    }

    #[test]
    fn percentage_of_empty_batch_is_complete() {
        assert_eq!(percentage(0, 0), 100);
    }
}
