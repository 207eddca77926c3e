use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::types::{Ack, ApiError, FailureKind, ListQuery, Page, ProgressInfo, RemoteFileMeta};

/// HTTP client for the file service.
///
/// Every operation issues exactly one outbound request and returns a
/// tagged result; retries belong to the caller. Failures never escape as
/// panics.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: reqwest::Client,
    upload_http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        // No total timeout on the upload client; the transfer is bounded
        // by its own cancellation handle instead.
        let upload_http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            config,
            http,
            upload_http,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub(crate) fn upload_client(&self) -> &reqwest::Client {
        &self.upload_http
    }

    pub(crate) fn url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// `GET {base}/files` with pagination and sort parameters.
    pub async fn list_files(&self, query: &ListQuery) -> Result<Page, ApiError> {
        let response = self
            .http
            .get(self.url("files"))
            .query(&[
                ("page", query.page.to_string()),
                ("pageSize", query.page_size.to_string()),
                ("type", query.media_type.clone()),
                ("sortBy", query.sort_by.clone()),
                ("order", query.order.clone()),
            ])
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode_data(response).await
    }

    /// `DELETE {base}/files/{id}`.
    pub async fn delete_file(&self, file_id: &str) -> Result<Ack, ApiError> {
        let response = self
            .http
            .delete(self.url(&format!("files/{file_id}")))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode_data_or_default(response).await
    }

    /// `GET {base}/files/{id}`.
    pub async fn file_detail(&self, file_id: &str) -> Result<RemoteFileMeta, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("files/{file_id}")))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode_data(response).await
    }

    /// `POST {base}/files/batch` with `{operation, fileIds, targetFolder}`.
    pub async fn batch_operation(
        &self,
        operation: &str,
        file_ids: &[String],
        target_folder: Option<&str>,
    ) -> Result<Ack, ApiError> {
        let body = serde_json::json!({
            "operation": operation,
            "fileIds": file_ids,
            "targetFolder": target_folder,
        });
        let response = self
            .http
            .post(self.url("files/batch"))
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode_data_or_default(response).await
    }

    /// `GET {base}/files/progress/{id}`.
    pub async fn get_progress(&self, file_id: &str) -> Result<ProgressInfo, ApiError> {
        if file_id.is_empty() {
            return Err(ApiError::new(FailureKind::InvalidRequest, "missing file id"));
        }
        let response = self
            .http
            .get(self.url(&format!("files/progress/{file_id}")))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode_data(response).await
    }
}

/// Every endpoint wraps its payload in this envelope; failures may carry
/// a message at either level.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    error: Option<ErrorBody>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl<T> Envelope<T> {
    fn failure_message(&self) -> Option<String> {
        self.error
            .as_ref()
            .and_then(|error| error.message.clone())
            .or_else(|| self.message.clone())
    }
}

pub(crate) async fn decode_data<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let envelope = read_envelope::<T>(response).await?;
    match envelope.data {
        Some(data) => Ok(data),
        None => Err(ApiError::new(
            FailureKind::Rejected,
            envelope
                .failure_message()
                .unwrap_or_else(|| "response carried no data".to_string()),
        )),
    }
}

/// Like [`decode_data`], but tolerates an absent payload; delete and
/// batch acknowledgements often ship `data: null`.
async fn decode_data_or_default<T: DeserializeOwned + Default>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let envelope = read_envelope::<T>(response).await?;
    Ok(envelope.data.unwrap_or_default())
}

async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Envelope<T>, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    if !status.is_success() {
        let message = serde_json::from_slice::<Envelope<serde_json::Value>>(&bytes)
            .ok()
            .and_then(|envelope| envelope.failure_message())
            .unwrap_or_else(|| format!("request failed: {status}"));
        return Err(ApiError::new(
            FailureKind::HttpStatus(status.as_u16()),
            message,
        ));
    }
    let envelope: Envelope<T> = serde_json::from_slice(&bytes).map_err(|err| {
        ApiError::new(FailureKind::Rejected, format!("malformed response body: {err}"))
    })?;
    if !envelope.success {
        return Err(ApiError::new(
            FailureKind::Rejected,
            envelope
                .failure_message()
                .unwrap_or_else(|| "request rejected".to_string()),
        ));
    }
    Ok(envelope)
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
