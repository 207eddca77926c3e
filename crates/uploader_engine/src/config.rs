use std::time::Duration;

/// Connection settings for the remote file service.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the service, e.g. `http://localhost:8083/api/v1`.
    pub base_url: String,
    /// Total timeout for request/response calls. The upload call is
    /// exempt: it streams arbitrarily large bodies and is bounded only by
    /// the transfer itself.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Delay between successive progress queries for one file.
    pub poll_interval: Duration,
    /// Consecutive query failures tolerated before a poll loop gives up.
    pub max_poll_retries: u32,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8083/api/v1".to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(1000),
            max_poll_retries: 3,
        }
    }
}
