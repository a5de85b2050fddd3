//! HTTP implementation of the backend operations.
//!
//! Every operation is a JSON POST under the configured endpoint. Calls are
//! bounded by the configured timeout and are not retried here: failed ticks
//! are re-driven by the scheduler, and retrying underneath it would break
//! the one-append-in-flight-per-stream contract.
//!
//! Log event payloads may be zstd-compressed (`Content-Encoding: zstd`)
//! when enabled; the remaining payloads are small enough that compressing
//! them is not worth the round trip through the encoder.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use zstd::stream::write::Encoder;

use crate::auth::CredentialStore;
use crate::backend::{
    Backend, BackendError, InputLogEvent, LogStreamSummary, MetricDatum, PutLogEventsAck,
};

const METRICS_PATH: &str = "/v1/metrics";
const LOG_GROUPS_PATH: &str = "/v1/log-groups";
const LOG_STREAMS_PATH: &str = "/v1/log-streams";
const DESCRIBE_STREAMS_PATH: &str = "/v1/log-streams/describe";
const LOG_EVENTS_PATH: &str = "/v1/log-events";

/// Error body returned by the backend on non-success statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
    expected_sequence_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DescribeResponse {
    log_streams: Vec<LogStreamSummary>,
}

pub struct HttpBackendConfig {
    pub endpoint: String,
    pub credentials: Arc<CredentialStore>,
    pub timeout: Duration,
    pub use_compression: bool,
    pub compression_level: i32,
}

/// Backend client speaking the telemetry service's JSON API.
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
    credentials: Arc<CredentialStore>,
    timeout: Duration,
    use_compression: bool,
    compression_level: i32,
}

impl HttpBackend {
    #[must_use]
    pub fn new(config: HttpBackendConfig) -> Self {
        HttpBackend {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            credentials: config.credentials,
            timeout: config.timeout,
            use_compression: config.use_compression,
            compression_level: config.compression_level,
        }
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        compress: bool,
    ) -> Result<reqwest::Response, BackendError> {
        let Some(token) = self.credentials.bearer().await else {
            return Err(BackendError::Transport(
                "no credentials issued yet".to_string(),
            ));
        };

        let url = format!("{}{}", self.endpoint, path);
        let mut request = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .bearer_auth(token)
            .header("Content-Type", "application/json");

        if compress && self.use_compression {
            let raw = serde_json::to_vec(body)
                .map_err(|e| BackendError::Transport(format!("serialize payload: {e}")))?;
            let encoded = self.encode(&raw)?;
            request = request.header("Content-Encoding", "zstd").body(encoded);
        } else {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(BackendError::Throttled);
        }

        let body = response.text().await.unwrap_or_default();
        let parsed: Option<ErrorBody> = serde_json::from_str(&body).ok();
        if let Some(err) = parsed {
            if err.error.as_deref() == Some("InvalidSequenceToken") {
                return Err(BackendError::InvalidSequenceToken {
                    expected: err.expected_sequence_token,
                });
            }
            return Err(BackendError::Http {
                status: status.as_u16(),
                message: err.message.or(err.error).unwrap_or_default(),
            });
        }
        Err(BackendError::Http {
            status: status.as_u16(),
            message: body,
        })
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, BackendError> {
        let mut encoder = Encoder::new(Vec::new(), self.compression_level)
            .map_err(|e| BackendError::Transport(format!("zstd encoder: {e}")))?;
        encoder
            .write_all(data)
            .map_err(|e| BackendError::Transport(format!("zstd write: {e}")))?;
        encoder
            .finish()
            .map_err(|e| BackendError::Transport(format!("zstd finish: {e}")))
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn put_metric_data(
        &self,
        namespace: &str,
        data: Vec<MetricDatum>,
    ) -> Result<(), BackendError> {
        let body = json!({
            "namespace": namespace,
            "metric_data": data,
        });
        self.post(METRICS_PATH, &body, false).await?;
        Ok(())
    }

    async fn create_log_group(&self, group: &str) -> Result<(), BackendError> {
        let body = json!({ "log_group_name": group });
        match self.post(LOG_GROUPS_PATH, &body, false).await {
            Ok(_) => Ok(()),
            // Pre-existing group is not an error
            Err(BackendError::Http { status: 409, .. }) => {
                debug!("BACKEND | Log group {} already exists", group);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), BackendError> {
        let body = json!({
            "log_group_name": group,
            "log_stream_name": stream,
        });
        match self.post(LOG_STREAMS_PATH, &body, false).await {
            Ok(_) => Ok(()),
            // Pre-existing stream is not an error
            Err(BackendError::Http { status: 409, .. }) => {
                debug!("BACKEND | Log stream {}/{} already exists", group, stream);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn describe_log_streams(
        &self,
        group: &str,
        limit: usize,
    ) -> Result<Vec<LogStreamSummary>, BackendError> {
        let body = json!({
            "log_group_name": group,
            "limit": limit,
        });
        let response = self.post(DESCRIBE_STREAMS_PATH, &body, false).await?;
        let parsed: DescribeResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Transport(format!("decode describe response: {e}")))?;
        Ok(parsed.log_streams)
    }

    async fn put_log_events(
        &self,
        group: &str,
        stream: &str,
        sequence_token: Option<&str>,
        events: Vec<InputLogEvent>,
    ) -> Result<PutLogEventsAck, BackendError> {
        let body = json!({
            "log_group_name": group,
            "log_stream_name": stream,
            "sequence_token": sequence_token,
            "log_events": events,
        });
        let response = self.post(LOG_EVENTS_PATH, &body, true).await?;
        let ack: PutLogEventsAck = response
            .json()
            .await
            .map_err(|e| BackendError::Transport(format!("decode append response: {e}")))?;
        Ok(ack)
    }
}
