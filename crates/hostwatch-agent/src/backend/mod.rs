//! Backend operations consumed by the shippers.
//!
//! The wire format belongs to the collaborator behind [`Backend`]; the core
//! only depends on the five operations below. The production implementation
//! is [`client::HttpBackend`]; tests substitute in-memory recorders.
//!
//! # Sequencing contract
//!
//! `put_log_events` is a single-writer ordered append: the caller must
//! supply the sequence token returned by the previous successful append to
//! the same stream (or `None` for a fresh stream). A mismatch fails with
//! [`BackendError::InvalidSequenceToken`], which may carry the token the
//! backend expected.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A name/value tag attached to a published metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

/// One metric value in a `put_metric_data` batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDatum {
    pub name: String,
    pub unit: String,
    pub value: f64,
    pub dimensions: Vec<Dimension>,
}

/// One log event in a `put_log_events` batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLogEvent {
    pub timestamp: i64,
    pub message: String,
}

/// Stream metadata returned by `describe_log_streams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStreamSummary {
    pub stream_name: String,
    pub upload_sequence_token: Option<String>,
}

/// Acknowledgement of a successful ordered append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutLogEventsAck {
    pub next_sequence_token: Option<String>,
}

/// Errors surfaced by backend operations.
///
/// All of these are transient from the scheduler's point of view; none
/// crosses a job boundary.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The supplied sequence token does not match the stream head.
    /// `expected` carries the backend's current token when it reports one.
    #[error("sequence token rejected by backend")]
    InvalidSequenceToken { expected: Option<String> },

    #[error("request throttled by backend")]
    Throttled,

    #[error("backend returned status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

/// The telemetry backend, as seen by the shippers.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Publish a batch of metric data under a namespace.
    async fn put_metric_data(
        &self,
        namespace: &str,
        data: Vec<MetricDatum>,
    ) -> Result<(), BackendError>;

    /// Create a log group. Pre-existing groups are not an error.
    async fn create_log_group(&self, group: &str) -> Result<(), BackendError>;

    /// Create a log stream in a group. Pre-existing streams are not an error.
    async fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), BackendError>;

    /// List streams in a group, with their current upload sequence tokens.
    async fn describe_log_streams(
        &self,
        group: &str,
        limit: usize,
    ) -> Result<Vec<LogStreamSummary>, BackendError>;

    /// Ordered append of `events` to a stream. `sequence_token` must match
    /// the token returned by the previous successful append.
    async fn put_log_events(
        &self,
        group: &str,
        stream: &str,
        sequence_token: Option<&str>,
        events: Vec<InputLogEvent>,
    ) -> Result<PutLogEventsAck, BackendError>;
}
