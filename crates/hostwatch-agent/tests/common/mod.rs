//! Shared test doubles for integration tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use hostwatch_agent::backend::{
    Backend, BackendError, InputLogEvent, LogStreamSummary, MetricDatum, PutLogEventsAck,
};

/// One captured `put_log_events` call.
#[derive(Debug, Clone)]
pub struct AppendCall {
    pub group: String,
    pub stream: String,
    pub token: Option<String>,
    pub messages: Vec<String>,
}

/// In-memory backend that records every call and hands out sequence
/// tokens the way the real service does.
#[derive(Default)]
pub struct RecordingBackend {
    pub appends: Mutex<Vec<AppendCall>>,
    pub metric_calls: Mutex<Vec<(String, Vec<MetricDatum>)>>,
    pub created_groups: Mutex<Vec<String>>,
    pub created_streams: Mutex<Vec<String>>,
    pub fail_next_metric_publish: AtomicBool,
    token_counter: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_count(&self) -> usize {
        self.appends.lock().unwrap().len()
    }

    pub fn metric_call_count(&self) -> usize {
        self.metric_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn put_metric_data(
        &self,
        namespace: &str,
        data: Vec<MetricDatum>,
    ) -> Result<(), BackendError> {
        if self.fail_next_metric_publish.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Http {
                status: 503,
                message: "publish rejected".to_string(),
            });
        }
        self.metric_calls
            .lock()
            .unwrap()
            .push((namespace.to_string(), data));
        Ok(())
    }

    async fn create_log_group(&self, group: &str) -> Result<(), BackendError> {
        self.created_groups.lock().unwrap().push(group.to_string());
        Ok(())
    }

    async fn create_log_stream(&self, _group: &str, stream: &str) -> Result<(), BackendError> {
        self.created_streams
            .lock()
            .unwrap()
            .push(stream.to_string());
        Ok(())
    }

    async fn describe_log_streams(
        &self,
        _group: &str,
        _limit: usize,
    ) -> Result<Vec<LogStreamSummary>, BackendError> {
        Ok(vec![])
    }

    async fn put_log_events(
        &self,
        group: &str,
        stream: &str,
        sequence_token: Option<&str>,
        events: Vec<InputLogEvent>,
    ) -> Result<PutLogEventsAck, BackendError> {
        self.appends.lock().unwrap().push(AppendCall {
            group: group.to_string(),
            stream: stream.to_string(),
            token: sequence_token.map(String::from),
            messages: events.into_iter().map(|e| e.message).collect(),
        });
        let next = self.token_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PutLogEventsAck {
            next_sequence_token: Some(format!("tok-{next}")),
        })
    }
}
