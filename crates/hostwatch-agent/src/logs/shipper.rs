//! Ordered shipping of queued events to the backend.
//!
//! One shipping tick drains every source's queue and performs at most one
//! token-chained append per source. Ticks are serialized by the scheduler,
//! so a stream never has two appends in flight.
//!
//! # Failure handling
//!
//! A failed append never aborts the tick for the other sources. The
//! drained batch is put back at the front of its queue, so delivery is
//! at-least-once (a duplicate flush is possible when the backend accepted
//! the append but the response was lost). On a sequence-token mismatch the
//! shipper resyncs the token, from the error itself when the backend
//! reports the expected token, otherwise by re-describing the stream, so
//! one stale token does not stall the stream forever.

use std::sync::Arc;
use tracing::{debug, error};

use crate::backend::{Backend, BackendError, InputLogEvent};
use crate::error::AgentError;
use crate::logs::queue::EventQueue;
use crate::logs::source::LogSource;

/// Streams listed per describe call when seeding or resyncing tokens.
/// Matches the source cap, so one call covers every stream the agent owns.
const DESCRIBE_STREAMS_LIMIT: usize = 50;

/// Backend stream identity and sequencing state for one source.
#[derive(Debug, Clone)]
pub struct LogStreamState {
    pub group_name: String,
    pub stream_name: String,
    pub sequence_token: Option<String>,
}

struct SourceLane {
    queue: EventQueue,
    stream: LogStreamState,
}

/// Drains every source queue and appends to the backend in order.
pub struct LogShipper {
    backend: Arc<dyn Backend>,
    lanes: Vec<SourceLane>,
}

impl LogShipper {
    /// Startup handshake: ensure the group exists, ensure one stream per
    /// source, and seed sequence tokens for streams that already hold
    /// entries. Failures here are fatal; everything downstream assumes the
    /// streams exist.
    pub async fn initialize(
        backend: Arc<dyn Backend>,
        group_name: &str,
        sources: Vec<(LogSource, EventQueue)>,
    ) -> Result<Self, AgentError> {
        backend.create_log_group(group_name).await?;
        let existing = backend
            .describe_log_streams(group_name, DESCRIBE_STREAMS_LIMIT)
            .await?;

        let mut lanes = Vec::with_capacity(sources.len());
        for (source, queue) in sources {
            backend.create_log_stream(group_name, &source.name).await?;
            let sequence_token = existing
                .iter()
                .find(|s| s.stream_name == source.name)
                .and_then(|s| s.upload_sequence_token.clone());
            lanes.push(SourceLane {
                stream: LogStreamState {
                    group_name: group_name.to_string(),
                    stream_name: source.name,
                    sequence_token,
                },
                queue,
            });
        }

        Ok(LogShipper { backend, lanes })
    }

    /// One shipping tick over every source, in registry order.
    ///
    /// Returns the number of events shipped, or an error naming the
    /// sources whose appends failed. Either way every source gets its
    /// turn.
    pub async fn ship_all(&mut self) -> Result<usize, AgentError> {
        let backend = Arc::clone(&self.backend);
        let mut shipped = 0;
        let mut failed: Vec<String> = Vec::new();

        for lane in &mut self.lanes {
            match Self::ship_lane(backend.as_ref(), lane).await {
                Ok(count) => shipped += count,
                Err(e) => {
                    error!(
                        "LOGS | Append to {} failed: {}",
                        lane.stream.stream_name, e
                    );
                    failed.push(lane.stream.stream_name.clone());
                }
            }
        }

        if failed.is_empty() {
            Ok(shipped)
        } else {
            Err(AgentError::LogShipping(failed.join(", ")))
        }
    }

    async fn ship_lane(
        backend: &dyn Backend,
        lane: &mut SourceLane,
    ) -> Result<usize, BackendError> {
        let batch = lane.queue.drain();
        if batch.is_empty() {
            // No call for an empty batch
            return Ok(0);
        }

        let events: Vec<InputLogEvent> = batch
            .iter()
            .map(|e| InputLogEvent {
                timestamp: e.timestamp_millis,
                message: e.message.clone(),
            })
            .collect();

        match backend
            .put_log_events(
                &lane.stream.group_name,
                &lane.stream.stream_name,
                lane.stream.sequence_token.as_deref(),
                events,
            )
            .await
        {
            Ok(ack) => {
                lane.stream.sequence_token = ack.next_sequence_token;
                debug!(
                    "LOGS | Shipped {} events to {}",
                    batch.len(),
                    lane.stream.stream_name
                );
                Ok(batch.len())
            }
            Err(e) => {
                // Requeue ahead of anything enqueued since the drain so the
                // retry next tick keeps observed order
                lane.queue.requeue_front(batch);
                if let BackendError::InvalidSequenceToken { expected } = &e {
                    match expected {
                        Some(token) => {
                            lane.stream.sequence_token = Some(token.clone());
                            debug!(
                                "LOGS | Resynced token for {} from rejection",
                                lane.stream.stream_name
                            );
                        }
                        None => Self::resync_token(backend, &mut lane.stream).await,
                    }
                }
                Err(e)
            }
        }
    }

    /// Re-describes the stream to recover the token the backend expects.
    /// Best effort: on failure the stale token is kept for the next tick.
    async fn resync_token(backend: &dyn Backend, stream: &mut LogStreamState) {
        match backend
            .describe_log_streams(&stream.group_name, DESCRIBE_STREAMS_LIMIT)
            .await
        {
            Ok(streams) => {
                if let Some(summary) = streams
                    .into_iter()
                    .find(|s| s.stream_name == stream.stream_name)
                {
                    debug!("LOGS | Resynced token for {} via describe", stream.stream_name);
                    stream.sequence_token = summary.upload_sequence_token;
                }
            }
            Err(e) => {
                debug!(
                    "LOGS | Token resync for {} failed: {}",
                    stream.stream_name, e
                );
            }
        }
    }

    /// Current sequence token for a stream, if the stream exists.
    #[must_use]
    pub fn sequence_token(&self, stream_name: &str) -> Option<&str> {
        self.lanes
            .iter()
            .find(|l| l.stream.stream_name == stream_name)
            .and_then(|l| l.stream.sequence_token.as_deref())
    }

    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }
}
