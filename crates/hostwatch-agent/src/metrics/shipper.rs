//! Batched publishing of metric snapshots.

use std::sync::Arc;
use tracing::debug;

use crate::backend::{Backend, Dimension, MetricDatum};
use crate::error::AgentError;
use crate::metrics::MetricValue;

/// Publishes the full metric snapshot in one call per tick.
///
/// All-or-nothing: a failed publish fails the tick and the next tick
/// republishes current state, so no per-metric retry is needed. The
/// `InstanceId` and `Hostname` dimensions are fixed at startup and attached
/// to every datum.
pub struct MetricShipper {
    backend: Arc<dyn Backend>,
    namespace: String,
    dimensions: Vec<Dimension>,
}

impl MetricShipper {
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        namespace: &str,
        instance_id: &str,
        hostname: &str,
    ) -> Self {
        MetricShipper {
            backend,
            namespace: namespace.to_string(),
            dimensions: vec![
                Dimension {
                    name: "InstanceId".to_string(),
                    value: instance_id.to_string(),
                },
                Dimension {
                    name: "Hostname".to_string(),
                    value: hostname.to_string(),
                },
            ],
        }
    }

    pub async fn ship(&self, values: Vec<MetricValue>) -> Result<(), AgentError> {
        let data: Vec<MetricDatum> = values
            .into_iter()
            .map(|v| MetricDatum {
                name: v.name.to_string(),
                unit: v.unit.as_str().to_string(),
                value: v.value,
                dimensions: self.dimensions.clone(),
            })
            .collect();

        debug!(
            "METRICS | Publishing {} data points under {}",
            data.len(),
            self.namespace
        );
        self.backend
            .put_metric_data(&self.namespace, data)
            .await
            .map_err(AgentError::from)
    }
}
