//! Metrics sink implementations.
//!
//! The NATS sink publishes gauge/counter updates to
//! `sx9.aircomm.telemetry.{metric}` subjects through a bounded channel; when
//! no broker is reachable it runs in offline mode and drains the channel so
//! the tick path never blocks. A tracing-backed sink and a recording sink
//! (for tests) are also provided.

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::interfaces::MetricsSink;

const NATS_DEFAULT_URL: &str = "nats://127.0.0.1:18020";
const CHANNEL_CAPACITY: usize = 1000;

/// One metric update on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MetricEvent {
    Gauge {
        name: String,
        value: f64,
        labels: Vec<(String, String)>,
        timestamp: i64,
    },
    Counter {
        name: String,
        labels: Vec<(String, String)>,
        timestamp: i64,
    },
}

impl MetricEvent {
    fn name(&self) -> &str {
        match self {
            MetricEvent::Gauge { name, .. } | MetricEvent::Counter { name, .. } => name,
        }
    }
}

/// NATS-backed metrics sink. `set_gauge`/`inc_counter` enqueue without
/// blocking; a full channel drops the update.
pub struct NatsMetricsSink {
    event_tx: mpsc::Sender<MetricEvent>,
}

/// The publishing half; run it on its own task.
pub struct NatsPublisherTask {
    client: Option<async_nats::Client>,
    event_rx: mpsc::Receiver<MetricEvent>,
}

impl NatsMetricsSink {
    /// Connect to NATS (env `NATS_URL`, offline mode when unreachable) and
    /// split into the sink and its publishing task.
    pub async fn connect() -> (Self, NatsPublisherTask) {
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let nats_url = std::env::var("NATS_URL").unwrap_or_else(|_| NATS_DEFAULT_URL.to_string());
        let client = match async_nats::connect(&nats_url).await {
            Ok(client) => {
                tracing::info!("connected to NATS at {}", nats_url);
                Some(client)
            }
            Err(e) => {
                warn!("NATS not available: {} (metrics drop to offline mode)", e);
                None
            }
        };

        (
            Self { event_tx },
            NatsPublisherTask { client, event_rx },
        )
    }
}

impl MetricsSink for NatsMetricsSink {
    fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        let _ = self.event_tx.try_send(MetricEvent::Gauge {
            name: name.to_string(),
            value,
            labels: owned_labels(labels),
            timestamp: Utc::now().timestamp_millis(),
        });
    }

    fn inc_counter(&self, name: &str, labels: &[(&str, &str)]) {
        let _ = self.event_tx.try_send(MetricEvent::Counter {
            name: name.to_string(),
            labels: owned_labels(labels),
            timestamp: Utc::now().timestamp_millis(),
        });
    }
}

impl NatsPublisherTask {
    /// Publish queued events until the sink side is dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.event_rx.recv().await {
            match &self.client {
                Some(client) => {
                    let subject = format!("sx9.aircomm.telemetry.{}", event.name());
                    match serde_json::to_vec(&event) {
                        Ok(payload) => {
                            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                                tracing::error!("failed to publish to {}: {}", subject, e);
                            }
                        }
                        Err(e) => tracing::error!("metric serialization failed: {}", e),
                    }
                }
                None => {
                    // Offline: discard to keep the channel drained.
                }
            }
        }
        debug!("telemetry channel closed");
    }
}

fn owned_labels(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Logs every update at debug level. Useful for local runs without a broker.
#[derive(Debug, Default)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        debug!(metric = name, value, ?labels, "gauge");
    }

    fn inc_counter(&self, name: &str, labels: &[(&str, &str)]) {
        debug!(metric = name, ?labels, "counter");
    }
}

/// Captures updates in memory for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    gauges: Mutex<Vec<(String, f64, Vec<(String, String)>)>>,
    counters: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gauge_values(&self, name: &str) -> Vec<f64> {
        self.gauges
            .lock()
            .iter()
            .filter(|(n, _, _)| n == name)
            .map(|(_, v, _)| *v)
            .collect()
    }

    pub fn last_gauge(&self, name: &str) -> Option<f64> {
        self.gauge_values(name).last().copied()
    }

    pub fn last_gauge_with_label(&self, name: &str, key: &str, value: &str) -> Option<f64> {
        self.gauges
            .lock()
            .iter()
            .filter(|(n, _, labels)| {
                n == name && labels.iter().any(|(k, v)| k == key && v == value)
            })
            .map(|(_, v, _)| *v)
            .last()
    }

    pub fn counter_count(&self, name: &str) -> usize {
        self.counters.lock().iter().filter(|(n, _)| n == name).count()
    }
}

impl MetricsSink for RecordingSink {
    fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        self.gauges
            .lock()
            .push((name.to_string(), value, owned_labels(labels)));
    }

    fn inc_counter(&self, name: &str, labels: &[(&str, &str)]) {
        self.counters
            .lock()
            .push((name.to_string(), owned_labels(labels)));
    }
}
