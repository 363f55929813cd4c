//! Periodic ingestion from a data source into the shared stream buffer.
//!
//! Ingestion runs on its own interval timer of the host [`FrameLoop`],
//! independent of the render cadence. Each firing asks the producer for the
//! points newer than the buffer's latest timestamp and appends them.

use crate::config::IngestConfig;
use crate::data_types::Measurement;
use crate::error::{ConfigurationError, Result};
use crate::frame_loop::{FrameLoop, TimerId};
use crate::state::ChartState;
use crate::telemetry::SharedTelemetry;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Source of measurement batches. `since` is `None` for the initial fill.
pub trait BatchProducer {
    fn produce_batch(
        &mut self,
        since: Option<i64>,
        categories: &[String],
        batch_size: usize,
    ) -> Vec<Measurement>;
}

impl<F> BatchProducer for F
where
    F: FnMut(Option<i64>, &[String], usize) -> Vec<Measurement>,
{
    fn produce_batch(
        &mut self,
        since: Option<i64>,
        categories: &[String],
        batch_size: usize,
    ) -> Vec<Measurement> {
        self(since, categories, batch_size)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialBatchRequest {
    pub count: usize,
    pub categories: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaBatchRequest {
    pub since_timestamp: i64,
    pub categories: Vec<String>,
    pub batch_size: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub measurements: Vec<Measurement>,
}

/// Request/response boundary serving the initial and delta batches.
pub trait MeasurementEndpoint {
    fn fetch_initial(&mut self, request: &InitialBatchRequest) -> eyre::Result<BatchResponse>;
    fn fetch_delta(&mut self, request: &DeltaBatchRequest) -> eyre::Result<BatchResponse>;
}

/// Adapts a [`MeasurementEndpoint`] to [`BatchProducer`]. A failed fetch is
/// logged and yields an empty batch; the next firing retries.
pub struct EndpointProducer<E> {
    endpoint: E,
    failures: u64,
}

impl<E: MeasurementEndpoint> EndpointProducer<E> {
    pub fn new(endpoint: E) -> Self {
        Self {
            endpoint,
            failures: 0,
        }
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn into_inner(self) -> E {
        self.endpoint
    }
}

impl<E: MeasurementEndpoint> BatchProducer for EndpointProducer<E> {
    fn produce_batch(
        &mut self,
        since: Option<i64>,
        categories: &[String],
        batch_size: usize,
    ) -> Vec<Measurement> {
        let response = match since {
            None => self.endpoint.fetch_initial(&InitialBatchRequest {
                count: batch_size,
                categories: categories.to_vec(),
            }),
            Some(since_timestamp) => self.endpoint.fetch_delta(&DeltaBatchRequest {
                since_timestamp,
                categories: categories.to_vec(),
                batch_size,
            }),
        };
        match response {
            Ok(r) => r.measurements,
            Err(err) => {
                self.failures += 1;
                warn!(error = %format!("{err:#}"), ?since, "batch fetch failed");
                Vec::new()
            }
        }
    }
}

/// Handle to a running ingestion interval. Dropping it stops ingestion.
pub struct IngestionTimer {
    host: FrameLoop,
    timer: Option<TimerId>,
    batches: Rc<Cell<u64>>,
    points: Rc<Cell<u64>>,
}

impl IngestionTimer {
    /// Appends the initial batch synchronously, then schedules the deltas.
    pub fn start<P>(
        host: &FrameLoop,
        state: ChartState,
        config: &IngestConfig,
        mut producer: P,
        telemetry: Option<SharedTelemetry>,
    ) -> Result<Self>
    where
        P: BatchProducer + 'static,
    {
        if config.interval_ms == 0 {
            return Err(ConfigurationError::InvalidConfig(
                "ingest.interval_ms must be positive".into(),
            ));
        }
        let categories = config.categories.clone();
        let batches = Rc::new(Cell::new(0));
        let points = Rc::new(Cell::new(0));

        if config.initial_batch_size > 0 {
            let initial = producer.produce_batch(None, &categories, config.initial_batch_size);
            points.set(initial.len() as u64);
            debug!(points = initial.len(), "initial batch ingested");
            state.append(initial);
        }

        let (batch_size, initial_size) = (config.batch_size, config.initial_batch_size);
        let (b, p) = (Rc::clone(&batches), Rc::clone(&points));
        let timer = host.set_interval(config.interval_ms as f64, move |now_ms| {
            let started = Instant::now();
            let since = state.snapshot().latest_timestamp();
            // An emptied buffer is refilled the way it was first filled.
            let size = match since {
                None if initial_size > 0 => initial_size,
                _ => batch_size,
            };
            let batch = producer.produce_batch(since, &categories, size);
            let n = batch.len();
            if n > 0 {
                state.append(batch);
            }
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            if let Some(t) = &telemetry {
                t.lock().set_processing_time(elapsed_ms);
            }
            b.set(b.get() + 1);
            p.set(p.get() + n as u64);
            trace!(now_ms, points = n, elapsed_ms, "delta batch ingested");
        })?;

        Ok(Self {
            host: host.clone(),
            timer: Some(timer),
            batches,
            points,
        })
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Delta batches fetched so far, empty ones included.
    pub fn batches_ingested(&self) -> u64 {
        self.batches.get()
    }

    pub fn points_ingested(&self) -> u64 {
        self.points.get()
    }

    /// Clears the interval token; no producer call happens after this.
    pub fn stop(&mut self) {
        if let Some(id) = self.timer.take() {
            self.host.clear_interval(id);
            debug!(batches = self.batches.get(), "ingestion stopped");
        }
    }
}

impl Drop for IngestionTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
