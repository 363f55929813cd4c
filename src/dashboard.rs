//! Wires ingestion, rendering, telemetry and the table onto one frame loop.

use crate::config::ChartConfig;
use crate::error::{Result, TransientDrawError};
use crate::frame_loop::{FrameLoop, TimerId};
use crate::ingest::{BatchProducer, IngestionTimer};
use crate::pipeline::{ChartPipeline, FrameStats};
use crate::rendering::RenderSurface;
use crate::scheduler::RenderScheduler;
use crate::state::ChartState;
use crate::table::{TableRow, TableView};
use crate::telemetry::{
    MemoryProbe, PerformanceAggregator, PerformanceMetrics, ProcMemoryProbe, SharedTelemetry,
};
use crossbeam_channel::Receiver;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info};

pub struct Dashboard {
    config: ChartConfig,
    host: FrameLoop,
    state: ChartState,
    telemetry: SharedTelemetry,
    scheduler: RenderScheduler,
    pipeline: Rc<RefCell<ChartPipeline>>,
    table: TableView,
    probe: Rc<dyn MemoryProbe>,
    ingestion: Option<IngestionTimer>,
    memory_timer: Option<TimerId>,
    last_frame: Rc<Cell<FrameStats>>,
}

impl Dashboard {
    pub fn new(config: ChartConfig) -> Result<Self> {
        config.validate()?;
        let host = FrameLoop::new(config.render.refresh_rate_hz)?;
        let state = ChartState::new(config.buffer.capacity, config.viewport.clone())?;
        let telemetry =
            PerformanceAggregator::new(&config.telemetry, config.render.target_fps).shared();
        let scheduler = RenderScheduler::new(host.clone()).with_telemetry(Arc::clone(&telemetry));
        let table = TableView::new(&config.table, config.display_timezone)?;
        let pipeline = Rc::new(RefCell::new(ChartPipeline::new(&config)));
        Ok(Self {
            config,
            host,
            state,
            telemetry,
            scheduler,
            pipeline,
            table,
            probe: Rc::new(ProcMemoryProbe),
            ingestion: None,
            memory_timer: None,
            last_frame: Rc::new(Cell::new(FrameStats::default())),
        })
    }

    pub fn with_memory_probe(mut self, probe: impl MemoryProbe + 'static) -> Self {
        self.probe = Rc::new(probe);
        self
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn host(&self) -> &FrameLoop {
        &self.host
    }

    pub fn state(&self) -> &ChartState {
        &self.state
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    pub fn table(&mut self) -> &mut TableView {
        &mut self.table
    }

    pub fn pipeline(&self) -> Rc<RefCell<ChartPipeline>> {
        Rc::clone(&self.pipeline)
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.telemetry.lock().metrics()
    }

    pub fn telemetry(&self) -> SharedTelemetry {
        Arc::clone(&self.telemetry)
    }

    pub fn errors(&self) -> Receiver<TransientDrawError> {
        self.scheduler.errors()
    }

    pub fn last_frame(&self) -> FrameStats {
        self.last_frame.get()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Starts ingestion, memory sampling and rendering into `surface`.
    /// Restarting replaces the previous producer and surface.
    pub fn start<S, P>(&mut self, surface: Rc<RefCell<S>>, producer: P) -> Result<()>
    where
        S: RenderSurface + 'static,
        P: BatchProducer + 'static,
    {
        self.stop();

        self.ingestion = Some(IngestionTimer::start(
            &self.host,
            self.state.clone(),
            &self.config.ingest,
            producer,
            Some(Arc::clone(&self.telemetry)),
        )?);

        let (probe, telemetry) = (Rc::clone(&self.probe), Arc::clone(&self.telemetry));
        let threshold_mb = self.config.telemetry.growth_threshold_mb;
        self.memory_timer = Some(self.host.set_interval(
            self.config.telemetry.memory_interval_ms as f64,
            move |_| {
                if let Some(bytes) = probe.used_bytes() {
                    let mut t = telemetry.lock();
                    t.sample_memory(bytes);
                    t.check_growth(threshold_mb);
                }
            },
        )?);

        let (state, pipeline, last_frame) = (
            self.state.clone(),
            Rc::clone(&self.pipeline),
            Rc::clone(&self.last_frame),
        );
        self.scheduler.start(move |time| {
            let mut surface = surface.borrow_mut();
            let stats = pipeline
                .borrow_mut()
                .frame(&state, &mut *surface, time.now_ms as u64)?;
            last_frame.set(stats);
            Ok(())
        });
        info!(
            capacity = self.config.buffer.capacity,
            refresh_rate_hz = self.config.render.refresh_rate_hz,
            "dashboard started"
        );
        Ok(())
    }

    /// Stops every timeline. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.scheduler.stop();
        if let Some(mut ingestion) = self.ingestion.take() {
            ingestion.stop();
        }
        if let Some(id) = self.memory_timer.take() {
            self.host.clear_interval(id);
            debug!("memory sampling stopped");
        }
    }

    /// Syncs the table with the current visible set and returns its rows.
    pub fn table_rows(&mut self) -> Result<Vec<TableRow>> {
        self.table.sync(&self.state)?;
        Ok(self.table.rows())
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.stop();
    }
}
