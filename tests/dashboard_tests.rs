use std::cell::RefCell;
use std::rc::Rc;
use stream_chart::config::ViewportConfig;
use stream_chart::ingest::{
    BatchResponse, DeltaBatchRequest, EndpointProducer, InitialBatchRequest, MeasurementEndpoint,
};
use stream_chart::rendering::DrawCommand;
use stream_chart::telemetry::FixedMemoryProbe;
use stream_chart::{
    CategoryFilter, ChartConfig, ChartPipeline, ChartState, Dashboard, FrameLoop, IngestionTimer,
    Measurement, RecordingSurface,
};

/// One point per category every 10 ms after `since`.
fn ticker(since: Option<i64>, categories: &[String], size: usize) -> Vec<Measurement> {
    let start = since.unwrap_or(0);
    (1..=size as i64)
        .flat_map(|i| {
            categories
                .iter()
                .map(move |c| Measurement::new(start + i * 10, (i % 50) as f64, c.as_str()))
        })
        .collect()
}

fn small_config() -> ChartConfig {
    let mut config = ChartConfig::default();
    config.buffer.capacity = 500;
    config.ingest.initial_batch_size = 20;
    config.ingest.batch_size = 5;
    config.ingest.interval_ms = 100;
    config.ingest.categories = vec!["cpu".into(), "memory".into()];
    config
}

#[test]
fn test_ingestion_appends_on_its_own_cadence() {
    let config = small_config();
    let host = FrameLoop::new(60.0).unwrap();
    let state = ChartState::new(config.buffer.capacity, ViewportConfig::default()).unwrap();
    let mut timer =
        IngestionTimer::start(&host, state.clone(), &config.ingest, ticker, None).unwrap();

    assert_eq!(state.len(), 40, "initial batch is appended synchronously");
    host.advance(350.0);
    assert_eq!(timer.batches_ingested(), 3);
    assert_eq!(state.len(), 40 + 3 * 10);

    timer.stop();
    assert_eq!(host.active_timers(), 0);
    host.advance(1_000.0);
    assert_eq!(state.len(), 70);
    assert!(!timer.is_running());
}

#[test]
fn test_deltas_continue_from_latest_timestamp() {
    let config = small_config();
    let host = FrameLoop::new(60.0).unwrap();
    let state = ChartState::new(1_000, ViewportConfig::default()).unwrap();
    let _timer = IngestionTimer::start(&host, state.clone(), &config.ingest, ticker, None).unwrap();
    host.advance(500.0);

    let snapshot = state.snapshot();
    assert!(snapshot.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(snapshot.latest_timestamp(), Some(200 + 5 * 50));
    assert_eq!(state.known_categories(), vec!["cpu".to_string(), "memory".to_string()]);
}

#[test]
fn test_cleared_buffer_is_refilled_with_initial_batch() {
    let config = small_config();
    let host = FrameLoop::new(60.0).unwrap();
    let state = ChartState::new(1_000, ViewportConfig::default()).unwrap();
    let _timer = IngestionTimer::start(&host, state.clone(), &config.ingest, ticker, None).unwrap();
    host.advance(100.0);
    assert_eq!(state.len(), 40 + 10);

    state.clear();
    host.advance(100.0);
    // 20 points per category, not the 5 of a delta batch.
    assert_eq!(state.len(), 40);
    assert_eq!(state.snapshot().latest_timestamp(), Some(200));
}

struct FlakyEndpoint {
    calls: usize,
}

impl MeasurementEndpoint for FlakyEndpoint {
    fn fetch_initial(&mut self, request: &InitialBatchRequest) -> eyre::Result<BatchResponse> {
        Ok(BatchResponse {
            measurements: ticker(None, &request.categories, request.count),
        })
    }

    fn fetch_delta(&mut self, request: &DeltaBatchRequest) -> eyre::Result<BatchResponse> {
        self.calls += 1;
        if self.calls % 2 == 0 {
            eyre::bail!("connection reset");
        }
        Ok(BatchResponse {
            measurements: ticker(
                Some(request.since_timestamp),
                &request.categories,
                request.batch_size,
            ),
        })
    }
}

#[test]
fn test_endpoint_failures_yield_empty_batches() {
    let config = small_config();
    let host = FrameLoop::new(60.0).unwrap();
    let state = ChartState::new(1_000, ViewportConfig::default()).unwrap();
    let producer = EndpointProducer::new(FlakyEndpoint { calls: 0 });
    let timer = IngestionTimer::start(&host, state.clone(), &config.ingest, producer, None).unwrap();
    host.advance(400.0);

    assert_eq!(timer.batches_ingested(), 4);
    assert_eq!(state.len(), 40 + 2 * 10);
}

#[test]
fn test_request_shapes_serialize_camel_case() {
    let request = DeltaBatchRequest {
        since_timestamp: 42,
        categories: vec!["cpu".into()],
        batch_size: 10,
    };
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["sinceTimestamp"], 42);
    assert_eq!(json["batchSize"], 10);

    let response: BatchResponse = serde_json::from_str(
        r#"{"measurements": [{"timestamp": 5, "value": 1.5, "category": "cpu"}]}"#,
    )
    .unwrap();
    assert_eq!(response.measurements[0], Measurement::new(5, 1.5, "cpu"));
}

#[test]
fn test_empty_buffer_paints_empty_state() {
    let config = small_config();
    let state = ChartState::new(10, config.viewport.clone()).unwrap();
    let mut pipeline = ChartPipeline::new(&config);
    let mut surface = RecordingSurface::new(800.0, 400.0);

    let stats = pipeline.frame(&state, &mut surface, 0).unwrap();
    assert!(stats.empty);
    assert_eq!(surface.commands().len(), 1);
    assert!(matches!(surface.commands()[0], DrawCommand::Clear(_)));
}

#[test]
fn test_pipeline_draws_each_category() {
    let config = small_config();
    let state = ChartState::new(1_000, config.viewport.clone()).unwrap();
    state.append(ticker(None, &config.ingest.categories, 200));
    let mut pipeline = ChartPipeline::new(&config);
    let mut surface = RecordingSurface::new(800.0, 400.0);

    let stats = pipeline.frame(&state, &mut surface, 0).unwrap();
    assert!(!stats.empty);
    assert_eq!(stats.visible_points, 400);
    assert_eq!(stats.paint.polylines, 2);
    assert!(stats.buckets >= 2);

    // Every vertex lies inside the surface once the viewport is fitted.
    for line in surface.polylines() {
        assert!(line
            .iter()
            .all(|p| p.x >= 0.0 && p.x <= 800.0 && p.y >= 0.0 && p.y <= 400.0));
    }
}

#[test]
fn test_unchanged_inputs_hit_the_cache() {
    let config = small_config();
    let state = ChartState::new(1_000, config.viewport.clone()).unwrap();
    state.append(ticker(None, &config.ingest.categories, 100));
    let mut pipeline = ChartPipeline::new(&config);
    let mut surface = RecordingSurface::new(800.0, 400.0);

    pipeline.frame(&state, &mut surface, 0).unwrap();
    pipeline.frame(&state, &mut surface, 16).unwrap();
    pipeline.frame(&state, &mut surface, 32).unwrap();
    assert_eq!(pipeline.series_cache().misses(), 1);
    assert_eq!(pipeline.bucket_cache().misses(), 1);

    state.append(ticker(Some(1_000), &config.ingest.categories, 1));
    pipeline.frame(&state, &mut surface, 48).unwrap();
    assert_eq!(pipeline.bucket_cache().misses(), 2);
}

#[test]
fn test_filter_none_shows_empty_state() {
    let config = small_config();
    let state = ChartState::new(1_000, config.viewport.clone()).unwrap();
    state.append(ticker(None, &config.ingest.categories, 10));
    let mut pipeline = ChartPipeline::new(&config);
    let mut surface = RecordingSurface::new(800.0, 400.0);

    state.set_categories(CategoryFilter::None);
    assert!(pipeline.frame(&state, &mut surface, 0).unwrap().empty);

    state.toggle_category("memory");
    let stats = pipeline.frame(&state, &mut surface, 16).unwrap();
    assert_eq!(stats.visible_points, 10);
    assert_eq!(stats.paint.polylines, 1);

    state.toggle_category("cpu");
    assert_eq!(state.filter().categories, CategoryFilter::All);
}

#[test]
fn test_window_filter_keeps_recent_points() {
    let config = small_config();
    let state = ChartState::new(1_000, config.viewport.clone()).unwrap();
    state.append(ticker(None, &["cpu".to_string()], 100));
    state.set_window(Some(100));

    let visible = state.visible();
    // Latest is 1000; the cutoff at 900 is inclusive.
    assert_eq!(visible.len(), 11);
    assert_eq!(visible[0].timestamp, 900);
}

#[test]
fn test_dashboard_end_to_end() {
    let mut config = small_config();
    config.telemetry.memory_interval_ms = 250;
    let mut dashboard = Dashboard::new(config)
        .unwrap()
        .with_memory_probe(FixedMemoryProbe(32 * 1024 * 1024));
    let surface = Rc::new(RefCell::new(RecordingSurface::new(1024.0, 512.0)));

    dashboard.start(Rc::clone(&surface), ticker).unwrap();
    // Ends just after the frame following the ingestion at t = 1000.
    dashboard.host().advance(1_050.0);

    assert!(dashboard.is_running());
    assert!(dashboard.scheduler().frames_drawn() >= 62);
    let frame = dashboard.last_frame();
    assert!(!frame.empty);
    assert_eq!(frame.visible_points, 40 + 10 * 10);

    let metrics = dashboard.metrics();
    assert!(metrics.fps > 55.0 && metrics.fps <= 60.0);
    assert_eq!(metrics.memory_usage_mb, 32.0);
    assert!(dashboard.errors().try_recv().is_err());

    let rows = dashboard.table_rows().unwrap();
    assert_eq!(rows.first().map(|r| r.index), Some(0));
    assert!(rows.len() <= 10 + 1 + 3);
    assert_eq!(rows[1].offset_px, 40.0);
    assert_eq!(rows[0].time_label, "1970-01-01 00:00:00.010");

    dashboard.stop();
    dashboard.stop();
    let drawn = dashboard.scheduler().frames_drawn();
    let points = dashboard.state().len();
    dashboard.host().advance(1_000.0);
    assert_eq!(dashboard.scheduler().frames_drawn(), drawn);
    assert_eq!(dashboard.state().len(), points);
    assert_eq!(dashboard.host().active_timers(), 0);
    assert_eq!(dashboard.host().pending_frames(), 0);
}

#[test]
fn test_table_scroll_materializes_only_visible_rows() {
    let mut dashboard = Dashboard::new(small_config()).unwrap();
    dashboard
        .state()
        .append(ticker(None, &["cpu".to_string()], 1_000));

    let rows = dashboard.table_rows().unwrap();
    assert_eq!(rows.len(), 14);
    assert_eq!(dashboard.table().total_rows(), 1_000);

    let range = dashboard.table().on_scroll(205.0, 0).unwrap().unwrap();
    assert_eq!((range.start_index, range.end_index), (2, 19));
    let rows = dashboard.table().rows();
    assert_eq!(rows.len(), 18);
    assert_eq!(rows[0].index, 2);
    assert_eq!(rows[0].offset_px, 80.0);
    assert_eq!(rows[0].value_label, "3.00");
}
