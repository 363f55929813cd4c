//! Streams a synthetic random walk through the dashboard for a few seconds
//! and logs the resulting metrics.
//!
//! `cargo run --example live_stream -- [config.json]`

use eyre::WrapErr;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use stream_chart::{ChartConfig, Dashboard, Measurement, RecordingSurface};
use tracing_subscriber::EnvFilter;

/// Random walk per category, starting at 50 and clamped to `[0, 100]`.
struct RandomWalk {
    rng: StdRng,
    levels: HashMap<String, f64>,
    clock_ms: i64,
    step_ms: i64,
}

impl RandomWalk {
    fn new(seed: u64, start_ms: i64, step_ms: i64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            levels: HashMap::new(),
            clock_ms: start_ms,
            step_ms,
        }
    }

    fn batch(&mut self, since: Option<i64>, categories: &[String], size: usize) -> Vec<Measurement> {
        if let Some(since) = since {
            self.clock_ms = self.clock_ms.max(since);
        }
        let mut out = Vec::with_capacity(size * categories.len());
        for _ in 0..size {
            self.clock_ms += self.step_ms;
            for category in categories {
                let level = self.levels.entry(category.clone()).or_insert(50.0);
                *level = (*level + self.rng.random_range(-2.0..2.0)).clamp(0.0, 100.0);
                out.push(Measurement::new(self.clock_ms, *level, category.as_str()));
            }
        }
        out
    }
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ChartConfig::load(&path).wrap_err_with(|| format!("loading {path}"))?,
        None => ChartConfig::default(),
    };

    let mut dashboard = Dashboard::new(config).wrap_err("invalid dashboard configuration")?;
    let surface = Rc::new(RefCell::new(RecordingSurface::new(1280.0, 720.0)));

    let mut walk = RandomWalk::new(7, chrono::Utc::now().timestamp_millis(), 10);
    dashboard
        .start(Rc::clone(&surface), move |since: Option<i64>, cats: &[String], size: usize| {
            walk.batch(since, cats, size)
        })
        .wrap_err("starting dashboard")?;

    dashboard.host().run_for(Duration::from_secs(3));
    dashboard.stop();

    let metrics = dashboard.metrics();
    let frame = dashboard.last_frame();
    tracing::info!(
        fps = format!("{:.1}", metrics.fps),
        memory_mb = format!("{:.1}", metrics.memory_usage_mb),
        render_ms = format!("{:.3}", metrics.render_time_ms),
        processing_ms = format!("{:.3}", metrics.processing_time_ms),
        "metrics"
    );
    tracing::info!(
        points = dashboard.state().len(),
        visible = frame.visible_points,
        vertices = frame.paint.vertices,
        buckets = frame.buckets,
        primitives = surface.borrow().primitive_count(),
        "last frame"
    );

    for row in dashboard.table_rows()?.iter().take(5) {
        tracing::info!(row = row.index, time = %row.time_label, category = %row.category, value = %row.value_label);
    }
    for err in dashboard.errors().try_iter() {
        tracing::warn!(%err, "frame error");
    }
    Ok(())
}
