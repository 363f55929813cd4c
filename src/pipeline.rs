//! Per-frame derivation: snapshot -> visible set -> buckets and pixel series.
//!
//! Each derived value sits in a small cache keyed by the fingerprint of its
//! inputs, so a frame with no new data and an unchanged viewport only repaints.

use crate::aggregation::aggregate_with_threshold;
use crate::cache::{DerivedCache, Fingerprint, FingerprintBuilder};
use crate::config::{AggregationConfig, ChartConfig, RenderConfig};
use crate::data_types::{AggregatedBucket, Measurement, Padding, Viewport};
use crate::error::{ConfigurationError, Result};
use crate::rendering::{map_series, ChartPainter, MappedSeries, PaintStats, RenderSurface};
use crate::state::ChartState;
use crate::stream_buffer::bounds_of;
use crate::theme::ChartTheme;
use crate::transform::CoordinateMapper;
use std::sync::Arc;
use tracing::trace;

const CACHE_SLOTS: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub visible_points: usize,
    pub buckets: usize,
    pub paint: PaintStats,
    /// Nothing to draw: the surface was only cleared.
    pub empty: bool,
    pub refitted: bool,
}

fn viewport_fingerprint(builder: FingerprintBuilder, vp: &Viewport) -> FingerprintBuilder {
    builder
        .with_f64(vp.x_min)
        .with_f64(vp.x_max)
        .with_f64(vp.y_min)
        .with_f64(vp.y_max)
}

fn padding_fingerprint(builder: FingerprintBuilder, p: &Padding) -> FingerprintBuilder {
    builder
        .with_f64(p.top)
        .with_f64(p.right)
        .with_f64(p.bottom)
        .with_f64(p.left)
}

pub struct ChartPipeline {
    render: RenderConfig,
    aggregation: AggregationConfig,
    painter: ChartPainter,
    visible: DerivedCache<Vec<Measurement>>,
    buckets: DerivedCache<Vec<AggregatedBucket>>,
    series: DerivedCache<Vec<MappedSeries>>,
    last_visible: Option<Fingerprint>,
    last_buckets: Arc<Vec<AggregatedBucket>>,
}

impl ChartPipeline {
    pub fn new(config: &ChartConfig) -> Self {
        Self::with_theme(config, ChartTheme::default())
    }

    pub fn with_theme(config: &ChartConfig, theme: ChartTheme) -> Self {
        Self {
            render: config.render.clone(),
            aggregation: config.aggregation.clone(),
            painter: ChartPainter::new(theme, config.render.point_radius, config.render.grid_ticks),
            visible: DerivedCache::new(CACHE_SLOTS),
            buckets: DerivedCache::new(CACHE_SLOTS),
            series: DerivedCache::new(CACHE_SLOTS),
            last_visible: None,
            last_buckets: Arc::default(),
        }
    }

    pub fn painter_mut(&mut self) -> &mut ChartPainter {
        &mut self.painter
    }

    /// Buckets of the most recent non-empty frame.
    pub fn last_buckets(&self) -> Arc<Vec<AggregatedBucket>> {
        Arc::clone(&self.last_buckets)
    }

    pub fn series_cache(&self) -> &DerivedCache<Vec<MappedSeries>> {
        &self.series
    }

    pub fn bucket_cache(&self) -> &DerivedCache<Vec<AggregatedBucket>> {
        &self.buckets
    }

    pub fn frame(
        &mut self,
        state: &ChartState,
        surface: &mut dyn RenderSurface,
        now_ms: u64,
    ) -> Result<FrameStats> {
        let snapshot = state.snapshot();
        let filter = state.filter();
        let visible_key = FingerprintBuilder::new()
            .with(&snapshot.version())
            .with(&filter)
            .finish();
        let visible = self
            .visible
            .get_or_insert_with(visible_key, || Ok::<_, ConfigurationError>(filter.apply(&snapshot)))?;

        let changed = self.last_visible != Some(visible_key);
        self.last_visible = Some(visible_key);

        let refitted = state.with_viewport(|tracker| {
            if changed {
                tracker.observe(bounds_of(&visible), now_ms);
            }
            tracker.poll(now_ms)
        });

        if visible.is_empty() {
            self.painter.paint_empty(surface);
            return Ok(FrameStats {
                empty: true,
                refitted,
                ..FrameStats::default()
            });
        }

        let viewport = state.viewport();
        let mapper = CoordinateMapper::new(
            viewport,
            surface.width(),
            surface.height(),
            self.render.padding,
        )?;

        let width = self.aggregation.bucket_width_ms;
        let threshold = self.aggregation.parallel_threshold;
        let bucket_key = FingerprintBuilder::new()
            .with(&visible_key)
            .with(&width)
            .finish();
        let buckets = self.buckets.get_or_insert_with(bucket_key, || {
            aggregate_with_threshold(&visible, width, threshold)
        })?;

        let (w, h) = mapper.surface_size();
        let decimate = self.render.decimate;
        let series_key = padding_fingerprint(
            viewport_fingerprint(FingerprintBuilder::new().with(&visible_key), &viewport)
                .with_f64(w)
                .with_f64(h),
            &self.render.padding,
        )
        .with(&decimate)
        .finish();
        let series = self.series.get_or_insert_with(series_key, || {
            Ok::<_, ConfigurationError>(map_series(&visible, &mapper, decimate))
        })?;

        let paint = self.painter.paint(
            surface,
            &mapper,
            &series,
            &buckets,
            width,
            &state.known_categories(),
        );
        trace!(
            visible = visible.len(),
            vertices = paint.vertices,
            refitted,
            "frame painted"
        );
        self.last_buckets = Arc::clone(&buckets);

        Ok(FrameStats {
            visible_points: visible.len(),
            buckets: buckets.len(),
            paint,
            empty: false,
            refitted,
        })
    }
}
