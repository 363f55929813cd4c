// Rendering primitives and the chart painter
//
// The core never talks to a graphics backend directly. It emits abstract draw
// operations against a `RenderSurface` sized in device-independent pixels.

use crate::data_types::{AggregatedBucket, Measurement};
use crate::decimation::decimate_m4_columns_into;
use crate::simd::batch_transform_points;
use crate::theme::{ChartTheme, Rgba};
use crate::transform::CoordinateMapper;
use glam::Vec2;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Series longer than this are drawn as a line only, without point markers.
pub const MAX_MARKERS: usize = 2_000;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Style {
    pub color: Rgba,
    pub line_width: f32,
}

impl Style {
    pub fn fill(color: Rgba) -> Self {
        Self {
            color,
            line_width: 0.0,
        }
    }

    pub fn stroke(color: Rgba, line_width: f32) -> Self {
        Self { color, line_width }
    }
}

/// Axis-aligned rectangle in surface pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelRect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl PixelRect {
    /// Rectangle spanning two corners given in any order.
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        let min = a.min(b);
        Self {
            origin: min,
            size: a.max(b) - min,
        }
    }
}

/// Drawing backend. Sizes are device-independent; `pixel_ratio` is the
/// device pixel scale factor the backend applies on top.
pub trait RenderSurface {
    fn width(&self) -> f64;
    fn height(&self) -> f64;
    fn pixel_ratio(&self) -> f64 {
        1.0
    }
    fn clear(&mut self, background: Rgba);
    fn draw_polyline(&mut self, points: &[Vec2], style: &Style);
    fn draw_points(&mut self, points: &[Vec2], radius: f32, style: &Style);
    fn draw_rects(&mut self, rects: &[PixelRect], style: &Style);
    /// Vertical lines at `xs` and horizontal lines at `ys`, clipped to `bounds`.
    fn draw_grid_lines(&mut self, xs: &[f32], ys: &[f32], bounds: &PixelRect, style: &Style);
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear(Rgba),
    Polyline {
        points: Vec<Vec2>,
        style: Style,
    },
    Points {
        points: Vec<Vec2>,
        radius: f32,
        style: Style,
    },
    Rects {
        rects: Vec<PixelRect>,
        style: Style,
    },
    GridLines {
        xs: Vec<f32>,
        ys: Vec<f32>,
        bounds: PixelRect,
        style: Style,
    },
}

impl DrawCommand {
    /// Vertices, markers, rectangles or lines emitted by this command.
    pub fn primitive_count(&self) -> usize {
        match self {
            Self::Clear(_) => 0,
            Self::Polyline { points, .. } | Self::Points { points, .. } => points.len(),
            Self::Rects { rects, .. } => rects.len(),
            Self::GridLines { xs, ys, .. } => xs.len() + ys.len(),
        }
    }
}

/// Keeps the commands of the current frame; `clear` starts a new frame.
#[derive(Clone, Debug)]
pub struct RecordingSurface {
    width: f64,
    height: f64,
    pixel_ratio: f64,
    commands: Vec<DrawCommand>,
    frames: u64,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
            commands: Vec::new(),
            frames: 0,
        }
    }

    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio;
        self
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of `clear` calls, i.e. frames started.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn primitive_count(&self) -> usize {
        self.commands.iter().map(DrawCommand::primitive_count).sum()
    }

    pub fn polylines(&self) -> impl Iterator<Item = &[Vec2]> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Polyline { points, .. } => Some(points.as_slice()),
            _ => None,
        })
    }
}

impl RenderSurface for RecordingSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn clear(&mut self, background: Rgba) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(background));
        self.frames += 1;
    }

    fn draw_polyline(&mut self, points: &[Vec2], style: &Style) {
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            style: *style,
        });
    }

    fn draw_points(&mut self, points: &[Vec2], radius: f32, style: &Style) {
        self.commands.push(DrawCommand::Points {
            points: points.to_vec(),
            radius,
            style: *style,
        });
    }

    fn draw_rects(&mut self, rects: &[PixelRect], style: &Style) {
        self.commands.push(DrawCommand::Rects {
            rects: rects.to_vec(),
            style: *style,
        });
    }

    fn draw_grid_lines(&mut self, xs: &[f32], ys: &[f32], bounds: &PixelRect, style: &Style) {
        self.commands.push(DrawCommand::GridLines {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            bounds: *bounds,
            style: *style,
        });
    }
}

/// Pixel-space polyline of one category.
#[derive(Clone, Debug, PartialEq)]
pub struct MappedSeries {
    pub category: Arc<str>,
    /// Points before decimation.
    pub source_len: usize,
    pub points: Vec<Vec2>,
}

/// Maps a chronologically sorted visible set into one pixel polyline per
/// category, ordered by category name.
pub fn map_series(points: &[Measurement], mapper: &CoordinateMapper, decimate: bool) -> Vec<MappedSeries> {
    let mut pixels = Vec::new();
    batch_transform_points(points, mapper, &mut pixels);

    let mut by_category: BTreeMap<Arc<str>, Vec<Vec2>> = BTreeMap::new();
    for (m, p) in points.iter().zip(pixels) {
        match by_category.get_mut(&m.category) {
            Some(v) => v.push(p),
            None => {
                by_category.insert(Arc::clone(&m.category), vec![p]);
            }
        }
    }

    let mut scratch = Vec::new();
    by_category
        .into_iter()
        .map(|(category, raw)| {
            let source_len = raw.len();
            let points = if decimate {
                decimate_m4_columns_into(&raw, &mut scratch);
                std::mem::take(&mut scratch)
            } else {
                raw
            };
            MappedSeries {
                category,
                source_len,
                points,
            }
        })
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaintStats {
    pub polylines: usize,
    pub vertices: usize,
    pub markers: usize,
    pub rects: usize,
    pub grid_lines: usize,
}

/// Draws grid, bucket envelopes, series lines and markers, in that order.
pub struct ChartPainter {
    pub theme: ChartTheme,
    pub point_radius: f32,
    pub grid_ticks: usize,
    pub line_width: f32,
}

impl ChartPainter {
    pub fn new(theme: ChartTheme, point_radius: f32, grid_ticks: usize) -> Self {
        Self {
            theme,
            point_radius,
            grid_ticks,
            line_width: 1.5,
        }
    }

    fn plot_rect(mapper: &CoordinateMapper) -> PixelRect {
        let pad = mapper.padding();
        PixelRect {
            origin: Vec2::new(pad.left as f32, pad.top as f32),
            size: Vec2::new(mapper.plot_width() as f32, mapper.plot_height() as f32),
        }
    }

    /// Empty state: background only.
    pub fn paint_empty(&self, surface: &mut dyn RenderSurface) {
        surface.clear(self.theme.background);
    }

    /// Paints one frame. `known_categories` fixes each category's color so
    /// toggling filters does not reshuffle the palette.
    pub fn paint(
        &self,
        surface: &mut dyn RenderSurface,
        mapper: &CoordinateMapper,
        series: &[MappedSeries],
        buckets: &[AggregatedBucket],
        bucket_width_ms: i64,
        known_categories: &[String],
    ) -> PaintStats {
        let mut stats = PaintStats::default();
        surface.clear(self.theme.background);

        let bounds = Self::plot_rect(mapper);
        let xs: Vec<f32> = mapper
            .x_scale()
            .ticks(self.grid_ticks)
            .into_iter()
            .map(|t| mapper.x_scale().map(t) as f32)
            .collect();
        let ys: Vec<f32> = mapper
            .y_scale()
            .ticks(self.grid_ticks)
            .into_iter()
            .map(|t| mapper.y_scale().map(t) as f32)
            .collect();
        stats.grid_lines = xs.len() + ys.len();
        surface.draw_grid_lines(&xs, &ys, &bounds, &Style::stroke(self.theme.grid_line, 1.0));

        if !buckets.is_empty() {
            let rects: Vec<PixelRect> = buckets
                .iter()
                .map(|b| {
                    PixelRect::from_corners(
                        mapper.to_pixel_vec(b.bucket_start as f64, b.max),
                        mapper.to_pixel_vec((b.bucket_start + bucket_width_ms) as f64, b.min),
                    )
                })
                .collect();
            stats.rects = rects.len();
            surface.draw_rects(&rects, &Style::fill(self.theme.bucket_fill));
        }

        for (i, s) in series.iter().enumerate() {
            if s.points.is_empty() {
                continue;
            }
            let color_index = known_categories
                .iter()
                .position(|k| **k == *s.category)
                .unwrap_or(i);
            let color = self.theme.series_color(color_index);
            surface.draw_polyline(&s.points, &Style::stroke(color, self.line_width));
            stats.polylines += 1;
            stats.vertices += s.points.len();
            if s.source_len <= MAX_MARKERS {
                surface.draw_points(&s.points, self.point_radius, &Style::fill(color));
                stats.markers += s.points.len();
            }
        }
        stats
    }
}
