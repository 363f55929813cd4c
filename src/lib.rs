//! stream_chart: streaming time-series charting core.
//!
//! Measurements flow from a [`BatchProducer`] into a bounded [`StreamBuffer`],
//! get bucketed and mapped to pixels each frame, and are painted onto a
//! [`RenderSurface`] by a [`RenderScheduler`] ticking on a [`FrameLoop`].

pub mod aggregation;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod data_types;
pub mod decimation;
pub mod error;
pub mod filter;
pub mod frame_loop;
pub mod ingest;
pub mod pipeline;
pub mod rendering;
pub mod scales;
pub mod scheduler;
pub mod simd;
pub mod state;
pub mod stream_buffer;
pub mod table;
pub mod telemetry;
pub mod theme;
pub mod transform;
pub mod utils;
pub mod view_controller;
pub mod virtualizer;

pub use aggregation::aggregate;
pub use config::ChartConfig;
pub use dashboard::Dashboard;
pub use data_types::{AggregatedBucket, DataBounds, Measurement, Padding, Viewport, VirtualRange};
pub use error::{ConfigurationError, Result, TransientDrawError};
pub use filter::{CategoryFilter, SnapshotFilter};
pub use frame_loop::{FrameLoop, FrameTime};
pub use ingest::{BatchProducer, IngestionTimer};
pub use pipeline::ChartPipeline;
pub use rendering::{RecordingSurface, RenderSurface};
pub use scheduler::{RenderScheduler, SchedulerState};
pub use state::ChartState;
pub use stream_buffer::{Snapshot, StreamBuffer};
pub use telemetry::{PerformanceAggregator, PerformanceMetrics};
pub use transform::{to_data, to_pixel, CoordinateMapper};
pub use virtualizer::{compute_range, ScrollVirtualizer};
