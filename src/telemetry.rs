//! Rolling performance metrics fed by the render loop.
//!
//! Frame rate comes from tick timestamps inside a trailing time window.
//! Memory is a fixed-length ring of samples. Render and processing durations
//! are stored as last-reported values without smoothing.

use crate::config::TelemetryConfig;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::warn;

pub type SharedTelemetry = Arc<Mutex<PerformanceAggregator>>;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PerformanceMetrics {
    pub fps: f64,
    pub memory_usage_mb: f64,
    pub render_time_ms: f64,
    pub processing_time_ms: f64,
}

pub struct PerformanceAggregator {
    ticks: VecDeque<f64>,
    frame_window_ms: f64,
    target_fps: f64,
    memory: VecDeque<f64>,
    memory_capacity: usize,
    min_samples_for_growth: usize,
    render_time_ms: f64,
    processing_time_ms: f64,
}

impl PerformanceAggregator {
    pub fn new(config: &TelemetryConfig, target_fps: f64) -> Self {
        let memory_capacity = config.memory_samples.max(2);
        Self {
            ticks: VecDeque::new(),
            frame_window_ms: config.frame_window_ms.max(1) as f64,
            target_fps,
            memory: VecDeque::with_capacity(memory_capacity),
            memory_capacity,
            min_samples_for_growth: config.min_samples_for_growth.clamp(2, memory_capacity),
            render_time_ms: 0.0,
            processing_time_ms: 0.0,
        }
    }

    pub fn shared(self) -> SharedTelemetry {
        Arc::new(Mutex::new(self))
    }

    /// Records one render tick at `now_ms` and evicts ticks older than the
    /// frame window.
    pub fn on_tick(&mut self, now_ms: f64) {
        self.ticks.push_back(now_ms);
        let cutoff = now_ms - self.frame_window_ms;
        while self.ticks.front().is_some_and(|&t| t < cutoff) {
            self.ticks.pop_front();
        }
    }

    /// Mean inter-tick delta over the window, as frames per second, capped at
    /// the target. Zero until two ticks exist.
    pub fn fps(&self) -> f64 {
        let (Some(first), Some(last)) = (self.ticks.front(), self.ticks.back()) else {
            return 0.0;
        };
        if self.ticks.len() < 2 || last <= first {
            return 0.0;
        }
        let mean_delta = (last - first) / (self.ticks.len() - 1) as f64;
        (1000.0 / mean_delta).min(self.target_fps)
    }

    pub fn tick_count(&self) -> usize {
        self.ticks.len()
    }

    pub fn sample_memory(&mut self, used_bytes: u64) {
        self.sample_memory_mb(used_bytes as f64 / BYTES_PER_MB);
    }

    pub fn sample_memory_mb(&mut self, used_mb: f64) {
        if self.memory.len() == self.memory_capacity {
            self.memory.pop_front();
        }
        self.memory.push_back(used_mb);
    }

    pub fn memory_samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.memory.iter().copied()
    }

    /// Heuristic only: true when enough samples exist and the newest retained
    /// sample exceeds the oldest by more than `threshold_mb`. Steady growth
    /// can also be a legitimately filling cache; a drop and regrowth inside
    /// the window is not detected.
    pub fn is_growing(&self, threshold_mb: f64) -> bool {
        if self.memory.len() < self.min_samples_for_growth {
            return false;
        }
        match (self.memory.front(), self.memory.back()) {
            (Some(oldest), Some(newest)) => newest - oldest > threshold_mb,
            _ => false,
        }
    }

    /// Like [`Self::is_growing`], logging a warning when it fires.
    pub fn check_growth(&self, threshold_mb: f64) -> bool {
        let growing = self.is_growing(threshold_mb);
        if growing {
            warn!(
                oldest_mb = self.memory.front().copied().unwrap_or_default(),
                newest_mb = self.memory.back().copied().unwrap_or_default(),
                threshold_mb,
                "memory usage keeps growing"
            );
        }
        growing
    }

    pub fn set_render_time(&mut self, ms: f64) {
        self.render_time_ms = ms;
    }

    pub fn set_processing_time(&mut self, ms: f64) {
        self.processing_time_ms = ms;
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            fps: self.fps(),
            memory_usage_mb: self.memory.back().copied().unwrap_or_default(),
            render_time_ms: self.render_time_ms,
            processing_time_ms: self.processing_time_ms,
        }
    }
}

/// Source of the process's current memory footprint.
pub trait MemoryProbe {
    fn used_bytes(&self) -> Option<u64>;
}

/// Resident set size from `/proc/self/statm`. Returns `None` elsewhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcMemoryProbe;

impl MemoryProbe for ProcMemoryProbe {
    fn used_bytes(&self) -> Option<u64> {
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
        // The kernel reports pages; 4 KiB covers every mainstream target.
        Some(resident_pages * 4096)
    }
}

/// Fixed reading, for tests and hosts without a probe.
#[derive(Clone, Copy, Debug)]
pub struct FixedMemoryProbe(pub u64);

impl MemoryProbe for FixedMemoryProbe {
    fn used_bytes(&self) -> Option<u64> {
        Some(self.0)
    }
}
