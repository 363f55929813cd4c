//! Shared state handle passed explicitly into each component.

use crate::config::ViewportConfig;
use crate::data_types::{Measurement, Viewport};
use crate::error::Result;
use crate::filter::{CategoryFilter, SnapshotFilter};
use crate::stream_buffer::{Snapshot, StreamBuffer};
use crate::view_controller::ViewportTracker;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

struct Inner {
    buffer: RwLock<StreamBuffer>,
    filter: RwLock<SnapshotFilter>,
    known_categories: RwLock<Vec<String>>,
    viewport: Mutex<ViewportTracker>,
}

/// Cheap to clone; clones share the same buffer, filter and viewport.
///
/// The buffer is written only through [`ChartState::append`] and
/// [`ChartState::clear`]. Readers take a [`Snapshot`], which stays valid and
/// unchanged however many batches arrive after it.
#[derive(Clone)]
pub struct ChartState {
    inner: Arc<Inner>,
}

impl ChartState {
    pub fn new(capacity: usize, viewport: ViewportConfig) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Inner {
                buffer: RwLock::new(StreamBuffer::new(capacity)?),
                filter: RwLock::new(SnapshotFilter::default()),
                known_categories: RwLock::new(Vec::new()),
                viewport: Mutex::new(ViewportTracker::new(viewport)),
            }),
        })
    }

    /// Appends a batch and records any category not seen before.
    pub fn append(&self, batch: Vec<Measurement>) {
        {
            let mut known = self.inner.known_categories.write();
            for m in &batch {
                if !known.iter().any(|k| **k == *m.category) {
                    known.push(m.category.to_string());
                }
            }
        }
        self.inner.buffer.write().append(batch);
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.buffer.read().snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner.buffer.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.buffer.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.buffer.read().capacity()
    }

    pub fn total_evicted(&self) -> u64 {
        self.inner.buffer.read().total_evicted()
    }

    pub fn clear(&self) {
        self.inner.buffer.write().clear();
    }

    pub fn filter(&self) -> SnapshotFilter {
        self.inner.filter.read().clone()
    }

    pub fn set_filter(&self, filter: SnapshotFilter) {
        *self.inner.filter.write() = filter;
    }

    pub fn set_categories(&self, categories: CategoryFilter) {
        self.inner.filter.write().categories = categories;
    }

    pub fn set_window(&self, window_ms: Option<i64>) {
        self.inner.filter.write().window_ms = window_ms;
    }

    /// Checkbox-style toggle against every category seen so far.
    pub fn toggle_category(&self, category: &str) {
        let known = self.inner.known_categories.read().clone();
        self.inner.filter.write().categories.toggle(category, &known);
    }

    pub fn known_categories(&self) -> Vec<String> {
        self.inner.known_categories.read().clone()
    }

    /// Snapshot with the current filter applied, in chronological order.
    pub fn visible(&self) -> Vec<Measurement> {
        let snapshot = self.snapshot();
        self.filter().apply(&snapshot)
    }

    pub fn viewport(&self) -> Viewport {
        *self.inner.viewport.lock().viewport()
    }

    /// Runs `f` with exclusive access to the viewport tracker.
    pub fn with_viewport<R>(&self, f: impl FnOnce(&mut ViewportTracker) -> R) -> R {
        f(&mut self.inner.viewport.lock())
    }
}
