//! Bounded, chronologically ordered measurement store (sliding window).
//!
//! The store is an `Arc<Vec<_>>` mutated through `Arc::make_mut`: while a
//! snapshot is alive the next `append` copies, otherwise it mutates in place.
//! A returned [`Snapshot`] therefore never observes later writes.

use crate::data_types::{DataBounds, Measurement};
use crate::error::{ConfigurationError, Result};
use std::ops::Deref;
use std::sync::Arc;
use tracing::trace;

/// Immutable view of the buffer contents at one point in time.
#[derive(Clone, Debug)]
pub struct Snapshot {
    points: Arc<Vec<Measurement>>,
    version: u64,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            points: Arc::default(),
            version: 0,
        }
    }

    /// Monotonic counter bumped by every mutation of the owning buffer.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn as_slice(&self) -> &[Measurement] {
        &self.points
    }

    /// True when both snapshots share the same allocation.
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.points, &other.points)
    }

    /// Points with `t_min <= timestamp <= t_max`, found by binary search.
    pub fn range(&self, t_min: i64, t_max: i64) -> &[Measurement] {
        let start = self.points.partition_point(|m| m.timestamp < t_min);
        let end = self.points.partition_point(|m| m.timestamp <= t_max);
        if start >= end {
            &[]
        } else {
            &self.points[start..end]
        }
    }

    pub fn bounds(&self) -> Option<DataBounds> {
        bounds_of(&self.points)
    }

    pub fn latest_timestamp(&self) -> Option<i64> {
        self.points.last().map(|m| m.timestamp)
    }
}

impl Deref for Snapshot {
    type Target = [Measurement];

    fn deref(&self) -> &[Measurement] {
        &self.points
    }
}

/// Extents of a chronologically sorted slice. NaN values are skipped.
pub fn bounds_of(points: &[Measurement]) -> Option<DataBounds> {
    let first = points.first()?;
    let last = points.last()?;
    let mut v_min = f64::INFINITY;
    let mut v_max = f64::NEG_INFINITY;
    for m in points {
        if m.value.is_nan() {
            continue;
        }
        v_min = v_min.min(m.value);
        v_max = v_max.max(m.value);
    }
    if v_min > v_max {
        return None;
    }
    Some(DataBounds {
        t_min: first.timestamp,
        t_max: last.timestamp,
        v_min,
        v_max,
    })
}

pub struct StreamBuffer {
    data: Arc<Vec<Measurement>>,
    capacity: usize,
    version: u64,
    total_appended: u64,
    total_evicted: u64,
}

impl StreamBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ConfigurationError::InvalidCapacity(capacity));
        }
        Ok(Self {
            data: Arc::new(Vec::with_capacity(capacity)),
            capacity,
            version: 0,
            total_appended: 0,
            total_evicted: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    pub fn total_evicted(&self) -> u64 {
        self.total_evicted
    }

    /// Merges `batch` into the ordered set and evicts the oldest entries
    /// beyond capacity. Equal timestamps keep arrival order.
    pub fn append(&mut self, batch: impl IntoIterator<Item = Measurement>) {
        let mut batch: Vec<Measurement> = batch.into_iter().collect();
        if batch.is_empty() {
            return;
        }
        let added = batch.len();
        // Stable: ties inside the batch stay in arrival order.
        batch.sort_by_key(|m| m.timestamp);

        let data = Arc::make_mut(&mut self.data);
        let in_order = data
            .last()
            .map_or(true, |last| last.timestamp <= batch[0].timestamp);

        if in_order {
            data.extend(batch);
        } else {
            let existing = std::mem::take(data);
            *data = merge_sorted(existing, batch);
        }

        let excess = data.len().saturating_sub(self.capacity);
        if excess > 0 {
            data.drain(..excess);
        }

        self.version += 1;
        self.total_appended += added as u64;
        self.total_evicted += excess as u64;
        trace!(
            added,
            evicted = excess,
            len = data.len(),
            in_order,
            "stream buffer append"
        );
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            points: Arc::clone(&self.data),
            version: self.version,
        }
    }

    /// Explicit reset. Eviction never calls this.
    pub fn clear(&mut self) {
        if self.data.is_empty() {
            return;
        }
        // A fresh allocation leaves outstanding snapshots untouched.
        self.data = Arc::new(Vec::with_capacity(self.capacity));
        self.version += 1;
        trace!("stream buffer cleared");
    }
}

/// Stable merge of two sorted runs; on equal timestamps `older` wins.
fn merge_sorted(older: Vec<Measurement>, newer: Vec<Measurement>) -> Vec<Measurement> {
    let mut out = Vec::with_capacity(older.len() + newer.len());
    let mut a = older.into_iter().peekable();
    let mut b = newer.into_iter().peekable();
    loop {
        let take_a = match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => x.timestamp <= y.timestamp,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_a { a.next() } else { b.next() };
        out.extend(next);
    }
    out
}
