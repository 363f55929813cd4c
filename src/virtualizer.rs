//! Visible-range math for virtualized lists.
//!
//! For fixed-extent rows:
//! `start = max(0, floor(offset / extent) - overscan)` and
//! `end = min(total - 1, ceil((offset + viewport) / extent) + overscan)`.
//! The variable-extent index gives the same answer when every row has the
//! same extent.

use crate::config::TableConfig;
use crate::data_types::VirtualRange;
use crate::error::{ensure_positive, ConfigurationError, Result};
use tracing::trace;

fn validate_scroll(scroll_offset: f64, viewport_extent: f64) -> Result<(f64, f64)> {
    if !scroll_offset.is_finite() {
        return Err(ConfigurationError::InvalidExtent {
            name: "scroll_offset",
            value: scroll_offset,
        });
    }
    if !(viewport_extent.is_finite() && viewport_extent >= 0.0) {
        return Err(ConfigurationError::InvalidExtent {
            name: "viewport_extent",
            value: viewport_extent,
        });
    }
    // Overscroll (rubber-banding) above the first row shows the first row.
    Ok((scroll_offset.max(0.0), viewport_extent))
}

pub fn compute_range(
    scroll_offset: f64,
    item_extent: f64,
    viewport_extent: f64,
    total_items: usize,
    overscan: usize,
) -> Result<VirtualRange> {
    let item_extent = ensure_positive("item_extent", item_extent)?;
    let (offset, viewport) = validate_scroll(scroll_offset, viewport_extent)?;
    if total_items == 0 {
        return Ok(VirtualRange::EMPTY);
    }
    let last = total_items - 1;
    let first_visible = (offset / item_extent).floor() as usize;
    let end_visible = ((offset + viewport) / item_extent).ceil() as usize;
    Ok(VirtualRange {
        start_index: first_visible.saturating_sub(overscan).min(last),
        end_index: end_visible.saturating_add(overscan).min(last),
    })
}

/// Cumulative offset table for rows of differing extents.
/// `offsets[i]` is where row `i` starts; the final entry is the total extent.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtentIndex {
    offsets: Vec<f64>,
}

impl ExtentIndex {
    pub fn from_extents(extents: impl IntoIterator<Item = f64>) -> Result<Self> {
        let extents = extents.into_iter();
        let mut offsets = Vec::with_capacity(extents.size_hint().0 + 1);
        let mut acc = 0.0;
        offsets.push(acc);
        for e in extents {
            acc += ensure_positive("item_extent", e)?;
            offsets.push(acc);
        }
        Ok(Self { offsets })
    }

    pub fn uniform(count: usize, extent: f64) -> Result<Self> {
        let extent = ensure_positive("item_extent", extent)?;
        Ok(Self {
            offsets: (0..=count).map(|i| i as f64 * extent).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_extent(&self) -> f64 {
        self.offsets[self.offsets.len() - 1]
    }

    pub fn offset_of(&self, index: usize) -> Option<f64> {
        (index < self.len()).then(|| self.offsets[index])
    }

    pub fn extent_of(&self, index: usize) -> Option<f64> {
        (index < self.len()).then(|| self.offsets[index + 1] - self.offsets[index])
    }

    /// Row containing `offset`, by binary search. Offsets past the end map to
    /// the last row.
    pub fn index_at(&self, offset: f64) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let starts = &self.offsets[..self.len()];
        let idx = starts.partition_point(|&o| o <= offset).saturating_sub(1);
        Some(idx)
    }

    /// Binary search for the first visible row, then a forward walk to the
    /// first row starting at or past the bottom edge.
    pub fn compute_range(
        &self,
        scroll_offset: f64,
        viewport_extent: f64,
        overscan: usize,
    ) -> Result<VirtualRange> {
        let (offset, viewport) = validate_scroll(scroll_offset, viewport_extent)?;
        let Some(first) = self.index_at(offset) else {
            return Ok(VirtualRange::EMPTY);
        };
        let n = self.len();
        let bottom = offset + viewport;
        let mut end = first;
        while end < n && self.offsets[end] < bottom {
            end += 1;
        }
        let last = n - 1;
        Ok(VirtualRange {
            start_index: first.saturating_sub(overscan).min(last),
            end_index: end.saturating_add(overscan).min(last),
        })
    }
}

/// Rate limiter for scroll input: the first offset of a burst passes, later
/// ones are held until `interval_ms` has elapsed; the latest held offset is
/// released by [`ScrollThrottle::flush`].
#[derive(Clone, Debug)]
pub struct ScrollThrottle {
    interval_ms: u64,
    last_emit_ms: Option<u64>,
    pending: Option<f64>,
}

impl ScrollThrottle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_emit_ms: None,
            pending: None,
        }
    }

    fn ready(&self, now_ms: u64) -> bool {
        self.last_emit_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.interval_ms)
    }

    pub fn offer(&mut self, offset: f64, now_ms: u64) -> Option<f64> {
        if self.ready(now_ms) {
            self.last_emit_ms = Some(now_ms);
            self.pending = None;
            Some(offset)
        } else {
            self.pending = Some(offset);
            None
        }
    }

    pub fn flush(&mut self, now_ms: u64) -> Option<f64> {
        if self.pending.is_some() && self.ready(now_ms) {
            self.last_emit_ms = Some(now_ms);
            self.pending.take()
        } else {
            None
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RowLayout {
    Fixed(f64),
    Variable(ExtentIndex),
}

/// Scroll state of one virtualized list.
pub struct ScrollVirtualizer {
    layout: RowLayout,
    viewport_extent: f64,
    overscan: usize,
    total_items: usize,
    scroll_offset: f64,
    throttle: ScrollThrottle,
    range: VirtualRange,
    recomputes: u64,
}

impl ScrollVirtualizer {
    pub fn new(config: &TableConfig) -> Result<Self> {
        let row = ensure_positive("row_extent", config.row_extent)?;
        let viewport = ensure_positive("viewport_extent", config.viewport_extent)?;
        Ok(Self {
            layout: RowLayout::Fixed(row),
            viewport_extent: viewport,
            overscan: config.overscan,
            total_items: 0,
            scroll_offset: 0.0,
            throttle: ScrollThrottle::new(config.scroll_throttle_ms),
            range: VirtualRange::EMPTY,
            recomputes: 0,
        })
    }

    pub fn range(&self) -> VirtualRange {
        self.range
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    /// Swaps the row layout. A variable layout also fixes the item count.
    pub fn set_layout(&mut self, layout: RowLayout) -> Result<VirtualRange> {
        if let RowLayout::Variable(index) = &layout {
            self.total_items = index.len();
        }
        self.layout = layout;
        self.recompute()
    }

    pub fn set_viewport_extent(&mut self, extent: f64) -> Result<VirtualRange> {
        self.viewport_extent = ensure_positive("viewport_extent", extent)?;
        self.recompute()
    }

    /// Data changes are applied immediately; only scroll input is throttled.
    pub fn set_total_items(&mut self, total: usize) -> Result<VirtualRange> {
        self.total_items = match &self.layout {
            RowLayout::Fixed(_) => total,
            RowLayout::Variable(index) => total.min(index.len()),
        };
        self.recompute()
    }

    /// Returns the new range when this offset passed the throttle.
    pub fn on_scroll(&mut self, offset: f64, now_ms: u64) -> Result<Option<VirtualRange>> {
        match self.throttle.offer(offset, now_ms) {
            Some(offset) => {
                self.scroll_offset = offset;
                self.recompute().map(Some)
            }
            None => Ok(None),
        }
    }

    /// Applies a held scroll offset once the throttle interval has passed.
    pub fn poll(&mut self, now_ms: u64) -> Result<Option<VirtualRange>> {
        match self.throttle.flush(now_ms) {
            Some(offset) => {
                self.scroll_offset = offset;
                self.recompute().map(Some)
            }
            None => Ok(None),
        }
    }

    /// Full scrollable extent of the list.
    pub fn content_extent(&self) -> f64 {
        match &self.layout {
            RowLayout::Fixed(extent) => extent * self.total_items as f64,
            RowLayout::Variable(index) => index.total_extent(),
        }
    }

    /// Where row `index` starts, for positioning materialized rows.
    pub fn row_offset(&self, index: usize) -> Option<f64> {
        if index >= self.total_items {
            return None;
        }
        match &self.layout {
            RowLayout::Fixed(extent) => Some(extent * index as f64),
            RowLayout::Variable(idx) => idx.offset_of(index),
        }
    }

    fn recompute(&mut self) -> Result<VirtualRange> {
        let range = match &self.layout {
            RowLayout::Fixed(extent) => compute_range(
                self.scroll_offset,
                *extent,
                self.viewport_extent,
                self.total_items,
                self.overscan,
            )?,
            RowLayout::Variable(index) => {
                let range =
                    index.compute_range(self.scroll_offset, self.viewport_extent, self.overscan)?;
                // The index may describe more rows than the list currently holds.
                match self.total_items.checked_sub(1) {
                    None => VirtualRange::EMPTY,
                    Some(last) => VirtualRange {
                        start_index: range.start_index.min(last),
                        end_index: range.end_index.min(last),
                    },
                }
            }
        };
        self.recomputes += 1;
        if range != self.range {
            trace!(start = range.start_index, end = range.end_index, "virtual range changed");
        }
        self.range = range;
        Ok(range)
    }
}
