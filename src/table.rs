//! Virtualized table over the visible set.
//!
//! Only rows inside the current [`VirtualRange`] are materialized. Rows are
//! in chronological order, the order of the backing snapshot.

use crate::cache::{Fingerprint, FingerprintBuilder};
use crate::config::TableConfig;
use crate::data_types::{Measurement, VirtualRange};
use crate::error::Result;
use crate::state::ChartState;
use crate::utils::date_formatter::format_datetime;
use crate::virtualizer::ScrollVirtualizer;
use chrono_tz::Tz;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    pub index: usize,
    /// Top edge of the row inside the scrollable content.
    pub offset_px: f64,
    pub timestamp: i64,
    pub time_label: String,
    pub category: Arc<str>,
    pub value: f64,
    pub value_label: String,
}

fn format_value(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        "-".to_string()
    }
}

/// Builds the rows `range` covers. Indices past the end of `points` are
/// skipped, so a stale range never panics.
pub fn materialize_rows(
    points: &[Measurement],
    range: VirtualRange,
    virtualizer: &ScrollVirtualizer,
    tz: Tz,
) -> Vec<TableRow> {
    if range.is_empty() {
        return Vec::new();
    }
    range
        .indices()
        .filter_map(|i| {
            let m = points.get(i)?;
            Some(TableRow {
                index: i,
                offset_px: virtualizer.row_offset(i).unwrap_or_default(),
                timestamp: m.timestamp,
                time_label: format_datetime(m.timestamp, tz),
                category: Arc::clone(&m.category),
                value: m.value,
                value_label: format_value(m.value),
            })
        })
        .collect()
}

pub struct TableView {
    virtualizer: ScrollVirtualizer,
    timezone: Tz,
    visible: Arc<Vec<Measurement>>,
    visible_key: Option<Fingerprint>,
}

impl TableView {
    pub fn new(config: &TableConfig, timezone: Tz) -> Result<Self> {
        Ok(Self {
            virtualizer: ScrollVirtualizer::new(config)?,
            timezone,
            visible: Arc::default(),
            visible_key: None,
        })
    }

    pub fn virtualizer(&self) -> &ScrollVirtualizer {
        &self.virtualizer
    }

    pub fn virtualizer_mut(&mut self) -> &mut ScrollVirtualizer {
        &mut self.virtualizer
    }

    pub fn range(&self) -> VirtualRange {
        self.virtualizer.range()
    }

    pub fn total_rows(&self) -> usize {
        self.visible.len()
    }

    /// Pulls the filtered snapshot from `state` when it changed since the
    /// last sync and updates the item count.
    pub fn sync(&mut self, state: &ChartState) -> Result<VirtualRange> {
        let snapshot = state.snapshot();
        let filter = state.filter();
        let key = FingerprintBuilder::new()
            .with(&snapshot.version())
            .with(&filter)
            .finish();
        if self.visible_key == Some(key) {
            return Ok(self.virtualizer.range());
        }
        self.visible = Arc::new(filter.apply(&snapshot));
        self.visible_key = Some(key);
        self.virtualizer.set_total_items(self.visible.len())
    }

    pub fn on_scroll(&mut self, offset: f64, now_ms: u64) -> Result<Option<VirtualRange>> {
        self.virtualizer.on_scroll(offset, now_ms)
    }

    pub fn poll(&mut self, now_ms: u64) -> Result<Option<VirtualRange>> {
        self.virtualizer.poll(now_ms)
    }

    /// Rows of the current range.
    pub fn rows(&self) -> Vec<TableRow> {
        materialize_rows(
            &self.visible,
            self.virtualizer.range(),
            &self.virtualizer,
            self.timezone,
        )
    }
}
