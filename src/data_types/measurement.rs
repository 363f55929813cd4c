use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Opaque key/value payload carried alongside a measurement.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A single timestamped sample. Immutable once created; clones share the
/// category and metadata allocations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub value: f64,
    pub category: Arc<str>,
    #[serde(default, skip_serializing_if = "is_empty_metadata")]
    pub metadata: Arc<Metadata>,
}

fn is_empty_metadata(m: &Arc<Metadata>) -> bool {
    m.is_empty()
}

impl Measurement {
    pub fn new(timestamp: i64, value: f64, category: impl Into<Arc<str>>) -> Self {
        Self {
            timestamp,
            value,
            category: category.into(),
            metadata: Arc::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Arc::new(metadata);
        self
    }
}
