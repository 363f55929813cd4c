use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Summary of all samples of one category inside one time bucket.
/// Only emitted when `count >= 1`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregatedBucket {
    pub bucket_start: i64,
    pub category: Arc<str>,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub count: usize,
}
