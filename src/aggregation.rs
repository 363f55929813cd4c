use crate::data_types::{AggregatedBucket, Measurement};
use crate::error::{ConfigurationError, Result};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Inputs below this size never touch the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 50_000;

/// Left-aligned bucket key anchored at epoch zero. Uses euclidean division so
/// timestamps before the epoch still land in the bucket that contains them.
#[inline]
pub fn bucket_key(timestamp: i64, bucket_width_ms: i64) -> i64 {
    timestamp.div_euclid(bucket_width_ms) * bucket_width_ms
}

#[derive(Clone, Copy, Debug)]
struct Accumulator {
    min: f64,
    max: f64,
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn new(v: f64) -> Self {
        Self {
            min: v,
            max: v,
            sum: v,
            count: 1,
        }
    }

    #[inline]
    fn push(&mut self, v: f64) {
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self.sum += v;
        self.count += 1;
    }

    fn merge(&mut self, other: Accumulator) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
    }
}

type Groups = HashMap<(i64, Arc<str>), Accumulator>;

fn group_into(groups: &mut Groups, points: &[Measurement], bucket_width_ms: i64) {
    for m in points {
        let key = (bucket_key(m.timestamp, bucket_width_ms), Arc::clone(&m.category));
        groups
            .entry(key)
            .and_modify(|acc| acc.push(m.value))
            .or_insert_with(|| Accumulator::new(m.value));
    }
}

fn merge_groups(mut a: Groups, b: Groups) -> Groups {
    if a.len() < b.len() {
        return merge_groups(b, a);
    }
    for (key, acc) in b {
        a.entry(key)
            .and_modify(|existing| existing.merge(acc))
            .or_insert(acc);
    }
    a
}

fn finish(groups: Groups) -> Vec<AggregatedBucket> {
    let mut out: Vec<AggregatedBucket> = groups
        .into_iter()
        .map(|((bucket_start, category), acc)| AggregatedBucket {
            bucket_start,
            category,
            min: acc.min,
            max: acc.max,
            avg: acc.sum / acc.count as f64,
            count: acc.count,
        })
        .collect();
    // Category order inside a bucket is not part of the contract; sorting by
    // it only keeps output stable between runs.
    out.sort_unstable_by(|a, b| {
        a.bucket_start
            .cmp(&b.bucket_start)
            .then_with(|| a.category.cmp(&b.category))
    });
    out
}

/// Groups points into fixed-width time buckets, then by category.
///
/// Empty input yields an empty result; a non-positive width is a
/// configuration error. Input order does not matter.
pub fn aggregate(points: &[Measurement], bucket_width_ms: i64) -> Result<Vec<AggregatedBucket>> {
    aggregate_with_threshold(points, bucket_width_ms, DEFAULT_PARALLEL_THRESHOLD)
}

/// Same as [`aggregate`] with an explicit size above which grouping is
/// split across the rayon pool.
pub fn aggregate_with_threshold(
    points: &[Measurement],
    bucket_width_ms: i64,
    parallel_threshold: usize,
) -> Result<Vec<AggregatedBucket>> {
    if bucket_width_ms <= 0 {
        return Err(ConfigurationError::NonPositiveBucketWidth(bucket_width_ms));
    }
    if points.is_empty() {
        return Ok(Vec::new());
    }

    let groups = if points.len() >= parallel_threshold.max(1) {
        let chunk = (points.len() / rayon::current_num_threads().max(1)).max(4_096);
        points
            .par_chunks(chunk)
            .fold(Groups::new, |mut groups, slice| {
                group_into(&mut groups, slice, bucket_width_ms);
                groups
            })
            .reduce(Groups::new, merge_groups)
    } else {
        let mut groups = Groups::with_capacity(points.len().min(1_024));
        group_into(&mut groups, points, bucket_width_ms);
        groups
    };

    Ok(finish(groups))
}
