use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stream_chart::{ConfigurationError, Measurement, StreamBuffer};

fn point(t: i64) -> Measurement {
    Measurement::new(t, t as f64, "cpu")
}

fn timestamps(buffer: &StreamBuffer) -> Vec<i64> {
    buffer.snapshot().iter().map(|m| m.timestamp).collect()
}

#[test]
fn test_zero_capacity_is_rejected() {
    assert!(matches!(
        StreamBuffer::new(0),
        Err(ConfigurationError::InvalidCapacity(0))
    ));
}

#[test]
fn test_oldest_evicted_across_appends() {
    let mut buffer = StreamBuffer::new(5).unwrap();
    buffer.append(vec![point(1), point(2)]);
    buffer.append(vec![point(3), point(4), point(5), point(6)]);

    assert_eq!(timestamps(&buffer), vec![2, 3, 4, 5, 6]);
    assert_eq!(buffer.total_evicted(), 1);
}

#[test]
fn test_streaming_capacity() {
    let mut buffer = StreamBuffer::new(10).unwrap();
    for i in 0..15 {
        buffer.append(vec![point(i)]);
    }

    assert_eq!(buffer.len(), 10);
    let bounds = buffer.snapshot().bounds().unwrap();
    assert_eq!(bounds.t_min, 5, "t_min should be 5 after eviction");
    assert_eq!(bounds.t_max, 14);
}

#[test]
fn test_late_batch_is_merged_in_order() {
    let mut buffer = StreamBuffer::new(100).unwrap();
    buffer.append(vec![point(10), point(20), point(30)]);
    buffer.append(vec![point(25), point(5), point(15)]);
    assert_eq!(timestamps(&buffer), vec![5, 10, 15, 20, 25, 30]);
}

#[test]
fn test_late_batch_evicts_by_timestamp_not_arrival() {
    let mut buffer = StreamBuffer::new(3).unwrap();
    buffer.append(vec![point(10), point(20), point(30)]);
    // The late point is the oldest, so it is the one evicted.
    buffer.append(vec![point(1)]);
    assert_eq!(timestamps(&buffer), vec![10, 20, 30]);
}

#[test]
fn test_equal_timestamps_keep_arrival_order() {
    let mut buffer = StreamBuffer::new(10).unwrap();
    buffer.append(vec![Measurement::new(5, 1.0, "a"), Measurement::new(9, 0.0, "a")]);
    buffer.append(vec![Measurement::new(5, 2.0, "b"), Measurement::new(5, 3.0, "c")]);

    let snapshot = buffer.snapshot();
    let at_five: Vec<&str> = snapshot
        .iter()
        .filter(|m| m.timestamp == 5)
        .map(|m| &*m.category)
        .collect();
    assert_eq!(at_five, vec!["a", "b", "c"]);
}

#[test]
fn test_snapshot_unaffected_by_later_writes() {
    let mut buffer = StreamBuffer::new(3).unwrap();
    buffer.append(vec![point(1), point(2), point(3)]);
    let before = buffer.snapshot();

    buffer.append(vec![point(4), point(5)]);
    buffer.clear();

    let ts: Vec<i64> = before.iter().map(|m| m.timestamp).collect();
    assert_eq!(ts, vec![1, 2, 3]);
    assert!(buffer.snapshot().is_empty());
    assert!(buffer.snapshot().version() > before.version());
}

#[test]
fn test_snapshot_range_is_inclusive() {
    let mut buffer = StreamBuffer::new(100).unwrap();
    buffer.append((0..10).map(|i| point(i * 10)));
    let snapshot = buffer.snapshot();

    let window: Vec<i64> = snapshot.range(20, 50).iter().map(|m| m.timestamp).collect();
    assert_eq!(window, vec![20, 30, 40, 50]);
    assert!(snapshot.range(51, 59).is_empty());
    assert!(snapshot.range(90, 10).is_empty());
}

#[test]
fn test_empty_batch_is_a_no_op() {
    let mut buffer = StreamBuffer::new(4).unwrap();
    buffer.append(Vec::new());
    assert_eq!(buffer.version(), 0);
    assert!(buffer.snapshot().bounds().is_none());
}

#[test]
fn test_random_appends_stay_bounded_and_sorted() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..50 {
        let capacity = rng.random_range(1..200);
        let mut buffer = StreamBuffer::new(capacity).unwrap();
        let mut clock = 0i64;
        for _ in 0..40 {
            let size = rng.random_range(0..50);
            let batch: Vec<Measurement> = (0..size)
                .map(|_| {
                    // Mostly forward, sometimes late by up to 100ms.
                    clock += rng.random_range(0..10);
                    point(clock - rng.random_range(0..100))
                })
                .collect();
            buffer.append(batch);

            let snapshot = buffer.snapshot();
            assert!(snapshot.len() <= capacity);
            assert!(
                snapshot.windows(2).all(|w| w[0].timestamp <= w[1].timestamp),
                "snapshot not sorted"
            );
        }
    }
}
