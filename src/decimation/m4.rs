use glam::Vec2;

/// Indices of first, min-y, max-y and last inside `chunk`, sorted and
/// deduplicated. NaN y values are never selected as extrema.
fn m4_indices(chunk: &[Vec2]) -> ([usize; 4], usize) {
    let n = chunk.len();
    let last = n - 1;
    let mut min_idx = 0;
    let mut max_idx = 0;
    let mut min_y = f32::INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for (i, p) in chunk.iter().enumerate() {
        if p.y.is_nan() {
            continue;
        }
        if p.y < min_y {
            min_y = p.y;
            min_idx = i;
        }
        if p.y > max_y {
            max_y = p.y;
            max_idx = i;
        }
    }

    let mut idxs = [0, min_idx, max_idx, last];
    idxs.sort_unstable();
    let mut out = [0usize; 4];
    let mut count = 1;
    for i in 1..4 {
        if idxs[i] != idxs[i - 1] {
            out[count] = idxs[i];
            count += 1;
        }
    }
    (out, count)
}

/// Reduces an x-sorted pixel polyline to at most four points per pixel
/// column (first, min, max, last), preserving the visual envelope.
pub fn decimate_m4_columns_into(points: &[Vec2], output: &mut Vec<Vec2>) {
    output.clear();
    if points.len() <= 4 {
        output.extend_from_slice(points);
        return;
    }

    let mut start = 0;
    while start < points.len() {
        let column = points[start].x.floor();
        let len = points[start..]
            .iter()
            .position(|p| p.x.floor() != column)
            .unwrap_or(points.len() - start);
        let chunk = &points[start..start + len];
        let (idxs, count) = m4_indices(chunk);
        output.extend(idxs[..count].iter().map(|&i| chunk[i]));
        start += len;
    }
}

pub fn decimate_m4_columns(points: &[Vec2]) -> Vec<Vec2> {
    let mut output = Vec::new();
    decimate_m4_columns_into(points, &mut output);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_envelope_of_each_column() {
        let points: Vec<Vec2> = (0..100)
            .map(|i| Vec2::new(i as f32 / 10.0, (i % 7) as f32))
            .collect();
        let out = decimate_m4_columns(&points);
        assert!(out.len() <= 40);
        assert_eq!(out.first(), points.first());
        assert_eq!(out.last(), points.last());
        for col in 0..10 {
            let ys: Vec<f32> = out
                .iter()
                .filter(|p| p.x.floor() as i32 == col)
                .map(|p| p.y)
                .collect();
            assert!(ys.contains(&0.0) && ys.contains(&6.0));
        }
    }
}
