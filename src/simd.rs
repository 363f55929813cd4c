//! Batch coordinate transforms.
//! Relying on auto-vectorization by LLVM.

use crate::data_types::Measurement;
use crate::transform::CoordinateMapper;
use glam::Vec2;

/// Maps every measurement through `pixel = data * scale + offset`.
/// Coefficients are applied in f64 and narrowed once per point.
pub fn batch_transform_points(
    data: &[Measurement],
    mapper: &CoordinateMapper,
    output: &mut Vec<Vec2>,
) {
    let (xm, xc, ym, yc) = mapper.scale_coefficients();
    output.clear();
    output.reserve(data.len());
    output.extend(data.iter().map(|m| {
        Vec2::new(
            (m.timestamp as f64 * xm + xc) as f32,
            (m.value * ym + yc) as f32,
        )
    }));
}
