use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stream_chart::scales::LinearScale;
use stream_chart::simd::batch_transform_points;
use stream_chart::{to_data, to_pixel, ConfigurationError, CoordinateMapper, Measurement, Padding, Viewport};

#[test]
fn test_linear_scale() {
    let scale = LinearScale::new((0.0, 100.0), (0.0, 500.0));

    assert_eq!(scale.map(0.0), 0.0);
    assert_eq!(scale.map(50.0), 250.0);
    assert_eq!(scale.map(100.0), 500.0);

    assert_eq!(scale.invert(0.0), 0.0);
    assert_eq!(scale.invert(250.0), 50.0);
    assert_eq!(scale.invert(500.0), 100.0);
}

#[test]
fn test_corners_and_y_inversion() {
    let vp = Viewport::new(0.0, 100.0, 0.0, 100.0).unwrap();
    let pad = Padding {
        top: 10.0,
        right: 20.0,
        bottom: 30.0,
        left: 40.0,
    };
    let mapper = CoordinateMapper::new(vp, 240.0, 240.0, pad).unwrap();

    // Bottom-left of the data lands on the bottom-left of the plot rect.
    assert_eq!(mapper.to_pixel(0.0, 0.0), (40.0, 210.0));
    assert_eq!(mapper.to_pixel(100.0, 100.0), (220.0, 10.0));
    assert_eq!(mapper.to_pixel(50.0, 50.0), (130.0, 110.0));

    let (_, low) = mapper.to_pixel(0.0, 10.0);
    let (_, high) = mapper.to_pixel(0.0, 90.0);
    assert!(high < low, "larger values sit higher on the surface");
}

#[test]
fn test_degenerate_viewport_is_rejected() {
    let flat = Viewport {
        x_min: 5.0,
        x_max: 5.0,
        y_min: 0.0,
        y_max: 1.0,
        scale: 1.0,
    };
    assert!(matches!(
        to_pixel(5.0, 0.5, &flat, 100.0, 100.0, &Padding::default()),
        Err(ConfigurationError::DegenerateViewport { .. })
    ));
    assert!(Viewport::new(0.0, 1.0, 3.0, 3.0).is_err());
    assert!(Viewport::new(0.0, 1.0, f64::NAN, 3.0).is_err());
}

#[test]
fn test_padding_larger_than_surface_is_rejected() {
    let vp = Viewport::new(0.0, 1.0, 0.0, 1.0).unwrap();
    assert!(matches!(
        CoordinateMapper::new(vp, 50.0, 50.0, Padding::uniform(30.0)),
        Err(ConfigurationError::InvalidSurface { .. })
    ));
}

#[test]
fn test_round_trip_random_viewports() {
    let mut rng = StdRng::seed_from_u64(1234);
    for _ in 0..2_000 {
        let x_min = rng.random_range(-1e12..1e12);
        let x_span = rng.random_range(1e-3..1e9);
        let y_min = rng.random_range(-1e6..1e6);
        let y_span = rng.random_range(1e-6..1e6);
        let vp = Viewport::new(x_min, x_min + x_span, y_min, y_min + y_span).unwrap();
        let w = rng.random_range(50.0..4000.0);
        let h = rng.random_range(50.0..4000.0);
        let pad = Padding {
            top: rng.random_range(0.0..20.0),
            right: rng.random_range(0.0..20.0),
            bottom: rng.random_range(0.0..20.0),
            left: rng.random_range(0.0..20.0),
        };

        let x = x_min + rng.random_range(-0.5..1.5) * x_span;
        let y = y_min + rng.random_range(-0.5..1.5) * y_span;
        let (px, py) = to_pixel(x, y, &vp, w, h, &pad).unwrap();
        let (bx, by) = to_data(px, py, &vp, w, h, &pad).unwrap();

        let x_tol = 1e-9 * x_span.max(x.abs());
        let y_tol = 1e-9 * y_span.max(y.abs());
        assert!((bx - x).abs() <= x_tol, "x: {x} -> {px} -> {bx}");
        assert!((by - y).abs() <= y_tol, "y: {y} -> {py} -> {by}");
    }
}

#[test]
fn test_batch_transform_matches_mapper() {
    let vp = Viewport::new(1_000.0, 2_000.0, -5.0, 5.0).unwrap();
    let mapper = CoordinateMapper::new(vp, 800.0, 600.0, Padding::uniform(10.0)).unwrap();
    let points: Vec<Measurement> = (0..37)
        .map(|i| Measurement::new(1_000 + i * 25, (i as f64 * 0.3).sin() * 5.0, "cpu"))
        .collect();

    let mut out = Vec::new();
    batch_transform_points(&points, &mapper, &mut out);
    assert_eq!(out.len(), points.len());
    for (m, p) in points.iter().zip(&out) {
        let expected = mapper.to_pixel_vec(m.timestamp as f64, m.value);
        assert!((expected - *p).abs().max_element() < 1e-3);
    }
}

#[test]
fn test_ticks_are_round_values() {
    let scale = LinearScale::new((0.0, 100.0), (0.0, 1.0));
    assert_eq!(scale.ticks(5), vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
    assert!(LinearScale::new((3.0, 3.0), (0.0, 1.0)).ticks(5).is_empty());
}
