/// Linear mapping from a data domain onto a pixel range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    #[inline]
    pub fn map(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let t = (value - d0) / (d1 - d0);
        r0 + t * (r1 - r0)
    }

    #[inline]
    pub fn invert(&self, pixel: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let t = (pixel - r0) / (r1 - r0);
        d0 + t * (d1 - d0)
    }

    /// Returns (m, c) such that pixel = value * m + c.
    pub fn linear_coeffs(&self) -> (f64, f64) {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let m = (r1 - r0) / (d1 - d0);
        (m, r0 - m * d0)
    }

    /// Roughly `count` evenly spaced round values inside the domain.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = if self.domain.0 <= self.domain.1 {
            self.domain
        } else {
            (self.domain.1, self.domain.0)
        };
        let step = tick_step(lo, hi, count);
        if !(step.is_finite() && step > 0.0) {
            return Vec::new();
        }
        let start = (lo / step).ceil() as i64;
        let stop = (hi / step).floor() as i64;
        if stop < start {
            return Vec::new();
        }
        (start..=stop).map(|i| i as f64 * step).collect()
    }
}

/// Step of the form {1, 2, 5} x 10^k closest to span / count.
pub fn tick_step(lo: f64, hi: f64, count: usize) -> f64 {
    let span = hi - lo;
    if count == 0 || !(span.is_finite() && span > 0.0) {
        return 0.0;
    }
    let raw = span / count as f64;
    let power = 10f64.powf(raw.log10().floor());
    let err = raw / power;
    let factor = if err >= 50f64.sqrt() {
        10.0
    } else if err >= 10f64.sqrt() {
        5.0
    } else if err >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * power
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_are_round_and_inside_domain() {
        let scale = LinearScale::new((0.0, 100.0), (0.0, 500.0));
        assert_eq!(scale.ticks(5), vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
        let scale = LinearScale::new((3.0, 97.0), (0.0, 500.0));
        assert!(scale.ticks(10).iter().all(|t| (3.0..=97.0).contains(t)));
    }

    #[test]
    fn invert_undoes_map() {
        let scale = LinearScale::new((-5.0, 5.0), (300.0, 20.0));
        for v in [-5.0, -1.25, 0.0, 4.5] {
            assert!((scale.invert(scale.map(v)) - v).abs() < 1e-12);
        }
    }
}
