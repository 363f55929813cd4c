use crate::config::ViewportConfig;
use crate::data_types::{DataBounds, Viewport};
use tracing::debug;

/// ViewController handles the business logic of interactions (zoom, pan, auto-fit)
/// independently of any windowing layer to facilitate testing.
pub struct ViewController;

impl ViewController {
    const MIN_SPAN: f64 = 1e-9;

    /// Calculates the new bounds for an auto-fit with an optional margin.
    pub fn compute_auto_fit(min: f64, max: f64, margin_pct: f64) -> (f64, f64) {
        if !min.is_finite() || !max.is_finite() || min > max {
            return (0.0, 100.0);
        }

        // Avoids a zero span
        let (lo, hi) = if (max - min).abs() < f64::EPSILON {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        };
        let span = hi - lo;

        (lo - span * margin_pct, hi + span * margin_pct)
    }

    /// Viewport covering `bounds`. Time gets no margin, values do.
    pub fn fit_bounds(bounds: &DataBounds, margin_pct: f64) -> Viewport {
        let (x_min, x_max) = Self::compute_auto_fit(bounds.t_min as f64, bounds.t_max as f64, 0.0);
        let (y_min, y_max) = Self::compute_auto_fit(bounds.v_min, bounds.v_max, margin_pct);
        Viewport {
            x_min,
            x_max,
            y_min,
            y_max,
            scale: 1.0,
        }
    }

    /// Pans by a pixel delta. Dragging right reveals earlier data; dragging
    /// down reveals higher values.
    pub fn pan(
        viewport: &mut Viewport,
        delta_x_px: f64,
        delta_y_px: f64,
        plot_width: f64,
        plot_height: f64,
    ) {
        if plot_width > 0.0 {
            let dx = -delta_x_px * viewport.width() / plot_width;
            viewport.x_min += dx;
            viewport.x_max += dx;
        }
        if plot_height > 0.0 {
            let dy = delta_y_px * viewport.height() / plot_height;
            viewport.y_min += dy;
            viewport.y_max += dy;
        }
    }

    /// Zooms both axes around a pivot given as a fraction of each axis
    /// (0 = min edge, 1 = max edge). `factor < 1` zooms in.
    pub fn zoom_at(viewport: &mut Viewport, pivot_x_pct: f64, pivot_y_pct: f64, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let zoom_axis = |min: &mut f64, max: &mut f64, pivot_pct: f64| -> f64 {
            let span = *max - *min;
            let mut f = factor;
            if span * f < Self::MIN_SPAN {
                f = Self::MIN_SPAN / span;
            }
            let pivot = *min + span * pivot_pct;
            let new_span = span * f;
            *min = pivot - new_span * pivot_pct;
            *max = *min + new_span;
            f
        };
        let fx = zoom_axis(&mut viewport.x_min, &mut viewport.x_max, pivot_x_pct);
        zoom_axis(&mut viewport.y_min, &mut viewport.y_max, pivot_y_pct);
        viewport.scale *= fx;
    }

    /// Calculates a zoom factor based on a wheel delta.
    pub fn compute_zoom_factor(delta: f64, sensitivity: f64) -> f64 {
        let factor = 1.0 + delta.abs() / sensitivity;
        if delta > 0.0 {
            1.0 / factor
        } else {
            factor
        }
    }
}

/// Owns the viewport and decides when it follows the data.
///
/// New snapshots mark the fit as stale; the refit happens once the stream has
/// been quiet for `debounce_ms`, or at the latest `max_wait_ms` after the
/// first stale mark so a continuous stream still scrolls. A user pan or zoom
/// detaches the viewport from the data until [`ViewportTracker::reset`].
pub struct ViewportTracker {
    viewport: Viewport,
    config: ViewportConfig,
    follow: bool,
    pending: Option<Pending>,
    last_bounds: Option<DataBounds>,
    refits: u64,
}

#[derive(Clone, Copy, Debug)]
struct Pending {
    first_ms: u64,
    last_ms: u64,
    bounds: DataBounds,
}

impl ViewportTracker {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            viewport: Viewport::default(),
            config,
            follow: true,
            pending: None,
            last_bounds: None,
            refits: 0,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    pub fn refit_count(&self) -> u64 {
        self.refits
    }

    /// Records the bounds of a new visible set. Call [`Self::poll`] to apply.
    pub fn observe(&mut self, bounds: Option<DataBounds>, now_ms: u64) {
        let Some(bounds) = bounds else {
            return;
        };
        if self.last_bounds == Some(bounds) && self.pending.is_none() {
            return;
        }
        // First data: nothing to debounce against.
        if self.last_bounds.is_none() && self.pending.is_none() {
            self.last_bounds = Some(bounds);
            if self.follow {
                self.viewport = ViewController::fit_bounds(&bounds, self.config.auto_fit_margin);
                self.refits += 1;
            }
            return;
        }
        self.pending = Some(match self.pending {
            Some(p) => Pending {
                last_ms: now_ms,
                bounds,
                ..p
            },
            None => Pending {
                first_ms: now_ms,
                last_ms: now_ms,
                bounds,
            },
        });
    }

    /// Applies a pending refit when its debounce window has elapsed.
    /// Returns true when the viewport changed.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let Some(p) = self.pending else {
            return false;
        };
        let quiet = now_ms.saturating_sub(p.last_ms) >= self.config.debounce_ms;
        let overdue = now_ms.saturating_sub(p.first_ms) >= self.config.max_wait_ms;
        if !(quiet || overdue) {
            return false;
        }
        self.pending = None;
        self.last_bounds = Some(p.bounds);
        if !self.follow {
            return false;
        }
        let next = ViewController::fit_bounds(&p.bounds, self.config.auto_fit_margin);
        if next == self.viewport {
            return false;
        }
        self.viewport = next;
        self.refits += 1;
        true
    }

    pub fn pan(&mut self, dx_px: f64, dy_px: f64, plot_width: f64, plot_height: f64) {
        self.follow = false;
        ViewController::pan(&mut self.viewport, dx_px, dy_px, plot_width, plot_height);
        debug!(viewport = ?self.viewport, "viewport panned");
    }

    pub fn zoom_at(&mut self, pivot_x_pct: f64, pivot_y_pct: f64, factor: f64) {
        self.follow = false;
        ViewController::zoom_at(&mut self.viewport, pivot_x_pct, pivot_y_pct, factor);
        debug!(viewport = ?self.viewport, "viewport zoomed");
    }

    /// Mouse-wheel zoom around the cursor, given as a fraction of each axis.
    /// A positive delta zooms in.
    pub fn wheel_zoom(&mut self, delta: f64, sensitivity: f64, pivot_x_pct: f64, pivot_y_pct: f64) {
        if delta == 0.0 || !(sensitivity.is_finite() && sensitivity > 0.0) {
            return;
        }
        let factor = ViewController::compute_zoom_factor(delta, sensitivity);
        self.zoom_at(pivot_x_pct, pivot_y_pct, factor);
    }

    /// Back to following the data, refitted immediately from the last bounds.
    pub fn reset(&mut self) {
        self.follow = true;
        if let Some(b) = self.pending.take().map(|p| p.bounds).or(self.last_bounds) {
            self.last_bounds = Some(b);
            self.viewport = ViewController::fit_bounds(&b, self.config.auto_fit_margin);
            self.refits += 1;
        }
    }
}
