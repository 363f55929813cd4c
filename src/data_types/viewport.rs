use crate::error::{Axis, ConfigurationError, Result};
use serde::{Deserialize, Serialize};

/// The visible data-space rectangle.
///
/// `scale` is the zoom level relative to the last auto-fit (1.0 = fitted,
/// below 1.0 = zoomed in). It does not take part in coordinate mapping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub scale: f64,
}

impl Viewport {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<Self> {
        let vp = Self {
            x_min,
            x_max,
            y_min,
            y_max,
            scale: 1.0,
        };
        vp.validate()?;
        Ok(vp)
    }

    /// Fails with `DegenerateViewport` unless both axes have a strictly
    /// positive, finite span.
    pub fn validate(&self) -> Result<()> {
        if !(self.x_min < self.x_max) || !(self.x_max - self.x_min).is_finite() {
            return Err(ConfigurationError::DegenerateViewport { axis: Axis::X });
        }
        if !(self.y_min < self.y_max) || !(self.y_max - self.y_min).is_finite() {
            return Err(ConfigurationError::DegenerateViewport { axis: Axis::Y });
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
            scale: 1.0,
        }
    }
}

/// Insets between the surface edge and the plot rectangle, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// Data extents of a measurement set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DataBounds {
    pub t_min: i64,
    pub t_max: i64,
    pub v_min: f64,
    pub v_max: f64,
}
