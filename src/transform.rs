//! Bidirectional data <-> pixel mapping.
//!
//! `x` is normalized into `[0, 1]` across the viewport and laid out left to
//! right inside the padded plot rectangle. The vertical axis is inverted:
//! larger values sit closer to the top of the surface.

use crate::data_types::{Padding, Viewport};
use crate::error::{ConfigurationError, Result};
use crate::scales::LinearScale;
use glam::Vec2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    viewport: Viewport,
    width: f64,
    height: f64,
    padding: Padding,
}

impl CoordinateMapper {
    /// Validates the viewport and that the padded plot area is non-empty.
    pub fn new(viewport: Viewport, width: f64, height: f64, padding: Padding) -> Result<Self> {
        viewport.validate()?;
        let plot_w = width - padding.horizontal();
        let plot_h = height - padding.vertical();
        if !(plot_w.is_finite() && plot_w > 0.0 && plot_h.is_finite() && plot_h > 0.0) {
            return Err(ConfigurationError::InvalidSurface { width, height });
        }
        Ok(Self {
            viewport,
            width,
            height,
            padding,
        })
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn surface_size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn padding(&self) -> &Padding {
        &self.padding
    }

    pub fn plot_width(&self) -> f64 {
        self.width - self.padding.horizontal()
    }

    pub fn plot_height(&self) -> f64 {
        self.height - self.padding.vertical()
    }

    #[inline]
    pub fn to_pixel(&self, data_x: f64, data_y: f64) -> (f64, f64) {
        let vp = &self.viewport;
        let nx = (data_x - vp.x_min) / (vp.x_max - vp.x_min);
        let ny = (data_y - vp.y_min) / (vp.y_max - vp.y_min);
        (
            self.padding.left + nx * self.plot_width(),
            self.padding.top + (1.0 - ny) * self.plot_height(),
        )
    }

    #[inline]
    pub fn to_data(&self, pixel_x: f64, pixel_y: f64) -> (f64, f64) {
        let vp = &self.viewport;
        let nx = (pixel_x - self.padding.left) / self.plot_width();
        let ny = 1.0 - (pixel_y - self.padding.top) / self.plot_height();
        (
            vp.x_min + nx * (vp.x_max - vp.x_min),
            vp.y_min + ny * (vp.y_max - vp.y_min),
        )
    }

    pub fn to_pixel_vec(&self, data_x: f64, data_y: f64) -> Vec2 {
        let (x, y) = self.to_pixel(data_x, data_y);
        Vec2::new(x as f32, y as f32)
    }

    pub fn x_scale(&self) -> LinearScale {
        LinearScale::new(
            (self.viewport.x_min, self.viewport.x_max),
            (self.padding.left, self.padding.left + self.plot_width()),
        )
    }

    pub fn y_scale(&self) -> LinearScale {
        LinearScale::new(
            (self.viewport.y_min, self.viewport.y_max),
            (self.padding.top + self.plot_height(), self.padding.top),
        )
    }

    /// Returns (x_scale, x_offset, y_scale, y_offset) for batch transforms.
    /// formula: pixel = data * scale + offset
    pub fn scale_coefficients(&self) -> (f64, f64, f64, f64) {
        let (xm, xc) = self.x_scale().linear_coeffs();
        let (ym, yc) = self.y_scale().linear_coeffs();
        (xm, xc, ym, yc)
    }
}

/// Free-function form: validates its arguments on every call.
pub fn to_pixel(
    data_x: f64,
    data_y: f64,
    viewport: &Viewport,
    surface_width: f64,
    surface_height: f64,
    padding: &Padding,
) -> Result<(f64, f64)> {
    let mapper = CoordinateMapper::new(*viewport, surface_width, surface_height, *padding)?;
    Ok(mapper.to_pixel(data_x, data_y))
}

/// Exact inverse of [`to_pixel`] for the same arguments.
pub fn to_data(
    pixel_x: f64,
    pixel_y: f64,
    viewport: &Viewport,
    surface_width: f64,
    surface_height: f64,
    padding: &Padding,
) -> Result<(f64, f64)> {
    let mapper = CoordinateMapper::new(*viewport, surface_width, surface_height, *padding)?;
    Ok(mapper.to_data(pixel_x, pixel_y))
}
