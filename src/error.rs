//! Error types shared by every component.

use thiserror::Error;

/// Which data-space axis a viewport problem refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => f.write_str("x"),
            Axis::Y => f.write_str("y"),
        }
    }
}

/// Bad input received at a component boundary. Never clamped silently.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("buffer capacity must be a positive integer, got {0}")]
    InvalidCapacity(usize),

    #[error("bucket width must be positive, got {0} ms")]
    NonPositiveBucketWidth(i64),

    #[error("degenerate viewport: {axis}_min must be strictly below {axis}_max")]
    DegenerateViewport { axis: Axis },

    #[error("{name} must be a positive finite number, got {value}")]
    InvalidExtent { name: &'static str, value: f64 },

    #[error("surface of {width}x{height} leaves no room for the plot area")]
    InvalidSurface { width: f64, height: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// A single failed frame. The scheduler reports it and keeps ticking.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransientDrawError {
    #[error("draw callback failed on frame {frame}: {message}")]
    Failed { frame: u64, message: String },

    #[error("draw callback panicked on frame {frame}: {message}")]
    Panicked { frame: u64, message: String },
}

impl TransientDrawError {
    pub fn frame(&self) -> u64 {
        match self {
            Self::Failed { frame, .. } | Self::Panicked { frame, .. } => *frame,
        }
    }
}

pub type Result<T, E = ConfigurationError> = std::result::Result<T, E>;

/// Checks that `value` is finite and strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigurationError::InvalidExtent { name, value })
    }
}
