use serde::{Deserialize, Serialize};

/// Linear RGBA color, components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// Opaque color from a `0xRRGGBB` literal.
pub const fn rgb(hex: u32) -> Rgba {
    Rgba {
        r: ((hex >> 16) & 0xff) as f32 / 255.0,
        g: ((hex >> 8) & 0xff) as f32 / 255.0,
        b: (hex & 0xff) as f32 / 255.0,
        a: 1.0,
    }
}

pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartTheme {
    pub background: Rgba,
    pub grid_line: Rgba,
    pub bucket_fill: Rgba,
    /// Cycled through by category index.
    pub series: Vec<Rgba>,
}

impl ChartTheme {
    pub fn series_color(&self, index: usize) -> Rgba {
        if self.series.is_empty() {
            return WHITE;
        }
        self.series[index % self.series.len()]
    }
}

impl Default for ChartTheme {
    fn default() -> Self {
        Self {
            background: BLACK,
            grid_line: WHITE.alpha(0.1),
            bucket_fill: WHITE.alpha(0.08),
            series: vec![
                rgb(0x4e79a7),
                rgb(0xf28e2b),
                rgb(0x59a14f),
                rgb(0xe15759),
                rgb(0x76b7b2),
                rgb(0xedc948),
            ],
        }
    }
}
