//! Translucent overlay rendering for label maps

use crate::error::{Result, ViewerError};
use crate::labels::LabelMap;
use crate::palette::LabelPalette;
use crate::raster::{PixelFormat, Raster};

/// Default overlay opacity
pub const DEFAULT_OPACITY: f32 = 0.5;

/// Overlay opacity, always in (0, 1]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Opacity(f32);

impl Opacity {
    pub const OPAQUE: Self = Self(1.0);

    pub fn new(value: f32) -> Result<Self> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(ViewerError::InvalidOpacity(value))
        }
    }

    pub fn get(&self) -> f32 {
        self.0
    }

    /// Alpha byte applied to labelled pixels
    pub fn alpha(&self) -> u8 {
        (self.0 * 255.0).round() as u8
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self(DEFAULT_OPACITY)
    }
}

/// RGBA rendering of a label map: background transparent, labels colored
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayRaster {
    raster: Raster,
    opacity: Opacity,
}

impl OverlayRaster {
    pub fn render(labels: &LabelMap, opacity: Opacity, palette: LabelPalette) -> Self {
        let alpha = opacity.alpha();
        let mut data = Vec::with_capacity(labels.as_slice().len() * 4);
        for &label in labels.as_slice() {
            match palette.color_for(label) {
                Some(color) => data.extend_from_slice(&[color.r(), color.g(), color.b(), alpha]),
                None => data.extend_from_slice(&[0, 0, 0, 0]),
            }
        }
        let raster = Raster::from_parts(labels.width(), labels.height(), PixelFormat::Rgba, data);
        Self { raster, opacity }
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn opacity(&self) -> Opacity {
        self.opacity
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    /// Alpha byte at column `x`, row `y`
    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        self.raster.pixel(x, y).map(|p| p[3])
    }
}
