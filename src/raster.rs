//! Raster images and the input kinds accepted for the base layer
//!
//! A `Raster` is the displayable form of an image: 8-bit samples in one of
//! three pixel formats. Callers hand images over as an `ImageSource`, which
//! covers the numeric buffers, file paths and decoded images the viewer
//! understands. Anything else is rejected with `UnsupportedInputKind`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use egui::ColorImage;
use image::DynamicImage;

use crate::error::{Result, ViewerError};

/// Pixel layout of a raster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Gray,
    Rgb,
    Rgba,
}

impl PixelFormat {
    /// Number of 8-bit samples per pixel
    pub fn channels(&self) -> u32 {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }

    /// Format for a channel count, if the viewer can display it
    pub fn from_channels(channels: u32) -> Option<Self> {
        match channels {
            1 => Some(PixelFormat::Gray),
            3 => Some(PixelFormat::Rgb),
            4 => Some(PixelFormat::Rgba),
            _ => None,
        }
    }
}

/// An immutable 8-bit image, replaced wholesale rather than edited
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Raster {
    /// Wrap interleaved samples; the buffer length must match the dimensions
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        check_len(width, height, format.channels(), data.len())?;
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// For buffers whose length is correct by construction
    pub(crate) fn from_parts(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (format.channels() as usize)
        );
        Self {
            width,
            height,
            format,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Samples of the pixel at column `x`, row `y`
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let channels = self.format.channels() as usize;
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * channels;
        self.data.get(idx..idx + channels)
    }

    /// Convert a decoded image, keeping 8-bit gray/RGB/RGBA layouts as they are
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let (format, data) = match image {
            DynamicImage::ImageLuma8(buf) => (PixelFormat::Gray, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (PixelFormat::Rgb, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (PixelFormat::Rgba, buf.into_raw()),
            other @ DynamicImage::ImageLuma16(_) => (PixelFormat::Gray, other.to_luma8().into_raw()),
            other => (PixelFormat::Rgba, other.to_rgba8().into_raw()),
        };
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Build an egui image for texture upload
    pub fn to_color_image(&self) -> ColorImage {
        let size = [self.width as usize, self.height as usize];
        match self.format {
            PixelFormat::Gray => ColorImage::from_gray(size, &self.data),
            PixelFormat::Rgb => ColorImage::from_rgb(size, &self.data),
            PixelFormat::Rgba => ColorImage::from_rgba_unmultiplied(size, &self.data),
        }
    }
}

/// A numeric buffer with explicit dimensions and channel count
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<T>,
}

impl<T> Grid<T> {
    /// Create a grid of `channels` interleaved samples per pixel (1, 3 or 4)
    pub fn new(width: u32, height: u32, channels: u32, data: Vec<T>) -> Result<Self> {
        if PixelFormat::from_channels(channels).is_none() {
            return Err(ViewerError::UnsupportedInputKind(format!(
                "{} channels per pixel (expected 1, 3 or 4)",
                channels
            )));
        }
        check_len(width, height, channels, data.len())?;
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Single-channel grid
    pub fn gray(width: u32, height: u32, data: Vec<T>) -> Result<Self> {
        Self::new(width, height, 1, data)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    fn format(&self) -> PixelFormat {
        // channel count is validated in `new`
        PixelFormat::from_channels(self.channels).unwrap_or(PixelFormat::Gray)
    }
}

/// Element type of an untyped sample buffer (Rust-style names: "u8", "f64", ...)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl SampleKind {
    pub fn is_integer(&self) -> bool {
        !matches!(self, SampleKind::F32 | SampleKind::F64)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SampleKind::U8 => "u8",
            SampleKind::I8 => "i8",
            SampleKind::U16 => "u16",
            SampleKind::I16 => "i16",
            SampleKind::U32 => "u32",
            SampleKind::I32 => "i32",
            SampleKind::U64 => "u64",
            SampleKind::I64 => "i64",
            SampleKind::F32 => "f32",
            SampleKind::F64 => "f64",
        }
    }
}

impl FromStr for SampleKind {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "u8" => Ok(SampleKind::U8),
            "i8" => Ok(SampleKind::I8),
            "u16" => Ok(SampleKind::U16),
            "i16" => Ok(SampleKind::I16),
            "u32" => Ok(SampleKind::U32),
            "i32" => Ok(SampleKind::I32),
            "u64" => Ok(SampleKind::U64),
            "i64" => Ok(SampleKind::I64),
            "f32" => Ok(SampleKind::F32),
            "f64" => Ok(SampleKind::F64),
            other => Err(ViewerError::UnsupportedInputKind(format!(
                "sample type '{}'",
                other
            ))),
        }
    }
}

/// Everything `set_base_image` accepts
#[derive(Clone, Debug)]
pub enum ImageSource {
    /// Floats assumed to be in [0, 1], scaled by 255
    Normalized(Grid<f64>),
    /// 8-bit samples, used as-is
    Bytes(Grid<u8>),
    /// Image file on disk (PNG, JPEG, BMP, TIFF)
    Path(PathBuf),
    /// An already decoded image
    Decoded(DynamicImage),
    /// Pixels ready for display
    Raster(Raster),
}

impl ImageSource {
    /// Interpret a buffer of samples according to its element type.
    ///
    /// Float kinds become `Normalized`; integer kinds are taken to already be
    /// in 8-bit range and are clamped into it.
    pub fn from_samples(
        kind: SampleKind,
        samples: Vec<f64>,
        width: u32,
        height: u32,
        channels: u32,
    ) -> Result<Self> {
        if kind.is_integer() {
            let bytes = samples.into_iter().map(|v| v.clamp(0.0, 255.0) as u8).collect();
            Ok(ImageSource::Bytes(Grid::new(width, height, channels, bytes)?))
        } else {
            Ok(ImageSource::Normalized(Grid::new(width, height, channels, samples)?))
        }
    }

    /// Short description for log messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            ImageSource::Normalized(_) => "normalized float grid",
            ImageSource::Bytes(_) => "8-bit grid",
            ImageSource::Path(_) => "image file",
            ImageSource::Decoded(_) => "decoded image",
            ImageSource::Raster(_) => "raster",
        }
    }

    /// Produce the displayable raster, loading from disk for `Path`
    pub fn into_raster(self) -> Result<Raster> {
        match self {
            ImageSource::Normalized(grid) => {
                let format = grid.format();
                let data = grid.data.iter().map(|&v| float_to_u8(v)).collect();
                Raster::new(grid.width, grid.height, format, data)
            }
            ImageSource::Bytes(grid) => {
                let format = grid.format();
                Raster::new(grid.width, grid.height, format, grid.data)
            }
            ImageSource::Path(path) => load_path(&path),
            ImageSource::Decoded(image) => Ok(Raster::from_dynamic(image)),
            ImageSource::Raster(raster) => Ok(raster),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        ImageSource::Decoded(image)
    }
}

impl From<Raster> for ImageSource {
    fn from(raster: Raster) -> Self {
        ImageSource::Raster(raster)
    }
}

impl From<Grid<u8>> for ImageSource {
    fn from(grid: Grid<u8>) -> Self {
        ImageSource::Bytes(grid)
    }
}

impl From<Grid<f64>> for ImageSource {
    fn from(grid: Grid<f64>) -> Self {
        ImageSource::Normalized(grid)
    }
}

/// Scale a [0, 1] float to 8 bits; NaN maps to 0, out-of-range values saturate
fn float_to_u8(v: f64) -> u8 {
    if v.is_nan() {
        0
    } else {
        (v * 255.0).clamp(0.0, 255.0) as u8
    }
}

fn load_path(path: &Path) -> Result<Raster> {
    if !path.exists() {
        return Err(ViewerError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let image = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
            ViewerError::FileNotFound {
                path: path.to_path_buf(),
            }
        }
        other => ViewerError::Decode {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    })?;
    Ok(Raster::from_dynamic(image))
}

/// Validate dimensions and that `actual` samples fill them exactly
pub(crate) fn check_len(width: u32, height: u32, channels: u32, actual: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ViewerError::UnsupportedInputKind(format!(
            "empty {}x{} grid",
            width, height
        )));
    }
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(channels as usize))
        .ok_or_else(|| {
            ViewerError::UnsupportedInputKind(format!(
                "{}x{}x{} samples do not fit in memory",
                width, height, channels
            ))
        })?;
    if actual != expected {
        return Err(ViewerError::BufferSizeMismatch {
            width,
            height,
            channels,
            expected,
            actual,
        });
    }
    Ok(())
}
