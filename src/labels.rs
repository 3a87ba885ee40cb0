//! Integer label maps (0 = background)

use image::{ImageBuffer, Luma};

use crate::error::{Result, ViewerError};
use crate::raster::{check_len, SampleKind};

/// A grid of region identities, one `u32` per pixel in row-major order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelMap {
    width: u32,
    height: u32,
    labels: Vec<u32>,
}

impl LabelMap {
    pub fn new(width: u32, height: u32, labels: Vec<u32>) -> Result<Self> {
        check_len(width, height, 1, labels.len())?;
        Ok(Self {
            width,
            height,
            labels,
        })
    }

    /// Map with every pixel set to background
    pub fn background(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            labels: vec![0; (width as usize) * (height as usize)],
        }
    }

    /// Build from an untyped sample buffer. Only integer kinds are accepted.
    pub fn from_samples(kind: SampleKind, samples: Vec<f64>, width: u32, height: u32) -> Result<Self> {
        if !kind.is_integer() {
            return Err(ViewerError::UnsupportedInputKind(format!(
                "label maps need integer samples, got '{}'",
                kind.name()
            )));
        }
        let labels = samples
            .into_iter()
            .map(|v| {
                if v < 0.0 || v > u32::MAX as f64 {
                    Err(ViewerError::InvalidLabel { value: v as i128 })
                } else {
                    Ok(v as u32)
                }
            })
            .collect::<Result<Vec<u32>>>()?;
        Self::new(width, height, labels)
    }

    /// Wrap the output of imageproc's connected component labelling
    pub fn from_image(image: &ImageBuffer<Luma<u32>, Vec<u32>>) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            labels: image.as_raw().clone(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.labels
    }

    /// Label at column `x`, row `y`
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x < self.width && y < self.height {
            let idx = (y as usize) * (self.width as usize) + (x as usize);
            self.labels.get(idx).copied()
        } else {
            None
        }
    }

    /// True when no pixel carries a label
    pub fn is_empty(&self) -> bool {
        self.labels.iter().all(|&l| l == 0)
    }

    /// Number of distinct non-zero labels
    pub fn region_count(&self) -> usize {
        let mut seen: Vec<u32> = self.labels.iter().copied().filter(|&l| l != 0).collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}
