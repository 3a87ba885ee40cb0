//! Generated demo data: bright discs on a shaded background and their segmentation

use std::collections::{HashMap, HashSet};

use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::morphology::close;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::labels::LabelMap;
use crate::overlay::{Opacity, OverlayRaster};
use crate::palette::LabelPalette;
use crate::raster::Raster;

const WIDTH: u32 = 240;
const HEIGHT: u32 = 160;

/// (center x, center y, radius, brightness)
const DISCS: [(f32, f32, f32, f32); 13] = [
    (40.0, 30.0, 14.0, 180.0),
    (90.0, 30.0, 12.0, 200.0),
    (140.0, 30.0, 16.0, 170.0),
    (190.0, 30.0, 13.0, 210.0),
    (40.0, 80.0, 15.0, 190.0),
    (90.0, 80.0, 11.0, 220.0),
    (140.0, 80.0, 14.0, 175.0),
    (190.0, 80.0, 16.0, 195.0),
    (40.0, 130.0, 12.0, 205.0),
    (90.0, 130.0, 16.0, 185.0),
    (140.0, 130.0, 13.0, 215.0),
    (190.0, 130.0, 15.0, 180.0),
    // cut by the border, removed during segmentation
    (236.0, 152.0, 12.0, 200.0),
];

/// A grey image and the labels found in it
#[derive(Clone, Debug)]
pub struct TestData {
    pub image: Raster,
    pub labels: LabelMap,
}

impl TestData {
    pub fn generate() -> Self {
        Self::from_gray(synthetic_discs(WIDTH, HEIGHT))
    }

    /// Segment an arbitrary grey image
    pub fn from_gray(gray: GrayImage) -> Self {
        let labels = segment(&gray);
        Self {
            image: Raster::from_dynamic(DynamicImage::ImageLuma8(gray)),
            labels,
        }
    }

    /// Fully opaque colored labels, transparent background
    pub fn overlay(&self, palette: LabelPalette) -> OverlayRaster {
        OverlayRaster::render(&self.labels, Opacity::OPAQUE, palette)
    }
}

fn synthetic_discs(width: u32, height: u32) -> GrayImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        let (fx, fy) = (x as f32, y as f32);
        let mut value = 40.0 + 50.0 * fx / width as f32;
        for (cx, cy, radius, level) in DISCS {
            if (fx - cx).hypot(fy - cy) <= radius {
                value = level;
            }
        }
        Luma([value as u8])
    })
}

/// Otsu threshold, 3x3 closing, border clearing, 8-connected labelling
fn segment(gray: &GrayImage) -> LabelMap {
    let level = otsu_level(gray);
    let mut binary = gray.clone();
    for p in binary.pixels_mut() {
        *p = if p.0[0] > level { Luma([255]) } else { Luma([0]) };
    }
    let closed = close(&binary, Norm::LInf, 1);
    let mut components = connected_components(&closed, Connectivity::Eight, Luma([0u8]));

    let (w, h) = components.dimensions();
    let touching: HashSet<u32> = components
        .enumerate_pixels()
        .filter(|(x, y, p)| p.0[0] != 0 && (*x == 0 || *y == 0 || *x == w - 1 || *y == h - 1))
        .map(|(_, _, p)| p.0[0])
        .collect();

    // Renumber survivors 1, 2, ... in scan order
    let mut remap = HashMap::new();
    let mut next = 0u32;
    for p in components.pixels_mut() {
        let label = p.0[0];
        p.0[0] = if label == 0 || touching.contains(&label) {
            0
        } else {
            *remap.entry(label).or_insert_with(|| {
                next += 1;
                next
            })
        };
    }

    LabelMap::from_image(&components)
}
