//! Qualitative palettes for coloring label regions
//!
//! Labels are mapped onto a short repeating list of distinct colors, so a
//! given label value always gets the same color.

use egui::Color32;
use serde::{Deserialize, Serialize};

/// scikit-image's default `label2rgb` cycle
const CLASSIC: [[u8; 3]; 10] = [
    [255, 0, 0],     // red
    [0, 0, 255],     // blue
    [255, 255, 0],   // yellow
    [255, 0, 255],   // magenta
    [0, 128, 0],     // green
    [75, 0, 130],    // indigo
    [255, 140, 0],   // dark orange
    [0, 255, 255],   // cyan
    [255, 192, 203], // pink
    [154, 205, 50],  // yellow-green
];

/// matplotlib tab10
const TAB10: [[u8; 3]; 10] = [
    [31, 119, 180],
    [255, 127, 14],
    [44, 160, 44],
    [214, 39, 40],
    [148, 103, 189],
    [140, 86, 75],
    [227, 119, 194],
    [127, 127, 127],
    [188, 189, 34],
    [23, 190, 207],
];

/// Available label palettes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LabelPalette {
    #[default]
    Classic,
    Tab10,
}

impl LabelPalette {
    /// Get display name for UI
    pub fn name(&self) -> &'static str {
        match self {
            LabelPalette::Classic => "Classic",
            LabelPalette::Tab10 => "Tab10",
        }
    }

    pub fn all() -> &'static [LabelPalette] {
        &[LabelPalette::Classic, LabelPalette::Tab10]
    }

    fn colors(&self) -> &'static [[u8; 3]] {
        match self {
            LabelPalette::Classic => &CLASSIC,
            LabelPalette::Tab10 => &TAB10,
        }
    }

    /// Color for a label; background (0) has none
    pub fn color_for(&self, label: u32) -> Option<Color32> {
        if label == 0 {
            return None;
        }
        let colors = self.colors();
        let rgb = colors[((label - 1) as usize) % colors.len()];
        Some(Color32::from_rgb(rgb[0], rgb[1], rgb[2]))
    }
}
