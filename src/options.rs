//! Viewer configuration

use serde::{Deserialize, Serialize};

use crate::overlay::DEFAULT_OPACITY;
use crate::palette::LabelPalette;

/// Behaviour switches applied when a widget is created
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerOptions {
    /// Primary-button drag pans the view
    pub can_pan: bool,
    /// Wheel and keyboard zoom
    pub can_zoom: bool,
    /// Opacity used when a caller does not pass one
    pub default_opacity: f32,
    pub palette: LabelPalette,
    /// Show pixel/label readout under the pointer
    pub show_hover_info: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            can_pan: true,
            can_zoom: true,
            default_opacity: DEFAULT_OPACITY,
            palette: LabelPalette::default(),
            show_hover_info: true,
        }
    }
}
