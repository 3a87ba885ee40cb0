//! ImageSurface - the base image and label overlay layers
//!
//! The surface owns at most one base raster and one overlay raster. Each
//! update either fully replaces a layer or fails and leaves it untouched.
//! Every successful replacement bumps a revision counter so the widget knows
//! which textures to re-upload.

use log::{debug, warn};

use crate::error::{Result, ViewerError};
use crate::labels::LabelMap;
use crate::overlay::{Opacity, OverlayRaster};
use crate::palette::LabelPalette;
use crate::raster::{ImageSource, Raster};

/// A displayed layer plus its visibility and revision
#[derive(Clone, Debug)]
pub struct Layer<T> {
    content: T,
    visible: bool,
    revision: u64,
}

impl<T> Layer<T> {
    pub fn content(&self) -> &T {
        &self.content
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[derive(Debug, Default)]
pub struct ImageSurface {
    base: Option<Layer<Raster>>,
    /// Labels are kept next to their rendering so hover can report them
    overlay: Option<(Layer<OverlayRaster>, LabelMap)>,
    palette: LabelPalette,
    next_revision: u64,
}

impl ImageSurface {
    pub fn new(palette: LabelPalette) -> Self {
        Self {
            palette,
            ..Self::default()
        }
    }

    fn bump(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }

    /// Replace the base image. Visibility of the previous base is carried over.
    pub fn set_base_image(&mut self, source: ImageSource) -> Result<()> {
        let kind = source.kind_name();
        let raster = source.into_raster()?;
        let dims = raster.dimensions();

        if let Some(overlay_dims) = self.overlay().map(|o| o.content().dimensions()) {
            if overlay_dims != dims {
                warn!(
                    "dropping {:?} label overlay that no longer matches the {:?} base image",
                    overlay_dims, dims
                );
                self.overlay = None;
            }
        }

        let visible = self.base.as_ref().map_or(true, |b| b.visible);
        let revision = self.bump();
        debug!("base image set from {} ({}x{}, revision {})", kind, dims.0, dims.1, revision);
        self.base = Some(Layer {
            content: raster,
            visible,
            revision,
        });
        Ok(())
    }

    /// Replace the label overlay. Dimensions must match the base image, if any.
    pub fn set_label_overlay(&mut self, labels: &LabelMap, opacity: Opacity) -> Result<()> {
        if let Some(base) = &self.base {
            let (image_width, image_height) = base.content().dimensions();
            let (labels_width, labels_height) = labels.dimensions();
            if (image_width, image_height) != (labels_width, labels_height) {
                return Err(ViewerError::ShapeMismatch {
                    image_width,
                    image_height,
                    labels_width,
                    labels_height,
                });
            }
        }

        let rendered = OverlayRaster::render(labels, opacity, self.palette);
        let visible = self.overlay.as_ref().map_or(true, |(o, _)| o.visible);
        let revision = self.bump();
        debug!(
            "label overlay set ({} regions, opacity {:.2}, revision {})",
            labels.region_count(),
            opacity.get(),
            revision
        );
        self.overlay = Some((
            Layer {
                content: rendered,
                visible,
                revision,
            },
            labels.clone(),
        ));
        Ok(())
    }

    pub fn clear_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn base(&self) -> Option<&Layer<Raster>> {
        self.base.as_ref()
    }

    pub fn overlay(&self) -> Option<&Layer<OverlayRaster>> {
        self.overlay.as_ref().map(|(layer, _)| layer)
    }

    pub fn labels(&self) -> Option<&LabelMap> {
        self.overlay.as_ref().map(|(_, labels)| labels)
    }

    pub fn has_image(&self) -> bool {
        self.base.is_some() || self.overlay.is_some()
    }

    /// Size of the displayed content: the base image, else the overlay
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.base
            .as_ref()
            .map(|b| b.content().dimensions())
            .or_else(|| self.overlay().map(|o| o.content().dimensions()))
    }

    /// Label under image pixel (`x` = column, `y` = row)
    pub fn label_at(&self, x: u32, y: u32) -> Option<u32> {
        self.labels().and_then(|l| l.get(x, y))
    }

    pub fn palette(&self) -> LabelPalette {
        self.palette
    }

    /// Change the palette, re-rendering the current overlay
    pub fn set_palette(&mut self, palette: LabelPalette) {
        if self.palette == palette {
            return;
        }
        self.palette = palette;
        if let Some((layer, labels)) = self.overlay.take() {
            let opacity = layer.content().opacity();
            let visible = layer.visible;
            let revision = self.bump();
            self.overlay = Some((
                Layer {
                    content: OverlayRaster::render(&labels, opacity, palette),
                    visible,
                    revision,
                },
                labels,
            ));
        }
    }

    pub fn set_base_visible(&mut self, visible: bool) {
        if let Some(base) = &mut self.base {
            base.visible = visible;
        }
    }

    pub fn set_overlay_visible(&mut self, visible: bool) {
        if let Some((layer, _)) = &mut self.overlay {
            layer.visible = visible;
        }
    }

    pub fn toggle_base_visible(&mut self) {
        if let Some(base) = &mut self.base {
            base.visible = !base.visible;
        }
    }

    pub fn toggle_overlay_visible(&mut self) {
        if let Some((layer, _)) = &mut self.overlay {
            layer.visible = !layer.visible;
        }
    }

    /// Visible layers in paint order: base first, overlay last
    pub fn visible_layers(&self) -> Vec<&Raster> {
        let mut layers = Vec::with_capacity(2);
        if let Some(base) = self.base.as_ref().filter(|b| b.visible) {
            layers.push(base.content());
        }
        if let Some(overlay) = self.overlay().filter(|o| o.visible) {
            layers.push(overlay.content().raster());
        }
        layers
    }
}
