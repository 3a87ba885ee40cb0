//! labelview - An image viewer with pan/zoom, click callbacks and a label overlay
//!
//! The viewer shows a base image with an optional translucent overlay that
//! colors each labelled region of a segmentation. Pointer events are reported
//! in image coordinates and a user-defined context menu can act on the viewer.
//!
//! ## Architecture
//!
//! - `LabelViewerWidget`: Self-contained egui widget with all viewing state
//! - `ViewerApp`: Thin eframe App shell that hosts the widget
//! - `ViewerHandle`: WASM interface for JavaScript to control the viewer

#[cfg(target_arch = "wasm32")]
use std::cell::RefCell;
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsCast;
#[cfg(target_arch = "wasm32")]
use web_sys::HtmlCanvasElement;

pub mod app;
pub mod error;
pub mod events;
pub mod labels;
pub mod menu;
pub mod options;
pub mod overlay;
pub mod palette;
pub mod raster;
pub mod surface;
pub mod testdata;
pub mod transform;
pub mod widget;

pub use app::ViewerApp;
pub use error::{Result, ViewerError};
pub use events::{ClickKind, HandlerId, ImagePoint, MouseButton, ViewerEvent};
pub use labels::LabelMap;
pub use menu::{ContextMenu, MenuClick, MenuEntry};
pub use options::ViewerOptions;
pub use overlay::{Opacity, OverlayRaster};
pub use palette::LabelPalette;
pub use raster::{Grid, ImageSource, PixelFormat, Raster, SampleKind};
pub use widget::LabelViewerWidget;

#[cfg(target_arch = "wasm32")]
impl From<ViewerError> for JsValue {
    fn from(err: ViewerError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// JavaScript calls waiting to be made once the widget is no longer borrowed
#[cfg(target_arch = "wasm32")]
type PendingCalls = Rc<RefCell<Vec<(js_sys::Function, JsValue)>>>;

/// A handle to a viewer instance. Each handle manages its own canvas and state.
///
/// This struct is exposed to JavaScript and provides methods to control the viewer.
/// It holds an Rc to the widget so it can call methods on it, and also stores
/// the eframe runner for the application lifecycle.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub struct ViewerHandle {
    /// The widget instance (shared with ViewerApp)
    widget: Rc<RefCell<LabelViewerWidget>>,
    /// Callback invocations queued during the frame
    pending: PendingCalls,
    /// The eframe runner (kept alive to maintain the render loop)
    runner: eframe::WebRunner,
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl ViewerHandle {
    /// Create a new viewer instance attached to the given canvas element.
    /// Returns a promise that resolves to a ViewerHandle when initialization completes.
    ///
    /// Use this static factory method instead of a constructor since async constructors
    /// are deprecated in wasm-bindgen.
    #[wasm_bindgen]
    pub async fn create(canvas: HtmlCanvasElement) -> std::result::Result<ViewerHandle, JsValue> {
        #[cfg(debug_assertions)]
        {
            eframe::WebLogger::init(log::LevelFilter::Debug).ok();
        }
        #[cfg(not(debug_assertions))]
        {
            eframe::WebLogger::init(log::LevelFilter::Warn).ok();
        }

        // Create the widget that will be shared between the handle and the app
        let widget = Rc::new(RefCell::new(LabelViewerWidget::new()));
        let widget_for_app = widget.clone();

        let pending: PendingCalls = Rc::new(RefCell::new(Vec::new()));
        let pending_for_app = pending.clone();

        let web_options = eframe::WebOptions::default();
        let runner = eframe::WebRunner::new();

        runner
            .start(
                canvas,
                web_options,
                Box::new(move |cc| {
                    let pending = pending_for_app.clone();
                    let flush: app::FrameHook = Box::new(move || flush_pending(&pending));
                    Ok(Box::new(ViewerApp::new(cc, widget_for_app.clone(), Some(flush))))
                }),
            )
            .await?;

        Ok(ViewerHandle { widget, pending, runner })
    }

    /// Set the base image.
    ///
    /// # Arguments
    /// * `buffer` - ArrayBuffer containing the raw samples, row-major
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `array_type` - Rust-style type specifier: "i8", "u8", "i16", "u16",
    ///   "i32", "u32", "i64", "u64", "f32", "f64". Floats are expected in [0, 1].
    /// * `channels` - 1 (grey, default), 3 (RGB) or 4 (RGBA)
    #[wasm_bindgen(js_name = setImageData)]
    pub fn set_image_data(
        &self,
        buffer: &js_sys::ArrayBuffer,
        width: u32,
        height: u32,
        array_type: &str,
        channels: Option<u32>,
    ) -> std::result::Result<(), JsValue> {
        let kind: SampleKind = array_type.parse()?;
        let samples = convert_buffer_to_f64(buffer, kind);
        let source = ImageSource::from_samples(kind, samples, width, height, channels.unwrap_or(1))?;
        self.widget.borrow_mut().set_base_image(source)?;
        Ok(())
    }

    /// Set the label overlay from an integer-typed buffer, drawn at `opacity` (0, 1]
    #[wasm_bindgen(js_name = setLabels)]
    pub fn set_labels(
        &self,
        buffer: &js_sys::ArrayBuffer,
        width: u32,
        height: u32,
        array_type: &str,
        opacity: Option<f32>,
    ) -> std::result::Result<(), JsValue> {
        let kind: SampleKind = array_type.parse()?;
        let labels = LabelMap::from_samples(kind, convert_buffer_to_f64(buffer, kind), width, height)?;
        let mut widget = self.widget.borrow_mut();
        match opacity {
            Some(opacity) => widget.set_label_overlay(&labels, opacity)?,
            None => widget.set_labels(&labels)?,
        }
        Ok(())
    }

    /// Remove the label overlay
    #[wasm_bindgen(js_name = clearLabels)]
    pub fn clear_labels(&self) {
        self.widget.borrow_mut().clear_overlay();
    }

    /// Show or hide the label overlay
    #[wasm_bindgen(js_name = toggleLabels)]
    pub fn toggle_labels(&self) {
        self.widget.borrow_mut().toggle_overlay_visible();
    }

    /// End event loop and release resources
    #[wasm_bindgen(js_name = destroy)]
    pub fn destroy(&self) {
        self.pending.borrow_mut().clear();
        self.runner.destroy();
    }

    /// Zoom in by one step (1.25x) around the viewport center
    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&self) {
        self.widget.borrow_mut().zoom_in();
    }

    /// Zoom out by one step (1/1.25x) around the viewport center
    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&self) {
        self.widget.borrow_mut().zoom_out();
    }

    /// Reset zoom to 1; the pan offset is kept
    #[wasm_bindgen(js_name = zoomReset)]
    pub fn zoom_reset(&self) {
        self.widget.borrow_mut().zoom_reset();
    }

    /// Get current zoom level (1.0 = one image pixel per point)
    #[wasm_bindgen(js_name = getZoom)]
    pub fn get_zoom(&self) -> f32 {
        self.widget.borrow().zoom_level()
    }

    #[wasm_bindgen(js_name = setPanEnabled)]
    pub fn set_pan_enabled(&self, enabled: bool) {
        self.widget.borrow_mut().set_pan_enabled(enabled);
    }

    #[wasm_bindgen(js_name = setZoomEnabled)]
    pub fn set_zoom_enabled(&self, enabled: bool) {
        self.widget.borrow_mut().set_zoom_enabled(enabled);
    }

    // =========================================================================
    // Callback registration
    // =========================================================================

    /// Register a callback for one of: leftPressed, leftReleased,
    /// leftDoubleClicked, rightPressed, rightReleased, rightDoubleClicked.
    /// The callback receives `{ x, y }` in image coordinates.
    #[wasm_bindgen(js_name = on)]
    pub fn on(&self, event_name: &str, callback: js_sys::Function) -> std::result::Result<(), JsValue> {
        let event = ViewerEvent::from_name(event_name)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown event '{}'", event_name)))?;
        let pending = self.pending.clone();
        self.widget.borrow_mut().on(event, move |point| {
            pending.borrow_mut().push((callback.clone(), point_object(point, None)));
        });
        Ok(())
    }

    /// Replace the context menu. `entries` is an array of `[label, callback]`
    /// pairs; each callback receives `{ x, y, label }`.
    #[wasm_bindgen(js_name = setContextMenu)]
    pub fn set_context_menu(&self, entries: js_sys::Array) -> std::result::Result<(), JsValue> {
        let mut menu = Vec::with_capacity(entries.length() as usize);
        for entry in entries.iter() {
            let pair = js_sys::Array::from(&entry);
            let label = pair
                .get(0)
                .as_string()
                .ok_or_else(|| JsValue::from_str("Context menu label must be a string"))?;
            let callback: js_sys::Function = pair
                .get(1)
                .dyn_into()
                .map_err(|_| JsValue::from_str(&format!("Context menu entry '{}' needs a function", label)))?;
            let pending = self.pending.clone();
            menu.push(MenuEntry::new(label, move |click, _viewer| {
                pending
                    .borrow_mut()
                    .push((callback.clone(), point_object(click.point, Some(&click.label))));
            }));
        }
        self.widget.borrow_mut().set_context_menu(menu)?;
        Ok(())
    }

    /// Clear all registered callbacks and the context menu.
    #[wasm_bindgen(js_name = clearCallbacks)]
    pub fn clear_callbacks(&self) -> std::result::Result<(), JsValue> {
        let mut widget = self.widget.borrow_mut();
        widget.clear_handlers();
        widget.set_context_menu(Vec::new())?;
        self.pending.borrow_mut().clear();
        Ok(())
    }
}

/// Call every queued JavaScript callback
#[cfg(target_arch = "wasm32")]
fn flush_pending(pending: &PendingCalls) {
    // Take the queue first so callbacks may register new work
    let calls = std::mem::take(&mut *pending.borrow_mut());
    for (callback, arg) in calls {
        if let Err(err) = callback.call1(&JsValue::NULL, &arg) {
            log::warn!("JavaScript callback failed: {:?}", err);
        }
    }
}

/// `{ x, y }` plus `label` for menu callbacks
#[cfg(target_arch = "wasm32")]
fn point_object(point: ImagePoint, label: Option<&str>) -> JsValue {
    let obj = js_sys::Object::new();
    let mut fields = vec![
        ("x", JsValue::from_f64(point.x as f64)),
        ("y", JsValue::from_f64(point.y as f64)),
    ];
    if let Some(label) = label {
        fields.push(("label", JsValue::from_str(label)));
    }
    for (key, value) in fields {
        if js_sys::Reflect::set(&obj, &JsValue::from_str(key), &value).is_err() {
            log::warn!("Failed to set '{}' on callback argument", key);
        }
    }
    obj.into()
}

/// Convert a JavaScript ArrayBuffer to Vec<f64> based on the sample type.
#[cfg(target_arch = "wasm32")]
fn convert_buffer_to_f64(buffer: &js_sys::ArrayBuffer, kind: SampleKind) -> Vec<f64> {
    match kind {
        SampleKind::I8 => js_sys::Int8Array::new(buffer).to_vec().into_iter().map(f64::from).collect(),
        SampleKind::U8 => js_sys::Uint8Array::new(buffer).to_vec().into_iter().map(f64::from).collect(),
        SampleKind::I16 => js_sys::Int16Array::new(buffer).to_vec().into_iter().map(f64::from).collect(),
        SampleKind::U16 => js_sys::Uint16Array::new(buffer).to_vec().into_iter().map(f64::from).collect(),
        SampleKind::I32 => js_sys::Int32Array::new(buffer).to_vec().into_iter().map(f64::from).collect(),
        SampleKind::U32 => js_sys::Uint32Array::new(buffer).to_vec().into_iter().map(f64::from).collect(),
        SampleKind::I64 => {
            let view = js_sys::BigInt64Array::new(buffer);
            // may lose precision for very large values
            (0..view.length()).map(|i| view.get_index(i) as f64).collect()
        }
        SampleKind::U64 => {
            let view = js_sys::BigUint64Array::new(buffer);
            (0..view.length()).map(|i| view.get_index(i) as f64).collect()
        }
        SampleKind::F32 => js_sys::Float32Array::new(buffer).to_vec().into_iter().map(f64::from).collect(),
        SampleKind::F64 => js_sys::Float64Array::new(buffer).to_vec(),
    }
}
