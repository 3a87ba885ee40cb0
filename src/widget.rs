//! LabelViewerWidget - A self-contained egui widget for viewing an image with a label overlay
//!
//! This widget encapsulates all state and rendering logic: the image surface,
//! pan/zoom, pointer event dispatch and the user-defined context menu.
//! Multiple instances can be used side-by-side without sharing state.
//!
//! The input handlers (`handle_press`, `handle_wheel`, ...) are plain methods
//! so embedders and tests can drive the widget without an egui frame; `show`
//! translates egui input into calls to them.

use egui::{
    Color32, Event, Key, MouseWheelUnit, PointerButton, Pos2, Rect, Response, TextureHandle, TextureOptions, Ui, Vec2,
};
use log::{debug, warn};

use crate::error::Result;
use crate::events::{ClickKind, EventBus, HandlerId, ImagePoint, MouseButton, ViewerEvent};
use crate::labels::LabelMap;
use crate::menu::{ContextMenu, MenuClick, MenuEntry};
use crate::options::ViewerOptions;
use crate::overlay::Opacity;
use crate::raster::{ImageSource, Raster};
use crate::surface::ImageSurface;
use crate::transform::{ViewTransform, WheelAccumulator, LINES_PER_DETENT, RAW_UNITS_PER_DETENT};

/// Viewport size assumed before the first frame is shown
const DEFAULT_VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);
/// Duration to show zoom level overlay after zooming
const ZOOM_OVERLAY_DURATION: f64 = 0.5;

/// Pan interaction state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging,
}

/// Actions returned from zoom controls overlay
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ZoomAction {
    None,
    ZoomIn,
    ZoomOut,
    Reset,
}

/// What lies under the pointer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoverInfo {
    pub point: ImagePoint,
    /// Pixel (column, row) if the pointer is over the image
    pub pixel: Option<(u32, u32)>,
    pub label: Option<u32>,
}

/// A texture uploaded for a given layer revision
struct UploadedTexture {
    revision: u64,
    handle: TextureHandle,
}

/// A self-contained widget for viewing an image with an optional label overlay.
///
/// This widget owns all its state and can be embedded in any egui application.
pub struct LabelViewerWidget {
    // === Layers ===
    surface: ImageSurface,
    options: ViewerOptions,
    default_opacity: Opacity,

    // === View transformation ===
    transform: ViewTransform,
    drag: DragState,
    /// Notches from line/page wheel events
    wheel_lines: WheelAccumulator,
    /// Notches from pixel-precise wheel and touchpad events
    wheel_points: WheelAccumulator,
    /// Size of the last shown viewport; zoom buttons anchor at its center
    viewport_size: Vec2,

    // === Callbacks ===
    events: EventBus,
    menu: ContextMenu,
    /// Image-space position of the right click while the menu is open
    menu_anchor: Option<ImagePoint>,

    // === Rendering state ===
    base_texture: Option<UploadedTexture>,
    overlay_texture: Option<UploadedTexture>,
    hover_info: Option<HoverInfo>,
    /// Buttons whose press started inside the widget
    held: Vec<MouseButton>,
    /// Track when zoom was last changed (for overlay display)
    zoom_changed_time: Option<f64>,
    /// Previous zoom level to detect changes
    prev_zoom_level: f32,
}

impl Default for LabelViewerWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelViewerWidget {
    /// Create a new empty widget
    pub fn new() -> Self {
        Self::with_options(ViewerOptions::default())
    }

    pub fn with_options(options: ViewerOptions) -> Self {
        let default_opacity = Opacity::new(options.default_opacity).unwrap_or_else(|e| {
            warn!("{}; using the default opacity", e);
            Opacity::default()
        });
        Self {
            surface: ImageSurface::new(options.palette),
            options,
            default_opacity,
            transform: ViewTransform::new(),
            drag: DragState::Idle,
            wheel_lines: WheelAccumulator::new(LINES_PER_DETENT),
            wheel_points: WheelAccumulator::new(RAW_UNITS_PER_DETENT),
            viewport_size: DEFAULT_VIEWPORT,
            events: EventBus::new(),
            menu: ContextMenu::default(),
            menu_anchor: None,
            base_texture: None,
            overlay_texture: None,
            hover_info: None,
            held: Vec::new(),
            zoom_changed_time: None,
            prev_zoom_level: 1.0,
        }
    }

    // =========================================================================
    // Layers
    // =========================================================================

    /// Replace the base image
    pub fn set_base_image(&mut self, source: impl Into<ImageSource>) -> Result<()> {
        self.surface.set_base_image(source.into())
    }

    /// Replace the label overlay, drawn at `opacity` (0, 1]
    pub fn set_label_overlay(&mut self, labels: &LabelMap, opacity: f32) -> Result<()> {
        let opacity = Opacity::new(opacity)?;
        self.surface.set_label_overlay(labels, opacity)
    }

    /// Replace the label overlay using the configured default opacity
    pub fn set_labels(&mut self, labels: &LabelMap) -> Result<()> {
        self.surface.set_label_overlay(labels, self.default_opacity)
    }

    pub fn clear_overlay(&mut self) {
        self.surface.clear_overlay();
    }

    pub fn toggle_overlay_visible(&mut self) {
        self.surface.toggle_overlay_visible();
    }

    pub fn toggle_base_visible(&mut self) {
        self.surface.toggle_base_visible();
    }

    pub fn surface(&self) -> &ImageSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut ImageSurface {
        &mut self.surface
    }

    /// Check if we have anything to display
    pub fn has_image(&self) -> bool {
        self.surface.has_image()
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    // =========================================================================
    // Zoom / pan
    // =========================================================================

    fn viewport_center(&self) -> Pos2 {
        (self.viewport_size / 2.0).to_pos2()
    }

    /// Zoom in by one step around the viewport center
    pub fn zoom_in(&mut self) {
        let center = self.viewport_center();
        self.transform.zoom_in(center);
    }

    /// Zoom out by one step around the viewport center
    pub fn zoom_out(&mut self) {
        let center = self.viewport_center();
        self.transform.zoom_out(center);
    }

    /// Zoom factor back to 1; the pan offset is kept
    pub fn zoom_reset(&mut self) {
        self.transform.reset_zoom();
    }

    /// Zoom 1 and no pan
    pub fn reset_view(&mut self) {
        self.transform.reset();
    }

    /// Get current zoom level (1.0 = one image pixel per point)
    pub fn zoom_level(&self) -> f32 {
        self.transform.zoom
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut ViewTransform {
        &mut self.transform
    }

    pub fn set_pan_enabled(&mut self, enabled: bool) {
        self.options.can_pan = enabled;
        if !enabled {
            self.drag = DragState::Idle;
        }
    }

    pub fn set_zoom_enabled(&mut self, enabled: bool) {
        self.options.can_zoom = enabled;
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag == DragState::Dragging
    }

    /// Image-space position for a position relative to the viewport's top-left
    pub fn view_to_image(&self, view_pos: Pos2) -> ImagePoint {
        self.transform.view_to_image(view_pos).into()
    }

    // =========================================================================
    // Input handlers
    // =========================================================================

    /// One zoom step per wheel notch, anchored at `anchor` (view coordinates)
    pub fn handle_wheel(&mut self, detents: i32, anchor: Pos2) {
        for _ in 0..detents.unsigned_abs() {
            if detents > 0 {
                self.transform.zoom_in(anchor);
            } else {
                self.transform.zoom_out(anchor);
            }
        }
    }

    /// Button press at a view position. A primary press starts panning when enabled.
    pub fn handle_press(&mut self, button: MouseButton, view_pos: Pos2) -> ImagePoint {
        let point = self.view_to_image(view_pos);
        if button == MouseButton::Left && self.options.can_pan {
            self.drag = DragState::Dragging;
        }
        self.events.emit(ViewerEvent::new(button, ClickKind::Pressed), point);
        point
    }

    /// Button release at a view position. A primary release ends panning.
    pub fn handle_release(&mut self, button: MouseButton, view_pos: Pos2) -> ImagePoint {
        let point = self.view_to_image(view_pos);
        if button == MouseButton::Left {
            self.drag = DragState::Idle;
        }
        self.events.emit(ViewerEvent::new(button, ClickKind::Released), point);
        point
    }

    pub fn handle_double_click(&mut self, button: MouseButton, view_pos: Pos2) -> ImagePoint {
        let point = self.view_to_image(view_pos);
        self.events
            .emit(ViewerEvent::new(button, ClickKind::DoubleClicked), point);
        point
    }

    /// Whole wheel notches carried by this frame's events. Command-modified
    /// wheel events are left out; egui reports them as `zoom_delta`.
    fn wheel_detents(&mut self, events: &[Event]) -> i32 {
        let mut detents = 0;
        for event in events {
            if let Event::MouseWheel { unit, delta, modifiers } = event {
                if modifiers.command {
                    continue;
                }
                detents += match unit {
                    MouseWheelUnit::Point => self.wheel_points.push(delta.y),
                    MouseWheelUnit::Line | MouseWheelUnit::Page => self.wheel_lines.push(delta.y),
                };
            }
        }
        detents
    }

    /// Pointer motion; pans only while dragging
    pub fn handle_drag(&mut self, delta: Vec2) {
        if self.drag == DragState::Dragging && delta != Vec2::ZERO {
            self.transform.pan_by(delta);
        }
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    /// Register a handler for one of the coordinate events
    pub fn on(&mut self, event: ViewerEvent, handler: impl FnMut(ImagePoint) + 'static) -> HandlerId {
        self.events.on(event, handler)
    }

    pub fn remove_handler(&mut self, id: HandlerId) -> bool {
        self.events.remove(id)
    }

    pub fn clear_handlers(&mut self) {
        self.events.clear();
    }

    /// Replace the whole context menu. On error the current menu stays.
    pub fn set_context_menu(&mut self, entries: Vec<MenuEntry>) -> Result<()> {
        self.menu = ContextMenu::new(entries)?;
        self.menu_anchor = None;
        Ok(())
    }

    pub fn context_menu(&self) -> &ContextMenu {
        &self.menu
    }

    /// Open the menu for a right click at a view position. Returns false when
    /// there is no menu to show.
    pub fn open_context_menu(&mut self, view_pos: Pos2) -> bool {
        if self.menu.is_empty() {
            return false;
        }
        self.menu_anchor = Some(self.view_to_image(view_pos));
        true
    }

    pub fn is_context_menu_open(&self) -> bool {
        self.menu_anchor.is_some()
    }

    /// Run the entry's callback with the click that opened the menu and close
    /// the menu. Returns false if no menu is open or the label is unknown.
    pub fn select_menu_entry(&mut self, label: &str) -> bool {
        let Some(point) = self.menu_anchor else {
            return false;
        };
        let Some(action) = self.menu.action(label) else {
            return false;
        };
        self.menu_anchor = None;
        debug!("context menu '{}' at ({:.1}, {:.1})", label, point.x, point.y);
        let click = MenuClick {
            label: label.to_string(),
            point,
        };
        action(&click, self);
        true
    }

    /// Close the menu without running anything
    pub fn dismiss_context_menu(&mut self) {
        self.menu_anchor = None;
    }

    /// Get current hover info
    pub fn hover_info(&self) -> Option<HoverInfo> {
        self.hover_info
    }

    fn update_hover(&mut self, view_pos: Option<Pos2>) {
        self.hover_info = view_pos.map(|pos| {
            let pixel = self
                .surface
                .dimensions()
                .and_then(|dims| self.transform.view_to_pixel(pos, dims));
            HoverInfo {
                point: self.view_to_image(pos),
                pixel,
                label: pixel.and_then(|(x, y)| self.surface.label_at(x, y)),
            }
        });
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Upload textures for layers whose revision changed, drop removed ones
    fn sync_textures(&mut self, ctx: &egui::Context) {
        let base = self.surface.base().map(|l| (l.revision(), l.content()));
        sync_texture(ctx, &mut self.base_texture, "base", base);

        let overlay = self
            .surface
            .overlay()
            .map(|l| (l.revision(), l.content().raster()));
        sync_texture(ctx, &mut self.overlay_texture, "overlay", overlay);
    }

    /// Show the widget, rendering into the given UI with a specified container size.
    pub fn show(&mut self, ui: &mut Ui, container_size: Vec2) -> Response {
        let ctx = ui.ctx().clone();
        self.sync_textures(&ctx);

        let (rect, response) = ui.allocate_exact_size(container_size, egui::Sense::click_and_drag());
        self.viewport_size = rect.size();

        if !self.has_image() {
            let painter = ui.painter_at(rect);
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No image loaded",
                egui::FontId::default(),
                ui.style().visuals.text_color(),
            );
            return response;
        }

        if response.hovered() {
            self.handle_keyboard_input(&ctx);
        }

        let to_view = |p: Pos2| (p - rect.min).to_pos2();
        let painter = ui.painter_at(rect);

        // Base first, overlay on top
        if let Some(base) = self.surface.base().filter(|l| l.is_visible()) {
            if let Some(tex) = &self.base_texture {
                paint_layer(&painter, &self.transform, rect, tex, base.content());
            }
        }
        if let Some(overlay) = self.surface.overlay().filter(|l| l.is_visible()) {
            if let Some(tex) = &self.overlay_texture {
                paint_layer(&painter, &self.transform, rect, tex, overlay.content().raster());
            }
        }

        let (zoom_delta, events, pointer_delta, interact_pos, hover_pos) = ui.input(|i| {
            (
                i.zoom_delta(),
                i.events.clone(),
                i.pointer.delta(),
                i.pointer.interact_pos(),
                i.pointer.hover_pos(),
            )
        });

        // Pinch / ctrl+wheel zoom
        if self.options.can_zoom && response.hovered() && zoom_delta != 1.0 {
            if let Some(pos) = hover_pos {
                self.transform.zoom_around_point(zoom_delta, to_view(pos));
            }
        } else if self.options.can_zoom && response.hovered() {
            let detents = self.wheel_detents(&events);
            if let Some(pos) = hover_pos.filter(|_| detents != 0) {
                self.handle_wheel(detents, to_view(pos));
            }
        }

        // Clicks on controls, popups or anything else layered above the
        // image do not reach it, nor does the click that closes the menu
        let accepts_press = response.contains_pointer() && !self.is_context_menu_open();

        // Button presses, releases and double clicks
        for pointer_button in [PointerButton::Primary, PointerButton::Secondary] {
            let Some(button) = MouseButton::from_pointer(pointer_button) else {
                continue;
            };
            let (pressed, released, double) = ui.input(|i| {
                (
                    i.pointer.button_pressed(pointer_button),
                    i.pointer.button_released(pointer_button),
                    i.pointer.button_double_clicked(pointer_button),
                )
            });
            let Some(pos) = interact_pos else {
                continue;
            };
            if pressed && accepts_press {
                self.held.push(button);
                self.handle_press(button, to_view(pos));
            }
            if double && accepts_press {
                self.handle_double_click(button, to_view(pos));
            }
            if released {
                if let Some(idx) = self.held.iter().position(|b| *b == button) {
                    self.held.swap_remove(idx);
                    self.handle_release(button, to_view(pos));
                }
            }
        }

        self.handle_drag(pointer_delta);

        // Context menu
        if response.secondary_clicked() {
            if let Some(pos) = interact_pos {
                self.open_context_menu(to_view(pos));
            }
        }
        if self.is_context_menu_open() {
            let labels: Vec<String> = self.menu.labels().map(str::to_owned).collect();
            let mut selected = None;
            let shown = response.context_menu(|ui| {
                for label in &labels {
                    if ui.button(label).clicked() {
                        selected = Some(label.clone());
                        ui.close();
                    }
                }
            });
            match selected {
                Some(label) => {
                    self.select_menu_entry(&label);
                }
                None if shown.is_none() && !response.secondary_clicked() => self.dismiss_context_menu(),
                None => {}
            }
        }

        self.update_hover(hover_pos.filter(|p| rect.contains(*p)).map(to_view));

        // Track zoom changes for overlay display
        let current_zoom = self.zoom_level();
        let current_time = ctx.input(|i| i.time);
        if (current_zoom - self.prev_zoom_level).abs() > 0.001 {
            self.zoom_changed_time = Some(current_time);
            self.prev_zoom_level = current_zoom;
        }

        let zoom_action = self.render_zoom_controls(&ctx, response.id, rect);
        self.render_zoom_info_overlay(&ctx, response.id, rect, current_time);
        if self.options.show_hover_info {
            self.render_hover_overlay(&ctx, response.id, rect);
        }

        match zoom_action {
            ZoomAction::None => {}
            ZoomAction::ZoomIn => self.zoom_in(),
            ZoomAction::ZoomOut => self.zoom_out(),
            ZoomAction::Reset => self.reset_view(),
        }

        response
    }

    /// Handle keyboard shortcuts for zoom
    fn handle_keyboard_input(&mut self, ctx: &egui::Context) {
        if !self.options.can_zoom {
            return;
        }
        let (zoom_in, zoom_out, reset) = ctx.input(|i| {
            (
                i.key_pressed(Key::Equals) || i.key_pressed(Key::Plus),
                i.key_pressed(Key::Minus),
                i.key_pressed(Key::Num0),
            )
        });
        if zoom_in {
            self.zoom_in();
        }
        if zoom_out {
            self.zoom_out();
        }
        if reset {
            self.reset_view();
        }
    }

    /// Render zoom control buttons at bottom-right of widget.
    /// Returns an action to be applied after rendering.
    fn render_zoom_controls(&self, ctx: &egui::Context, id: egui::Id, widget_rect: Rect) -> ZoomAction {
        let button_size = egui::vec2(28.0, 28.0);
        let margin = 10.0;
        let spacing = 4.0;

        let num_buttons = 3.0;
        let base_x = widget_rect.max.x - margin - button_size.x * num_buttons - spacing * (num_buttons - 1.0);
        let base_y = widget_rect.max.y - margin - button_size.y;

        let mut action = ZoomAction::None;

        egui::Area::new(id.with("zoom_controls"))
            .fixed_pos(egui::pos2(base_x, base_y))
            .show(ctx, |ui| {
                let text_color = get_overlay_text_color(ui);
                overlay_frame(ui).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.spacing_mut().item_spacing.x = spacing;

                        let can_reset = !self.transform.is_default();
                        let reset_color = if can_reset { text_color } else { text_color.gamma_multiply(0.3) };
                        let reset_btn = egui::Button::new(egui::RichText::new("⟲").color(reset_color))
                            .fill(Color32::TRANSPARENT);
                        if ui.add_sized(button_size, reset_btn).clicked() && can_reset {
                            action = ZoomAction::Reset;
                        }

                        let minus_btn = egui::Button::new(egui::RichText::new("−").color(text_color))
                            .fill(Color32::TRANSPARENT);
                        if ui.add_sized(button_size, minus_btn).clicked() {
                            action = ZoomAction::ZoomOut;
                        }

                        let plus_btn = egui::Button::new(egui::RichText::new("+").color(text_color))
                            .fill(Color32::TRANSPARENT);
                        if ui.add_sized(button_size, plus_btn).clicked() {
                            action = ZoomAction::ZoomIn;
                        }
                    });
                });
            });

        action
    }

    /// Render zoom level overlay while zooming
    fn render_zoom_info_overlay(&self, ctx: &egui::Context, id: egui::Id, widget_rect: Rect, current_time: f64) {
        let should_show = self
            .zoom_changed_time
            .is_some_and(|changed| (current_time - changed) < ZOOM_OVERLAY_DURATION);
        if !should_show {
            return;
        }

        egui::Area::new(id.with("zoom_info_overlay"))
            .fixed_pos(egui::pos2(widget_rect.center().x - 50.0, widget_rect.center().y - 20.0))
            .show(ctx, |ui| {
                let text_color = get_overlay_text_color(ui);
                egui::Frame::popup(ui.style())
                    .fill(get_overlay_bg(ui))
                    .show(ui, |ui| {
                        ui.style_mut().wrap_mode = Some(egui::TextWrapMode::Extend);
                        ui.label(
                            egui::RichText::new(format!("{:.3}x", self.zoom_level()))
                                .color(text_color)
                                .size(24.0),
                        );
                    });
            });
        ctx.request_repaint();
    }

    /// Render hover info overlay at bottom-left of widget
    fn render_hover_overlay(&self, ctx: &egui::Context, id: egui::Id, widget_rect: Rect) {
        let Some(info) = self.hover_info else {
            return;
        };
        let Some((x, y)) = info.pixel else {
            return;
        };

        egui::Area::new(id.with("hover_overlay"))
            .fixed_pos(egui::pos2(widget_rect.min.x + 10.0, widget_rect.max.y - 30.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.style_mut().wrap_mode = Some(egui::TextWrapMode::Extend);
                    match info.label {
                        Some(0) | None => ui.label(format!("Pixel (row={}, column={})", y, x)),
                        Some(label) => ui.label(format!("Pixel (row={}, column={})  |  Label {}", y, x, label)),
                    };
                });
            });
    }
}

fn sync_texture(
    ctx: &egui::Context,
    slot: &mut Option<UploadedTexture>,
    name: &str,
    layer: Option<(u64, &Raster)>,
) {
    match layer {
        None => *slot = None,
        Some((revision, _)) if slot.as_ref().is_some_and(|t| t.revision == revision) => {}
        Some((revision, raster)) => {
            let handle = ctx.load_texture(name, raster.to_color_image(), TextureOptions::NEAREST);
            *slot = Some(UploadedTexture { revision, handle });
        }
    }
}

fn paint_layer(
    painter: &egui::Painter,
    transform: &ViewTransform,
    viewport: Rect,
    texture: &UploadedTexture,
    raster: &Raster,
) {
    let size = egui::vec2(raster.width() as f32, raster.height() as f32);
    let image_rect = transform.calculate_image_rect(viewport, size);
    painter.image(
        texture.handle.id(),
        image_rect,
        Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        Color32::WHITE,
    );
}

/// Get a translucent background color appropriate for light/dark mode
fn get_overlay_bg(ui: &Ui) -> Color32 {
    if ui.visuals().dark_mode {
        Color32::from_black_alpha(180)
    } else {
        Color32::from_white_alpha(220)
    }
}

/// Get text color appropriate for light/dark mode overlays
fn get_overlay_text_color(ui: &Ui) -> Color32 {
    if ui.visuals().dark_mode {
        Color32::WHITE
    } else {
        Color32::from_gray(30)
    }
}

/// Create a frame style for overlay controls that adapts to light/dark mode
fn overlay_frame(ui: &Ui) -> egui::Frame {
    egui::Frame::new()
        .fill(get_overlay_bg(ui))
        .corner_radius(4.0)
        .inner_margin(6.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Grid;
    use crate::transform::ZOOM_STEP;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn widget_with_image(width: u32, height: u32) -> LabelViewerWidget {
        let mut w = LabelViewerWidget::new();
        let grid = Grid::gray(width, height, vec![128u8; (width * height) as usize]).unwrap();
        w.set_base_image(grid).unwrap();
        w
    }

    #[test]
    fn test_press_reports_image_coordinates() {
        let mut w = widget_with_image(100, 100);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        w.on(ViewerEvent::LEFT_PRESSED, move |p| s.borrow_mut().push(p));

        w.handle_press(MouseButton::Left, Pos2::new(10.0, 20.0));
        assert_eq!(*seen.borrow(), vec![ImagePoint::new(10.0, 20.0)]);
    }

    #[test]
    fn test_press_after_zoom_and_pan() {
        let mut w = widget_with_image(100, 100);
        w.transform_mut().zoom = 2.0;
        w.transform_mut().pan_offset = Vec2::new(20.0, 0.0);
        let p = w.handle_press(MouseButton::Right, Pos2::new(40.0, 40.0));
        assert_eq!(p, ImagePoint::new(10.0, 20.0));
        // right button never pans
        assert_eq!(w.drag_state(), DragState::Idle);
    }

    #[test]
    fn test_drag_state_machine() {
        let mut w = widget_with_image(10, 10);
        assert_eq!(w.drag_state(), DragState::Idle);

        w.handle_drag(Vec2::new(5.0, 5.0));
        assert!(w.transform().pan_offset.length() < 0.001);

        w.handle_press(MouseButton::Left, Pos2::new(1.0, 1.0));
        assert!(w.is_dragging());
        w.handle_drag(Vec2::new(5.0, -3.0));
        assert_eq!(w.transform().pan_offset, Vec2::new(5.0, -3.0));

        w.handle_release(MouseButton::Left, Pos2::new(6.0, -2.0));
        assert_eq!(w.drag_state(), DragState::Idle);
        w.handle_drag(Vec2::new(5.0, 5.0));
        assert_eq!(w.transform().pan_offset, Vec2::new(5.0, -3.0));
    }

    #[test]
    fn test_pan_disabled_still_emits_events() {
        let mut w = widget_with_image(10, 10);
        w.set_pan_enabled(false);
        let count = Rc::new(Cell::new(0));
        for event in [ViewerEvent::LEFT_PRESSED, ViewerEvent::LEFT_RELEASED] {
            let c = count.clone();
            w.on(event, move |_| c.set(c.get() + 1));
        }

        w.handle_press(MouseButton::Left, Pos2::new(1.0, 1.0));
        assert!(!w.is_dragging());
        w.handle_release(MouseButton::Left, Pos2::new(1.0, 1.0));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_wheel_detents() {
        let mut w = widget_with_image(10, 10);
        w.handle_wheel(1, Pos2::ZERO);
        assert!((w.zoom_level() - 1.25).abs() < 1e-6);

        w.handle_wheel(0, Pos2::ZERO);
        assert!((w.zoom_level() - 1.25).abs() < 1e-6);

        w.handle_wheel(-2, Pos2::ZERO);
        assert!((w.zoom_level() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_reset_is_exact() {
        let mut w = widget_with_image(10, 10);
        for _ in 0..7 {
            w.zoom_in();
        }
        w.zoom_out();
        w.handle_wheel(-3, Pos2::new(3.0, 4.0));
        w.zoom_reset();
        assert_eq!(w.zoom_level(), 1.0);
    }

    #[test]
    fn test_context_menu_invokes_once_with_click_point() {
        let mut w = widget_with_image(50, 50);
        let calls = Rc::new(RefCell::new(Vec::new()));
        let c = calls.clone();
        w.set_context_menu(vec![MenuEntry::new("toggle", move |click, _| {
            c.borrow_mut().push(click.clone())
        })])
        .unwrap();

        assert!(w.open_context_menu(Pos2::new(12.0, 34.0)));
        assert!(w.select_menu_entry("toggle"));
        assert!(!w.select_menu_entry("toggle"));

        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].label, "toggle");
        assert_eq!(calls[0].point, ImagePoint::new(12.0, 34.0));
    }

    #[test]
    fn test_context_menu_dismiss_invokes_nothing() {
        let mut w = widget_with_image(50, 50);
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        w.set_context_menu(vec![MenuEntry::new("toggle", move |_, _| c.set(c.get() + 1))])
            .unwrap();

        w.open_context_menu(Pos2::new(1.0, 1.0));
        w.dismiss_context_menu();
        assert!(!w.is_context_menu_open());
        assert!(!w.select_menu_entry("toggle"));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_context_menu_callback_mutates_viewer() {
        let mut w = widget_with_image(2, 2);
        w.set_labels(&LabelMap::new(2, 2, vec![1, 0, 0, 2]).unwrap()).unwrap();
        w.set_context_menu(vec![MenuEntry::new("toggle labels", |_, viewer| viewer.toggle_overlay_visible())])
            .unwrap();

        w.open_context_menu(Pos2::new(0.5, 0.5));
        w.select_menu_entry("toggle labels");
        assert!(!w.surface().overlay().unwrap().is_visible());
    }

    #[test]
    fn test_empty_menu_does_not_open() {
        let mut w = widget_with_image(2, 2);
        assert!(!w.open_context_menu(Pos2::ZERO));
    }

    #[test]
    fn test_duplicate_menu_keeps_previous() {
        let mut w = widget_with_image(2, 2);
        w.set_context_menu(vec![MenuEntry::new("a", |_, _| {})]).unwrap();
        let result = w.set_context_menu(vec![
            MenuEntry::new("b", |_, _| {}),
            MenuEntry::new("b", |_, _| {}),
        ]);
        assert!(result.is_err());
        assert_eq!(w.context_menu().labels().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_invalid_opacity_rejected() {
        let mut w = widget_with_image(2, 2);
        let labels = LabelMap::background(2, 2);
        assert!(w.set_label_overlay(&labels, 0.0).is_err());
        assert!(w.surface().overlay().is_none());
        w.set_label_overlay(&labels, 1.0).unwrap();
        assert!(w.surface().overlay().is_some());
    }

    #[test]
    fn test_hover_reports_label() {
        let mut w = widget_with_image(2, 2);
        w.set_labels(&LabelMap::new(2, 2, vec![0, 7, 0, 0]).unwrap()).unwrap();
        w.update_hover(Some(Pos2::new(1.5, 0.5)));
        let info = w.hover_info().unwrap();
        assert_eq!(info.pixel, Some((1, 0)));
        assert_eq!(info.label, Some(7));

        w.update_hover(Some(Pos2::new(5.0, 5.0)));
        assert_eq!(w.hover_info().unwrap().pixel, None);
    }

    #[test]
    fn test_invalid_default_opacity_falls_back() {
        let options = ViewerOptions {
            default_opacity: 3.0,
            ..ViewerOptions::default()
        };
        let mut w = LabelViewerWidget::with_options(options);
        w.set_labels(&LabelMap::new(1, 1, vec![1]).unwrap()).unwrap();
        let overlay = w.surface().overlay().unwrap();
        assert_eq!(overlay.content().opacity(), Opacity::default());
    }

    // -------------------------------------------------------------------------
    // Full frames through egui
    // -------------------------------------------------------------------------

    const SCREEN: Vec2 = Vec2::new(800.0, 600.0);

    /// Run one frame with the widget filling the screen
    fn run_frame(ctx: &egui::Context, widget: &mut LabelViewerWidget, events: Vec<Event>) {
        let input = egui::RawInput {
            screen_rect: Some(Rect::from_min_size(Pos2::ZERO, SCREEN)),
            events,
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default()
                .frame(egui::Frame::NONE)
                .show(ctx, |ui| {
                    let size = ui.available_size();
                    widget.show(ui, size);
                });
        });
    }

    /// Hover for a couple of frames so layered areas are laid out, then press and release
    fn click(ctx: &egui::Context, widget: &mut LabelViewerWidget, pos: Pos2, button: PointerButton) {
        for _ in 0..2 {
            run_frame(ctx, widget, vec![Event::PointerMoved(pos)]);
        }
        for pressed in [true, false] {
            run_frame(
                ctx,
                widget,
                vec![Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    modifiers: egui::Modifiers::NONE,
                }],
            );
        }
    }

    fn wheel(unit: MouseWheelUnit, y: f32) -> Event {
        Event::MouseWheel {
            unit,
            delta: Vec2::new(0.0, y),
            modifiers: egui::Modifiers::NONE,
        }
    }

    fn record(widget: &mut LabelViewerWidget, event: ViewerEvent) -> Rc<RefCell<Vec<ImagePoint>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        widget.on(event, move |p| s.borrow_mut().push(p));
        seen
    }

    #[test]
    fn test_each_line_notch_zooms_one_step() {
        let ctx = egui::Context::default();
        let mut w = widget_with_image(100, 100);
        run_frame(&ctx, &mut w, vec![Event::PointerMoved(Pos2::new(50.0, 50.0))]);

        let mut expected = 1.0;
        for _ in 0..5 {
            run_frame(&ctx, &mut w, vec![wheel(MouseWheelUnit::Line, 1.0)]);
            expected *= ZOOM_STEP;
            assert!((w.zoom_level() - expected).abs() < 1e-4, "zoom {} != {}", w.zoom_level(), expected);
        }

        run_frame(&ctx, &mut w, vec![wheel(MouseWheelUnit::Line, -2.0)]);
        expected /= ZOOM_STEP * ZOOM_STEP;
        assert!((w.zoom_level() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_point_wheel_accumulates_to_notches() {
        let ctx = egui::Context::default();
        let mut w = widget_with_image(100, 100);
        run_frame(&ctx, &mut w, vec![Event::PointerMoved(Pos2::new(50.0, 50.0))]);

        run_frame(&ctx, &mut w, vec![wheel(MouseWheelUnit::Point, 60.0)]);
        assert_eq!(w.zoom_level(), 1.0);
        run_frame(&ctx, &mut w, vec![wheel(MouseWheelUnit::Point, 60.0)]);
        assert!((w.zoom_level() - ZOOM_STEP).abs() < 1e-4);
    }

    #[test]
    fn test_wheel_ignored_when_zoom_disabled() {
        let ctx = egui::Context::default();
        let mut w = widget_with_image(100, 100);
        w.set_zoom_enabled(false);
        run_frame(&ctx, &mut w, vec![Event::PointerMoved(Pos2::new(50.0, 50.0))]);
        run_frame(&ctx, &mut w, vec![wheel(MouseWheelUnit::Line, 3.0)]);
        assert_eq!(w.zoom_level(), 1.0);
    }

    #[test]
    fn test_image_click_emits_press_and_release() {
        let ctx = egui::Context::default();
        let mut w = widget_with_image(100, 100);
        let presses = record(&mut w, ViewerEvent::LEFT_PRESSED);
        let releases = record(&mut w, ViewerEvent::LEFT_RELEASED);

        click(&ctx, &mut w, Pos2::new(10.0, 20.0), PointerButton::Primary);
        assert_eq!(*presses.borrow(), vec![ImagePoint::new(10.0, 20.0)]);
        assert_eq!(*releases.borrow(), vec![ImagePoint::new(10.0, 20.0)]);
        assert!(!w.is_dragging());
    }

    #[test]
    fn test_zoom_button_click_does_not_reach_image() {
        let ctx = egui::Context::default();
        let mut w = widget_with_image(100, 100);
        let presses = record(&mut w, ViewerEvent::LEFT_PRESSED);
        let releases = record(&mut w, ViewerEvent::LEFT_RELEASED);

        // "+" is the right-most zoom control in the bottom-right corner
        click(&ctx, &mut w, Pos2::new(776.0, 576.0), PointerButton::Primary);
        assert!((w.zoom_level() - ZOOM_STEP).abs() < 1e-4);
        assert!(presses.borrow().is_empty());
        assert!(releases.borrow().is_empty());
        assert!(!w.is_dragging());
    }

    #[test]
    fn test_menu_entry_click_does_not_reach_image() {
        let ctx = egui::Context::default();
        let mut w = widget_with_image(100, 100);
        let presses = record(&mut w, ViewerEvent::LEFT_PRESSED);
        let calls = Rc::new(RefCell::new(Vec::new()));
        let c = calls.clone();
        w.set_context_menu(vec![MenuEntry::new("toggle", move |click, _| {
            c.borrow_mut().push(click.point)
        })])
        .unwrap();

        click(&ctx, &mut w, Pos2::new(50.0, 60.0), PointerButton::Secondary);
        assert!(w.is_context_menu_open());

        // first entry sits just below and right of the click
        click(&ctx, &mut w, Pos2::new(60.0, 68.0), PointerButton::Primary);
        assert_eq!(*calls.borrow(), vec![ImagePoint::new(50.0, 60.0)]);
        assert!(presses.borrow().is_empty());
        assert!(!w.is_context_menu_open());
    }
}
