//! ViewerApp - A thin eframe App shell that hosts a LabelViewerWidget
//!
//! This is the application wrapper used by both the WASM interface and the
//! native demo. All viewing logic is delegated to the widget.

use std::cell::RefCell;
use std::rc::Rc;

use crate::widget::LabelViewerWidget;

/// Runs once per frame after the widget has been shown and released
pub type FrameHook = Box<dyn FnMut()>;

/// The egui application for the viewer
pub struct ViewerApp {
    /// The widget instance (shared with the embedder)
    widget: Rc<RefCell<LabelViewerWidget>>,
    after_frame: Option<FrameHook>,
}

impl ViewerApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        widget: Rc<RefCell<LabelViewerWidget>>,
        after_frame: Option<FrameHook>,
    ) -> Self {
        Self { widget, after_frame }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let available_size = ui.available_size();
                self.widget.borrow_mut().show(ui, available_size);
            });

        // The widget borrow is released here, so the hook may borrow it again
        if let Some(hook) = &mut self.after_frame {
            hook();
        }
    }
}
