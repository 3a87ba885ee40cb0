//! Native demo: generated discs with their segmentation as the label overlay.
//! Pass an image path to view that file instead.

#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    use std::cell::RefCell;
    use std::rc::Rc;

    use labelview::testdata::TestData;
    use labelview::{ImageSource, LabelPalette, LabelViewerWidget, MenuEntry, ViewerApp, ViewerEvent};

    env_logger::init();

    let mut widget = LabelViewerWidget::new();
    match std::env::args_os().nth(1) {
        Some(path) => {
            if let Err(e) = widget.set_base_image(ImageSource::Path(path.into())) {
                log::error!("{}", e);
            }
        }
        None => {
            let data = TestData::generate();
            if let Err(e) = widget
                .set_base_image(data.image)
                .and_then(|()| widget.set_labels(&data.labels))
            {
                log::error!("{}", e);
            }
        }
    }

    widget.on(ViewerEvent::LEFT_PRESSED, |point| {
        log::info!("left press at row {}, column {}", point.row(), point.column());
    });
    let menu = vec![
        MenuEntry::new("toggle labels", |_, viewer| viewer.toggle_overlay_visible()),
        MenuEntry::new("bar", |click, _| {
            log::info!("bar at ({:.1}, {:.1})", click.point.x, click.point.y);
        }),
        MenuEntry::new("next palette", |_, viewer| {
            let palettes = LabelPalette::all();
            let current = viewer.surface().palette();
            let idx = palettes.iter().position(|p| *p == current).unwrap_or(0);
            let next = palettes[(idx + 1) % palettes.len()];
            viewer.surface_mut().set_palette(next);
            log::info!("palette: {}", next.name());
        }),
    ];
    if let Err(e) = widget.set_context_menu(menu) {
        log::error!("{}", e);
    }

    let widget = Rc::new(RefCell::new(widget));
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_min_inner_size([320.0, 240.0]),
        ..Default::default()
    };

    eframe::run_native(
        "labelview",
        native_options,
        Box::new(move |cc| Ok(Box::new(ViewerApp::new(cc, widget, None)))),
    )
}

#[cfg(target_arch = "wasm32")]
fn main() {}
