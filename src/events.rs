//! Pointer events in image space and the handlers registered for them

use std::fmt;

/// A location in the base image's pixel grid.
///
/// `x` is the column and `y` the row, so code indexing a raster by
/// (row, column) has to swap them. Points outside the image are not clamped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImagePoint {
    pub x: f32,
    pub y: f32,
}

impl ImagePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Row index (floor of `y`)
    pub fn row(&self) -> i64 {
        self.y.floor() as i64
    }

    /// Column index (floor of `x`)
    pub fn column(&self) -> i64 {
        self.x.floor() as i64
    }
}

impl From<egui::Pos2> for ImagePoint {
    fn from(p: egui::Pos2) -> Self {
        Self { x: p.x, y: p.y }
    }
}

/// Mouse buttons that produce coordinate events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
}

impl MouseButton {
    pub fn from_pointer(button: egui::PointerButton) -> Option<Self> {
        match button {
            egui::PointerButton::Primary => Some(MouseButton::Left),
            egui::PointerButton::Secondary => Some(MouseButton::Right),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClickKind {
    Pressed,
    Released,
    DoubleClicked,
}

/// One of the six coordinate events (button x kind)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewerEvent {
    pub button: MouseButton,
    pub kind: ClickKind,
}

impl ViewerEvent {
    pub const LEFT_PRESSED: Self = Self::new(MouseButton::Left, ClickKind::Pressed);
    pub const LEFT_RELEASED: Self = Self::new(MouseButton::Left, ClickKind::Released);
    pub const LEFT_DOUBLE_CLICKED: Self = Self::new(MouseButton::Left, ClickKind::DoubleClicked);
    pub const RIGHT_PRESSED: Self = Self::new(MouseButton::Right, ClickKind::Pressed);
    pub const RIGHT_RELEASED: Self = Self::new(MouseButton::Right, ClickKind::Released);
    pub const RIGHT_DOUBLE_CLICKED: Self = Self::new(MouseButton::Right, ClickKind::DoubleClicked);

    pub const ALL: [Self; 6] = [
        Self::LEFT_PRESSED,
        Self::LEFT_RELEASED,
        Self::LEFT_DOUBLE_CLICKED,
        Self::RIGHT_PRESSED,
        Self::RIGHT_RELEASED,
        Self::RIGHT_DOUBLE_CLICKED,
    ];

    pub const fn new(button: MouseButton, kind: ClickKind) -> Self {
        Self { button, kind }
    }

    /// camelCase name used by the JavaScript API, e.g. "leftPressed"
    pub fn name(&self) -> &'static str {
        match (self.button, self.kind) {
            (MouseButton::Left, ClickKind::Pressed) => "leftPressed",
            (MouseButton::Left, ClickKind::Released) => "leftReleased",
            (MouseButton::Left, ClickKind::DoubleClicked) => "leftDoubleClicked",
            (MouseButton::Right, ClickKind::Pressed) => "rightPressed",
            (MouseButton::Right, ClickKind::Released) => "rightReleased",
            (MouseButton::Right, ClickKind::DoubleClicked) => "rightDoubleClicked",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }
}

impl fmt::Display for ViewerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies a registered handler so it can be removed again
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Box<dyn FnMut(ImagePoint)>;

/// Synchronous observer list. Handlers for an event run in registration order.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<(HandlerId, ViewerEvent, Handler)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, event: ViewerEvent, handler: impl FnMut(ImagePoint) + 'static) -> HandlerId {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.handlers.push((id, event, Box::new(handler)));
        id
    }

    /// Returns false if the id was not registered
    pub fn remove(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(hid, _, _)| *hid != id);
        self.handlers.len() != before
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub fn handler_count(&self, event: ViewerEvent) -> usize {
        self.handlers.iter().filter(|(_, e, _)| *e == event).count()
    }

    /// Invoke every handler registered for `event`
    pub fn emit(&mut self, event: ViewerEvent, point: ImagePoint) {
        for (_, _, handler) in self.handlers.iter_mut().filter(|(_, e, _)| *e == event) {
            handler(point);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
