//! User-defined context menu entries

use std::fmt;
use std::rc::Rc;

use crate::error::{Result, ViewerError};
use crate::events::ImagePoint;
use crate::widget::LabelViewerWidget;

/// What a menu callback is told about the click that opened the menu
#[derive(Clone, Debug, PartialEq)]
pub struct MenuClick {
    /// Label of the selected entry
    pub label: String,
    /// Image-space position of the right click
    pub point: ImagePoint,
}

/// Callback run when an entry is chosen. It gets the viewer so it can change
/// what is displayed (toggle a layer, zoom, swap images, ...).
pub type MenuAction = Rc<dyn Fn(&MenuClick, &mut LabelViewerWidget)>;

#[derive(Clone)]
pub struct MenuEntry {
    label: String,
    action: MenuAction,
}

impl MenuEntry {
    pub fn new(
        label: impl Into<String>,
        action: impl Fn(&MenuClick, &mut LabelViewerWidget) + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            action: Rc::new(action),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for MenuEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuEntry").field("label", &self.label).finish()
    }
}

/// Ordered list of entries with unique labels
#[derive(Clone, Debug, Default)]
pub struct ContextMenu {
    entries: Vec<MenuEntry>,
}

impl ContextMenu {
    pub fn new(entries: Vec<MenuEntry>) -> Result<Self> {
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.label == entry.label) {
                return Err(ViewerError::DuplicateMenuLabel(entry.label.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Labels in display order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    pub(crate) fn action(&self, label: &str) -> Option<MenuAction> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.action.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_keep_order() {
        let menu = ContextMenu::new(vec![
            MenuEntry::new("toggle labels", |_, _| {}),
            MenuEntry::new("bar", |_, _| {}),
        ])
        .unwrap();
        assert_eq!(menu.labels().collect::<Vec<_>>(), vec!["toggle labels", "bar"]);
        assert_eq!(menu.len(), 2);
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let err = ContextMenu::new(vec![
            MenuEntry::new("a", |_, _| {}),
            MenuEntry::new("b", |_, _| {}),
            MenuEntry::new("a", |_, _| {}),
        ])
        .unwrap_err();
        assert!(matches!(err, ViewerError::DuplicateMenuLabel(label) if label == "a"));
    }

    #[test]
    fn test_action_lookup() {
        let menu = ContextMenu::new(vec![MenuEntry::new("a", |_, _| {})]).unwrap();
        assert!(menu.action("a").is_some());
        assert!(menu.action("b").is_none());
        assert!(ContextMenu::default().is_empty());
    }
}
