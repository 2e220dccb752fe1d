//! Multi-select state and the bulk-action menu

use drive_proto::FileNode;

/// Selected items plus the visibility of the action menu.
///
/// The two move together: whenever the menu is hidden the selection is
/// empty. Items are unique by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: Vec<FileNode>,
    menu_visible: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &[FileNode] {
        &self.selected
    }

    pub fn is_menu_visible(&self) -> bool {
        self.menu_visible
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Ids of the selected items, in selection order
    pub fn ids(&self) -> Vec<String> {
        self.selected.iter().map(|f| f.id.clone()).collect()
    }

    /// The only selected item, if exactly one is selected
    pub fn single(&self) -> Option<&FileNode> {
        match self.selected.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Toggle membership of `file`. Only effective while the menu is open.
    pub fn toggle_select(&mut self, file: &FileNode) -> bool {
        if !self.menu_visible {
            return false;
        }

        if let Some(pos) = self.selected.iter().position(|f| f.id == file.id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(file.clone());
        }
        true
    }

    /// Select exactly `file` and show the menu (per-row "more options")
    pub fn select_single_and_open_menu(&mut self, file: &FileNode) {
        self.selected.clear();
        self.selected.push(file.clone());
        self.menu_visible = true;
    }

    /// Hide the menu and drop the selection
    pub fn close_menu(&mut self) {
        self.selected.clear();
        self.menu_visible = false;
    }

    /// Replace stale copies of selected items with fresh listing records,
    /// dropping any that disappeared from the listing
    pub fn retain_listed(&mut self, listing: &[FileNode]) {
        self.selected = self
            .selected
            .iter()
            .filter_map(|s| listing.iter().find(|f| f.id == s.id).cloned())
            .collect();
    }
}
