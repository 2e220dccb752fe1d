//! Folder navigation state

use drive_proto::FolderRef;

/// Where the user is in the folder tree.
///
/// `stack` holds the ancestors of `current`, root first. The current
/// folder never appears in its own stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    current: FolderRef,
    stack: Vec<FolderRef>,
}

impl NavigationState {
    pub fn new() -> Self {
        Self {
            current: FolderRef::root(),
            stack: Vec::new(),
        }
    }

    pub fn current(&self) -> &FolderRef {
        &self.current
    }

    pub fn stack(&self) -> &[FolderRef] {
        &self.stack
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Descend into a folder: push the current folder, make `target` current
    pub fn enter_folder(&mut self, target: FolderRef) {
        if target.id == self.current.id {
            return;
        }

        // Entering an ancestor (e.g. from a move dialog) unwinds to it instead
        if let Some(pos) = self.stack.iter().position(|f| f.id == target.id) {
            self.stack.truncate(pos);
            self.current = target;
            return;
        }

        let previous = std::mem::replace(&mut self.current, target);
        self.stack.push(previous);
    }

    /// Go up one level
    pub fn go_back(&mut self) -> bool {
        if let Some(parent) = self.stack.pop() {
            self.current = parent;
            true
        } else {
            false
        }
    }

    /// Jump to a breadcrumb position.
    ///
    /// 0 resets to root. `1..=depth` makes `stack[index - 1]` current and
    /// keeps the `index - 1` entries above it. Anything else is ignored.
    pub fn jump_to_breadcrumb(&mut self, index: usize) -> bool {
        if index == 0 {
            self.reset();
            return true;
        }

        if index > self.stack.len() {
            return false;
        }

        self.current = self.stack[index - 1].clone();
        self.stack.truncate(index - 1);
        true
    }

    /// Back to "My Drive" with an empty trail
    pub fn reset(&mut self) {
        self.current = FolderRef::root();
        self.stack.clear();
    }

    /// Full trail from the top of the stack down to the current folder
    pub fn breadcrumbs(&self) -> Vec<&FolderRef> {
        self.stack.iter().chain(std::iter::once(&self.current)).collect()
    }

    /// Trail rendered as "My Drive / Projects / 2024"
    pub fn path_display(&self) -> String {
        self.breadcrumbs()
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }

    /// Parent of the current folder, if any
    pub fn parent(&self) -> Option<&FolderRef> {
        self.stack.last()
    }
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new()
    }
}
