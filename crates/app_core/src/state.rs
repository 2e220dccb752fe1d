//! Application state management

use crate::{
    AppConfig, AppError, ErrorSink, Listing, MutationCoordinator, NavigationState,
    SelectionState, Session, SharingController, SharingState, SortBy, SortOrder,
};
use app_api::{DriveApi, LinkHandler};
use drive_proto::{FileNode, FolderRef};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

/// Main application state.
///
/// Each slice is independently lockable; no lock is held across an await.
pub struct AppState {
    /// Application configuration
    pub config: RwLock<AppConfig>,

    /// Where the user is in the folder tree
    pub navigation: Arc<RwLock<NavigationState>>,

    /// Selected items and action-menu visibility
    pub selection: Arc<RwLock<SelectionState>>,

    /// Contents of the current folder
    pub listing: Arc<RwLock<Listing>>,

    /// Signed-in user
    pub session: RwLock<Session>,

    api: Arc<dyn DriveApi>,
    links: Arc<dyn LinkHandler>,
    errors: Arc<dyn ErrorSink>,
    mutations: MutationCoordinator,
    sharing: SharingController,
}

impl AppState {
    /// Create a new application state
    pub fn new(
        config: AppConfig,
        api: Arc<dyn DriveApi>,
        links: Arc<dyn LinkHandler>,
        errors: Arc<dyn ErrorSink>,
    ) -> Self {
        let navigation = Arc::new(RwLock::new(NavigationState::new()));
        let selection = Arc::new(RwLock::new(SelectionState::new()));
        let listing = Arc::new(RwLock::new(Listing::new()));
        let sharing_state = Arc::new(RwLock::new(SharingState::new(
            config.sharing.default_invite_role,
        )));

        let mutations = MutationCoordinator::new(
            api.clone(),
            links.clone(),
            errors.clone(),
            navigation.clone(),
            selection.clone(),
            listing.clone(),
        );
        let sharing = SharingController::new(api.clone(), errors.clone(), sharing_state);

        Self {
            config: RwLock::new(config),
            navigation,
            selection,
            listing,
            session: RwLock::new(Session::default()),
            api,
            links,
            errors,
            mutations,
            sharing,
        }
    }

    pub fn sharing(&self) -> &SharingController {
        &self.sharing
    }

    pub fn errors(&self) -> &Arc<dyn ErrorSink> {
        &self.errors
    }

    fn reject(&self, error: AppError) -> AppError {
        self.errors.report(&error);
        error
    }

    /// Save the current configuration
    pub fn save_config(&self) -> anyhow::Result<()> {
        self.config.read().save()
    }

    // ========================================
    // Listing
    // ========================================

    /// Refetch the current folder, then re-sort it and drop selected
    /// items that no longer exist
    pub async fn refresh(&self) -> Result<(), AppError> {
        let result = self.mutations.refresh().await;
        self.apply_listing().await;
        result
    }

    async fn apply_listing(&self) {
        let (by, order, folders_first) = {
            let config = self.config.read();
            (
                config.filer.sort_by,
                config.filer.sort_order,
                config.filer.folders_first,
            )
        };
        {
            let mut listing = self.listing.write();
            listing.sort(by, order, folders_first);
            self.selection.write().retain_listed(listing.files());
        }
        self.sync_sharing().await;
    }

    /// Change and persist-in-memory the listing order
    pub fn set_sort(&self, by: SortBy, order: SortOrder) {
        let folders_first = {
            let mut config = self.config.write();
            config.filer.sort_by = by;
            config.filer.sort_order = order;
            config.filer.folders_first
        };
        self.listing.write().sort(by, order, folders_first);
    }

    // ========================================
    // Navigation
    // ========================================

    /// Activate a listed item: folders are entered, files are opened in
    /// the browser without touching navigation
    pub async fn open(&self, node: &FileNode) -> Result<(), AppError> {
        if node.is_folder() {
            return self.enter_folder(node.folder_ref()).await;
        }

        tracing::info!("Opening {} externally", node.name);
        let opened = match self.api.open_link(&node.id).await {
            Ok(link) => self.links.open_url(&link).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        opened.map_err(|reason| self.reject(AppError::OpenFile(reason)))
    }

    /// Descend into `target` and load it
    pub async fn enter_folder(&self, target: FolderRef) -> Result<(), AppError> {
        self.navigation.write().enter_folder(target);
        self.after_navigation().await
    }

    /// Return to the parent folder. Returns Ok(false) at the root.
    pub async fn go_back(&self) -> Result<bool, AppError> {
        if !self.navigation.write().go_back() {
            return Ok(false);
        }
        self.after_navigation().await.map(|_| true)
    }

    /// Jump to a breadcrumb; 0 is the root
    pub async fn jump_to_breadcrumb(&self, index: usize) -> Result<bool, AppError> {
        if !self.navigation.write().jump_to_breadcrumb(index) {
            return Ok(false);
        }
        self.after_navigation().await.map(|_| true)
    }

    async fn after_navigation(&self) -> Result<(), AppError> {
        self.selection.write().close_menu();
        tracing::debug!("Now in {}", self.navigation.read().path_display());
        self.refresh().await
    }

    // ========================================
    // Selection
    // ========================================

    pub async fn toggle_select(&self, node: &FileNode) -> bool {
        let changed = self.selection.write().toggle_select(node);
        if changed {
            self.sync_sharing().await;
        }
        changed
    }

    pub async fn select_single(&self, node: &FileNode) {
        self.selection.write().select_single_and_open_menu(node);
        self.sync_sharing().await;
    }

    pub async fn close_menu(&self) {
        self.selection.write().close_menu();
        self.sync_sharing().await;
    }

    /// The one selected item, for actions that act on a single file
    pub fn single_selected(&self) -> Result<FileNode, AppError> {
        let (single, count) = {
            let selection = self.selection.read();
            (selection.single().cloned(), selection.len())
        };
        single.ok_or_else(|| {
            self.reject(AppError::Selection(format!(
                "select exactly one item ({} selected)",
                count
            )))
        })
    }

    fn selected_ids(&self) -> Vec<String> {
        self.selection.read().ids()
    }

    /// Keep the open sharing panel on the current selection
    async fn sync_sharing(&self) {
        if !self.sharing.state().read().is_active() {
            return;
        }
        let items = self.selection.read().selected().to_vec();
        // A load failure has already been reported and recorded in the panel
        if self.sharing.follow_selection(&items) && self.sharing.load().await.is_err() {
            tracing::debug!("Sharing panel load failed after selection change");
        }
    }

    // ========================================
    // Mutations on the selection
    // ========================================

    pub async fn move_selected(&self, destination_id: &str) -> Result<(), AppError> {
        let ids = self.selected_ids();
        let result = self.mutations.move_files(&ids, destination_id).await;
        self.apply_listing().await;
        result
    }

    pub async fn delete_selected(&self) -> Result<(), AppError> {
        let ids = self.selected_ids();
        let result = self.mutations.remove_files(&ids).await;
        self.apply_listing().await;
        result
    }

    pub async fn copy_selected(&self) -> Result<(), AppError> {
        let ids = self.selected_ids();
        let result = self.mutations.copy_files(&ids).await;
        self.apply_listing().await;
        result
    }

    pub async fn rename_selected(&self, new_name: &str) -> Result<(), AppError> {
        let target = self.single_selected()?;
        let result = self.mutations.rename(&target.id, new_name).await;
        self.apply_listing().await;
        result
    }

    /// Copy the selected item's link; returns the link
    pub async fn copy_link_selected(&self) -> Result<String, AppError> {
        let target = self.single_selected()?;
        let result = self.mutations.copy_link(&target.id).await;
        self.sync_sharing().await;
        result
    }

    /// Create a folder inside the current folder
    pub async fn create_folder(&self, name: &str) -> Result<FileNode, AppError> {
        let parent_id = self.navigation.read().current().id.clone();
        let result = self.mutations.create_folder(&parent_id, name).await;
        self.apply_listing().await;
        result
    }

    /// Upload a local file into the current folder
    pub async fn upload(&self, path: &Path) -> Result<(), AppError> {
        let parent_id = self.navigation.read().current().id.clone();
        let result = self.mutations.upload(&parent_id, path).await;
        self.apply_listing().await;
        result
    }

    // ========================================
    // Sharing panel
    // ========================================

    /// Open the sharing panel on the current selection
    pub async fn open_sharing(&self) -> Result<(), AppError> {
        let items = self.selection.read().selected().to_vec();
        if items.is_empty() {
            return Err(self.reject(AppError::Selection(
                "select the items to share first".into(),
            )));
        }
        self.sharing.follow_selection(&items);
        self.sharing.load().await
    }

    pub fn close_sharing(&self) {
        self.sharing.close();
    }

    // ========================================
    // Session
    // ========================================

    /// Ask the backend who is signed in
    pub async fn refresh_session(&self) -> Result<Session, AppError> {
        match Session::fetch(self.api.as_ref()).await {
            Ok(session) => {
                *self.session.write() = session.clone();
                Ok(session)
            }
            Err(e) => Err(self.reject(e.into())),
        }
    }

    /// Forget the session once the backend stops accepting it
    pub fn note_failure(&self, error: &AppError) {
        if !error.needs_login() {
            return;
        }
        let signed_in = self.session.read().authenticated;
        if signed_in {
            tracing::info!("Session rejected by the backend; signed out");
            *self.session.write() = Session::default();
        }
    }

    /// Open the backend login page in the browser
    pub fn login(&self) -> Result<String, AppError> {
        let url = self.config.read().login_url();
        self.links
            .open_url(&url)
            .map(|_| url)
            .map_err(|e| self.reject(e.into()))
    }

    /// End the backend session and drop all per-user state
    pub async fn logout(&self) -> Result<(), AppError> {
        let result = self.api.logout().await;

        *self.session.write() = Session::default();
        self.navigation.write().reset();
        self.selection.write().close_menu();
        self.listing.write().clear();
        self.sharing.close();

        result.map_err(|e| self.reject(e.into()))
    }
}
