//! Mutation coordinator
//!
//! Bridges a selection to a backend mutation and resynchronizes the
//! listing. Every operation follows the same sequence:
//! 1. Remote call (never retried)
//! 2. On success, refetch the folder that was current when the call started
//! 3. Close the action menu, success or failure
//!
//! Failures go to the error sink and are returned to the caller.

use crate::validation::validate_name;
use crate::{AppError, ErrorSink, Listing, NavigationState, SelectionState};
use app_api::{ApiError, DriveApi, LinkHandler};
use drive_proto::FileNode;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

pub struct MutationCoordinator {
    api: Arc<dyn DriveApi>,
    links: Arc<dyn LinkHandler>,
    errors: Arc<dyn ErrorSink>,
    navigation: Arc<RwLock<NavigationState>>,
    selection: Arc<RwLock<SelectionState>>,
    listing: Arc<RwLock<Listing>>,
}

impl MutationCoordinator {
    pub fn new(
        api: Arc<dyn DriveApi>,
        links: Arc<dyn LinkHandler>,
        errors: Arc<dyn ErrorSink>,
        navigation: Arc<RwLock<NavigationState>>,
        selection: Arc<RwLock<SelectionState>>,
        listing: Arc<RwLock<Listing>>,
    ) -> Self {
        Self {
            api,
            links,
            errors,
            navigation,
            selection,
            listing,
        }
    }

    fn current_folder_id(&self) -> String {
        self.navigation.read().current().id.clone()
    }

    fn reject(&self, error: AppError) -> AppError {
        self.errors.report(&error);
        error
    }

    /// Fetch the listing of the folder currently shown
    pub async fn refresh(&self) -> Result<(), AppError> {
        let folder_id = self.current_folder_id();
        self.refresh_folder(&folder_id).await
    }

    /// Fetch one folder's listing into the cache.
    /// A response overtaken by a newer fetch, or for a folder the user has
    /// since left, is dropped.
    pub async fn refresh_folder(&self, folder_id: &str) -> Result<(), AppError> {
        let ticket = self.listing.write().begin(folder_id);
        tracing::debug!("Fetching listing #{} for {}", ticket.seq(), folder_id);

        let result = self.api.list_folder(folder_id).await;
        let still_shown = self.current_folder_id() == folder_id;

        match result {
            Ok(_) if !still_shown => {
                self.listing.write().discard(ticket);
                Ok(())
            }
            Ok(files) => {
                let count = files.len();
                if self.listing.write().complete(ticket, files) {
                    tracing::debug!("Listing for {} updated ({} items)", folder_id, count);
                }
                Ok(())
            }
            Err(e) => {
                if still_shown {
                    self.listing.write().fail(ticket, &e.to_string());
                } else {
                    self.listing.write().discard(ticket);
                }
                Err(self.reject(e.into()))
            }
        }
    }

    /// Move items into `destination_id`
    pub async fn move_files(&self, file_ids: &[String], destination_id: &str) -> Result<(), AppError> {
        if file_ids.is_empty() {
            return Err(self.reject(AppError::Selection("Nothing selected to move".into())));
        }
        if file_ids.iter().any(|id| id == destination_id) {
            return Err(self.reject(AppError::Selection(
                "Cannot move a folder into itself".into(),
            )));
        }

        let folder_id = self.current_folder_id();
        tracing::info!("Moving {} item(s) to {}", file_ids.len(), destination_id);
        let result = self.api.move_files(file_ids, destination_id).await;
        self.settle("Move", &folder_id, result).await
    }

    /// Delete items. Trash or permanent delete is the backend's decision.
    pub async fn remove_files(&self, file_ids: &[String]) -> Result<(), AppError> {
        if file_ids.is_empty() {
            return Err(self.reject(AppError::Selection("Nothing selected to delete".into())));
        }

        let folder_id = self.current_folder_id();
        tracing::info!("Deleting {} item(s)", file_ids.len());
        let result = self.api.delete_files(file_ids).await;
        self.settle("Delete", &folder_id, result).await
    }

    /// Duplicate items in place
    pub async fn copy_files(&self, file_ids: &[String]) -> Result<(), AppError> {
        if file_ids.is_empty() {
            return Err(self.reject(AppError::Selection("Nothing selected to copy".into())));
        }

        let folder_id = self.current_folder_id();
        tracing::info!("Copying {} item(s)", file_ids.len());
        let result = self.api.copy_files(file_ids).await;
        self.settle("Copy", &folder_id, result).await
    }

    /// Rename one item. Invalid names are rejected without a request and
    /// leave the selection as it was.
    pub async fn rename(&self, file_id: &str, new_name: &str) -> Result<(), AppError> {
        let name = validate_name(new_name).map_err(|e| self.reject(e))?;

        let folder_id = self.current_folder_id();
        tracing::info!("Renaming {} to {:?}", file_id, name);
        let result = self.api.rename_file(file_id, &name).await;
        self.settle("Rename", &folder_id, result).await
    }

    /// Create a folder under `parent_id`, validated like a rename
    pub async fn create_folder(&self, parent_id: &str, name: &str) -> Result<FileNode, AppError> {
        let name = validate_name(name).map_err(|e| self.reject(e))?;

        let folder_id = self.current_folder_id();
        tracing::info!("Creating folder {:?} in {}", name, parent_id);
        let result = self.api.create_folder(parent_id, &name).await;
        self.settle("Create folder", &folder_id, result).await
    }

    /// Upload a local file into `parent_id`
    pub async fn upload(&self, parent_id: &str, path: &Path) -> Result<(), AppError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                self.reject(AppError::InvalidName(format!(
                    "{} is not a file",
                    path.display()
                )))
            })?;
        let file_name = validate_name(&file_name).map_err(|e| self.reject(e))?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| self.reject(AppError::Io(e)))?;

        let folder_id = self.current_folder_id();
        tracing::info!("Uploading {} ({} bytes) to {}", file_name, bytes.len(), parent_id);
        let result = self.api.upload_file(parent_id, &file_name, bytes).await;
        self.settle("Upload", &folder_id, result).await
    }

    /// Put an item's view link on the clipboard. Nothing changes
    /// server-side, so the listing is not refetched.
    pub async fn copy_link(&self, file_id: &str) -> Result<String, AppError> {
        let result = match self.api.open_link(file_id).await {
            Ok(link) => self
                .links
                .copy_to_clipboard(&link)
                .map(|_| link)
                .map_err(AppError::from),
            Err(e) => Err(AppError::from(e)),
        };

        self.selection.write().close_menu();

        match result {
            Ok(link) => {
                tracing::info!("Copied link for {}", file_id);
                Ok(link)
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Finish a mutation: refetch on success, report on failure, always
    /// close the menu
    async fn settle<T>(
        &self,
        operation: &str,
        folder_id: &str,
        result: Result<T, ApiError>,
    ) -> Result<T, AppError> {
        let outcome = match result {
            Ok(value) => {
                tracing::info!("{} succeeded", operation);
                // A failed refetch is reported on its own; the mutation still stands
                if let Err(e) = self.refresh_folder(folder_id).await {
                    tracing::debug!("Listing refresh after {} failed: {}", operation, e);
                }
                Ok(value)
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", operation, e);
                Err(self.reject(e.into()))
            }
        };

        self.selection.write().close_menu();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{file, folder, Call, FakeDrive, FakeLinks, RecordingSink};
    use drive_proto::FolderRef;

    struct Harness {
        api: Arc<FakeDrive>,
        links: Arc<FakeLinks>,
        sink: Arc<RecordingSink>,
        navigation: Arc<RwLock<NavigationState>>,
        selection: Arc<RwLock<SelectionState>>,
        listing: Arc<RwLock<Listing>>,
        coordinator: MutationCoordinator,
    }

    fn harness() -> Harness {
        let api = FakeDrive::new();
        let links = FakeLinks::new();
        let sink = RecordingSink::new();
        let navigation = Arc::new(RwLock::new(NavigationState::new()));
        let selection = Arc::new(RwLock::new(SelectionState::new()));
        let listing = Arc::new(RwLock::new(Listing::new()));
        let coordinator = MutationCoordinator::new(
            api.clone(),
            links.clone(),
            sink.clone(),
            navigation.clone(),
            selection.clone(),
            listing.clone(),
        );
        Harness {
            api,
            links,
            sink,
            navigation,
            selection,
            listing,
            coordinator,
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    impl Harness {
        fn select(&self, items: &[FileNode]) {
            let mut sel = self.selection.write();
            sel.select_single_and_open_menu(&items[0]);
            for item in &items[1..] {
                sel.toggle_select(item);
            }
        }

        fn assert_menu_closed(&self) {
            let sel = self.selection.read();
            assert!(!sel.is_menu_visible());
            assert!(sel.is_empty());
        }
    }

    #[tokio::test]
    async fn test_move_calls_then_refetches_then_resets() {
        let h = harness();
        h.navigation.write().enter_folder(FolderRef::new("work", "Work"));
        h.api.with_folder("work", vec![folder("folderX", "X")]);
        h.select(&[file("f1", "a.pdf"), file("f2", "b.pdf")]);

        h.coordinator
            .move_files(&ids(&["f1", "f2"]), "folderX")
            .await
            .unwrap();

        assert_eq!(
            h.api.calls(),
            vec![
                Call::Move(ids(&["f1", "f2"]), "folderX".to_string()),
                Call::List("work".to_string()),
            ]
        );
        h.assert_menu_closed();
        assert_eq!(h.listing.read().folder_id(), Some("work"));
        assert!(h.sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutation_reports_and_still_resets() {
        let h = harness();
        h.api.fail("delete");
        h.select(&[file("f1", "a.pdf")]);

        let err = h.coordinator.remove_files(&ids(&["f1"])).await.unwrap_err();

        assert!(matches!(err, AppError::Api(ApiError::Status { status: 500, .. })));
        assert_eq!(h.api.count("delete"), 1);
        assert_eq!(h.api.count("list"), 0);
        assert_eq!(h.sink.messages().len(), 1);
        h.assert_menu_closed();
    }

    #[tokio::test]
    async fn test_rename_validation_skips_network() {
        let h = harness();
        h.select(&[file("f1", "a.pdf")]);

        for bad in ["", "   ", "a/b", "a\\b"] {
            let err = h.coordinator.rename("f1", bad).await.unwrap_err();
            assert!(err.is_validation());
        }

        assert!(h.api.calls().is_empty());
        assert_eq!(h.sink.messages().len(), 4);
        // The user can fix the name without reselecting
        assert_eq!(h.selection.read().len(), 1);
    }

    #[tokio::test]
    async fn test_valid_rename_refetches_current_folder_once() {
        let h = harness();
        h.navigation.write().enter_folder(FolderRef::new("docs", "Docs"));
        h.select(&[file("f1", "a.pdf")]);

        h.coordinator
            .rename("f1", "Quarterly report 2024.pdf")
            .await
            .unwrap();

        assert_eq!(
            h.api.calls(),
            vec![
                Call::Rename("f1".into(), "Quarterly report 2024.pdf".into()),
                Call::List("docs".into()),
            ]
        );
        h.assert_menu_closed();
    }

    #[tokio::test]
    async fn test_refetch_targets_folder_at_call_time() {
        let h = harness();
        h.navigation.write().enter_folder(FolderRef::new("a", "A"));
        h.coordinator.copy_files(&ids(&["f1"])).await.unwrap();
        assert_eq!(h.api.calls()[1], Call::List("a".into()));
    }

    #[tokio::test]
    async fn test_refetch_for_left_folder_is_dropped() {
        let h = harness();
        h.api.with_folder("root", vec![file("r1", "root-file.pdf")]);
        h.api.with_folder("b", vec![file("b1", "b-file.pdf")]);
        let gate = h.api.gate("delete");
        h.select(&[file("r1", "root-file.pdf")]);

        // The user opens B while the delete in root is still pending
        let navigate = async {
            h.navigation.write().enter_folder(FolderRef::new("b", "B"));
            h.coordinator.refresh().await.unwrap();
            gate.notify_one();
        };
        let to_delete = ids(&["r1"]);
        let (deleted, ()) = tokio::join!(h.coordinator.remove_files(&to_delete), navigate);
        deleted.unwrap();

        assert_eq!(h.api.calls().last(), Some(&Call::List("root".into())));
        let listing = h.listing.read();
        assert_eq!(listing.folder_id(), Some("b"));
        assert_eq!(listing.files()[0].id, "b1");
        assert!(!listing.is_loading());
        drop(listing);
        h.assert_menu_closed();
    }

    #[tokio::test]
    async fn test_empty_and_self_moves_rejected_locally() {
        let h = harness();
        assert!(h.coordinator.move_files(&[], "x").await.is_err());
        assert!(h
            .coordinator
            .move_files(&ids(&["x"]), "x")
            .await
            .unwrap_err()
            .is_validation());
        assert!(h.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refetch_failure_does_not_fail_mutation() {
        let h = harness();
        h.api.fail("list");
        h.coordinator.copy_files(&ids(&["f1"])).await.unwrap();
        assert_eq!(h.sink.messages().len(), 1);
        assert!(h.listing.read().last_error().is_some());
        assert!(!h.listing.read().is_loading());
    }

    #[tokio::test]
    async fn test_create_folder_in_parent() {
        let h = harness();
        let created = h.coordinator.create_folder("root", " Invoices ").await.unwrap();
        assert!(created.is_folder());
        assert_eq!(
            h.api.calls(),
            vec![
                Call::CreateFolder("root".into(), "Invoices".into()),
                Call::List("root".into()),
            ]
        );

        assert!(h.coordinator.create_folder("root", "a/b").await.is_err());
        assert_eq!(h.api.count("create_folder"), 1);
    }

    #[tokio::test]
    async fn test_copy_link_does_not_refetch() {
        let h = harness();
        h.select(&[file("f1", "a.pdf")]);

        let link = h.coordinator.copy_link("f1").await.unwrap();

        assert_eq!(h.links.clipboard.lock().as_deref(), Some(link.as_str()));
        assert_eq!(h.api.calls(), vec![Call::Open("f1".into())]);
        h.assert_menu_closed();
    }

    #[tokio::test]
    async fn test_copy_link_clipboard_failure_reported() {
        let h = harness();
        *h.links.broken.lock() = true;
        h.select(&[file("f1", "a.pdf")]);

        let err = h.coordinator.copy_link("f1").await.unwrap_err();
        assert!(matches!(err, AppError::Link(_)));
        assert_eq!(h.sink.messages().len(), 1);
        h.assert_menu_closed();
    }

    #[tokio::test]
    async fn test_upload_reads_file() {
        let h = harness();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello drive").unwrap();

        h.coordinator.upload("root", &path).await.unwrap();
        assert_eq!(
            h.api.calls(),
            vec![
                Call::Upload("root".into(), "notes.txt".into(), 11),
                Call::List("root".into()),
            ]
        );

        let missing = dir.path().join("missing.txt");
        let err = h.coordinator.upload("root", &missing).await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
        assert_eq!(h.api.count("upload"), 1);
    }
}
