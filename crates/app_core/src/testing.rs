//! In-memory backend and sinks for unit tests

use crate::{AppError, ErrorSink};
use app_api::{ApiError, DriveApi, LinkError, LinkHandler};
use async_trait::async_trait;
use drive_proto::{
    FileNode, GeneralAccess, PermissionEntry, PermissionList, Role, UserInfo, FOLDER_MIME_TYPE,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Notify;

pub fn file(id: &str, name: &str) -> FileNode {
    FileNode {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: "application/pdf".to_string(),
        parents: Vec::new(),
        size: Some(2048),
        modified_time: None,
        viewed_by_me_time: None,
        created_time: None,
        shared_with_me_time: None,
        shared: false,
        owners: Vec::new(),
        has_thumbnail: false,
        thumbnail_link: None,
    }
}

pub fn folder(id: &str, name: &str) -> FileNode {
    FileNode {
        mime_type: FOLDER_MIME_TYPE.to_string(),
        size: None,
        ..file(id, name)
    }
}

pub fn person(id: &str, email: &str, role: Role) -> PermissionEntry {
    PermissionEntry {
        id: id.to_string(),
        display_name: email.split('@').next().unwrap_or_default().to_string(),
        email_address: Some(email.to_string()),
        photo_link: None,
        role,
    }
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CheckAuth,
    UserInfo,
    Logout,
    List(String),
    Open(String),
    CreateFolder(String, String),
    Move(Vec<String>, String),
    Delete(Vec<String>),
    Copy(Vec<String>),
    Rename(String, String),
    Upload(String, String, usize),
    UserRole(String),
    Permissions(String),
    Share(String, String, Role),
    UpdatePermission(String, String, Role),
    RemovePermission(String, String),
    GeneralAccess(String, GeneralAccess, Role),
}

impl Call {
    fn op(&self) -> &'static str {
        match self {
            Call::CheckAuth => "check_auth",
            Call::UserInfo => "user_info",
            Call::Logout => "logout",
            Call::List(_) => "list",
            Call::Open(_) => "open",
            Call::CreateFolder(..) => "create_folder",
            Call::Move(..) => "move",
            Call::Delete(_) => "delete",
            Call::Copy(_) => "copy",
            Call::Rename(..) => "rename",
            Call::Upload(..) => "upload",
            Call::UserRole(_) => "user_role",
            Call::Permissions(_) => "permissions",
            Call::Share(..) => "share",
            Call::UpdatePermission(..) => "update_permission",
            Call::RemovePermission(..) => "remove_permission",
            Call::GeneralAccess(..) => "general_access",
        }
    }
}

/// Scriptable in-memory backend
#[derive(Default)]
pub struct FakeDrive {
    calls: Mutex<Vec<Call>>,
    folders: Mutex<HashMap<String, Vec<FileNode>>>,
    failing: Mutex<HashSet<&'static str>>,
    failing_emails: Mutex<HashSet<String>>,
    role: Mutex<Option<Role>>,
    permissions: Mutex<Vec<PermissionEntry>>,
    authenticated: Mutex<bool>,
    gates: Mutex<HashMap<&'static str, Arc<Notify>>>,
}

impl FakeDrive {
    pub fn new() -> Arc<Self> {
        let fake = Self::default();
        *fake.role.lock() = Some(Role::Owner);
        *fake.authenticated.lock() = true;
        Arc::new(fake)
    }

    pub fn with_folder(&self, folder_id: &str, files: Vec<FileNode>) {
        self.folders.lock().insert(folder_id.to_string(), files);
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().insert(op);
    }

    pub fn fail_share_to(&self, email: &str) {
        self.failing_emails.lock().insert(email.to_string());
    }

    pub fn set_role(&self, role: Role) {
        *self.role.lock() = Some(role);
    }

    pub fn set_permissions(&self, entries: Vec<PermissionEntry>) {
        *self.permissions.lock() = entries;
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        *self.authenticated.lock() = authenticated;
    }

    /// Hold calls of `op` until the returned notify fires
    pub fn gate(&self, op: &'static str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.lock().insert(op, notify.clone());
        notify
    }

    async fn pass_gate(&self, op: &str) {
        let gate = self.gates.lock().get(op).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.op() == op).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: Call) -> Result<(), ApiError> {
        let op = call.op();
        self.calls.lock().push(call);
        if self.failing.lock().contains(op) {
            return Err(ApiError::Status {
                status: 500,
                message: format!("{} failed", op),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn check_auth(&self) -> app_api::Result<bool> {
        self.record(Call::CheckAuth)?;
        Ok(*self.authenticated.lock())
    }

    async fn user_info(&self) -> app_api::Result<UserInfo> {
        self.record(Call::UserInfo)?;
        Ok(UserInfo {
            email: "me@example.com".to_string(),
            name: "Me".to_string(),
        })
    }

    async fn logout(&self) -> app_api::Result<()> {
        self.record(Call::Logout)?;
        *self.authenticated.lock() = false;
        Ok(())
    }

    async fn list_folder(&self, folder_id: &str) -> app_api::Result<Vec<FileNode>> {
        self.record(Call::List(folder_id.to_string()))?;
        Ok(self.folders.lock().get(folder_id).cloned().unwrap_or_default())
    }

    async fn open_link(&self, file_id: &str) -> app_api::Result<String> {
        self.record(Call::Open(file_id.to_string()))?;
        Ok(format!("https://drive.example.com/file/d/{}/view", file_id))
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> app_api::Result<FileNode> {
        self.record(Call::CreateFolder(parent_id.to_string(), name.to_string()))?;
        Ok(folder("new-folder", name))
    }

    async fn move_files(&self, file_ids: &[String], new_folder_id: &str) -> app_api::Result<()> {
        let result = self.record(Call::Move(file_ids.to_vec(), new_folder_id.to_string()));
        self.pass_gate("move").await;
        result
    }

    async fn delete_files(&self, file_ids: &[String]) -> app_api::Result<()> {
        let result = self.record(Call::Delete(file_ids.to_vec()));
        self.pass_gate("delete").await;
        result
    }

    async fn copy_files(&self, file_ids: &[String]) -> app_api::Result<()> {
        let result = self.record(Call::Copy(file_ids.to_vec()));
        self.pass_gate("copy").await;
        result
    }

    async fn rename_file(&self, file_id: &str, new_name: &str) -> app_api::Result<()> {
        let result = self.record(Call::Rename(file_id.to_string(), new_name.to_string()));
        self.pass_gate("rename").await;
        result
    }

    async fn upload_file(
        &self,
        folder_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> app_api::Result<()> {
        self.record(Call::Upload(
            folder_id.to_string(),
            file_name.to_string(),
            bytes.len(),
        ))
    }

    async fn user_role(&self, file_id: &str) -> app_api::Result<Role> {
        self.record(Call::UserRole(file_id.to_string()))?;
        Ok(self.role.lock().unwrap_or(Role::Viewer))
    }

    async fn permissions(&self, file_id: &str) -> app_api::Result<PermissionList> {
        self.record(Call::Permissions(file_id.to_string()))?;
        Ok(PermissionList {
            people_with_access: self.permissions.lock().clone(),
            current_user_role: *self.role.lock(),
            current_user_id: Some("me".to_string()),
        })
    }

    async fn share(&self, file_id: &str, email: &str, role: Role) -> app_api::Result<()> {
        self.record(Call::Share(file_id.to_string(), email.to_string(), role))?;
        self.pass_gate("share").await;
        if self.failing_emails.lock().contains(email) {
            return Err(ApiError::Status {
                status: 400,
                message: format!("cannot share with {}", email),
            });
        }
        Ok(())
    }

    async fn update_permission(
        &self,
        file_id: &str,
        permission_id: &str,
        role: Role,
    ) -> app_api::Result<()> {
        self.record(Call::UpdatePermission(
            file_id.to_string(),
            permission_id.to_string(),
            role,
        ))
    }

    async fn remove_permission(&self, file_id: &str, permission_id: &str) -> app_api::Result<()> {
        self.record(Call::RemovePermission(
            file_id.to_string(),
            permission_id.to_string(),
        ))
    }

    async fn set_general_access(
        &self,
        file_id: &str,
        access: GeneralAccess,
        link_role: Role,
    ) -> app_api::Result<()> {
        self.record(Call::GeneralAccess(file_id.to_string(), access, link_role))
    }
}

/// Sink that keeps every reported message
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, error: &AppError) {
        self.messages.lock().push(error.to_string());
    }
}

/// Link handler that records instead of touching the desktop
#[derive(Default)]
pub struct FakeLinks {
    pub opened: Mutex<Vec<String>>,
    pub clipboard: Mutex<Option<String>>,
    pub broken: Mutex<bool>,
}

impl FakeLinks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl LinkHandler for FakeLinks {
    fn open_url(&self, url: &str) -> Result<(), LinkError> {
        if *self.broken.lock() {
            return Err(LinkError::Open {
                url: url.to_string(),
                reason: "no browser".to_string(),
            });
        }
        self.opened.lock().push(url.to_string());
        Ok(())
    }

    fn copy_to_clipboard(&self, text: &str) -> Result<(), LinkError> {
        if *self.broken.lock() {
            return Err(LinkError::Clipboard("no clipboard".to_string()));
        }
        *self.clipboard.lock() = Some(text.to_string());
        Ok(())
    }
}
