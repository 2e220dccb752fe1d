//! Wire types for the DriveDesk backend REST API
//!
//! This crate defines the JSON documents exchanged with the backend that
//! wraps Google Drive. Field names follow the backend (Drive API naming,
//! camelCase); Rust-side names are snake_case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// MIME type Drive uses to mark folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Id of the user's top-level folder
pub const ROOT_FOLDER_ID: &str = "root";

/// Display name of the user's top-level folder
pub const ROOT_FOLDER_NAME: &str = "My Drive";

/// Id of the synthetic permission entry describing link sharing
pub const ANYONE_WITH_LINK_ID: &str = "anyoneWithLink";

/// Error parsing a protocol enum from user input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown role: {0}")]
    Role(String),

    #[error("unknown general access mode: {0}")]
    GeneralAccess(String),
}

/// A user as reported in `owners`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub photo_link: Option<String>,
    #[serde(default)]
    pub me: bool,
}

/// A file or folder record as returned by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub parents: Vec<String>,
    /// Drive reports sizes as decimal strings; folders and Docs have none
    #[serde(default, deserialize_with = "size_from_string_or_number")]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub viewed_by_me_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shared_with_me_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shared: bool,
    #[serde(default)]
    pub owners: Vec<Person>,
    #[serde(default)]
    pub has_thumbnail: bool,
    #[serde(default)]
    pub thumbnail_link: Option<String>,
}

impl FileNode {
    /// Is this record a folder?
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Minimal navigation handle for this record
    pub fn folder_ref(&self) -> FolderRef {
        FolderRef::new(&self.id, &self.name)
    }
}

fn size_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSize {
        Number(u64),
        Text(String),
    }

    match Option::<RawSize>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawSize::Number(n)) => Ok(Some(n)),
        Some(RawSize::Text(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Minimal `{id, name}` handle used for navigation bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
}

impl FolderRef {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    /// The user's "My Drive" root
    pub fn root() -> Self {
        Self::new(ROOT_FOLDER_ID, ROOT_FOLDER_NAME)
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_FOLDER_ID
    }
}

impl Default for FolderRef {
    fn default() -> Self {
        Self::root()
    }
}

/// Permission role on a Drive item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "reader")]
    Viewer,
    Commenter,
    #[serde(alias = "editor")]
    Writer,
    Owner,
}

impl Role {
    /// Can a user holding this role change an item's sharing?
    pub fn can_manage_sharing(self) -> bool {
        matches!(self, Role::Writer | Role::Owner)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Commenter => "commenter",
            Role::Writer => "writer",
            Role::Owner => "owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viewer" | "reader" => Ok(Role::Viewer),
            "commenter" => Ok(Role::Commenter),
            "writer" | "editor" => Ok(Role::Writer),
            "owner" => Ok(Role::Owner),
            other => Err(ParseError::Role(other.to_string())),
        }
    }
}

/// Link-sharing mode of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeneralAccess {
    #[default]
    #[serde(rename = "Restricted")]
    Restricted,
    #[serde(rename = "Anyone with the link")]
    AnyoneWithLink,
}

impl GeneralAccess {
    pub fn as_str(self) -> &'static str {
        match self {
            GeneralAccess::Restricted => "Restricted",
            GeneralAccess::AnyoneWithLink => "Anyone with the link",
        }
    }
}

impl fmt::Display for GeneralAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneralAccess {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restricted" => Ok(GeneralAccess::Restricted),
            "anyone" | "anyone with the link" | "link" => Ok(GeneralAccess::AnyoneWithLink),
            other => Err(ParseError::GeneralAccess(other.to_string())),
        }
    }
}

/// One entry of an item's permission list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub photo_link: Option<String>,
    pub role: Role,
}

impl PermissionEntry {
    /// Synthetic entry standing for "anyone with the link"
    pub fn anyone_with_link(role: Role) -> Self {
        Self {
            id: ANYONE_WITH_LINK_ID.to_string(),
            display_name: GeneralAccess::AnyoneWithLink.as_str().to_string(),
            email_address: None,
            photo_link: None,
            role,
        }
    }

    pub fn is_link_entry(&self) -> bool {
        self.id == ANYONE_WITH_LINK_ID
    }
}

// ===== Responses =====

#[derive(Debug, Clone, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<FileNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenLink {
    pub web_view_link: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionList {
    #[serde(default)]
    pub people_with_access: Vec<PermissionEntry>,
    #[serde(default)]
    pub current_user_role: Option<Role>,
    #[serde(default)]
    pub current_user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleResponse {
    pub role: Role,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// Error document returned with non-2xx responses.
/// Backends disagree on the key, so all common ones are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.detail).or(self.message)
    }
}

// ===== Requests =====

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest<'a> {
    pub parent_folder_id: &'a str,
    pub folder_name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveFilesRequest<'a> {
    pub file_ids: &'a [String],
    pub new_folder_id: &'a str,
}

/// Body shared by delete and copy
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileIdsRequest<'a> {
    pub file_ids: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameFileRequest<'a> {
    pub file_id: &'a str,
    pub new_name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareRequest<'a> {
    pub email: &'a str,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePermissionRequest<'a> {
    pub permission_id: &'a str,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovePermissionRequest<'a> {
    pub permission_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralAccessRequest {
    pub access: GeneralAccess,
    pub link_role: Role,
}
