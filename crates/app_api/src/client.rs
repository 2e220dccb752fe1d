//! REST client for the Drive backend

use crate::{ApiError, Result};
use async_trait::async_trait;
use drive_proto::{
    AuthStatus, CreateFolderRequest, ErrorBody, FileIdsRequest, FileList, FileNode,
    GeneralAccess, GeneralAccessRequest, MoveFilesRequest, OpenLink, PermissionList,
    RemovePermissionRequest, RenameFileRequest, Role, RoleResponse, ShareRequest,
    UpdatePermissionRequest, UserInfo,
};
use reqwest::cookie::Jar;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Backend operations, one per REST endpoint.
///
/// Every call is a single round-trip: no retries, no timeouts beyond the
/// transport's own. Non-2xx answers come back as [`ApiError::Status`].
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// GET /check-auth
    async fn check_auth(&self) -> Result<bool>;

    /// GET /user-info
    async fn user_info(&self) -> Result<UserInfo>;

    /// POST /logout
    async fn logout(&self) -> Result<()>;

    /// GET /drive?folder_id=<id>
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<FileNode>>;

    /// GET /drive/{id}/open, returns the item's web view link
    async fn open_link(&self, file_id: &str) -> Result<String>;

    /// POST /drive/create-folder
    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<FileNode>;

    /// POST /drive/move-files
    async fn move_files(&self, file_ids: &[String], new_folder_id: &str) -> Result<()>;

    /// POST /drive/delete-files
    async fn delete_files(&self, file_ids: &[String]) -> Result<()>;

    /// POST /drive/copy-files
    async fn copy_files(&self, file_ids: &[String]) -> Result<()>;

    /// POST /drive/rename-file
    async fn rename_file(&self, file_id: &str, new_name: &str) -> Result<()>;

    /// POST /drive/upload (multipart)
    async fn upload_file(&self, folder_id: &str, file_name: &str, bytes: Vec<u8>) -> Result<()>;

    /// GET /drive/{id}/user-role
    async fn user_role(&self, file_id: &str) -> Result<Role>;

    /// GET /drive/{id}/permissions
    async fn permissions(&self, file_id: &str) -> Result<PermissionList>;

    /// POST /drive/{id}/share
    async fn share(&self, file_id: &str, email: &str, role: Role) -> Result<()>;

    /// POST /drive/{id}/update-permission
    async fn update_permission(&self, file_id: &str, permission_id: &str, role: Role) -> Result<()>;

    /// POST /drive/{id}/remove-permission
    async fn remove_permission(&self, file_id: &str, permission_id: &str) -> Result<()>;

    /// POST /drive/{id}/general-access
    async fn set_general_access(
        &self,
        file_id: &str,
        access: GeneralAccess,
        link_role: Role,
    ) -> Result<()>;
}

/// Connection options for [`HttpDriveClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    /// `name=value` cookie seeded into the jar, for sessions created in a browser
    pub session_cookie: Option<String>,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            session_cookie: None,
            user_agent: concat!("DriveDesk/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// reqwest implementation of [`DriveApi`].
///
/// Session credentials live in a cookie jar shared by every request.
pub struct HttpDriveClient {
    base: Url,
    http: reqwest::Client,
}

impl HttpDriveClient {
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let base = Url::parse(&options.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", options.base_url, e)))?;

        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(options.base_url.clone()));
        }

        let jar = Arc::new(Jar::default());
        if let Some(cookie) = options.session_cookie.as_deref().filter(|c| !c.trim().is_empty()) {
            jar.add_cookie_str(cookie.trim(), &base);
            tracing::debug!("Seeded session cookie for {}", base);
        }

        let http = reqwest::Client::builder()
            .cookie_provider(jar)
            .user_agent(options.user_agent.as_str())
            .build()?;

        Ok(Self { base, http })
    }

    /// Build an endpoint URL under the base, percent-encoding each segment
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let request = request
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .build()?;

        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(%request_id, %method, path = url.path(), "Sending request");

        let response = self.http.execute(request).await.map_err(|e| {
            tracing::warn!(%request_id, %method, path = url.path(), "Request failed: {}", e);
            ApiError::Transport(e)
        })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(%request_id, status = status.as_u16(), "Request completed");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        tracing::warn!(%request_id, %method, path = url.path(), status = status.as_u16(), "{}", message);

        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(self.http.get(url)).await?;
        decode(response).await
    }

    async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.send(self.http.post(url).json(body)).await?;
        decode(response).await
    }

    /// POST whose response body carries nothing the client needs
    async fn post_unit<B>(&self, url: Url, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.send(self.http.post(url).json(body)).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Extract a readable message from a non-2xx response body
fn error_message(status: StatusCode, body: &str) -> String {
    if let Some(message) = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
    {
        return message;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl DriveApi for HttpDriveClient {
    async fn check_auth(&self) -> Result<bool> {
        let status: AuthStatus = self.get_json(self.endpoint(&["check-auth"])?).await?;
        Ok(status.authenticated)
    }

    async fn user_info(&self) -> Result<UserInfo> {
        self.get_json(self.endpoint(&["user-info"])?).await
    }

    async fn logout(&self) -> Result<()> {
        self.post_unit(self.endpoint(&["logout"])?, &serde_json::json!({})).await
    }

    async fn list_folder(&self, folder_id: &str) -> Result<Vec<FileNode>> {
        let mut url = self.endpoint(&["drive"])?;
        url.query_pairs_mut().append_pair("folder_id", folder_id);
        let list: FileList = self.get_json(url).await?;
        Ok(list.files)
    }

    async fn open_link(&self, file_id: &str) -> Result<String> {
        let link: OpenLink = self.get_json(self.endpoint(&["drive", file_id, "open"])?).await?;
        Ok(link.web_view_link)
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<FileNode> {
        let body = CreateFolderRequest {
            parent_folder_id: parent_id,
            folder_name: name,
        };
        self.post_json(self.endpoint(&["drive", "create-folder"])?, &body)
            .await
    }

    async fn move_files(&self, file_ids: &[String], new_folder_id: &str) -> Result<()> {
        let body = MoveFilesRequest {
            file_ids,
            new_folder_id,
        };
        self.post_unit(self.endpoint(&["drive", "move-files"])?, &body)
            .await
    }

    async fn delete_files(&self, file_ids: &[String]) -> Result<()> {
        self.post_unit(
            self.endpoint(&["drive", "delete-files"])?,
            &FileIdsRequest { file_ids },
        )
        .await
    }

    async fn copy_files(&self, file_ids: &[String]) -> Result<()> {
        self.post_unit(
            self.endpoint(&["drive", "copy-files"])?,
            &FileIdsRequest { file_ids },
        )
        .await
    }

    async fn rename_file(&self, file_id: &str, new_name: &str) -> Result<()> {
        let body = RenameFileRequest { file_id, new_name };
        self.post_unit(self.endpoint(&["drive", "rename-file"])?, &body)
            .await
    }

    async fn upload_file(&self, folder_id: &str, file_name: &str, bytes: Vec<u8>) -> Result<()> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("folder_id", folder_id.to_string())
            .part("file", part);

        let url = self.endpoint(&["drive", "upload"])?;
        self.send(self.http.post(url).multipart(form)).await?;
        Ok(())
    }

    async fn user_role(&self, file_id: &str) -> Result<Role> {
        let response: RoleResponse = self
            .get_json(self.endpoint(&["drive", file_id, "user-role"])?)
            .await?;
        Ok(response.role)
    }

    async fn permissions(&self, file_id: &str) -> Result<PermissionList> {
        self.get_json(self.endpoint(&["drive", file_id, "permissions"])?)
            .await
    }

    async fn share(&self, file_id: &str, email: &str, role: Role) -> Result<()> {
        self.post_unit(
            self.endpoint(&["drive", file_id, "share"])?,
            &ShareRequest { email, role },
        )
        .await
    }

    async fn update_permission(&self, file_id: &str, permission_id: &str, role: Role) -> Result<()> {
        self.post_unit(
            self.endpoint(&["drive", file_id, "update-permission"])?,
            &UpdatePermissionRequest { permission_id, role },
        )
        .await
    }

    async fn remove_permission(&self, file_id: &str, permission_id: &str) -> Result<()> {
        self.post_unit(
            self.endpoint(&["drive", file_id, "remove-permission"])?,
            &RemovePermissionRequest { permission_id },
        )
        .await
    }

    async fn set_general_access(
        &self,
        file_id: &str,
        access: GeneralAccess,
        link_role: Role,
    ) -> Result<()> {
        self.post_unit(
            self.endpoint(&["drive", file_id, "general-access"])?,
            &GeneralAccessRequest { access, link_role },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    fn client(base: &str) -> HttpDriveClient {
        HttpDriveClient::new(&ClientOptions {
            base_url: base.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_under_base_path() {
        let c = client("http://localhost:8000/api");
        assert_eq!(
            c.endpoint(&["drive", "move-files"]).unwrap().as_str(),
            "http://localhost:8000/api/drive/move-files"
        );

        let c = client("http://localhost:8000/api/");
        assert_eq!(
            c.endpoint(&["check-auth"]).unwrap().as_str(),
            "http://localhost:8000/api/check-auth"
        );
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let c = client("http://localhost:8000");
        let url = c.endpoint(&["drive", "a/b c", "open"]).unwrap();
        assert_eq!(url.path(), "/drive/a%2Fb%20c/open");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpDriveClient::new(&ClientOptions {
            base_url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(err, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(StatusCode::UNAUTHORIZED, r#"{"error": "Not logged in"}"#),
            "Not logged in"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "  upstream down \n"),
            "upstream down"
        );
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
    }

    /// One request as the local test server saw it
    #[derive(Debug, Clone)]
    struct Seen {
        method: String,
        target: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Seen {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }

        fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.body).unwrap()
        }
    }

    type Responder = fn(&str, &str) -> (u16, &'static str);

    /// Minimal HTTP/1.1 server on a random port. `respond` maps method and
    /// path to a status and JSON body.
    async fn serve(respond: Responder) -> (String, Arc<parking_lot::Mutex<Vec<Seen>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let log = seen.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle(stream, respond, log.clone()));
            }
        });
        (base, seen)
    }

    async fn handle(stream: TcpStream, respond: Responder, log: Arc<parking_lot::Mutex<Vec<Seen>>>) {
        let mut reader = BufReader::new(stream);
        loop {
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).await.unwrap_or(0) == 0 {
                return;
            }
            let mut parts = request_line.split_whitespace();
            let method = parts.next().unwrap_or_default().to_string();
            let target = parts.next().unwrap_or_default().to_string();

            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
                }
            }

            let length = headers
                .iter()
                .find(|(k, _)| k == "content-length")
                .and_then(|(_, v)| v.parse().ok())
                .unwrap_or(0);
            let mut body = vec![0; length];
            reader.read_exact(&mut body).await.unwrap();

            let path = target.split('?').next().unwrap_or_default();
            let (status, payload) = respond(&method, path);
            log.lock().push(Seen {
                method,
                target,
                headers,
                body: String::from_utf8_lossy(&body).to_string(),
            });

            let reply = format!(
                "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                status,
                payload.len(),
                payload
            );
            reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
        }
    }

    fn drive_backend(method: &str, path: &str) -> (u16, &'static str) {
        match (method, path) {
            ("GET", "/check-auth") => (200, r#"{"authenticated": true}"#),
            ("GET", "/drive") => (
                200,
                r#"{"files": [{"id": "d1", "name": "Docs", "mimeType": "application/vnd.google-apps.folder"}]}"#,
            ),
            ("GET", "/drive/locked/permissions") => (500, "  quota exceeded \n"),
            ("POST", _) => (200, "{}"),
            _ => (401, r#"{"detail": "Not authenticated"}"#),
        }
    }

    #[tokio::test]
    async fn test_listing_sends_query_cookie_and_request_id() {
        let (base, seen) = serve(drive_backend).await;
        let c = HttpDriveClient::new(&ClientOptions {
            base_url: base,
            session_cookie: Some("session=abc123".to_string()),
            ..Default::default()
        })
        .unwrap();

        let files = c.list_folder("folder 1").await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].is_folder());
        assert!(c.check_auth().await.unwrap());

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].method, "GET");
        assert_eq!(seen[0].target, "/drive?folder_id=folder+1");
        assert_eq!(seen[1].target, "/check-auth");
        for request in seen.iter() {
            assert!(request.header("cookie").unwrap().contains("session=abc123"));
            assert_eq!(request.header("x-request-id").map(str::len), Some(36));
            assert!(request.header("user-agent").unwrap().starts_with("DriveDesk/"));
        }
        assert_ne!(seen[0].header("x-request-id"), seen[1].header("x-request-id"));
    }

    #[tokio::test]
    async fn test_bodies_reach_their_endpoints() {
        let (base, seen) = serve(drive_backend).await;
        let c = client(&base);
        let ids = vec!["f1".to_string(), "f2".to_string()];

        c.move_files(&ids, "dest").await.unwrap();
        c.rename_file("f1", "report.pdf").await.unwrap();
        c.share("f1", "ann@example.com", Role::Commenter).await.unwrap();
        c.set_general_access("f 2", GeneralAccess::AnyoneWithLink, Role::Viewer)
            .await
            .unwrap();

        let seen = seen.lock();
        let targets: Vec<&str> = seen.iter().map(|s| s.target.as_str()).collect();
        assert_eq!(
            targets,
            [
                "/drive/move-files",
                "/drive/rename-file",
                "/drive/f1/share",
                "/drive/f%202/general-access",
            ]
        );
        assert!(seen.iter().all(|s| s.method == "POST"));
        assert_eq!(
            seen[0].json(),
            serde_json::json!({"fileIds": ["f1", "f2"], "newFolderId": "dest"})
        );
        assert_eq!(
            seen[1].json(),
            serde_json::json!({"fileId": "f1", "newName": "report.pdf"})
        );
        assert_eq!(
            seen[2].json(),
            serde_json::json!({"email": "ann@example.com", "role": "commenter"})
        );
        assert_eq!(
            seen[3].json(),
            serde_json::json!({"access": "Anyone with the link", "linkRole": "viewer"})
        );
    }

    #[tokio::test]
    async fn test_non_success_status_becomes_status_error() {
        let (base, _) = serve(drive_backend).await;
        let c = client(&base);

        let err = c.user_info().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(matches!(
            err,
            ApiError::Status { status: 401, ref message } if message == "Not authenticated"
        ));

        let err = c.permissions("locked").await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Status { status: 500, ref message } if message == "quota exceeded"
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let c = client("http://127.0.0.1:9");
        let err = c.check_auth().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(!err.is_unauthorized());
    }
}
