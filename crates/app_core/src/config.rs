//! Application configuration

use app_api::ClientOptions;
use directories::ProjectDirs;
use drive_proto::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding `api.base_url`
pub const ENV_API_URL: &str = "DRIVE_DESK_API_URL";

/// Environment variable overriding `api.session_cookie`
pub const ENV_SESSION: &str = "DRIVE_DESK_SESSION";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub filer: FilerConfig,
    pub sharing: SharingConfig,
    pub log: LogConfig,
    /// Shell word -> command id
    pub aliases: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            filer: FilerConfig::default(),
            sharing: SharingConfig::default(),
            log: LogConfig::default(),
            aliases: default_aliases(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend root, e.g. "http://localhost:8000"
    pub base_url: String,
    /// `name=value` session cookie copied from a browser login
    pub session_cookie: Option<String>,
    /// Path opened in the browser by `login`
    pub login_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            session_cookie: None,
            login_path: "login".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilerConfig {
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub folders_first: bool,
    /// chrono format string for the modified column
    pub date_format: String,
}

impl Default for FilerConfig {
    fn default() -> Self {
        Self {
            sort_by: SortBy::Name,
            sort_order: SortOrder::Ascending,
            folders_first: true,
            date_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharingConfig {
    /// Role given to invitees unless changed in the share panel
    pub default_invite_role: Role,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            default_invite_role: Role::Viewer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when RUST_LOG is unset
    pub level: String,
    /// Days of log files to keep
    pub retention_days: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            retention_days: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortBy {
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "size")]
    Size,
    #[serde(rename = "modified")]
    Modified,
    #[serde(rename = "type")]
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl AppConfig {
    /// Load configuration from the default location, then apply env overrides
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::info!("Configuration loaded from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        tracing::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "DriveDesk", "DriveDesk")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_API_URL).ok(),
            std::env::var(ENV_SESSION).ok(),
        );
    }

    fn apply_overrides(&mut self, api_url: Option<String>, session: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            tracing::debug!("Backend URL overridden by {}", ENV_API_URL);
            self.api.base_url = url.trim().to_string();
        }
        if let Some(cookie) = session.filter(|c| !c.trim().is_empty()) {
            self.api.session_cookie = Some(cookie.trim().to_string());
        }
    }

    /// Connection options for the HTTP client
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.api.base_url.clone(),
            session_cookie: self.api.session_cookie.clone(),
            ..ClientOptions::default()
        }
    }

    /// Absolute URL of the browser login page
    pub fn login_url(&self) -> String {
        format!(
            "{}/{}",
            self.api.base_url.trim_end_matches('/'),
            self.api.login_path.trim_start_matches('/')
        )
    }
}

fn default_aliases() -> HashMap<String, String> {
    let mut al = HashMap::new();

    // ========================================
    // Navigation (nav.*)
    // ========================================

    al.insert("cd".into(), "nav.enter".into());
    al.insert("open".into(), "nav.enter".into());
    al.insert("back".into(), "nav.back".into());
    al.insert("..".into(), "nav.back".into());
    al.insert("crumb".into(), "nav.crumb".into());
    al.insert("home".into(), "nav.root".into());
    al.insert("pwd".into(), "nav.breadcrumbs".into());

    // ========================================
    // View (view.*)
    // ========================================

    al.insert("ls".into(), "view.refresh".into());
    al.insert("refresh".into(), "view.refresh".into());
    al.insert("sort".into(), "view.sort".into());

    // ========================================
    // Selection (select.*)
    // ========================================

    al.insert("menu".into(), "select.menu".into());
    al.insert("sel".into(), "select.toggle".into());
    al.insert("clear".into(), "select.clear".into());

    // ========================================
    // File (file.*)
    // ========================================

    al.insert("mv".into(), "file.move_to".into());
    al.insert("rm".into(), "file.delete".into());
    al.insert("cp".into(), "file.copy".into());
    al.insert("rename".into(), "file.rename".into());
    al.insert("link".into(), "file.copy_link".into());
    al.insert("mkdir".into(), "file.create_folder".into());
    al.insert("upload".into(), "file.upload".into());

    // ========================================
    // Sharing (share.*)
    // ========================================

    al.insert("share".into(), "share.open".into());
    al.insert("unshare".into(), "share.close".into());
    al.insert("invite".into(), "share.add_email".into());
    al.insert("uninvite".into(), "share.remove_email".into());
    al.insert("as".into(), "share.invite_role".into());
    al.insert("send".into(), "share.send".into());
    al.insert("perm".into(), "share.set_role".into());
    al.insert("revoke".into(), "share.remove_access".into());
    al.insert("access".into(), "share.general_access".into());

    // ========================================
    // App (app.*)
    // ========================================

    al.insert("whoami".into(), "app.whoami".into());
    al.insert("login".into(), "app.login".into());
    al.insert("logout".into(), "app.logout".into());
    al.insert("help".into(), "app.help".into());
    al.insert("?".into(), "app.help".into());
    al.insert("quit".into(), "app.quit".into());
    al.insert("exit".into(), "app.quit".into());

    al
}
