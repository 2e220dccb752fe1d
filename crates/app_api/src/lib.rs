//! DriveDesk Backend Access Layer
//!
//! Provides the client side of the backend REST API, including:
//! - DriveApi: one async operation per REST endpoint
//! - HttpDriveClient: reqwest implementation with a cookie-backed session
//! - LinkHandler: browser and clipboard integration for Drive links

mod client;
mod desktop;

pub use client::{ClientOptions, DriveApi, HttpDriveClient};
pub use desktop::{DesktopLinks, LinkError, LinkHandler};

use thiserror::Error;

/// Backend access errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status of the failed request, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Did the backend reject the session?
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
