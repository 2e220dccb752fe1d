//! Application error types

use app_api::{ApiError, LinkError};
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Validation (caught before any network call) =====
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Selection error: {0}")]
    Selection(String),

    #[error("Not permitted: {0}")]
    NotPermitted(String),

    #[error("Unknown command: {0}")]
    Command(String),

    #[error("Usage: {0}")]
    Usage(String),

    // ===== Remote (operation failed, local state reset) =====
    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("Failed to open file: {0}")]
    OpenFile(String),

    #[error("{0}")]
    Link(#[from] LinkError),

    #[error("{failed} of {total} requests failed (first error: {first})")]
    PartialBatch {
        failed: usize,
        total: usize,
        first: String,
    },

    // ===== Local environment =====
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Was this rejected locally, without contacting the backend?
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::InvalidName(_)
                | AppError::InvalidEmail(_)
                | AppError::Selection(_)
                | AppError::NotPermitted(_)
                | AppError::Command(_)
                | AppError::Usage(_)
        )
    }

    /// Should the user sign in again?
    pub fn needs_login(&self) -> bool {
        matches!(self, AppError::Api(e) if e.is_unauthorized())
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(ApiError::Transport(_)) => {
                "Cannot reach the Drive backend. Check your connection and try again.".to_string()
            }
            AppError::Api(e) if e.is_unauthorized() => {
                "Your session has expired. Run `login` to sign in again.".to_string()
            }
            AppError::Api(ApiError::Status { message, .. }) => message.clone(),
            AppError::OpenFile(_) => "Failed to open file".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Destination for errors that must reach the user.
///
/// Every failing operation reports here once, in addition to returning
/// the error to its caller.
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &AppError);
}

/// Sink that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, error: &AppError) {
        if error.is_validation() {
            tracing::info!("{}", error);
        } else {
            tracing::warn!("{}", error);
        }
    }
}
