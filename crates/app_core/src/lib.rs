//! DriveDesk Core Domain Logic
//!
//! This crate contains:
//! - Application state composition
//! - Folder navigation and selection
//! - Listing cache and mutations
//! - Sharing panel state
//! - Command system
//! - Configuration
//! - Error types

pub mod state;
pub mod config;
pub mod command;
pub mod error;
pub mod navigation;
pub mod selection;
pub mod listing;
pub mod mutation;
pub mod sharing;
pub mod session;
pub mod validation;

#[cfg(test)]
mod testing;

pub use state::AppState;
pub use config::{AppConfig, ApiConfig, FilerConfig, LogConfig, SharingConfig, SortBy, SortOrder};
pub use command::{Command, CommandId, CommandParams};
pub use error::{AppError, ErrorSink, LogSink};
pub use navigation::NavigationState;
pub use selection::SelectionState;
pub use listing::{format_size, sort_files, FetchTicket, Listing};
pub use mutation::MutationCoordinator;
pub use sharing::{BatchReport, BatchTarget, SharingController, SharingPhase, SharingState};
pub use session::Session;
pub use validation::{is_valid_name, validate_email, validate_name};
