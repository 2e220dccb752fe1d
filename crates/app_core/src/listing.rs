//! Cached folder listing with stale-response detection
//!
//! Every fetch takes a ticket with a sequence number. A response is only
//! applied if no newer fetch has already landed, so two racing refetches
//! (e.g. a rename and a delete fired back to back) cannot leave an older
//! listing on screen.

use crate::config::{SortBy, SortOrder};
use drive_proto::FileNode;
use std::cmp::Ordering;

/// Handle for one in-flight listing fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    folder_id: String,
}

impl FetchTicket {
    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Client-held copy of one folder's contents
#[derive(Debug, Default)]
pub struct Listing {
    folder_id: Option<String>,
    files: Vec<FileNode>,
    issued: u64,
    applied: u64,
    in_flight: usize,
    last_error: Option<String>,
}

impl Listing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folder the cached files belong to
    pub fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref()
    }

    pub fn files(&self) -> &[FileNode] {
        &self.files
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Register a fetch for `folder_id`
    pub fn begin(&mut self, folder_id: &str) -> FetchTicket {
        self.issued += 1;
        self.in_flight += 1;
        FetchTicket {
            seq: self.issued,
            folder_id: folder_id.to_string(),
        }
    }

    /// Apply a fetched listing. Returns false if a newer fetch already landed.
    pub fn complete(&mut self, ticket: FetchTicket, files: Vec<FileNode>) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);

        if ticket.seq <= self.applied {
            tracing::debug!(
                "Dropping stale listing #{} for {} (#{} already applied)",
                ticket.seq,
                ticket.folder_id,
                self.applied
            );
            return false;
        }

        self.applied = ticket.seq;
        self.folder_id = Some(ticket.folder_id);
        self.files = files;
        self.last_error = None;
        true
    }

    /// Drop a response for a folder that is no longer shown
    pub fn discard(&mut self, ticket: FetchTicket) {
        self.in_flight = self.in_flight.saturating_sub(1);
        tracing::debug!(
            "Discarding listing #{} for {}: folder no longer shown",
            ticket.seq,
            ticket.folder_id
        );
    }

    /// Forget the cached folder. Fetches already in flight stay stale.
    pub fn clear(&mut self) {
        self.applied = self.issued;
        self.folder_id = None;
        self.files.clear();
        self.last_error = None;
    }

    /// Record a failed fetch. The cached files stay as they were.
    pub fn fail(&mut self, ticket: FetchTicket, message: &str) {
        self.in_flight = self.in_flight.saturating_sub(1);

        if ticket.seq > self.applied {
            self.last_error = Some(message.to_string());
        }
    }

    /// Look up an item by 1-based display position, exact name, or id
    pub fn find(&self, key: &str) -> Option<&FileNode> {
        if let Ok(pos) = key.parse::<usize>() {
            if let Some(file) = pos.checked_sub(1).and_then(|i| self.files.get(i)) {
                return Some(file);
            }
        }

        self.files
            .iter()
            .find(|f| f.name == key)
            .or_else(|| self.files.iter().find(|f| f.id == key))
    }

    /// Reorder the cache for display
    pub fn sort(&mut self, by: SortBy, order: SortOrder, folders_first: bool) {
        sort_files(&mut self.files, by, order, folders_first);
    }
}

/// Sort files in place; folders optionally grouped ahead of files
pub fn sort_files(files: &mut [FileNode], by: SortBy, order: SortOrder, folders_first: bool) {
    files.sort_by(|a, b| {
        if folders_first {
            match (a.is_folder(), b.is_folder()) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
        }

        let ord = match by {
            SortBy::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortBy::Size => a.size.cmp(&b.size),
            SortBy::Modified => a.modified_time.cmp(&b.modified_time),
            SortBy::Type => a.mime_type.cmp(&b.mime_type),
        };

        match order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    });
}

/// Format file size for display
pub fn format_size(size: Option<u64>) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    let Some(bytes) = size else {
        return "N/A".to_string();
    };

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
