//! Desktop integration for Drive links
//! Opens web view links in the browser and places share links on the clipboard

use thiserror::Error;

/// Desktop integration errors
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Failed to open {url}: {reason}")]
    Open { url: String, reason: String },

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Link handling seam between the core and the desktop
pub trait LinkHandler: Send + Sync {
    /// Open a URL with the system browser
    fn open_url(&self, url: &str) -> Result<(), LinkError>;

    /// Replace the clipboard contents with text
    fn copy_to_clipboard(&self, text: &str) -> Result<(), LinkError>;
}

/// Default implementation backed by the system browser and clipboard
pub struct DesktopLinks {
    #[cfg(feature = "clipboard")]
    clipboard: parking_lot::Mutex<Option<arboard::Clipboard>>,
}

impl DesktopLinks {
    pub fn new() -> Self {
        Self {
            // Headless sessions have no clipboard; report that on use, not here
            #[cfg(feature = "clipboard")]
            clipboard: parking_lot::Mutex::new(arboard::Clipboard::new().ok()),
        }
    }
}

impl Default for DesktopLinks {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkHandler for DesktopLinks {
    #[cfg(feature = "open-external")]
    fn open_url(&self, url: &str) -> Result<(), LinkError> {
        open::that(url).map_err(|e| LinkError::Open {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!("Opened in browser: {}", url);
        Ok(())
    }

    #[cfg(not(feature = "open-external"))]
    fn open_url(&self, url: &str) -> Result<(), LinkError> {
        Err(LinkError::Unsupported(format!(
            "open-external feature not enabled ({})",
            url
        )))
    }

    #[cfg(feature = "clipboard")]
    fn copy_to_clipboard(&self, text: &str) -> Result<(), LinkError> {
        let mut guard = self.clipboard.lock();
        let clipboard = guard
            .as_mut()
            .ok_or_else(|| LinkError::Clipboard("Clipboard not available".to_string()))?;

        clipboard
            .set_text(text)
            .map_err(|e| LinkError::Clipboard(e.to_string()))?;

        tracing::debug!("Copied {} bytes to clipboard", text.len());
        Ok(())
    }

    #[cfg(not(feature = "clipboard"))]
    fn copy_to_clipboard(&self, _text: &str) -> Result<(), LinkError> {
        Err(LinkError::Unsupported(
            "Clipboard feature not enabled".to_string(),
        ))
    }
}
