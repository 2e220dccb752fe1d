//! Client-side checks run before any request is sent

use crate::AppError;

/// Characters that would be read as path separators
const PATH_SEPARATORS: &[char] = &['/', '\\'];

/// Validate a file or folder name, returning it trimmed
pub fn validate_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(AppError::InvalidName("Name cannot be empty".to_string()));
    }

    if trimmed.contains(PATH_SEPARATORS) {
        return Err(AppError::InvalidName(format!(
            "'{}' contains a path separator (/ or \\)",
            trimmed
        )));
    }

    if trimmed.chars().any(char::is_control) {
        return Err(AppError::InvalidName(
            "Name cannot contain control characters".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

/// Check if a name would pass [`validate_name`]
pub fn is_valid_name(name: &str) -> bool {
    validate_name(name).is_ok()
}

/// Validate an invitee address, returning it trimmed and lowercased.
///
/// Only the shape is checked; the backend decides whether the account exists.
pub fn validate_email(email: &str) -> Result<String, AppError> {
    let trimmed = email.trim();
    let invalid = || AppError::InvalidEmail(trimmed.to_string());

    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = trimmed.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }

    Ok(trimmed.to_lowercase())
}
