//! Storage name checks shared by the persistence adapters.

use confgen_core::application::{ApplicationError, PersistenceErrorKind, PortResult};

/// A name must be a single plain file name inside its directory.
pub(crate) fn validate_name(name: &str) -> PortResult<()> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name.contains(['/', '\\']) {
        Some("name contains a path separator")
    } else if name.contains("..") {
        Some("name contains '..'")
    } else if name.starts_with('.') {
        Some("hidden names are not allowed")
    } else if name.chars().any(char::is_control) {
        Some("name contains control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ApplicationError::persistence(
            name,
            PersistenceErrorKind::InvalidName,
            reason,
        )),
        None => Ok(()),
    }
}
