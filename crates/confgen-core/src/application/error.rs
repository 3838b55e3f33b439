//! Application layer errors.
//!
//! These errors come back from the ports (template parsing, rendering,
//! storage). They are transient: the session reports them and keeps its
//! state. Rule violations are `DomainError` from `crate::domain`.

use std::fmt;

use thiserror::Error;

use crate::error::ErrorCategory;

/// What went wrong in a storage call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceErrorKind {
    /// Nothing stored under that name.
    NotFound,
    /// The name cannot be used as a storage key.
    InvalidName,
    /// The stored content could not be decoded.
    Format,
    /// Underlying I/O failure.
    Io,
}

impl fmt::Display for PersistenceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "not found",
            Self::InvalidName => "invalid name",
            Self::Format => "bad format",
            Self::Io => "i/o error",
        })
    }
}

/// Errors raised by the ports during orchestration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApplicationError {
    /// Template text could not be parsed for variables.
    #[error("Template parse failed: {reason}")]
    SchemaParse { reason: String },

    /// Template rendering failed.
    #[error("Template rendering failed: {reason}")]
    Render { reason: String },

    /// Load or save failed.
    #[error("Storage error for '{name}' ({kind}): {reason}")]
    Persistence {
        name: String,
        kind: PersistenceErrorKind,
        reason: String,
    },

    /// Output was requested before any render succeeded.
    #[error("No rendered output to write yet")]
    NothingRendered,
}

impl ApplicationError {
    pub fn schema_parse(reason: impl Into<String>) -> Self {
        Self::SchemaParse {
            reason: reason.into(),
        }
    }

    pub fn render(reason: impl Into<String>) -> Self {
        Self::Render {
            reason: reason.into(),
        }
    }

    pub fn persistence(
        name: impl Into<String>,
        kind: PersistenceErrorKind,
        reason: impl Into<String>,
    ) -> Self {
        Self::Persistence {
            name: name.into(),
            kind,
            reason: reason.into(),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::persistence(name, PersistenceErrorKind::NotFound, "no such entry")
    }

    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::SchemaParse { .. } => vec![
                "Fix the template syntax; the previous variables are kept until then".into(),
            ],
            Self::Render { .. } => vec![
                "Check the template for undefined filters or bad expressions".into(),
                "The current values are unchanged; edit and try again".into(),
            ],
            Self::Persistence { kind, name, .. } => match kind {
                PersistenceErrorKind::NotFound => vec![
                    format!("Nothing is stored under '{}'", name),
                    "Try: confgen list templates / confgen list values".into(),
                ],
                PersistenceErrorKind::InvalidName => vec![
                    "Names must be plain file names: no '/', no '..', no leading '.'".into(),
                ],
                PersistenceErrorKind::Format => vec![
                    "Value files must be YAML mappings of name to value".into(),
                ],
                PersistenceErrorKind::Io => vec![
                    "Check that the workspace directory exists and is writable".into(),
                    "Run `confgen config get workspace.root` to see where it points".into(),
                ],
            },
            Self::NothingRendered => vec![
                "Wait for the render to finish, or run `render` first".into(),
                "A failing template never produces output; fix the render error".into(),
            ],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SchemaParse { .. } => ErrorCategory::Validation,
            Self::Render { .. } | Self::NothingRendered => ErrorCategory::Validation,
            Self::Persistence { kind, .. } => match kind {
                PersistenceErrorKind::NotFound => ErrorCategory::NotFound,
                PersistenceErrorKind::InvalidName | PersistenceErrorKind::Format => {
                    ErrorCategory::Validation
                }
                PersistenceErrorKind::Io => ErrorCategory::Internal,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Persistence {
                kind: PersistenceErrorKind::NotFound,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_rendered_is_its_own_user_error() {
        let err = ApplicationError::NothingRendered;
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.to_string(), "No rendered output to write yet");
        assert!(!err.is_not_found());
        assert!(err.suggestions().iter().any(|s| s.contains("render")));
    }
}
