//! The error type every public core operation returns.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfgenError {
    /// The call broke a store rule; nothing was changed.
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// A port failed; the store and schema are as they were.
    #[error("{0}")]
    Application(#[from] ApplicationError),
}

pub type ConfgenResult<T> = Result<T, ConfgenError>;

/// Coarse classification for front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Internal,
}

impl ConfgenError {
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::NotFound => ErrorCategory::NotFound,
                crate::domain::ErrorCategory::Internal => ErrorCategory::Internal,
            },
            Self::Application(e) => e.category(),
        }
    }

    /// Port failures are transient: the same call may succeed after the
    /// template or the workspace is fixed. Rule violations never do.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Application(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::PersistenceErrorKind;

    #[test]
    fn transient_errors_are_retryable() {
        let err: ConfgenError = ApplicationError::render("boom").into();
        assert!(err.is_retryable());

        let err: ConfgenError = DomainError::UnknownVariable { name: "x".into() }.into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn categories_follow_the_inner_error() {
        let err: ConfgenError = ApplicationError::not_found("site.yaml").into();
        assert_eq!(err.category(), ErrorCategory::NotFound);

        let err: ConfgenError =
            ApplicationError::persistence("../x", PersistenceErrorKind::InvalidName, "bad").into();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(!err.suggestions().is_empty());

        let err: ConfgenError = DomainError::InvalidSchema("blank name".into()).into();
        assert_eq!(err.category(), ErrorCategory::Internal);
    }

    #[test]
    fn display_is_the_inner_message() {
        let err: ConfgenError = DomainError::UnknownVariable { name: "mtu".into() }.into();
        assert_eq!(err.to_string(), "Unknown variable 'mtu'");
    }
}
