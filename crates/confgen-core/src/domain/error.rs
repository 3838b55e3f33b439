//! Errors raised by the store, the reconciler and the merge resolver.

use thiserror::Error;

/// Every variant is raised *before* the live store is touched, so a caller
/// receiving one can assume the store is exactly as it was.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Caller errors (400-level equivalent)
    // ========================================================================
    #[error("Unknown variable '{name}'")]
    UnknownVariable { name: String },

    #[error("Index {index} out of range for list '{list}' (length {len})")]
    IndexOutOfRange {
        list: String,
        index: usize,
        len: usize,
    },

    #[error("List '{list}' has no field '{field}'")]
    UnknownField { list: String, field: String },

    #[error("Variable '{name}' is a {actual}, not a {expected}")]
    KindMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    // ========================================================================
    // Data errors (loaded value sets, schemas from adapters)
    // ========================================================================
    #[error("Malformed value for '{name}': {reason}")]
    MalformedValue { name: String, reason: String },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

impl DomainError {
    pub(crate) fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownVariable { name: name.into() }
    }

    pub(crate) fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedValue {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::UnknownVariable { name } => vec![
                format!("'{}' is not used by the current template", name),
                "Run `confgen vars <template>` to see the declared variables".into(),
            ],
            Self::IndexOutOfRange { list, len, .. } => vec![
                format!("'{}' currently has {} item(s)", list, len),
                format!("Valid indexes are 0..{}", len),
            ],
            Self::UnknownField { list, .. } => vec![
                format!("Fields of '{}' come from `{{{{ item.field }}}}` uses in its for-loop", list),
                "Run `confgen vars <template>` to list them".into(),
            ],
            Self::KindMismatch { expected, .. } if *expected == "list" => {
                vec!["Use `set` for scalar variables".into()]
            }
            Self::KindMismatch { .. } => vec!["Use `add`/`field` for list variables".into()],
            Self::MalformedValue { name, .. } => vec![
                format!("Check the value of '{}' in the loaded file", name),
                "Scalars must be plain values; lists must be sequences of mappings".into(),
            ],
            Self::InvalidSchema(_) => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownVariable { .. } | Self::UnknownField { .. } => ErrorCategory::NotFound,
            Self::IndexOutOfRange { .. } | Self::KindMismatch { .. } => ErrorCategory::Validation,
            Self::MalformedValue { .. } => ErrorCategory::Validation,
            Self::InvalidSchema(_) => ErrorCategory::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Internal,
}
