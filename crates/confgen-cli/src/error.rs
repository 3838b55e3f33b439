//! CLI errors: what the user sees and which exit code the process returns.
//!
//! | Category      | Exit code |
//! |---------------|-----------|
//! | Internal      | 1         |
//! | User error    | 2         |
//! | Not found     | 3         |
//! | Configuration | 4         |
//!
//! Argument errors are reported by clap and also exit with 2.

use std::error::Error;
use std::fmt::Write as _;

use owo_colors::OwoColorize;
use thiserror::Error;

use confgen_core::error::ConfgenError;

pub use confgen_core::error::ErrorCategory as CoreCategory;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// A configuration file could not be read, parsed, or written.
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },

    /// Raised by the session, the domain rules, or an adapter.
    #[error(transparent)]
    Core(#[from] ConfgenError),

    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::IoError {
            message: err.to_string(),
            source: err,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    UserError,
    NotFound,
    Configuration,
    Internal,
}

impl CliError {
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ConfigError { .. } => vec![
                format!(
                    "Check the config file ({})",
                    crate::config::AppConfig::config_path().display()
                ),
                "Run `confgen config path` to see which file is read".into(),
                "Run `confgen init --force` to write a fresh default".into(),
            ],
            Self::Core(core) => {
                let mut suggestions = core.suggestions();
                if core.category() == CoreCategory::NotFound {
                    suggestions
                        .push("List what the workspace holds: confgen list templates|values".into());
                }
                suggestions
            }
            Self::IoError { .. } => vec![
                "Check permissions on the workspace directory".into(),
                "Pass --workspace to point at another directory".into(),
            ],
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. } => ErrorCategory::Configuration,
            Self::Core(core) => match core.category() {
                CoreCategory::Validation => ErrorCategory::UserError,
                CoreCategory::NotFound => ErrorCategory::NotFound,
                CoreCategory::Internal => ErrorCategory::Internal,
            },
            Self::IoError { .. } => ErrorCategory::Internal,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self.category() {
            ErrorCategory::Internal => 1,
            ErrorCategory::UserError => 2,
            ErrorCategory::NotFound => 3,
            ErrorCategory::Configuration => 4,
        }
    }

    /// Multi-line report for stderr: the message, the cause chain when
    /// `verbose`, then suggestions.
    pub fn report(&self, verbose: bool, color: bool) -> String {
        let paint = |text: &str, style: owo_colors::Style| {
            if color {
                text.style(style).to_string()
            } else {
                text.to_string()
            }
        };
        let red = owo_colors::Style::new().red().bold();
        let dim = owo_colors::Style::new().dimmed();
        let yellow = owo_colors::Style::new().yellow().bold();

        let mut out = String::new();
        let _ = writeln!(out, "\n{} {self}", paint("Error:", red));

        if verbose {
            let mut source = self.source();
            while let Some(err) = source {
                let _ = writeln!(out, "  {}", paint(&format!("caused by: {err}"), dim));
                source = err.source();
            }
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            let _ = writeln!(out, "\n{}", paint("Suggestions:", yellow));
            for suggestion in suggestions {
                let _ = writeln!(out, "  {suggestion}");
            }
        }

        if !verbose {
            let _ = writeln!(out, "\n{}", paint("Use -v / --verbose for more details.", dim));
        }
        out
    }

    pub fn log(&self) {
        match self.category() {
            ErrorCategory::UserError | ErrorCategory::NotFound => {
                tracing::warn!(exit_code = self.exit_code(), "{self}")
            }
            ErrorCategory::Configuration | ErrorCategory::Internal => {
                tracing::error!(exit_code = self.exit_code(), "{self}")
            }
        }
        if let Some(source) = self.source() {
            tracing::debug!("caused by: {source}");
        }
    }
}

/// Attach a context message to an I/O failure.
pub trait IntoCli<T> {
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IntoCli<T> for Result<T, std::io::Error> {
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| CliError::IoError {
            message: f().into(),
            source: e,
        })
    }
}
