//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the session needs from the outside world.
//! The `confgen-adapters` crate provides implementations.

use async_trait::async_trait;

use crate::application::ApplicationError;
use crate::domain::{RawValues, Snapshot, VariableSchema};

/// Result type shared by every port.
pub type PortResult<T> = Result<T, ApplicationError>;

/// Port for turning template text into a variable schema.
///
/// Implemented by:
/// - `confgen_adapters::schema::JinjaSchemaExtractor`
///
/// Fails with [`ApplicationError::SchemaParse`] when the text does not parse.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemaService: Send + Sync {
    async fn extract_schema(&self, template: &str) -> PortResult<VariableSchema>;
}

/// Port for rendering template text against a value snapshot.
///
/// Implemented by:
/// - `confgen_adapters::renderer::JinjaRenderer`
///
/// Fails with [`ApplicationError::Render`]. Never sees the live store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RenderService: Send + Sync {
    async fn render(&self, template: &str, snapshot: &Snapshot) -> PortResult<String>;
}

/// Port for named value sets, templates and rendered outputs.
///
/// Implemented by:
/// - `confgen_adapters::persistence::FsPersistence` (workspace directory)
/// - `confgen_adapters::persistence::MemoryPersistence` (testing)
///
/// Every failure is an [`ApplicationError::Persistence`]; a missing entry is
/// `NotFound`, never an empty result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PersistenceService: Send + Sync {
    async fn load_values(&self, name: &str) -> PortResult<RawValues>;

    async fn save_values(&self, name: &str, snapshot: &Snapshot) -> PortResult<()>;

    async fn load_template(&self, name: &str) -> PortResult<String>;

    async fn save_template(&self, name: &str, text: &str) -> PortResult<()>;

    /// Stored template names, sorted.
    async fn list_templates(&self) -> PortResult<Vec<String>>;

    /// Stored value-set names, sorted.
    async fn list_values(&self) -> PortResult<Vec<String>>;

    /// Write rendered text, replacing any previous content.
    async fn save_output(&self, name: &str, text: &str) -> PortResult<()>;

    /// Append rendered text after a newline separator.
    async fn append_output(&self, name: &str, text: &str) -> PortResult<()>;
}

/// Confirmation hook consulted before leaving a session with unsaved changes.
///
/// Closures `Fn() -> bool` implement it; so does a bare `bool`.
pub trait ExitGuard {
    /// Return `true` to discard the unsaved changes and exit.
    fn confirm_discard(&self) -> bool;
}

impl<F> ExitGuard for F
where
    F: Fn() -> bool,
{
    fn confirm_discard(&self) -> bool {
        self()
    }
}

impl ExitGuard for bool {
    fn confirm_discard(&self) -> bool {
        *self
    }
}
