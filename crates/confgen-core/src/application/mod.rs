//! Application layer for confgen.
//!
//! This layer contains:
//! - **Services**: the editor session orchestrating one editing workflow
//! - **Scheduler**: dirty-state tracking and render debouncing
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: port failures
//!
//! The application layer coordinates the domain layer but contains no
//! variable rules itself. Those live in `crate::domain`.

pub mod error;
pub mod ports;
pub mod scheduler;
pub mod services;

// Re-export main services
pub use services::{EditorSession, SessionEvent, SessionPorts, SessionSettings};

pub use scheduler::{Completion, DirtyScheduler, RenderTicket, SyncState, DEFAULT_DEBOUNCE};

// Re-export port traits (for adapter implementation)
pub use ports::{ExitGuard, PersistenceService, PortResult, RenderService, SchemaService};

pub use error::{ApplicationError, PersistenceErrorKind};
