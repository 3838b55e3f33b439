//! Infrastructure adapters for confgen.
//!
//! This crate implements the ports defined in `confgen_core::application::ports`.
//! It contains all external dependencies and I/O operations:
//!
//! - [`JinjaSchemaExtractor`]: variables from template text (minijinja + regex)
//! - [`JinjaRenderer`]: template rendering (minijinja)
//! - [`FsPersistence`]: workspace directory with YAML value sets
//! - [`MemoryPersistence`]: in-memory storage for tests

mod names;
pub mod persistence;
pub mod renderer;
pub mod schema;

// Re-export commonly used adapters
pub use persistence::{EntryKind, FsPersistence, MemoryPersistence};
pub use renderer::JinjaRenderer;
pub use schema::JinjaSchemaExtractor;
