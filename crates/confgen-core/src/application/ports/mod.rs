//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `confgen-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by the session, implemented by infrastructure
//!   - `SchemaService`: variable extraction from template text
//!   - `RenderService`: template rendering
//!   - `PersistenceService`: value sets, templates, rendered outputs
//!
//! - **Decision hooks**: synchronous callbacks standing in for prompts
//!   - `ExitGuard` here, `MergeChoiceProvider`/`ItemCountProvider` in the domain

pub mod output;

pub use output::{ExitGuard, PersistenceService, PortResult, RenderService, SchemaService};

#[cfg(test)]
pub use output::{MockPersistenceService, MockRenderService, MockSchemaService};
