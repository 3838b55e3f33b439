//! Variable-state engine behind confgen.
//!
//! Keeps a store of variable values consistent with a schema that changes
//! whenever the template text changes, merges loaded value sets into it under
//! an explicit policy, and debounces re-renders so stale output never wins.
//!
//! - [`domain`]: synchronous rules. [`VariableStore`](domain::VariableStore),
//!   [`Reconciler`](domain::Reconciler), [`MergeResolver`](domain::MergeResolver).
//! - [`application`]: the ports the engine consumes and
//!   [`EditorSession`](application::EditorSession), which drives them with a
//!   [`DirtyScheduler`](application::DirtyScheduler).
//!
//! Template parsing, rendering and storage live behind the ports; see
//! `confgen-adapters` for the minijinja and filesystem implementations.
//!
//! ```rust,ignore
//! use confgen_core::prelude::*;
//!
//! let mut session = EditorSession::new(ports, SessionSettings::default());
//! session.set_template_text("hostname {{ host }}").await?;
//! session.set_scalar("host", "db01")?;
//! session.flush();
//! session.settle().await;
//! assert_eq!(session.rendered_output(), Some("hostname db01"));
//! ```

pub mod application;
pub mod domain;
pub mod error;

pub mod prelude {
    pub use crate::application::{
        ApplicationError, DirtyScheduler, EditorSession, ExitGuard, PersistenceErrorKind,
        PersistenceService, PortResult, RenderService, SchemaService, SessionEvent, SessionPorts,
        SessionSettings, SyncState,
    };
    pub use crate::domain::{
        DomainError, ItemCountPolicy, ItemCountProvider, ListItem, MergeChoice,
        MergeChoiceProvider, MergeOutcome, MergeRequest, MergeResolver, RawValues, Reconciler,
        Snapshot, VariableKind, VariableSchema, VariableStore, VariableValue,
    };
    pub use crate::error::{ConfgenError, ConfgenResult, ErrorCategory};
}

