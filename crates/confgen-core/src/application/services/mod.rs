//! Application services - orchestrate use cases.
//!
//! The editor session coordinates the domain layer and the ports to keep
//! values, schema and rendered output in step.

pub mod session_service;

pub use session_service::{EditorSession, SessionEvent, SessionPorts, SessionSettings};
