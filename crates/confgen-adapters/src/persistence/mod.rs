//! Persistence adapters.

mod local;
mod memory;

pub use local::{EntryKind, FsPersistence, OUTPUT_DIR, TEMPLATES_DIR, VALUES_DIR};
pub use memory::MemoryPersistence;
