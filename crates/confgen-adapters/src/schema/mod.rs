//! Schema extraction adapters.

mod jinja;

pub use jinja::JinjaSchemaExtractor;
