//! Render adapters.

mod jinja;

pub use jinja::JinjaRenderer;
