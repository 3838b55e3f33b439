//! Jinja rendering with minijinja.

use async_trait::async_trait;
use confgen_core::{
    application::{ApplicationError, PortResult, RenderService},
    domain::Snapshot,
};
use minijinja::{Environment, UndefinedBehavior, Value};
use tracing::instrument;

/// Renderer using minijinja.
///
/// Undefined names render as empty by default, like stock Jinja. Strict mode
/// turns them into render errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct JinjaRenderer {
    strict: bool,
}

impl JinjaRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { strict: true }
    }

    /// Render synchronously.
    pub fn render_text(&self, template: &str, snapshot: &Snapshot) -> PortResult<String> {
        let mut env = Environment::new();
        if self.strict {
            env.set_undefined_behavior(UndefinedBehavior::Strict);
        }
        let tmpl = env
            .template_from_str(template)
            .map_err(|e| ApplicationError::render(e.to_string()))?;
        tmpl.render(Value::from_serialize(snapshot))
            .map_err(|e| ApplicationError::render(e.to_string()))
    }
}

#[async_trait]
impl RenderService for JinjaRenderer {
    #[instrument(skip_all, fields(len = template.len(), names = snapshot.len()))]
    async fn render(&self, template: &str, snapshot: &Snapshot) -> PortResult<String> {
        self.render_text(template, snapshot)
    }
}
