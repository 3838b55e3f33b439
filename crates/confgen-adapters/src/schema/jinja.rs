//! Variable extraction from Jinja template text.
//!
//! minijinja parses the text (syntax errors surface here) and reports the
//! undeclared names. Names the environment already provides (`range`,
//! `dict`, `namespace`, ...) are not variables. List variables are the
//! iterables of simple `{% for item in list %}` loops; their fields are the
//! `item.field` attributes used anywhere inside `{{ ... }}` or `{% ... %}`
//! tags. Everything else undeclared is a scalar, in order of first
//! appearance in the text.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

use async_trait::async_trait;
use confgen_core::{
    application::{ApplicationError, PortResult, SchemaService},
    domain::VariableSchema,
};
use minijinja::Environment;
use regex::Regex;
use tracing::{debug, instrument};

static FOR_LOOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{%-?\s*for\s+(\w+)\s+in\s+(\w+)\s*-?%\}").expect("for-loop pattern is valid")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{.*?\}\}|\{%.*?%\}").expect("tag pattern is valid")
});

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("identifier pattern is valid"));

/// Schema extractor backed by minijinja.
#[derive(Debug, Clone, Copy, Default)]
pub struct JinjaSchemaExtractor;

impl JinjaSchemaExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous extraction, shared by the port and the CLI `vars` command.
    pub fn extract(&self, template: &str) -> PortResult<VariableSchema> {
        let env = Environment::new();
        let parsed = env
            .template_from_str(template)
            .map_err(|e| ApplicationError::schema_parse(e.to_string()))?;
        let undeclared: HashSet<String> = parsed
            .undeclared_variables(false)
            .into_iter()
            .filter(|name| !env.globals().any(|(global, _)| global == name.as_str()))
            .collect();

        let lists = list_variables(template);

        let mut seen = BTreeSet::new();
        let scalars: Vec<&str> = IDENTIFIER
            .find_iter(template)
            .map(|m| m.as_str())
            .filter(|t| undeclared.contains(*t) && !lists.contains_key(*t) && seen.insert(*t))
            .collect();

        debug!(
            scalars = scalars.len(),
            lists = lists.len(),
            "Extracted template variables"
        );
        Ok(VariableSchema::new(scalars, lists))
    }
}

/// `list name -> sorted unique fields` for every simple for-loop.
fn list_variables(template: &str) -> BTreeMap<String, Vec<String>> {
    let mut lists: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let tags: Vec<&str> = TAG.find_iter(template).map(|m| m.as_str()).collect();
    for caps in FOR_LOOP.captures_iter(template) {
        let (item, list) = (&caps[1], &caps[2]);
        let fields = lists.entry(list.to_string()).or_default();
        // `item.field` not preceded by another name or a dot
        let attr = format!(r"(?:^|[^\w.]){}\.(\w+)", regex::escape(item));
        let Ok(attr) = Regex::new(&attr) else {
            continue;
        };
        for tag in &tags {
            fields.extend(attr.captures_iter(tag).map(|c| c[1].to_string()));
        }
    }
    lists
        .into_iter()
        .map(|(name, fields)| (name, fields.into_iter().collect()))
        .collect()
}

#[async_trait]
impl SchemaService for JinjaSchemaExtractor {
    #[instrument(skip_all, fields(len = template.len()))]
    async fn extract_schema(&self, template: &str) -> PortResult<VariableSchema> {
        self.extract(template)
    }
}
