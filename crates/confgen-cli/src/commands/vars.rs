//! `confgen vars`: show the variables a template declares.

use confgen_adapters::JinjaSchemaExtractor;
use confgen_core::prelude::{PersistenceService, VariableSchema};
use tracing::instrument;

use crate::{
    cli::{GlobalArgs, ListFormat, OutputFormat, VarsArgs},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

#[instrument(skip_all, fields(template = %args.template))]
pub async fn execute(
    args: VarsArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let store = super::workspace(&global, &config);
    let text = store
        .load_template(&args.template)
        .await
        .map_err(|e| CliError::Core(e.into()))?;
    let schema = JinjaSchemaExtractor::new()
        .extract(&text)
        .map_err(|e| CliError::Core(e.into()))?;

    let format = if output.format() == OutputFormat::Json {
        ListFormat::Json
    } else {
        args.format
    };

    match format {
        ListFormat::Json => output.json(&schema)?,
        ListFormat::List => {
            for line in name_lines(&schema) {
                output.payload(&line)?;
            }
        }
        ListFormat::Table => {
            if schema.is_empty() {
                output.info("Template declares no variables")?;
                return Ok(());
            }
            output.header(&format!("Variables of {}:", args.template))?;
            for line in table_lines(&schema) {
                output.print(&line)?;
            }
        }
    }

    Ok(())
}

/// `name` for scalars, `list.field` for list fields.
fn name_lines(schema: &VariableSchema) -> Vec<String> {
    let mut lines: Vec<String> = schema.scalars().to_vec();
    for (list, fields) in schema.lists() {
        if fields.is_empty() {
            lines.push(list.clone());
        }
        lines.extend(fields.iter().map(|f| format!("{list}.{f}")));
    }
    lines
}

pub(crate) fn table_lines(schema: &VariableSchema) -> Vec<String> {
    let width = schema.names().iter().map(|n| n.len()).max().unwrap_or(0);
    let mut lines = Vec::new();
    for name in schema.scalars() {
        lines.push(format!("  {name:<width$}  scalar"));
    }
    for (list, fields) in schema.lists() {
        lines.push(format!("  {list:<width$}  list [{}]", fields.join(", ")));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> VariableSchema {
        VariableSchema::new(
            ["hostname", "mtu"],
            [("vlans".to_string(), vec!["id", "name"])],
        )
    }

    #[test]
    fn table_aligns_names() {
        assert_eq!(
            table_lines(&schema()),
            [
                "  hostname  scalar",
                "  mtu       scalar",
                "  vlans     list [id, name]",
            ]
        );
    }

    #[test]
    fn name_lines_flatten_list_fields() {
        assert_eq!(
            name_lines(&schema()),
            ["hostname", "mtu", "vlans.id", "vlans.name"]
        );
    }
}
