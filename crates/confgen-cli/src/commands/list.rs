//! `confgen list`: stored templates or value sets.

use confgen_adapters::EntryKind;
use confgen_core::prelude::{ConfgenError, PersistenceService};

use crate::{
    cli::{GlobalArgs, ListArgs, ListFormat, ListTarget, OutputFormat},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub async fn execute(
    args: ListArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let store = super::workspace(&global, &config);
    let (kind, names) = match args.what {
        ListTarget::Templates => (EntryKind::Template, store.list_templates().await),
        ListTarget::Values => (EntryKind::Values, store.list_values().await),
    };
    let names = names.map_err(ConfgenError::from)?;

    let format = if output.format() == OutputFormat::Json {
        ListFormat::Json
    } else {
        args.format
    };

    match format {
        ListFormat::Json => output.json(&names)?,
        ListFormat::List => {
            for name in &names {
                output.payload(name)?;
            }
        }
        ListFormat::Table => {
            let dir = store.dir(kind);
            if names.is_empty() {
                output.info(&format!("Nothing stored in {}", dir.display()))?;
                return Ok(());
            }
            output.header(&format!("{} ({}):", title(args.what), dir.display()))?;
            for name in &names {
                output.print(&format!("  {name}"))?;
            }
        }
    }

    Ok(())
}

fn title(what: ListTarget) -> &'static str {
    match what {
        ListTarget::Templates => "Templates",
        ListTarget::Values => "Value sets",
    }
}
