//! `confgen import`: copy an outside file into the workspace.

use confgen_adapters::EntryKind;
use confgen_core::prelude::ConfgenError;
use tracing::instrument;

use crate::{
    cli::{GlobalArgs, ImportArgs, ImportKind},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[instrument(skip_all, fields(file = %args.file.display()))]
pub async fn execute(
    args: ImportArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let store = super::workspace(&global, &config);
    store.init().await.map_err(ConfgenError::from)?;

    let kind = match args.kind {
        ImportKind::Template => EntryKind::Template,
        ImportKind::Values => EntryKind::Values,
    };
    let name = store
        .import(kind, &args.file)
        .await
        .map_err(ConfgenError::from)?;

    output.success(&format!(
        "Imported '{}' into {}",
        name,
        store.dir(kind).display()
    ))?;
    Ok(())
}
