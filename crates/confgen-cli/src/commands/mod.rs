//! Command handlers.
//!
//! Each handler translates parsed arguments into calls on the core session
//! or the workspace adapters and reports results. No business logic lives
//! here.

use std::{path::PathBuf, sync::Arc};

use confgen_adapters::{FsPersistence, JinjaRenderer, JinjaSchemaExtractor};
use confgen_core::prelude::{
    ConfgenResult, DomainError, EditorSession, MergeChoice, MergeChoiceProvider, MergeOutcome,
    SessionPorts,
};

use crate::{
    cli::{Assignment, GlobalArgs, MergePolicy},
    config::AppConfig,
    output::OutputManager,
    prompt,
};

pub mod completions;
pub mod config;
pub mod edit;
pub mod import;
pub mod init;
pub mod list;
pub mod render;
pub mod vars;

/// Workspace directory: `--workspace` wins over `workspace.root`.
pub(crate) fn workspace_root(global: &GlobalArgs, config: &AppConfig) -> PathBuf {
    global
        .workspace
        .clone()
        .unwrap_or_else(|| config.workspace.root.clone())
}

pub(crate) fn workspace(global: &GlobalArgs, config: &AppConfig) -> FsPersistence {
    FsPersistence::new(workspace_root(global, config))
}

/// Ports wired to the workspace directory and the minijinja adapters.
pub(crate) fn session_ports(store: FsPersistence, renderer: JinjaRenderer) -> SessionPorts {
    SessionPorts::new(
        Arc::new(JinjaSchemaExtractor::new()),
        Arc::new(renderer),
        Arc::new(store),
    )
}

/// Choice provider for a policy; `ask` prompts on the terminal.
pub(crate) fn merge_provider(policy: MergePolicy) -> Box<dyn MergeChoiceProvider> {
    match policy {
        MergePolicy::Overwrite => Box::new(MergeChoice::Overwrite),
        MergePolicy::Merge => Box::new(MergeChoice::Merge),
        MergePolicy::Cancel => Box::new(MergeChoice::Cancel),
        MergePolicy::Ask => Box::new(prompt::choose_merge),
    }
}

/// Apply one `--set` style override. An index one past the end appends a
/// blank item first; anything further out is rejected.
pub(crate) fn apply_assignment(
    session: &mut EditorSession,
    assignment: &Assignment,
) -> ConfgenResult<()> {
    match assignment {
        Assignment::Scalar { name, value } => session.set_scalar(name, value.as_str()),
        Assignment::Field {
            list,
            index,
            field,
            value,
        } => {
            let len = session.get(list)?.as_list().map_or(0, |items| items.len());
            if *index > len {
                return Err(DomainError::IndexOutOfRange {
                    list: list.clone(),
                    index: *index,
                    len,
                }
                .into());
            }
            if *index == len {
                session.add_list_item(list)?;
            }
            session.set_list_field(list, *index, field, value.as_str())
        }
    }
}

/// One status line per loaded value set.
pub(crate) fn report_merge(
    output: &OutputManager,
    name: &str,
    outcome: &MergeOutcome,
) -> std::io::Result<()> {
    if outcome.choice == MergeChoice::Cancel {
        return output.warning(&format!("Skipped '{name}'"));
    }
    output.info(&format!(
        "Loaded '{}' ({}): {} replaced",
        name,
        outcome.choice,
        outcome.replaced.len()
    ))?;
    if !outcome.ignored.is_empty() {
        output.warning(&format!(
            "Ignored names not in the template: {}",
            outcome.ignored.join(", ")
        ))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use confgen_adapters::MemoryPersistence;
    use confgen_core::prelude::SessionSettings;

    use crate::cli::OutputFormat;

    fn global(workspace: Option<&str>) -> GlobalArgs {
        GlobalArgs {
            verbose: 0,
            quiet: true,
            no_color: true,
            config: None,
            workspace: workspace.map(PathBuf::from),
            output_format: OutputFormat::Plain,
        }
    }

    #[test]
    fn workspace_flag_wins_over_config() {
        let config = AppConfig::default();
        assert_eq!(workspace_root(&global(None), &config), PathBuf::from("./data"));
        assert_eq!(
            workspace_root(&global(Some("/srv/confgen")), &config),
            PathBuf::from("/srv/confgen")
        );
    }

    #[tokio::test]
    async fn field_assignment_grows_the_list() {
        let ports = SessionPorts::new(
            Arc::new(JinjaSchemaExtractor::new()),
            Arc::new(JinjaRenderer::new()),
            Arc::new(MemoryPersistence::new()),
        );
        let mut session = EditorSession::new(ports, SessionSettings::default());
        session
            .set_template_text("{% for v in vlans %}{{ v.id }}{% endfor %}")
            .await
            .unwrap();

        for text in ["vlans.1.id=20", "vlans.2.id=30"] {
            let assignment: Assignment = text.parse().unwrap();
            apply_assignment(&mut session, &assignment).unwrap();
        }

        let vlans = session.get("vlans").unwrap().as_list().unwrap();
        assert_eq!(vlans.len(), 3);
        assert_eq!(vlans[2].get("id"), Some("30"));
        assert_eq!(vlans[0].get("id"), Some(""));
    }

    #[tokio::test]
    async fn field_assignment_past_the_end_is_rejected() {
        let ports = SessionPorts::new(
            Arc::new(JinjaSchemaExtractor::new()),
            Arc::new(JinjaRenderer::new()),
            Arc::new(MemoryPersistence::new()),
        );
        let mut session = EditorSession::new(ports, SessionSettings::default());
        session
            .set_template_text("{% for d in disks %}{{ d.name }}{% endfor %}")
            .await
            .unwrap();

        let assignment: Assignment = "disks.1000000000.name=x".parse().unwrap();
        let err = apply_assignment(&mut session, &assignment).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert_eq!(session.get("disks").unwrap().as_list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn scalar_assignment_to_unknown_name_fails() {
        let ports = SessionPorts::new(
            Arc::new(JinjaSchemaExtractor::new()),
            Arc::new(JinjaRenderer::new()),
            Arc::new(MemoryPersistence::new()),
        );
        let mut session = EditorSession::new(ports, SessionSettings::default());
        session.set_template_text("{{ host }}").await.unwrap();

        let assignment: Assignment = "hostname=x".parse().unwrap();
        assert!(apply_assignment(&mut session, &assignment).is_err());
        assert_eq!(session.get("host").unwrap().as_scalar(), Some(""));
    }

    #[test]
    fn fixed_policies_do_not_prompt() {
        let request = confgen_core::prelude::MergeRequest {
            source: "x",
            matching: 1,
            ignored: 0,
        };
        assert_eq!(
            merge_provider(MergePolicy::Merge).choose(&request),
            MergeChoice::Merge
        );
        assert_eq!(
            merge_provider(MergePolicy::Cancel).choose(&request),
            MergeChoice::Cancel
        );
    }
}
