//! `confgen render`: one-shot render of a workspace template.
//!
//! Sequence:
//! 1. Load the template (schema extracted, store reconciled)
//! 2. Merge each `-V` value set in order under the chosen policy
//! 3. Apply `--set` overrides
//! 4. Flush the debounce window and wait for the render
//! 5. Print the output, or save/append it under `saved/`

use confgen_adapters::{JinjaRenderer, persistence::OUTPUT_DIR};
use confgen_core::prelude::{EditorSession, ItemCountPolicy, SessionEvent};
use tracing::{debug, info, instrument};

use crate::{
    cli::{GlobalArgs, ItemsArg, RenderArgs},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
    prompt,
};

#[instrument(skip_all, fields(template = %args.template))]
pub async fn execute(
    args: RenderArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let renderer = if args.strict {
        JinjaRenderer::strict()
    } else {
        JinjaRenderer::new()
    };
    let ports = super::session_ports(super::workspace(&global, &config), renderer);
    let settings = config.session_settings(args.items.map(item_policy));
    let mut session = EditorSession::new(ports, settings);

    session.load_template(&args.template).await?;

    let provider = super::merge_provider(args.policy.unwrap_or(config.merge.default_choice));
    for name in &args.values {
        let outcome = session.load_values(name, provider.as_ref()).await?;
        super::report_merge(&output, name, &outcome)?;
    }

    for assignment in &args.set {
        super::apply_assignment(&mut session, assignment)?;
    }

    session.flush();
    for event in session.settle().await {
        match event {
            SessionEvent::RenderFailed { error, .. } => return Err(CliError::Core(error.into())),
            SessionEvent::Rendered { version, .. } => debug!(version, "Render applied"),
            _ => {}
        }
    }

    match args.output {
        Some(name) => {
            session.save_output(&name, args.append).await?;
            info!(output = %name, append = args.append, "Output saved");
            let verb = if args.append { "Appended to" } else { "Saved" };
            output.success(&format!("{verb} {OUTPUT_DIR}/{name}"))?;
        }
        None => output.payload(session.rendered_output().unwrap_or_default())?,
    }

    Ok(())
}

fn item_policy(items: ItemsArg) -> ItemCountPolicy {
    match items {
        ItemsArg::Count(0) => ItemCountPolicy::Empty,
        ItemsArg::Count(n) => ItemCountPolicy::Fixed(n),
        ItemsArg::Ask => ItemCountPolicy::ask(prompt::ask_item_count),
    }
}
