//! `confgen edit`: line-driven editing session with live re-rendering.
//!
//! Input lines and render-loop events are multiplexed on one task: while the
//! session has a render scheduled or in flight, the loop also waits on
//! [`EditorSession::next_event`]. Rendered output is printed as it arrives.
//!
//! A value set loaded without an explicit choice under the `ask` policy is
//! previewed first (loaded with `cancel`), and the user repeats the command
//! with the choice. Quitting or switching templates with unsaved changes
//! takes the same command twice in a row.

use std::{cell::RefCell, time::Duration};

use confgen_adapters::JinjaRenderer;
use confgen_core::prelude::{
    EditorSession, MergeChoice, MergeRequest, SessionEvent, VariableValue,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, instrument};

use crate::{
    cli::{EditArgs, GlobalArgs, MergePolicy},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
    prompt,
};

const HELP: &str = "\
Commands:
  set <name> <value>                 set a scalar
  add <list>                         append a blank item
  rm <list> <index>                  remove an item
  field <list> <index> <field> <v>   set a list item field
  load <values> [overwrite|merge|cancel]
  save <values>                      save the current values
  write <name> | append <name>       save the rendered output
  template <name> | template! <name> start over on another template
  savetemplate <name>                save the current template under a new name
  show | vars | render | help
  quit | quit!                       leave (quit! discards unsaved changes)";

#[instrument(skip_all, fields(template = %args.template))]
pub async fn execute(
    args: EditArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let mut settings = config.session_settings(None);
    if let Some(ms) = args.debounce_ms {
        settings.debounce = Duration::from_millis(ms);
    }
    let ports = super::session_ports(super::workspace(&global, &config), JinjaRenderer::new());
    let mut session = EditorSession::new(ports, settings);
    session.start_template(&args.template).await?;

    let policy = args.policy.unwrap_or(config.merge.default_choice);
    let provider = super::merge_provider(policy);
    for name in &args.values {
        let outcome = session.load_values(name, provider.as_ref()).await?;
        super::report_merge(&output, name, &outcome)?;
    }

    output.header(&format!("Editing {}", args.template))?;
    output.print("Type `help` for commands.")?;

    let mut repl = Repl {
        session,
        output,
        policy,
        armed: None,
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line?),
            event = repl.session.next_event(), if !repl.session.is_idle() => Input::Event(event),
        };

        match input {
            Input::Event(event) => repl.on_event(event)?,
            Input::Line(Some(line)) => {
                if let Flow::Quit = repl.on_line(&line).await? {
                    break;
                }
            }
            Input::Line(None) => {
                if repl.session.has_unsaved_changes() {
                    repl.output
                        .warning("Input closed; unsaved changes were discarded")?;
                }
                break;
            }
        }
    }

    Ok(())
}

enum Input {
    Line(Option<String>),
    Event(SessionEvent),
}

enum Flow {
    Continue,
    Quit,
}

/// One parsed session command.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Set { name: String, value: String },
    Add { list: String },
    Remove { list: String, index: usize },
    Field { list: String, index: usize, field: String, value: String },
    Load { name: String, choice: Option<MergeChoice> },
    Save { name: String },
    Write { name: String, append: bool },
    Template { name: String, force: bool },
    SaveTemplate { name: String },
    Show,
    Vars,
    Render,
    Help,
    Quit { force: bool },
    Nothing,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim_start();
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match (word, args.as_slice()) {
            ("", _) => Self::Nothing,
            ("set", [name, ..]) => Self::Set {
                name: name.to_string(),
                value: after_words(rest, 1).to_string(),
            },
            ("add", [list]) => Self::Add {
                list: list.to_string(),
            },
            ("rm", [list, index]) => Self::Remove {
                list: list.to_string(),
                index: parse_index(index)?,
            },
            ("field", [list, index, field, ..]) => Self::Field {
                list: list.to_string(),
                index: parse_index(index)?,
                field: field.to_string(),
                value: after_words(rest, 3).to_string(),
            },
            ("load", [name]) => Self::Load {
                name: name.to_string(),
                choice: None,
            },
            ("load", [name, choice]) => Self::Load {
                name: name.to_string(),
                choice: Some(choice.parse()?),
            },
            ("save", [name]) => Self::Save {
                name: name.to_string(),
            },
            ("write", [name]) => Self::Write {
                name: name.to_string(),
                append: false,
            },
            ("append", [name]) => Self::Write {
                name: name.to_string(),
                append: true,
            },
            ("template", [name]) => Self::Template {
                name: name.to_string(),
                force: false,
            },
            ("template!", [name]) => Self::Template {
                name: name.to_string(),
                force: true,
            },
            ("savetemplate", [name]) => Self::SaveTemplate {
                name: name.to_string(),
            },
            ("show", []) => Self::Show,
            ("vars", []) => Self::Vars,
            ("render", []) => Self::Render,
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit", []) => Self::Quit { force: false },
            ("quit!" | "exit!", []) => Self::Quit { force: true },
            _ => return Err(format!("cannot parse '{line}' (try `help`)")),
        };
        Ok(command)
    }
}

/// Text after the first `n` words, spacing inside the value kept.
fn after_words(text: &str, n: usize) -> &str {
    let mut rest = text;
    for _ in 0..n {
        rest = rest.trim_start();
        rest = match rest.find(char::is_whitespace) {
            Some(i) => &rest[i..],
            None => "",
        };
    }
    rest.trim()
}

fn parse_index(text: &str) -> Result<usize, String> {
    text.parse()
        .map_err(|_| format!("'{text}' is not a list index"))
}

struct Repl {
    session: EditorSession,
    output: OutputManager,
    policy: MergePolicy,
    /// Command that was refused for unsaved changes; repeating it confirms.
    armed: Option<Command>,
}

impl Repl {
    async fn on_line(&mut self, line: &str) -> CliResult<Flow> {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(message) => {
                self.output.error(&message)?;
                return Ok(Flow::Continue);
            }
        };

        // Quitting and starting over both drop the current values.
        let armed = self.armed.take();
        let repeat = match &command {
            Command::Quit { force } if !force => Some("quit".to_string()),
            Command::Template { name, force } if !force => Some(format!("template {name}")),
            _ => None,
        };
        if let Some(repeat) = repeat {
            let confirmed = armed.as_ref() == Some(&command);
            if !self.session.request_exit(&confirmed) {
                self.output.warning(&format!(
                    "There are unsaved changes: `save <name>` them, or `{repeat}` again to discard"
                ))?;
                self.armed = Some(command);
                return Ok(Flow::Continue);
            }
        }
        if let Command::Quit { .. } = command {
            return Ok(Flow::Quit);
        }

        if let Err(e) = self.run(command).await {
            self.output.error(&e.to_string())?;
        }
        Ok(Flow::Continue)
    }

    /// Session errors are reported and the session goes on.
    async fn run(&mut self, command: Command) -> CliResult<()> {
        match command {
            Command::Set { name, value } => self.session.set_scalar(&name, value)?,
            Command::Add { list } => {
                let index = self.session.add_list_item(&list)?;
                self.output.info(&format!("Added {list}[{index}]"))?;
            }
            Command::Remove { list, index } => {
                self.session.remove_list_item(&list, index)?;
            }
            Command::Field {
                list,
                index,
                field,
                value,
            } => self.session.set_list_field(&list, index, &field, value)?,
            Command::Load { name, choice } => self.load(&name, choice).await?,
            Command::Save { name } => {
                self.session.save_values(&name).await?;
                self.output.success(&format!("Saved values as '{name}'"))?;
            }
            Command::Write { name, append } => {
                self.settle().await?;
                self.session.save_output(&name, append).await?;
                self.output.success(&format!("Wrote output '{name}'"))?;
            }
            Command::Template { name, .. } => {
                self.session.start_template(&name).await?;
                self.output.info(&format!("Started over on {name}"))?;
            }
            Command::SaveTemplate { name } => {
                self.session.save_template(&name).await?;
                self.output.success(&format!("Saved template as '{name}'"))?;
            }
            Command::Show => self.show()?,
            Command::Vars => {
                let schema = self.session.schema();
                for line in super::vars::table_lines(schema) {
                    self.output.print(&line)?;
                }
            }
            Command::Render => {
                if !self.settle().await? {
                    let text = self.session.rendered_output().unwrap_or_default().to_string();
                    self.output.payload(&text)?;
                }
            }
            Command::Help => self.output.print(HELP)?,
            Command::Quit { .. } | Command::Nothing => {}
        }
        Ok(())
    }

    async fn load(&mut self, name: &str, choice: Option<MergeChoice>) -> CliResult<()> {
        let choice = choice.or(match self.policy {
            MergePolicy::Overwrite => Some(MergeChoice::Overwrite),
            MergePolicy::Merge => Some(MergeChoice::Merge),
            MergePolicy::Cancel => Some(MergeChoice::Cancel),
            MergePolicy::Ask => None,
        });

        let Some(choice) = choice else {
            let question = RefCell::new(String::new());
            let preview = |request: &MergeRequest<'_>| {
                *question.borrow_mut() = prompt::merge_question(request);
                MergeChoice::Cancel
            };
            self.session.load_values(name, &preview).await?;
            self.output.info(&format!(
                "{}; repeat as `load {} overwrite|merge|cancel`",
                question.into_inner(),
                name
            ))?;
            return Ok(());
        };

        let outcome = self.session.load_values(name, &choice).await?;
        super::report_merge(&self.output, name, &outcome)?;
        Ok(())
    }

    /// Skip the debounce window and drain the render loop. Returns whether
    /// anything was rendered.
    async fn settle(&mut self) -> CliResult<bool> {
        self.session.flush();
        let events = self.session.settle().await;
        let rendered = events
            .iter()
            .any(|e| matches!(e, SessionEvent::Rendered { .. }));
        for event in events {
            self.on_event(event)?;
        }
        Ok(rendered)
    }

    fn on_event(&self, event: SessionEvent) -> CliResult<()> {
        match event {
            SessionEvent::Rendered { version, output } => {
                self.output.header(&format!("--- rendered (v{version}) ---"))?;
                self.output.payload(&output)?;
            }
            SessionEvent::RenderFailed { error, .. } => {
                self.output.error(&format!("Render failed: {error}"))?;
            }
            SessionEvent::RenderIssued { version } => debug!(version, "Render issued"),
            SessionEvent::Discarded { version } => debug!(version, "Stale render dropped"),
            SessionEvent::Idle => {}
        }
        Ok(())
    }

    fn show(&self) -> CliResult<()> {
        for line in value_lines(&self.session) {
            self.output.print(&line)?;
        }
        if self.session.has_unsaved_changes() {
            self.output.print("(unsaved changes)")?;
        }
        Ok(())
    }
}

fn value_lines(session: &EditorSession) -> Vec<String> {
    let mut lines = Vec::new();
    for (name, value) in session.snapshot() {
        match value {
            VariableValue::Scalar(text) => lines.push(format!("  {name} = {text}")),
            VariableValue::List(items) => {
                if items.is_empty() {
                    lines.push(format!("  {name} = []"));
                }
                for (i, item) in items.iter().enumerate() {
                    for field in item.fields() {
                        let text = item.get(field).unwrap_or_default();
                        lines.push(format!("  {name}[{i}].{field} = {text}"));
                    }
                }
            }
        }
    }
    lines
}
