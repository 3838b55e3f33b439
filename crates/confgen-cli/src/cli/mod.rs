//! Command line surface of `confgen`.
//!
//! Besides the clap derive types this module parses the small value syntaxes
//! used on the command line: `--set` assignments and `--items` counts.

use std::{fmt, path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "confgen",
    bin_name = "confgen",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Live configuration rendering from Jinja templates",
    long_about = "confgen renders configuration files from Jinja templates. \
                  It extracts the variables a template declares, keeps their \
                  values in step with template edits, and merges reusable \
                  value sets into them.",
    after_help = "EXAMPLES:\n\
        \x20 confgen vars switch.j2\n\
        \x20 confgen render switch.j2 -V core.yaml --set host=sw01\n\
        \x20 confgen render switch.j2 -V core.yaml -o sw01.cfg\n\
        \x20 confgen edit switch.j2\n\
        \x20 confgen completions bash > /usr/share/bash-completion/completions/confgen",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the variables a template declares.
    #[command(
        about = "Show template variables",
        after_help = "EXAMPLES:\n\
            \x20 confgen vars switch.j2\n\
            \x20 confgen vars switch.j2 --format json"
    )]
    Vars(VarsArgs),

    /// Render a template once, with value sets and overrides applied.
    #[command(
        visible_alias = "r",
        about = "Render a template",
        after_help = "EXAMPLES:\n\
            \x20 confgen render switch.j2 --set host=sw01 --set vlans.0.id=10\n\
            \x20 confgen render switch.j2 -V site.yaml -V sw01.yaml --policy merge\n\
            \x20 confgen render switch.j2 -V sw01.yaml -o sw01.cfg --append"
    )]
    Render(RenderArgs),

    /// Edit values interactively with live re-rendering.
    #[command(
        visible_alias = "e",
        about = "Interactive editing session",
        after_help = "Type `help` inside the session for the command list."
    )]
    Edit(EditArgs),

    /// List stored templates or value sets.
    #[command(
        visible_alias = "ls",
        about = "List templates or value sets",
        after_help = "EXAMPLES:\n\
            \x20 confgen list templates\n\
            \x20 confgen list values --format json"
    )]
    List(ListArgs),

    /// Copy an outside file into the workspace.
    #[command(
        about = "Import a template or value set",
        after_help = "EXAMPLES:\n\
            \x20 confgen import template ./switch.j2\n\
            \x20 confgen import values ./sw01.yaml"
    )]
    Import(ImportArgs),

    /// Initialise a configuration file and the workspace directories.
    #[command(
        about = "Initialise configuration",
        after_help = "EXAMPLES:\n\
            \x20 confgen init           # default location\n\
            \x20 confgen init --local   # .confgen.toml in CWD"
    )]
    Init(InitArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 confgen completions bash > ~/.local/share/bash-completion/completions/confgen\n\
            \x20 confgen completions zsh  > ~/.zfunc/_confgen\n\
            \x20 confgen completions fish > ~/.config/fish/completions/confgen.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the confgen configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 confgen config get session.debounce_ms\n\
            \x20 confgen config list"
    )]
    Config(ConfigCommands),
}

// ── vars ──────────────────────────────────────────────────────────────────────

/// Arguments for `confgen vars`.
#[derive(Debug, Args)]
pub struct VarsArgs {
    /// Template name in the workspace.
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// Output format.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: ListFormat,
}

// ── render ────────────────────────────────────────────────────────────────────

/// Arguments for `confgen render`.
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Template name in the workspace.
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// Value sets to load, applied in order.
    #[arg(short = 'V', long = "values", value_name = "NAME")]
    pub values: Vec<String>,

    /// How each value set combines with the values already present.
    #[arg(short = 'p', long = "policy", value_enum, value_name = "POLICY")]
    pub policy: Option<MergePolicy>,

    /// Starting item count for lists: a number, or `ask`.
    #[arg(long = "items", value_name = "N|ask")]
    pub items: Option<ItemsArg>,

    /// Value overrides applied after the value sets.
    #[arg(
        short = 's',
        long = "set",
        value_name = "NAME=VALUE",
        long_help = "Override a value after the value sets are loaded.\n\
            Scalars: host=sw01\n\
            List fields: vlans.0.id=10 (missing items are added)"
    )]
    pub set: Vec<Assignment>,

    /// Save the output under this name instead of printing it.
    #[arg(short = 'o', long = "output", value_name = "NAME")]
    pub output: Option<String>,

    /// Append to the saved output instead of replacing it.
    #[arg(long = "append", requires = "output")]
    pub append: bool,

    /// Fail on variables that have no value instead of rendering them empty.
    #[arg(long = "strict")]
    pub strict: bool,
}

// ── edit ──────────────────────────────────────────────────────────────────────

/// Arguments for `confgen edit`.
#[derive(Debug, Args)]
pub struct EditArgs {
    /// Template name in the workspace.
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// Value sets to load before the session starts.
    #[arg(short = 'V', long = "values", value_name = "NAME")]
    pub values: Vec<String>,

    /// Policy for the value sets given with `-V`.
    #[arg(short = 'p', long = "policy", value_enum, value_name = "POLICY")]
    pub policy: Option<MergePolicy>,

    /// Debounce window in milliseconds.
    #[arg(long = "debounce", value_name = "MS")]
    pub debounce_ms: Option<u64>,
}

// ── list ──────────────────────────────────────────────────────────────────────

/// Arguments for `confgen list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// What to list.
    #[arg(value_enum)]
    pub what: ListTarget,

    /// Output format.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: ListFormat,
}

/// Stored entry kinds that can be listed or imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListTarget {
    Templates,
    #[value(alias = "variables")]
    Values,
}

/// Output format for the `list` and `vars` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    /// Human-readable table.
    Table,
    /// One name per line.
    List,
    /// JSON document.
    Json,
}

// ── import ────────────────────────────────────────────────────────────────────

/// Arguments for `confgen import`.
#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Whether the file is a template or a value set.
    #[arg(value_enum, value_name = "KIND")]
    pub kind: ImportKind,

    /// File to copy in; stored under its file name.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportKind {
    Template,
    #[value(alias = "variables")]
    Values,
}

// ── init ──────────────────────────────────────────────────────────────────────

/// Arguments for `confgen init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Write `.confgen.toml` in the current directory.
    #[arg(
        long = "local",
        help = "Create local configuration in current directory"
    )]
    pub local: bool,

    /// Overwrite an existing config file.
    #[arg(short = 'f', long = "force", help = "Overwrite existing configuration")]
    pub force: bool,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `confgen completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `confgen config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `session.debounce_ms`.
        key: String,
    },
    /// Print the effective configuration as TOML (JSON with `--output-format json`).
    List,
    /// Print the configuration file that is read, and whether it exists.
    Path,
}

// ── value types ───────────────────────────────────────────────────────────────

/// Merge policy as chosen on the command line or in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    Overwrite,
    Merge,
    Cancel,
    /// Prompt for every value set.
    #[default]
    Ask,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite => write!(f, "overwrite"),
            Self::Merge => write!(f, "merge"),
            Self::Cancel => write!(f, "cancel"),
            Self::Ask => write!(f, "ask"),
        }
    }
}

/// `--items` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemsArg {
    Count(usize),
    Ask,
}

impl FromStr for ItemsArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ask") {
            return Ok(Self::Ask);
        }
        s.parse()
            .map(Self::Count)
            .map_err(|_| format!("expected a number or 'ask', got '{s}'"))
    }
}

/// One `--set` override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Scalar {
        name: String,
        value: String,
    },
    Field {
        list: String,
        index: usize,
        field: String,
        value: String,
    },
}

impl FromStr for Assignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
        let value = value.to_string();
        let parts: Vec<&str> = target.trim().split('.').collect();
        match parts.as_slice() {
            [name] if !name.is_empty() => Ok(Self::Scalar {
                name: name.to_string(),
                value,
            }),
            [list, index, field] if !list.is_empty() && !field.is_empty() => {
                let index = index
                    .parse()
                    .map_err(|_| format!("'{index}' is not a list index"))?;
                Ok(Self::Field {
                    list: list.to_string(),
                    index,
                    field: field.to_string(),
                    value,
                })
            }
            _ => Err(format!(
                "expected NAME=VALUE or LIST.INDEX.FIELD=VALUE, got '{s}'"
            )),
        }
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
