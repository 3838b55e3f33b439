//! Terminal output for commands.
//!
//! Status lines (success, info, warnings) are suppressed by `--quiet`.
//! Payloads (rendered configuration, JSON, listings) are always written and
//! carry no markers, so `confgen render t.j2 > out.cfg` captures only the
//! configuration.

use std::io::{self, IsTerminal};

use console::Term;
use owo_colors::{OwoColorize, Style};

use crate::cli::global::{GlobalArgs, OutputFormat};
use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Success,
    Error,
    Warning,
    Info,
}

impl Marker {
    fn symbol(self) -> &'static str {
        match self {
            Self::Success => "\u{2713}",
            Self::Error => "\u{2717}",
            Self::Warning => "\u{26a0}",
            Self::Info => "\u{2139}",
        }
    }

    fn style(self) -> Style {
        match self {
            Self::Success => Style::new().green(),
            Self::Error => Style::new().red(),
            Self::Warning => Style::new().yellow(),
            Self::Info => Style::new().blue(),
        }
    }
}

pub struct OutputManager {
    format: OutputFormat,
    quiet: bool,
    color: bool,
    term: Term,
}

impl OutputManager {
    /// The `--output-format` flag wins over `output.format`; `auto` resolves
    /// to human on a terminal and plain otherwise.
    pub fn new(args: &GlobalArgs, config: &AppConfig) -> Self {
        let requested = match args.output_format {
            OutputFormat::Auto => config.output.format,
            explicit => explicit,
        };
        let format = resolve(requested, io::stdout().is_terminal());

        Self {
            format,
            quiet: args.quiet,
            color: format == OutputFormat::Human && !(args.no_color || config.output.no_color),
            term: Term::stdout(),
        }
    }

    pub fn print(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(msg)
    }

    pub fn success(&self, msg: &str) -> io::Result<()> {
        self.status(Marker::Success, msg)
    }

    /// Shown even with `--quiet`.
    pub fn error(&self, msg: &str) -> io::Result<()> {
        self.term.write_line(&self.marked(Marker::Error, msg))
    }

    pub fn warning(&self, msg: &str) -> io::Result<()> {
        self.status(Marker::Warning, msg)
    }

    pub fn info(&self, msg: &str) -> io::Result<()> {
        self.status(Marker::Info, msg)
    }

    pub fn header(&self, text: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        if self.color {
            self.term.write_line(&text.cyan().bold().to_string())
        } else {
            self.term.write_line(text)
        }
    }

    /// Written verbatim with a trailing newline added if missing.
    pub fn payload(&self, text: &str) -> io::Result<()> {
        self.term.write_str(text)?;
        if !text.ends_with('\n') {
            self.term.write_line("")?;
        }
        self.term.flush()
    }

    pub fn json<T: serde::Serialize>(&self, value: &T) -> io::Result<()> {
        let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        self.payload(&text)
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Never `Auto`.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn status(&self, marker: Marker, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(&self.marked(marker, msg))
    }

    fn marked(&self, marker: Marker, msg: &str) -> String {
        if self.color {
            let style = marker.style();
            format!(
                "{} {}",
                marker.symbol().style(style.bold()),
                msg.style(style)
            )
        } else {
            format!("{} {msg}", marker.symbol())
        }
    }
}

fn resolve(format: OutputFormat, stdout_is_terminal: bool) -> OutputFormat {
    match format {
        OutputFormat::Auto if stdout_is_terminal => OutputFormat::Human,
        OutputFormat::Auto => OutputFormat::Plain,
        other => other,
    }
}
