//! Tracing subscriber setup for the binary.
//!
//! The library crates only emit spans and events; the filter below covers the
//! binary and both of them. `RUST_LOG` replaces the computed filter.
//!
//! Logs always go to stderr so that rendered configuration on stdout stays
//! clean when piped. With `--output-format json` every log line is a JSON
//! object carrying the current span fields (session id, template).

use std::io::IsTerminal as _;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{GlobalArgs, OutputFormat};

const TARGETS: [&str; 3] = ["confgen", "confgen_core", "confgen_adapters"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogStyle {
    Compact { ansi: bool },
    Json,
}

pub fn init_logging(args: &GlobalArgs) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives(level_for(args))))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match style_for(args, std::io::stderr().is_terminal()) {
        LogStyle::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogStyle::Compact { ansi } => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_ansi(ansi)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    installed.map_err(|e| anyhow::anyhow!("tracing subscriber already set: {e}"))
}

fn level_for(args: &GlobalArgs) -> LevelFilter {
    if args.quiet {
        return LevelFilter::ERROR;
    }
    match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn style_for(args: &GlobalArgs, stderr_is_terminal: bool) -> LogStyle {
    match args.output_format {
        OutputFormat::Json => LogStyle::Json,
        OutputFormat::Plain => LogStyle::Compact { ansi: false },
        OutputFormat::Auto | OutputFormat::Human => LogStyle::Compact {
            ansi: stderr_is_terminal && !args.no_color,
        },
    }
}

fn directives(level: LevelFilter) -> String {
    let level = level.to_string().to_lowercase();
    TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(verbose: u8, quiet: bool, output_format: OutputFormat) -> GlobalArgs {
        GlobalArgs {
            verbose,
            quiet,
            no_color: false,
            config: None,
            workspace: None,
            output_format,
        }
    }

    #[test]
    fn verbosity_steps() {
        let level = |v| level_for(&args(v, false, OutputFormat::Auto));
        assert_eq!(level(0), LevelFilter::WARN);
        assert_eq!(level(1), LevelFilter::INFO);
        assert_eq!(level(2), LevelFilter::DEBUG);
        assert_eq!(level(3), LevelFilter::TRACE);
        assert_eq!(level(9), LevelFilter::TRACE);
    }

    #[test]
    fn quiet_wins() {
        assert_eq!(level_for(&args(3, true, OutputFormat::Auto)), LevelFilter::ERROR);
    }

    #[test]
    fn json_output_logs_json() {
        assert_eq!(style_for(&args(0, false, OutputFormat::Json), true), LogStyle::Json);
    }

    #[test]
    fn colour_only_on_a_terminal() {
        let auto = args(0, false, OutputFormat::Auto);
        assert_eq!(style_for(&auto, true), LogStyle::Compact { ansi: true });
        assert_eq!(style_for(&auto, false), LogStyle::Compact { ansi: false });

        let mut no_color = args(0, false, OutputFormat::Human);
        no_color.no_color = true;
        assert_eq!(style_for(&no_color, true), LogStyle::Compact { ansi: false });
        assert_eq!(
            style_for(&args(0, false, OutputFormat::Plain), true),
            LogStyle::Compact { ansi: false }
        );
    }

    #[test]
    fn directives_cover_every_crate() {
        assert_eq!(
            directives(LevelFilter::DEBUG),
            "confgen=debug,confgen_core=debug,confgen_adapters=debug"
        );
    }
}
