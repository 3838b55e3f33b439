//! `confgen`: render configuration from Jinja templates and reusable value
//! sets, one-shot or in a live editing session.
//!
//! Exit codes are listed in [`error`].

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, instrument};

use crate::{
    cli::{Cli, Commands},
    config::AppConfig,
    error::{CliError, CliResult},
    logging::init_logging,
    output::OutputManager,
};

mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod output;
mod prompt;

fn main() -> ExitCode {
    // Missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version arrive here too and exit 0.
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = init_logging(&cli.global) {
        eprintln!("Failed to initialise logging: {e}");
        return ExitCode::from(1);
    }
    debug!(
        verbose = cli.global.verbose,
        quiet = cli.global.quiet,
        workspace = ?cli.global.workspace,
        "Arguments parsed"
    );

    let verbose = cli.global.verbose > 0;
    let no_color = cli.global.no_color;
    let fail = |e: CliError| handle_error(e, verbose, no_color);

    let loaded = match cli.command {
        Commands::Init(_) => AppConfig::load_lenient(cli.global.config.as_ref()),
        _ => AppConfig::load(cli.global.config.as_ref()),
    };
    let config = match loaded {
        Ok(cfg) => cfg,
        Err(e) => return fail(e),
    };
    let output = OutputManager::new(&cli.global, &config);

    // The edit session multiplexes stdin and render timers on one thread.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return fail(e.into()),
    };

    match runtime.block_on(run(cli, config, output)) {
        Ok(()) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

#[instrument(skip_all)]
async fn run(cli: Cli, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let global = cli.global;
    match cli.command {
        Commands::Vars(cmd) => commands::vars::execute(cmd, global, config, output).await,
        Commands::Render(cmd) => commands::render::execute(cmd, global, config, output).await,
        Commands::Edit(cmd) => commands::edit::execute(cmd, global, config, output).await,
        Commands::List(cmd) => commands::list::execute(cmd, global, config, output).await,
        Commands::Import(cmd) => commands::import::execute(cmd, global, config, output).await,
        Commands::Init(cmd) => commands::init::execute(cmd, global, config, output).await,
        Commands::Config(cmd) => commands::config::execute(cmd, global, config, output),
        Commands::Completions(cmd) => commands::completions::execute(cmd),
    }
}

/// The only place where structured errors become human-readable output.
fn handle_error(err: CliError, verbose: bool, no_color: bool) -> ExitCode {
    err.log();
    // stderr, so the message survives a redirected stdout.
    let color = !no_color && std::io::IsTerminal::is_terminal(&std::io::stderr());
    eprint!("{}", err.report(verbose, color));
    ExitCode::from(err.exit_code())
}

// ── tests ─────────────────────────────────────────────────────────────────────
