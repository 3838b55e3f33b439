//! Settings for the binary: workspace location, session tuning, merge default
//! and output style. The core crate only sees the [`SessionSettings`] derived
//! from them.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. Environment variables: `CONFGEN_SESSION__DEBOUNCE_MS=250`
//! 3. Config file: `--config FILE`, else `.confgen.toml` in the current
//!    directory, else the platform config directory
//! 4. Built-in defaults

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, Environment, File, FileFormat};
use confgen_core::prelude::{ItemCountPolicy, SessionSettings};
use serde::{Deserialize, Serialize};

use crate::{
    cli::{MergePolicy, OutputFormat},
    error::{CliError, CliResult},
};

/// File name used by `confgen init --local`.
pub const LOCAL_CONFIG_FILE: &str = ".confgen.toml";

const ENV_PREFIX: &str = "CONFGEN";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub workspace: WorkspaceConfig,
    pub session: SessionConfig,
    pub merge: MergeConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory holding `templates/`, `variables/` and `saved/`.
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub debounce_ms: u64,
    /// Blank items a new list starts with; `0` leaves it empty.
    pub initial_items: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    pub default_choice: MergePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub no_color: bool,
    /// Used when `--output-format` is left at `auto`.
    pub format: OutputFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: WorkspaceConfig {
                root: PathBuf::from("./data"),
            },
            session: SessionConfig {
                debounce_ms: 400,
                initial_items: 1,
            },
            merge: MergeConfig {
                default_choice: MergePolicy::Ask,
            },
            output: OutputConfig {
                no_color: false,
                format: OutputFormat::Auto,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, file and environment.
    ///
    /// An explicit `config_file` must exist; the implicit locations are
    /// optional.
    pub fn load(config_file: Option<&PathBuf>) -> CliResult<Self> {
        Self::load_from(
            &Self::source_path(config_file),
            config_file.is_some(),
            Environment::with_prefix(ENV_PREFIX),
        )
    }

    /// Like [`AppConfig::load`], but a missing `--config` file is not an error.
    /// Used by `confgen init`, which is about to create it.
    pub fn load_lenient(config_file: Option<&PathBuf>) -> CliResult<Self> {
        Self::load_from(
            &Self::source_path(config_file),
            false,
            Environment::with_prefix(ENV_PREFIX),
        )
    }

    /// The file [`AppConfig::load`] reads for the given `--config` value.
    pub fn source_path(config_file: Option<&PathBuf>) -> PathBuf {
        config_file.cloned().unwrap_or_else(Self::discover)
    }

    fn load_from(path: &Path, required: bool, env: Environment) -> CliResult<Self> {
        let defaults = Config::try_from(&Self::default()).map_err(config_error)?;

        let loaded = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).format(FileFormat::Toml).required(required))
            .add_source(
                env.prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_error)?;

        loaded.try_deserialize().map_err(config_error)
    }

    /// Local `.confgen.toml` if present, else the platform default.
    fn discover() -> PathBuf {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            local
        } else {
            Self::config_path()
        }
    }

    /// Platform config file (`~/.config/confgen/config.toml` on Linux), or
    /// `.confgen.toml` when no home directory is known.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "confgen", "confgen")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE))
    }

    /// Session tunables; `items` overrides the configured initial count.
    pub fn session_settings(&self, items: Option<ItemCountPolicy>) -> SessionSettings {
        let item_policy = items.unwrap_or(match self.session.initial_items {
            0 => ItemCountPolicy::Empty,
            n => ItemCountPolicy::Fixed(n),
        });
        SessionSettings {
            debounce: Duration::from_millis(self.session.debounce_ms),
            item_policy,
        }
    }
}

fn config_error(e: config::ConfigError) -> CliError {
    CliError::ConfigError {
        message: e.to_string(),
        source: Some(Box::new(e)),
    }
}
