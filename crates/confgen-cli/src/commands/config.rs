//! `confgen config`: inspect the effective settings.

use crate::{
    cli::{ConfigCommands, GlobalArgs, OutputFormat},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// Dotted keys accepted by `config get`, in display order.
const KEYS: [&str; 6] = [
    "workspace.root",
    "session.debounce_ms",
    "session.initial_items",
    "merge.default_choice",
    "output.no_color",
    "output.format",
];

pub fn execute(
    cmd: ConfigCommands,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    match cmd {
        ConfigCommands::Get { key } => output.payload(&lookup(&config, &key)?)?,
        ConfigCommands::List if output.format() == OutputFormat::Json => output.json(&config)?,
        ConfigCommands::List => {
            let text = toml::to_string_pretty(&config).map_err(|e| CliError::ConfigError {
                message: format!("Failed to serialise config: {e}"),
                source: Some(Box::new(e)),
            })?;
            output.payload(&text)?;
        }
        ConfigCommands::Path => {
            let path = AppConfig::source_path(global.config.as_ref());
            output.payload(&path.display().to_string())?;
            if !path.is_file() {
                output.info("Not created yet; built-in defaults apply (see `confgen init`)")?;
            }
        }
    }
    Ok(())
}

fn lookup(config: &AppConfig, key: &str) -> CliResult<String> {
    let value = match key {
        "workspace.root" => config.workspace.root.display().to_string(),
        "session.debounce_ms" => config.session.debounce_ms.to_string(),
        "session.initial_items" => config.session.initial_items.to_string(),
        "merge.default_choice" => config.merge.default_choice.to_string(),
        "output.no_color" => config.output.no_color.to_string(),
        "output.format" => config.output.format.to_string(),
        _ => {
            return Err(CliError::ConfigError {
                message: format!(
                    "Unknown config key '{key}' (known: {})",
                    KEYS.join(", ")
                ),
                source: None,
            });
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_key_resolves() {
        let cfg = AppConfig::default();
        for key in KEYS {
            assert!(lookup(&cfg, key).is_ok(), "{key}");
        }
    }

    #[test]
    fn values_use_config_spelling() {
        let cfg = AppConfig::default();
        assert_eq!(lookup(&cfg, "session.debounce_ms").unwrap(), "400");
        assert_eq!(lookup(&cfg, "merge.default_choice").unwrap(), "ask");
        assert_eq!(lookup(&cfg, "output.format").unwrap(), "auto");
    }

    #[test]
    fn unknown_key_lists_the_known_ones() {
        let err = lookup(&AppConfig::default(), "defaults.lang").unwrap_err();
        assert!(matches!(&err, CliError::ConfigError { .. }));
        assert!(err.to_string().contains("session.debounce_ms"));
    }
}
