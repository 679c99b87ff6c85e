//! `sdoh` - SDOH profile catalog and Consent access from the command line

mod commands;
mod config;
mod logging;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use crate::commands::Command;
use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "sdoh", version, about = "SDOH resources on an EHR FHIR endpoint")]
struct Cli {
    /// Configuration file (TOML); defaults to ./sdoh.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// EHR FHIR base URL (overrides ehr.base_url)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token for the EHR (overrides ehr.token)
    #[arg(long, global = true, env = "SDOH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log level (overrides logging.level)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.ehr.base_url = base_url.clone();
        }
        if let Some(token) = &self.token {
            config.ehr.token = Some(token.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.json = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Starting sdoh");

    commands::run(cli.command, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_consent_search() {
        let cli = Cli::try_parse_from([
            "sdoh",
            "--base-url",
            "https://ehr.example.org/fhir",
            "consent",
            "search",
            "patient=Patient/1",
            "status=active",
            "--count",
            "10",
        ])
        .unwrap();

        assert_eq!(cli.base_url.as_deref(), Some("https://ehr.example.org/fhir"));
        match cli.command {
            Command::Consent(commands::ConsentCommand::Search(args)) => {
                assert_eq!(args.criteria.len(), 2);
                assert_eq!(args.count, Some(10));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "sdoh",
            "profiles",
            "--base-url",
            "https://other.example.org/fhir",
            "--log-level",
            "debug",
            "--json-logs",
        ])
        .unwrap();

        let mut config = Config {
            ehr: crate::config::EhrConfig {
                base_url: "http://localhost:8080/fhir".to_string(),
                token: None,
                timeout_seconds: 30,
                max_pages: 50,
            },
            logging: crate::config::LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        };
        cli.apply_overrides(&mut config);

        assert_eq!(config.ehr.base_url, "https://other.example.org/fhir");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }
}
