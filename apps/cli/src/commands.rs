use anyhow::Context;
use clap::{Args, Subcommand};
use sdoh_exchange::{profiles, Consent, ConsentRepository, FhirResource, SdohProfile, SearchParams};
use sdoh_fhir_client::{FhirClient, RestClient, RestClientOptions};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the SDOH profile catalog
    Profiles {
        /// Print as a JSON object instead of a table
        #[arg(long)]
        json: bool,

        /// Show a single category (e.g. `consent`, `service-request`)
        category: Option<String>,
    },

    /// Work with Consent resources on the EHR
    #[command(subcommand)]
    Consent(ConsentCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConsentCommand {
    /// Read a Consent by id
    Read { id: String },

    /// Search Consents with `name=value` criteria
    Search(SearchArgs),

    /// Create a Consent from a JSON file (`-` for stdin)
    Create {
        file: PathBuf,

        /// Do not add the SDOHCC-Consent profile to meta.profile
        #[arg(long)]
        no_profile: bool,
    },

    /// Replace a Consent from a JSON file (`-` for stdin); the id is taken from the resource
    Update { file: PathBuf },

    /// Delete a Consent by id
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search criteria, e.g. `patient=Patient/123 status=active`
    #[arg(value_parser = parse_criterion)]
    pub criteria: Vec<(String, String)>,

    /// Page size (`_count`)
    #[arg(long)]
    pub count: Option<u32>,
}

pub async fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();

    match command {
        Command::Profiles { json, category } => {
            let selected = match category {
                Some(name) => vec![name.parse::<SdohProfile>()?],
                None => SdohProfile::ALL.to_vec(),
            };
            write_profiles(&mut stdout, &selected, json)?;
        }
        Command::Consent(command) => {
            let repo = consent_repository(config)?;
            run_consent(command, &repo, &mut stdout).await?;
        }
    }

    stdout.flush()?;
    Ok(())
}

fn consent_repository(config: &Config) -> anyhow::Result<ConsentRepository> {
    config
        .ehr
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let client = RestClient::with_options(
        config.ehr.base_url.clone(),
        RestClientOptions {
            timeout: config.ehr.timeout(),
            bearer_token: config.ehr.token.clone(),
        },
    )
    .context("Failed to create FHIR client")?;

    tracing::info!(base_url = client.base_url(), "Using EHR FHIR endpoint");

    Ok(ConsentRepository::new(Arc::new(client)).with_max_pages(config.ehr.max_pages))
}

async fn run_consent(
    command: ConsentCommand,
    repo: &ConsentRepository,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        ConsentCommand::Read { id } => {
            let consent = repo.get(&id).await?;
            write_json(out, &consent)?;
        }
        ConsentCommand::Search(args) => {
            let mut params = SearchParams {
                params: args.criteria,
                count: None,
            };
            if let Some(count) = args.count {
                params = params.with_count(count);
            }
            let found = repo.search(&params).await?;
            tracing::info!(count = found.len(), "Search finished");
            write_json(out, &found)?;
        }
        ConsentCommand::Create { file, no_profile } => {
            let mut consent = read_consent(&file)?;
            if !no_profile && consent.ensure_profile(profiles::CONSENT) {
                tracing::debug!("Stamped SDOHCC-Consent profile");
            }
            let stored = repo.create(&consent).await?;
            write_json(out, &stored)?;
        }
        ConsentCommand::Update { file } => {
            let consent = read_consent(&file)?;
            let stored = repo.update(&consent).await?;
            write_json(out, &stored)?;
        }
        ConsentCommand::Delete { id } => {
            repo.delete(&id).await?;
            writeln!(out, "Deleted Consent/{id}")?;
        }
    }
    Ok(())
}

fn read_consent(path: &Path) -> anyhow::Result<Consent> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read Consent from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };

    serde_json::from_str(&raw).with_context(|| format!("{} is not a valid Consent", path.display()))
}

fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_profiles(out: &mut impl Write, selected: &[SdohProfile], json: bool) -> anyhow::Result<()> {
    if json {
        let map: serde_json::Map<String, serde_json::Value> = selected
            .iter()
            .map(|p| (p.name().to_string(), p.uri().into()))
            .collect();
        return write_json(out, &map);
    }

    let width = selected.iter().map(|p| p.name().len()).max().unwrap_or(0);
    for profile in selected {
        writeln!(out, "{:<width$}  {}", profile.name(), profile.uri())?;
    }
    Ok(())
}

fn parse_criterion(raw: &str) -> Result<(String, String), String> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(format!("expected name=value, got {raw:?}"));
    };
    if name.is_empty() {
        return Err(format!("search parameter name is empty in {raw:?}"));
    }
    Ok((name.to_string(), value.to_string()))
}
