//! CLI configuration
//!
//! Layered, lowest precedence first: built-in defaults, a TOML file
//! (`--config` or `./sdoh.toml` when present), `SDOH__*` environment
//! variables (`.env` is loaded first), then command line flags.
//!
//! ```toml
//! [ehr]
//! base_url = "https://ehr.example.org/fhir"
//! timeout_seconds = 30
//!
//! [logging]
//! level = "debug"
//! json = true
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "SDOH";
const DEFAULT_FILE: &str = "sdoh";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ehr: EhrConfig,
    pub logging: LoggingConfig,
}

/// Connection settings for the EHR FHIR endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct EhrConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    pub timeout_seconds: u64,
    /// Page limit for searches
    pub max_pages: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Config {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder()
            .set_default("ehr.base_url", "http://localhost:8080/fhir")?
            .set_default("ehr.timeout_seconds", 30_i64)?
            .set_default("ehr.max_pages", sdoh_exchange::DEFAULT_MAX_PAGES as i64)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?;

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name(DEFAULT_FILE).required(false)),
        };

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration sources")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Settings every command needs. EHR settings are checked separately by
    /// the commands that talk to the server.
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(
            self.logging.level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(format!("unknown logging.level {:?}", self.logging.level));
        }
        Ok(())
    }
}

impl EhrConfig {
    pub fn validate(&self) -> Result<(), String> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("ehr.base_url must be an http(s) URL, got {url:?}"));
        }
        if self.timeout_seconds == 0 {
            return Err("ehr.timeout_seconds must be greater than zero".to_string());
        }
        if self.max_pages == 0 {
            return Err("ehr.max_pages must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> Config {
        Config {
            ehr: EhrConfig {
                base_url: "https://ehr.example.org/fhir".to_string(),
                token: None,
                timeout_seconds: 30,
                max_pages: 50,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }

    #[test]
    fn accepts_defaults_like_config() {
        let config = valid();
        assert!(config.validate().is_ok());
        assert!(config.ehr.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = valid();
        config.ehr.timeout_seconds = 0;
        assert!(config.ehr.validate().is_err());

        let mut config = valid();
        config.ehr.max_pages = 0;
        assert!(config.ehr.validate().is_err());

        let mut config = valid();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn broken_ehr_settings_only_fail_ehr_validation() {
        let mut config = valid();
        config.ehr.base_url = "ehr.example.org".to_string();

        assert!(config.validate().is_ok());
        let err = config.ehr.validate().unwrap_err();
        assert!(err.contains("ehr.base_url"), "{err}");
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = std::env::temp_dir();
        file.push(format!("sdoh-config-test-{}.toml", std::process::id()));
        let mut handle = std::fs::File::create(&file).unwrap();
        writeln!(
            handle,
            "[ehr]\nbase_url = \"https://file.example.org/fhir\"\nmax_pages = 3\n\n[logging]\njson = true"
        )
        .unwrap();
        drop(handle);

        let config = Config::load(Some(&file)).unwrap();
        std::fs::remove_file(&file).ok();

        assert_eq!(config.ehr.base_url, "https://file.example.org/fhir");
        assert_eq!(config.ehr.max_pages, 3);
        assert_eq!(config.ehr.timeout_seconds, 30);
        assert!(config.logging.json);
    }
}
