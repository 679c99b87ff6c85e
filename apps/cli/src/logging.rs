//! Logging initialization for the `sdoh` binary
//!
//! Logs go to stderr so that resource JSON printed on stdout can be piped.
//! `RUST_LOG` overrides the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = build_env_filter(config);
    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config.json {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr);
        subscriber.with(layer).try_init()?;
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(std::io::stderr);
        subscriber.with(layer).try_init()?;
    }

    tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)))
}

/// Our crates at the configured level; HTTP internals stay quiet.
fn default_directives(level: &str) -> String {
    let level = level.to_ascii_lowercase();
    format!(
        "sdoh={level},sdoh_exchange={level},sdoh_fhir_client={level},reqwest=warn,hyper=warn"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cover_workspace_crates() {
        let directives = default_directives("DEBUG");
        assert!(directives.starts_with("sdoh=debug,"));
        assert!(directives.contains("sdoh_exchange=debug"));
        assert!(directives.contains("sdoh_fhir_client=debug"));
        assert!(directives.contains("hyper=warn"));
    }
}
