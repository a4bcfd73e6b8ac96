///
/// This module implements the CLI interface for share-sync: locating the
/// settings file, wiring the configured collaborators together and running
/// one synchronisation pass.
///
/// All upload/link/record logic lives in the [`share-sync-core`] crate. This
/// module only selects the config source, the link recorder and the logging
/// context at startup.
///
/// [`share-sync-core`]: ../../share-sync-core/
use crate::client::NextcloudClient;
use crate::load_config::{load_config, ConfigLoad, Settings};
use crate::logging::{LogContext, LoggingConfig};
use crate::recorder::SqlRecorder;
use anyhow::{Context, Result};
use clap::Parser;
use share_sync_core::config::Configuration;
use share_sync_core::contract::{LinkRecorder, NoopRecorder};
use share_sync_core::synchronise::{synchronise, SyncReport};
use std::path::PathBuf;

/// Default settings file name, looked up next to the executable.
pub const DEFAULT_CONFIG_FILE: &str = "appsettings.json";

/// Upload a folder to Nextcloud, share every file publicly and clean up.
#[derive(Parser)]
#[clap(
    name = "share-sync",
    version,
    about = "Upload a local folder to Nextcloud, create public share links and remove uploaded files"
)]
pub struct Cli {
    /// Settings file (.json/.yaml for structured settings, anything else for
    /// the `key: value` line format). Defaults to appsettings.json next to
    /// the executable.
    #[clap(long)]
    pub config: Option<PathBuf>,
}

fn default_config_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Cannot locate the running executable")?;
    let dir = exe
        .parent()
        .context("Executable has no parent directory")?;
    Ok(dir.join(DEFAULT_CONFIG_FILE))
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };

    // Stdout-only logging until the configured sink is known.
    let startup_logging =
        LogContext::init(&LoggingConfig::default()).context("Failed to initialise logging")?;
    let loaded = load_config(&config_path);
    startup_logging.shutdown();

    let settings = match loaded
        .with_context(|| format!("Invalid configuration in {}", config_path.display()))?
    {
        ConfigLoad::Bootstrapped(path) => {
            println!(
                "Created placeholder configuration at {}. Fill it in and run again.",
                path.display()
            );
            return Ok(());
        }
        ConfigLoad::Loaded(settings) => settings,
    };

    let logging = LogContext::init(&settings.logging).context("Failed to initialise logging")?;
    tracing::info!(command = "sync", "Starting synchronisation");

    let result = sync_once(&settings).await;
    match &result {
        Ok(report) => tracing::info!(
            command = "sync",
            processed = report.files.len(),
            shared = report.shared(),
            retained = report.retained(),
            "Synchronisation complete"
        ),
        Err(e) => tracing::error!(command = "sync", error = ?e, "Synchronisation aborted"),
    }

    logging.shutdown();
    result.map(|_| ())
}

/// Builds the client and recorder described by `settings` and runs one pass.
pub async fn sync_once(settings: &Settings) -> Result<SyncReport> {
    let config = Configuration::new(settings.server.clone())?;
    let client = NextcloudClient::new(config.clone(), settings.share_payload)?;
    let recorder: Box<dyn LinkRecorder> = match &settings.database {
        Some(database) => Box::new(SqlRecorder::connect(database)?),
        None => Box::new(NoopRecorder),
    };

    let report = synchronise(&config, &client, recorder.as_ref()).await?;
    Ok(report)
}
