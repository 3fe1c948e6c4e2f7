// darci-sync - Google Sheet to dclisync roster sync
//
// Reads Bungie names (name#tag) from the first column of a Google Sheet and
// registers the ones dclisync does not know yet, one at a time.
//
// Architecture:
// - Sheets (reqwest): service-account token + values.get for the roster
// - Store (rusqlite): read-only view of dclisync's members table
// - Backend (tokio::process): `dclisync --list` / `--add` child processes
// - Sync: reconcile the two rosters and pace the adds
//
// One invocation is one pass; scheduling is left to cron or a systemd timer.

mod backend;
mod cli;
mod config;
mod diagnostics;
mod identifier;
mod logging;
mod secret;
mod sheets;
mod store;
mod sync;

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::Instrument;

use backend::DcliBackend;
use cli::{Cli, Commands};
use config::Config;
use sheets::{GoogleSheetsSource, RosterSource, SourceError};
use store::SqliteMemberDirectory;
use sync::{SyncManager, SyncOptions, SyncOutcome};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let explicit = cli.config.as_deref();
    let command = cli.command();

    // --path and --init must work even when the file does not parse
    if let Commands::Config {
        path, init, force, ..
    } = &command
    {
        if cli::handle_config_file(explicit, *path, *init, *force)? {
            return Ok(ExitCode::SUCCESS);
        }
    }

    let config = Config::load(explicit)?;

    // Keep the guard alive so buffered file logs flush on exit
    let _log_guard = logging::init(&config.logging);

    match command {
        Commands::Sync { dry_run, json } => run_sync(&config, dry_run, json).await,
        Commands::Check => {
            diagnostics::run_checks(&config).await;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Lookup { name } => {
            cli::handle_lookup(&cli::member_store(&config), &name)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { show: true, .. } => {
            cli::handle_config_show(&config, explicit);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { .. } => {
            println!("Usage: darci-sync config [--show|--path|--init [--force]]");
            println!();
            println!("Options:");
            println!("  --show    Display effective configuration (secrets masked)");
            println!("  --path    Show config file path");
            println!("  --init    Write the default config file");
            println!("  --force   Overwrite an existing file with --init");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// One sync pass. Fails only when the sheet cannot be read.
async fn run_sync(config: &Config, dry_run: bool, json: bool) -> Result<ExitCode> {
    let run_id = sync::generate_run_id();
    let span = tracing::info_span!("sync", run_id = %run_id);

    async {
        tracing::info!(dry_run, "starting user sync");
        match &config.dcli.api_key {
            Some(key) => tracing::debug!(api_key = %key.fingerprint(), "using Bungie API key"),
            None => tracing::warn!("BUNGIE_API_KEY not set, dclisync calls will fail"),
        }

        let source = if config.sheet.is_configured() {
            let source = GoogleSheetsSource::new(&config.sheet)
                .context("failed to set up Google Sheets")?;
            Some(source)
        } else {
            None
        };
        let store = SqliteMemberDirectory::new(config.dcli.db_path());
        let backend = DcliBackend::from_config(&config.dcli);
        let options = SyncOptions {
            dry_run,
            add_delay: config.dcli.add_delay(),
        };

        let manager = SyncManager::new(
            source.as_ref().map(|s| s as &dyn RosterSource),
            &store,
            &backend,
            options,
        );
        let result = manager.run().await;
        match &result {
            Ok(outcome) if json => println!("{}", serde_json::to_string_pretty(outcome)?),
            Ok(outcome) => println!("{}", outcome),
            Err(e) => {
                tracing::error!(error = %e, "failed to read users from sheet");
                eprintln!("Error: failed to read users from sheet: {}", e);
            }
        }

        Ok::<_, anyhow::Error>(exit_code(&result))
    }
    .instrument(span)
    .await
}

/// Only an unreadable sheet fails the process. Per-user add failures are
/// part of a completed pass.
fn exit_code(result: &Result<SyncOutcome, SourceError>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::sync::testing::{FakeBackend, FakeDirectory, FakeSource};

    async fn pass(source: &FakeSource, backend: &FakeBackend) -> Result<SyncOutcome, SourceError> {
        let source: &dyn RosterSource = source;
        let store = FakeDirectory::with(&["alpha#1111"]);
        let options = SyncOptions {
            dry_run: false,
            add_delay: Duration::from_secs(2),
        };
        SyncManager::new(Some(source), &store, backend, options)
            .run()
            .await
    }

    #[tokio::test]
    async fn test_failed_add_still_exits_zero() {
        let source = FakeSource::column(&["Alpha#1111", "beta#2222"]);
        let backend = FakeBackend::listing(&[]).failing_on(&["beta#2222"]);

        let result = pass(&source, &backend).await;

        match &result {
            Ok(SyncOutcome::Completed(report)) => {
                assert_eq!(report.succeeded(), 0);
                assert_eq!(report.failed(), 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(exit_code(&result), ExitCode::SUCCESS);
    }

    #[tokio::test]
    async fn test_sheet_failure_exits_non_zero() {
        let source = FakeSource::failing();
        let backend = FakeBackend::listing(&[]);

        let result = pass(&source, &backend).await;

        assert!(result.is_err());
        assert_eq!(exit_code(&result), ExitCode::FAILURE);
        assert!(backend.attempted().is_empty());
    }

    #[test]
    fn test_skipped_and_up_to_date_exit_zero() {
        assert_eq!(exit_code(&Ok(SyncOutcome::Skipped)), ExitCode::SUCCESS);
        assert_eq!(
            exit_code(&Ok(SyncOutcome::UpToDate { candidates: 3 })),
            ExitCode::SUCCESS
        );
    }
}
