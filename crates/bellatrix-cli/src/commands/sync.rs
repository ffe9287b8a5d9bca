use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use bellatrix_core::{DeclaredState, OwnershipMarker};
use bellatrix_ngsi::NgsiClient;
use bellatrix_reconcile::{Reconciler, ReconcilerConfig, RunReport};

use crate::cli::OutputFormat;
use crate::config::ResolvedSettings;
use crate::output::print_report;

pub async fn sync(
    state_file: &Path,
    settings: &ResolvedSettings,
    format: OutputFormat,
) -> Result<()> {
    let report = reconcile(state_file, settings).await?;
    print_report(&report, format)?;
    tracing::info!("Done, hope you had a nice sync :D");
    Ok(())
}

/// Load the state file and run one reconciliation against its broker.
pub async fn reconcile(state_file: &Path, settings: &ResolvedSettings) -> Result<RunReport> {
    tracing::info!(file_path = %state_file.display(), "Reading the declared state");
    let marker = OwnershipMarker::new(settings.instance_prefix.clone());
    let state = DeclaredState::from_path(state_file)
        .context("Failed to load the declared state")?
        .tag(&marker);

    let options = state.client_options();
    let client = NgsiClient::with_options(
        &options.client_url,
        &options.additional_headers,
        settings.client_options(),
    )
    .context("Failed to set up the broker client")?;
    tracing::debug!(broker = %client.base_url(), "Broker client ready");

    let reconciler = Reconciler::new(
        Arc::new(client),
        ReconcilerConfig {
            dry_run: settings.dry_run,
        },
    );
    let report = reconciler.run(&state).await?;
    Ok(report)
}
