//! Command handlers for the CLI.
//!
//! Area failures are reported inside the JSON output, not as a non-zero exit;
//! only configuration problems abort a run.

use std::path::Path;
use std::sync::Arc;

use sadomap_core::{AppConfig, AreaCatalog, AreaId};
use sadomap_ingest::{CsvDirSource, PoiBatch, PoiStore, RetryPolicy, SheetsClient, SourceReader};
use tokio_util::sync::CancellationToken;

/// Area ids to ingest: the requested ones, or every configured area.
pub(crate) fn requested_areas(catalog: &AreaCatalog, areas: &[String]) -> Vec<AreaId> {
    if areas.is_empty() {
        catalog.areas.iter().map(|a| a.id.clone()).collect()
    } else {
        areas.iter().map(|a| AreaId::new(a.trim())).collect()
    }
}

pub(crate) fn render_batch(batch: &PoiBatch, pretty: bool) -> anyhow::Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(batch)?
    } else {
        serde_json::to_string(batch)?
    };
    Ok(json)
}

fn build_source(config: &AppConfig, csv_dir: Option<&Path>) -> anyhow::Result<Arc<dyn SourceReader>> {
    match csv_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "reading areas from CSV files");
            Ok(Arc::new(CsvDirSource::new(dir)))
        }
        None => {
            let client = SheetsClient::from_config(config)
                .map_err(|e| anyhow::anyhow!("failed to build Sheets client: {e}"))?;
            Ok(Arc::new(client))
        }
    }
}

/// Ingest `areas` (or all of them) and print the merged batch to stdout.
///
/// # Errors
///
/// Returns an error if the areas file is invalid, an area id is unknown, the
/// Sheets credentials are missing, or the output cannot be written.
pub(crate) async fn run_fetch(
    config: &AppConfig,
    areas: &[String],
    csv_dir: Option<&Path>,
    pretty: bool,
) -> anyhow::Result<()> {
    let catalog = sadomap_core::load_areas(&config.areas_path)?;
    let requested = requested_areas(&catalog, areas);
    let source = build_source(config, csv_dir)?;
    let store = PoiStore::new(source, catalog, RetryPolicy::from_config(config));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; abandoning pending fetches");
            on_signal.cancel();
        }
    });

    let batch = store.get_pois(&requested, &cancel).await?;
    if batch.errors.is_empty() {
        tracing::info!(pois = batch.data.len(), areas = requested.len(), "fetch complete");
    } else {
        tracing::warn!(
            pois = batch.data.len(),
            failed_areas = batch.errors.len(),
            "fetch completed with area errors"
        );
    }

    println!("{}", render_batch(&batch, pretty)?);
    Ok(())
}

/// Print one line per configured area.
///
/// # Errors
///
/// Returns an error if the areas file cannot be loaded.
pub(crate) fn run_areas(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = sadomap_core::load_areas(&config.areas_path)?;
    for area in &catalog.areas {
        println!(
            "{:<20} {:<10} {}{}",
            area.id.as_str(),
            area.kind.as_str(),
            area.sheet,
            area.label
                .as_deref()
                .map(|l| format!(" ({l})"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

/// Load everything a fetch would need and report what is missing.
///
/// # Errors
///
/// Returns an error if the areas file is invalid.
pub(crate) fn run_check_config(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = sadomap_core::load_areas(&config.areas_path)?;
    println!("environment: {}", config.env);
    println!(
        "areas file:  {} ({} areas)",
        config.areas_path.display(),
        catalog.areas.len()
    );
    match SheetsClient::from_config(config) {
        Ok(_) => println!("sheets:      credentials present"),
        Err(e) => println!("sheets:      unavailable ({e}); use --csv-dir"),
    }
    Ok(())
}
