mod chunker;
mod config;
mod db;
mod entities;
mod error;
mod extractor;
mod importer;
mod loader;
mod models;
mod progress;
mod resolver;

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::Context;
use clap::Parser;

use crate::{
    config::Config,
    db::Datastore,
    importer::{ImportOptions, Importer},
    models::ImportMode,
    progress::BarProgress,
};

/// Import films from csv into the film, actor and director tables.
#[derive(Debug, Parser)]
#[command(name = "filmport", version)]
struct Cli {
    /// Path to the .csv file to import
    file: PathBuf,

    /// Update films and relations in place. By default the whole dataset is
    /// imported after truncating previously stored data.
    #[arg(short, long)]
    update: bool,

    /// For testing purposes, limit the dataset to the first rows
    /// (IMPORT_TEST_ROWS, 1000 by default).
    #[arg(short, long)]
    test: bool,

    /// Overrides DATABASE_URL.
    #[arg(long)]
    database_url: Option<String>,

    /// Hide progress bars.
    #[arg(short, long)]
    quiet: bool,
}

/// Raises the cancel flag and reports whether it was already raised.
fn already_interrupted(cancel: &AtomicBool) -> bool {
    cancel.swap(true, Ordering::Relaxed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,filmport=debug,sqlx=warn".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    if !cli.file.is_file() {
        anyhow::bail!("File not found. Please check correct path to {}", cli.file.display());
    }

    let database_url = cli.database_url.as_deref().unwrap_or(&config.database_url);
    let store = Datastore::connect(database_url)
        .await
        .with_context(|| format!("opening datastore {database_url}"))?;

    let mode = if cli.update { ImportMode::Update } else { ImportMode::Create };
    let mut options = ImportOptions::new(mode, config.scratch_dir.clone());
    options.batch_size = match mode {
        ImportMode::Create => config.create_batch_size,
        ImportMode::Update => config.update_batch_size,
    };
    options.segments = config.segments;
    options.malformed_rows = config.malformed_rows;
    options.row_limit = cli.test.then_some(config.test_rows);

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if already_interrupted(&cancel) {
                    tracing::warn!("second interrupt, exiting without waiting for the batch");
                    std::process::exit(130);
                }
                tracing::warn!("interrupt received, stopping after the current batch");
            }
        });
    }

    let progress = BarProgress::new(cli.quiet);
    let mut importer = Importer::new(&store, options, &progress).with_cancel_flag(cancel);
    let outcome = importer.run(&cli.file).await;
    tracing::debug!(state = %importer.state(), "importer stopped");
    let summary = outcome?;

    tracing::info!(
        mode = ?summary.mode,
        rows = summary.stats.rows_read,
        films_created = summary.stats.films_created,
        films_updated = summary.stats.films_updated,
        actors_created = summary.stats.actors_created,
        directors_created = summary.stats.directors_created,
        skipped = summary.stats.malformed_rows + summary.stats.rows_without_id,
        batches = summary.stats.batches,
        "done"
    );

    Ok(())
}
