//! Replace command handler.

use clap::Args;
use color_eyre::Result;

use crate::error::AppError;
use crate::services::{ReplacementOrchestrator, ReplacementReport, RunOptions};
use crate::store::{self, DocumentStore};

use super::{App, MigrationArgs};

/// Arguments for `replace`.
#[derive(Args, Debug, Clone, Default)]
pub struct ReplaceArgs {
    #[command(flatten)]
    pub migration: MigrationArgs,

    /// Write changes to the store (otherwise a dry run, unless config says otherwise)
    #[arg(long)]
    pub commit: bool,

    /// Skip re-reading and re-checking the collection after commit
    #[arg(long)]
    pub no_verify: bool,
}

impl App {
    /// Run the replace command.
    pub async fn run_replace(&self, args: &ReplaceArgs) -> Result<()> {
        let config = self.load_config()?;
        let mut options = RunOptions::from(&config.migration);
        args.migration.apply(&mut options);
        if args.commit {
            options.dry_run = false;
        }
        if args.no_verify {
            options.verify = false;
        }

        tracing::info!(
            "Replacing duplicate {} values in '{}' (scope: {:?}, library: {}, dry run: {})",
            options.field,
            options.collection,
            options.scope,
            options.library.as_deref().unwrap_or("any"),
            options.dry_run
        );

        let store = store::open(&config.store).await?;
        let report = replace_store(store, options).await?;

        self.print(&report, print_replacement)
    }
}

/// Runs a replacement against an opened store and closes it on every path,
/// including errors from the run itself.
pub async fn replace_store(
    store: Box<dyn DocumentStore>,
    options: RunOptions,
) -> Result<ReplacementReport, AppError> {
    let result = match ReplacementOrchestrator::new(store.as_ref(), options) {
        Ok(orchestrator) => orchestrator.run().await,
        Err(e) => Err(e),
    };
    store.close().await;
    result
}

fn print_replacement(report: &ReplacementReport) {
    println!("Collection:           {}", report.collection);
    println!("Outcome:              {}", report.outcome);
    println!("Documents:            {}", report.document_count);
    if report.matched_documents != report.document_count {
        println!("Matching library:     {}", report.matched_documents);
    }
    println!("Duplicate values:     {}", report.duplicates.len());
    println!("Occurrences replaced: {}", report.occurrences_replaced);
    println!("Affected documents:   {}", report.affected_documents);
    println!(
        "Corpus length:        {} -> {}",
        report.original_length, report.new_length
    );
    if let Some(swap) = &report.swap {
        println!(
            "Swap:                 deleted {}, inserted {} (transactional: {})",
            swap.deleted, swap.inserted, swap.transactional
        );
    }
    if report.updated > 0 {
        println!("Updated documents:    {}", report.updated);
    }
}
