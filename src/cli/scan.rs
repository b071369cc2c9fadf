//! Scan command handler.

use color_eyre::Result;

use crate::error::AppError;
use crate::services::{ReplacementOrchestrator, RunOptions, ScanReport};
use crate::store::{self, DocumentStore};

use super::{App, MigrationArgs};

impl App {
    /// Run the scan command: load, detect, report. Never writes.
    pub async fn run_scan(&self, args: &MigrationArgs) -> Result<()> {
        let config = self.load_config()?;
        let mut options = RunOptions::from(&config.migration);
        args.apply(&mut options);
        options.dry_run = true;

        let store = store::open(&config.store).await?;
        let report = scan_store(store, options).await?;

        self.print(&report, print_scan)
    }
}

/// Scans an opened store and closes it, whether or not the scan succeeded.
pub async fn scan_store(
    store: Box<dyn DocumentStore>,
    options: RunOptions,
) -> Result<ScanReport, AppError> {
    let result = match ReplacementOrchestrator::new(store.as_ref(), options) {
        Ok(orchestrator) => orchestrator.scan().await,
        Err(e) => Err(e),
    };
    store.close().await;
    result
}

fn print_scan(report: &ScanReport) {
    println!("Collection:         {}", report.collection);
    println!("Documents:          {}", report.document_count);
    if report.matched_documents != report.document_count {
        println!("Matching library:   {}", report.matched_documents);
    }
    println!("Corpus length:      {}", report.corpus_length);
    println!("Duplicate values:   {}", report.duplicates.len());
    println!("Affected documents: {}", report.affected_documents);
    for value in &report.duplicates {
        println!("  {}", value);
    }
}
