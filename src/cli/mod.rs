//! CLI module for content migrations.
//!
//! Subcommands:
//! - `scan`: Report duplicate identifiers without changing anything
//! - `replace`: Replace duplicate identifiers (dry run unless `--commit`)

mod replace;
mod scan;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::Result;

use crate::config::{Config, Scope, StoreConfig};
use crate::services::RunOptions;

pub use replace::{replace_store, ReplaceArgs};
pub use scan::scan_store;

/// Content migration - deduplicate embedded identifiers
#[derive(Parser)]
#[command(name = "content-migration")]
#[command(about = "Deduplicate subContentId values in content document collections")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use a JSON dump file as the store instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    pub store_file: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Report duplicate identifiers without writing
    Scan(MigrationArgs),

    /// Replace duplicate identifiers with fresh ones
    Replace(ReplaceArgs),
}

/// Overrides shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct MigrationArgs {
    /// Collection to process
    #[arg(long)]
    pub collection: Option<String>,

    /// Identifier field that must be unique
    #[arg(long)]
    pub field: Option<String>,

    /// Count duplicates across the whole collection or within each document
    #[arg(long, value_enum)]
    pub scope: Option<Scope>,

    /// Only process documents holding this content library (prefix match, document scope)
    #[arg(long, value_name = "PREFIX")]
    pub library: Option<String>,
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> Result<()> {
        match &self.command {
            Command::Scan(args) => self.run_scan(args).await,
            Command::Replace(args) => self.run_replace(args).await,
        }
    }

    /// Loads configuration, honouring `--store-file`.
    fn load_config(&self) -> Result<Config> {
        let config = match &self.store_file {
            Some(path) => Config::load_with_store(StoreConfig::File { path: path.clone() })?,
            None => Config::load()?,
        };
        Ok(config)
    }

    /// Prints a report either as JSON or through its human-readable form.
    fn print<T: serde::Serialize>(&self, report: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            human(report);
        }
        Ok(())
    }
}

impl MigrationArgs {
    /// Applies CLI overrides on top of the configured run options.
    pub fn apply(&self, options: &mut RunOptions) {
        if let Some(collection) = &self.collection {
            options.collection = collection.clone();
        }
        if let Some(field) = &self.field {
            options.field = field.clone();
        }
        if let Some(scope) = self.scope {
            options.scope = scope;
        }
        if let Some(library) = &self.library {
            options.library = Some(library.clone());
        }
    }
}
