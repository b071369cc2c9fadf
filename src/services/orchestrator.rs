//! Replacement orchestration: load a collection, detect duplicate
//! identifiers, replace them, and write the result back.
//!
//! A run moves through `Idle → Loaded → Analyzed` and ends in one of three
//! outcomes:
//!
//! - [`Outcome::NoOp`]: no duplicates; the replacer is never called and the
//!   store is never written.
//! - [`Outcome::DryRun`]: duplicates found, replacement computed and parsed,
//!   nothing written.
//! - [`Outcome::Committed`]: the rewritten documents were written back.
//!
//! In [`Scope::Collection`] the whole collection is one corpus and is
//! swapped as a unit through [`DocumentStore::replace_all`]. Whether that swap
//! is transactional depends on the backend; the fallback is delete-then-insert
//! with no rollback. In [`Scope::Document`] each document is its own corpus
//! and only affected documents are rewritten, by `_id`. Document scope can
//! be narrowed to documents holding a given content library (see
//! [`LibraryFilter`]); the collection scope always swaps every document.

use std::fmt;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::config::{MigrationConfig, Scope};
use crate::error::AppError;
use crate::models::{Corpus, Document};
use crate::services::detector::{DetectDuplicates, DuplicateDetector};
use crate::services::filter::LibraryFilter;
use crate::services::replacer::{IdReplacer, ReplaceIds};
use crate::store::{DocumentStore, SwapCounts};

/// Parameters of a single run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub collection: String,
    pub field: String,
    pub scope: Scope,
    pub dry_run: bool,
    pub verify: bool,
    /// Library prefix selecting which documents to process (document scope).
    pub library: Option<String>,
}

impl From<&MigrationConfig> for RunOptions {
    fn from(config: &MigrationConfig) -> Self {
        Self {
            collection: config.collection.clone(),
            field: config.field.clone(),
            scope: config.scope,
            dry_run: config.dry_run,
            verify: config.verify,
            library: config.library.clone(),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from(&MigrationConfig::default())
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    NoOp,
    DryRun,
    Committed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::NoOp => "no-op",
            Outcome::DryRun => "dry-run",
            Outcome::Committed => "committed",
        };
        f.write_str(label)
    }
}

/// Summary of a replacement run.
#[derive(Debug, Clone, Serialize)]
pub struct ReplacementReport {
    pub collection: String,
    pub scope: Scope,
    pub outcome: Outcome,
    /// Documents in the collection.
    pub document_count: usize,
    /// Documents selected for processing (all of them without a library filter).
    pub matched_documents: usize,
    /// Duplicate values found (per document in document scope).
    pub duplicates: Vec<String>,
    /// Documents whose content changed.
    pub affected_documents: usize,
    pub occurrences_replaced: usize,
    /// Serialized length of the processed documents before the run.
    pub original_length: usize,
    /// Serialized length after replacement (equal to the original on no-op).
    pub new_length: usize,
    /// Collection swap counts (collection scope, committed runs).
    pub swap: Option<SwapCounts>,
    /// Documents rewritten one by one (document scope, committed runs).
    pub updated: u64,
}

impl ReplacementReport {
    fn new(options: &RunOptions, loaded: &Loaded, original_length: usize) -> Self {
        Self {
            collection: options.collection.clone(),
            scope: options.scope,
            outcome: Outcome::NoOp,
            document_count: loaded.total,
            matched_documents: loaded.documents.len(),
            duplicates: Vec::new(),
            affected_documents: 0,
            occurrences_replaced: 0,
            original_length,
            new_length: original_length,
            swap: None,
            updated: 0,
        }
    }

    pub fn length_preserved(&self) -> bool {
        self.original_length == self.new_length
    }
}

/// Result of a read-only scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub collection: String,
    pub scope: Scope,
    pub document_count: usize,
    pub matched_documents: usize,
    pub duplicates: Vec<String>,
    /// Documents containing at least one duplicate value.
    pub affected_documents: usize,
    pub corpus_length: usize,
}

/// Documents selected for a run, with the size of the whole collection.
struct Loaded {
    documents: Vec<Document>,
    total: usize,
}

/// Drives detection and replacement against a store.
///
/// The store is borrowed; opening and closing it is the caller's job.
pub struct ReplacementOrchestrator<'s, S: ?Sized, D = DuplicateDetector, R = IdReplacer> {
    store: &'s S,
    detector: D,
    replacer: R,
    filter: Option<LibraryFilter>,
    options: RunOptions,
}

impl<'s, S> ReplacementOrchestrator<'s, S>
where
    S: DocumentStore + ?Sized,
{
    /// Creates an orchestrator with the default detector for `options.field`
    /// and the UUID replacer.
    pub fn new(store: &'s S, options: RunOptions) -> Result<Self, AppError> {
        let detector = DuplicateDetector::new(&options.field)?;
        Self::with_components(store, options, detector, IdReplacer::new())
    }
}

impl<'s, S, D, R> ReplacementOrchestrator<'s, S, D, R>
where
    S: DocumentStore + ?Sized,
    D: DetectDuplicates,
    R: ReplaceIds,
{
    /// Creates an orchestrator from explicit components.
    ///
    /// A library filter needs document scope: a collection swap rewrites
    /// every document, so it cannot leave unselected ones out.
    pub fn with_components(
        store: &'s S,
        options: RunOptions,
        detector: D,
        replacer: R,
    ) -> Result<Self, AppError> {
        let filter = options.library.as_deref().map(LibraryFilter::new);
        if filter.is_some() && options.scope == Scope::Collection {
            return Err(AppError::InvalidOptions(
                "a library filter requires document scope".to_string(),
            ));
        }

        Ok(Self {
            store,
            detector,
            replacer,
            filter,
            options,
        })
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Reports duplicates without replacing or writing anything.
    pub async fn scan(&self) -> Result<ScanReport, AppError> {
        let loaded = self.load().await?;
        let documents = &loaded.documents;
        let corpus = Corpus::serialize(documents)?;

        let (duplicates, affected_documents) = match self.options.scope {
            Scope::Collection => {
                let duplicates = self.detector.get_duplicates(corpus.as_str());
                let mut affected = 0;
                for document in documents {
                    let text = Corpus::serialize_one(document)?;
                    if duplicates.iter().any(|d| text.as_str().contains(d.as_str())) {
                        affected += 1;
                    }
                }
                (duplicates, affected)
            }
            Scope::Document => {
                let mut duplicates = Vec::new();
                let mut affected = 0;
                for document in documents {
                    let text = Corpus::serialize_one(document)?;
                    let found = self.detector.get_duplicates(text.as_str());
                    if !found.is_empty() {
                        affected += 1;
                        duplicates.extend(found);
                    }
                }
                (duplicates, affected)
            }
        };

        tracing::info!(
            "Found {} duplicate values in {} of {} documents",
            duplicates.len(),
            affected_documents,
            documents.len()
        );

        Ok(ScanReport {
            collection: self.options.collection.clone(),
            scope: self.options.scope,
            document_count: loaded.total,
            matched_documents: documents.len(),
            duplicates,
            affected_documents,
            corpus_length: corpus.len(),
        })
    }

    /// Runs detection and replacement, writing back unless this is a dry run.
    pub async fn run(&self) -> Result<ReplacementReport, AppError> {
        let loaded = self.load().await?;

        let report = match self.options.scope {
            Scope::Collection => self.run_collection(loaded).await?,
            Scope::Document => self.run_per_document(loaded).await?,
        };

        tracing::info!(
            "Run on '{}' finished: {} ({} duplicate values, {} occurrences, {} documents affected)",
            report.collection,
            report.outcome,
            report.duplicates.len(),
            report.occurrences_replaced,
            report.affected_documents
        );
        Ok(report)
    }

    /// `Idle → Loaded`.
    async fn load(&self) -> Result<Loaded, AppError> {
        let collection = &self.options.collection;
        self.store.ensure_collection(collection).await?;

        let documents = self.store.find_all(collection).await?;
        let total = documents.len();
        tracing::info!("Loaded {} documents from '{}'", total, collection);

        let documents = self.select(documents);
        if let Some(filter) = &self.filter {
            tracing::info!(
                "Documents containing {}: {} of {}",
                filter.prefix(),
                documents.len(),
                total
            );
        }
        Ok(Loaded { documents, total })
    }

    /// Keeps the documents the library filter selects, or all of them.
    fn select(&self, mut documents: Vec<Document>) -> Vec<Document> {
        if let Some(filter) = &self.filter {
            documents.retain(|document| filter.matches(document));
        }
        documents
    }

    async fn run_collection(&self, loaded: Loaded) -> Result<ReplacementReport, AppError> {
        let collection = &self.options.collection;
        let original = Corpus::serialize(&loaded.documents)?;
        let mut report = ReplacementReport::new(&self.options, &loaded, original.len());
        let documents = loaded.documents;

        // Loaded → Analyzed
        let duplicates = self.detector.get_duplicates(original.as_str());
        tracing::info!(
            "Duplicate {} values: {}",
            self.options.field,
            duplicates.len()
        );
        if duplicates.is_empty() {
            tracing::info!("No duplicate {} values. Bailing out early...", self.options.field);
            return Ok(report);
        }

        let replacement = self
            .replacer
            .replace_with_new_ids(original.as_str(), &duplicates)?;
        report.occurrences_replaced = replacement.occurrences;
        let new_corpus = Corpus::from_text(replacement.text.into_owned());
        let mut new_documents = new_corpus.parse()?;

        report.duplicates = duplicates;
        report.new_length = new_corpus.len();
        report.affected_documents = documents
            .iter()
            .zip(&new_documents)
            .filter(|(before, after)| before != after)
            .count();
        self.log_length(&report);

        if self.options.dry_run {
            tracing::info!("Dry run: exiting without writing changes to '{}'", collection);
            report.outcome = Outcome::DryRun;
            return Ok(report);
        }

        // Identities the store would assign on insert are assigned here, so
        // verification knows the exact text to expect back.
        for document in &mut new_documents {
            document.ensure_id();
        }
        let expected = Corpus::serialize(&new_documents)?;

        tracing::info!("Writing {} documents to '{}'...", new_documents.len(), collection);
        let swap = self.store.replace_all(collection, &new_documents).await?;
        tracing::info!(
            "Swap complete: deleted {}, inserted {} (transactional: {})",
            swap.deleted,
            swap.inserted,
            swap.transactional
        );
        report.swap = Some(swap);
        report.outcome = Outcome::Committed;

        if self.options.verify {
            self.verify(expected.len()).await?;
        }
        Ok(report)
    }

    async fn run_per_document(&self, loaded: Loaded) -> Result<ReplacementReport, AppError> {
        let collection = &self.options.collection;
        let original_length = Corpus::serialize(&loaded.documents)?.len();
        let mut report = ReplacementReport::new(&self.options, &loaded, original_length);
        let documents = loaded.documents;

        let mut rewritten = documents.clone();
        let mut updates: Vec<(&JsonValue, usize)> = Vec::new();

        for (position, document) in documents.iter().enumerate() {
            let corpus = Corpus::serialize_one(document)?;
            let duplicates = self.detector.get_duplicates(corpus.as_str());
            if duplicates.is_empty() {
                continue;
            }

            let Some(id) = document.id() else {
                return Err(AppError::MissingDocumentKey(position));
            };
            tracing::debug!("Document {} has {} duplicate values", id, duplicates.len());

            let replacement = self
                .replacer
                .replace_with_new_ids(corpus.as_str(), &duplicates)?;
            report.occurrences_replaced += replacement.occurrences;
            rewritten[position] = Corpus::from_text(replacement.text.into_owned()).parse_one()?;

            report.duplicates.extend(duplicates);
            updates.push((id, position));
        }

        report.affected_documents = updates.len();
        tracing::info!("Total duplicate {} values: {}", self.options.field, report.duplicates.len());
        tracing::info!("Total documents affected: {}", updates.len());

        if updates.is_empty() {
            tracing::info!("No duplicates to replace. Exiting early...");
            return Ok(report);
        }

        let new_corpus = Corpus::serialize(&rewritten)?;
        report.new_length = new_corpus.len();
        self.log_length(&report);

        if self.options.dry_run {
            tracing::info!("Dry run: exiting without writing changes to '{}'", collection);
            report.outcome = Outcome::DryRun;
            return Ok(report);
        }

        tracing::info!("Writing {} documents to '{}'...", updates.len(), collection);
        for (id, position) in updates {
            let replaced = self
                .store
                .replace_one(collection, id, &rewritten[position])
                .await?;
            if replaced == 0 {
                tracing::warn!("Document {} disappeared before it could be replaced", id);
            }
            report.updated += replaced;
        }
        report.outcome = Outcome::Committed;

        if self.options.verify {
            self.verify(new_corpus.len()).await?;
        }
        Ok(report)
    }

    /// Re-reads the collection and checks the committed state of the
    /// documents the run selected.
    async fn verify(&self, expected_length: usize) -> Result<(), AppError> {
        let collection = &self.options.collection;
        let documents = self.select(self.store.find_all(collection).await?);
        let corpus = Corpus::serialize(&documents)?;

        let remaining = match self.options.scope {
            Scope::Collection => self.detector.get_duplicates(corpus.as_str()).len(),
            Scope::Document => documents
                .iter()
                .map(|document| {
                    Corpus::serialize_one(document)
                        .map(|text| self.detector.get_duplicates(text.as_str()).len())
                })
                .sum::<Result<usize, AppError>>()?,
        };

        if remaining > 0 {
            return Err(AppError::Verification {
                collection: collection.clone(),
                reason: format!("{} duplicate values remain after commit", remaining),
            });
        }
        if corpus.len() != expected_length {
            return Err(AppError::Verification {
                collection: collection.clone(),
                reason: format!(
                    "corpus length is {}, expected {}",
                    corpus.len(),
                    expected_length
                ),
            });
        }

        tracing::info!("Verified '{}': no duplicates, corpus length {}", collection, corpus.len());
        Ok(())
    }

    fn log_length(&self, report: &ReplacementReport) {
        if report.length_preserved() {
            tracing::info!("Corpus length preserved: {}", report.new_length);
        } else {
            tracing::warn!(
                "Corpus length changed from {} to {} (duplicate values were not 36-character identifiers)",
                report.original_length,
                report.new_length
            );
        }
    }
}
