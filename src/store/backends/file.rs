//! JSON dump file backend.
//!
//! The file holds one collection as a JSON array in canonical corpus form,
//! the same text an export of the collection produces. Every write goes to
//! a temporary file in the same directory which is then renamed over the
//! original, so a collection swap is all-or-nothing.
//!
//! The collection name passed to each call is only used for logging: a dump
//! file is a single collection.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tempfile::NamedTempFile;

use crate::error::AppError;
use crate::models::{Corpus, Document};
use crate::store::traits::{DocumentStore, SwapCounts};

/// Store backed by a single JSON dump file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the dump. A missing file is an empty collection.
    async fn read(&self) -> Result<Vec<Document>, AppError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(Vec::new()),
            Ok(text) => Corpus::from_text(text).parse(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically replaces the dump with the given documents.
    async fn write(&self, documents: Vec<Document>) -> Result<(), AppError> {
        let corpus = Corpus::serialize(&documents)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, corpus.as_str()))
            .await
            .map_err(|e| AppError::Internal(format!("File write task failed: {}", e)))?
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| AppError::Io(e.error))?;
    Ok(())
}

fn with_ids(documents: &[Document]) -> impl Iterator<Item = Document> + '_ {
    documents.iter().cloned().map(|mut doc| {
        doc.ensure_id();
        doc
    })
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, AppError> {
        tracing::debug!("Reading '{}' from {}", collection, self.path.display());
        self.read().await
    }

    async fn delete_all(&self, collection: &str) -> Result<u64, AppError> {
        let existing = self.read().await?;
        tracing::debug!("Truncating '{}' in {}", collection, self.path.display());
        self.write(Vec::new()).await?;
        Ok(existing.len() as u64)
    }

    async fn insert_all(&self, collection: &str, documents: &[Document]) -> Result<u64, AppError> {
        let mut existing = self.read().await?;
        existing.extend(with_ids(documents));
        tracing::debug!(
            "Appending {} documents to '{}' in {}",
            documents.len(),
            collection,
            self.path.display()
        );
        self.write(existing).await?;
        Ok(documents.len() as u64)
    }

    async fn replace_one(
        &self,
        _collection: &str,
        id: &JsonValue,
        document: &Document,
    ) -> Result<u64, AppError> {
        let mut existing = self.read().await?;
        let Some(slot) = existing.iter_mut().find(|doc| doc.id() == Some(id)) else {
            return Ok(0);
        };
        *slot = document.clone();
        self.write(existing).await?;
        Ok(1)
    }

    async fn replace_all(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<SwapCounts, AppError> {
        let deleted = self.read().await?.len() as u64;
        tracing::info!(
            "Rewriting '{}' in {} ({} -> {} documents)",
            collection,
            self.path.display(),
            deleted,
            documents.len()
        );
        self.write(with_ids(documents).collect()).await?;

        Ok(SwapCounts {
            deleted,
            inserted: documents.len() as u64,
            transactional: true,
        })
    }
}
