//! Core trait for document store abstraction.
//!
//! The migration engine only needs a handful of whole-collection operations,
//! so every backend implements the same capability surface:
//!
//! - [`DocumentStore::find_all`] - read a collection in order
//! - [`DocumentStore::delete_all`] / [`DocumentStore::insert_all`] - the two halves of a swap
//! - [`DocumentStore::replace_all`] - the swap itself, transactional where the backend can
//! - [`DocumentStore::replace_one`] - rewrite one document by identity

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::models::Document;

/// Counts reported by a collection swap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SwapCounts {
    /// Documents removed.
    pub deleted: u64,
    /// Documents written back.
    pub inserted: u64,
    /// Whether both steps ran inside one transaction.
    pub transactional: bool,
}

/// A store holding named collections of documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Prepares a collection for use (e.g. creates its table).
    ///
    /// Backends without a schema need not override this.
    async fn ensure_collection(&self, _collection: &str) -> Result<(), AppError> {
        Ok(())
    }

    /// Reads every document of a collection, in store order.
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, AppError>;

    /// Deletes every document of a collection and returns how many were removed.
    async fn delete_all(&self, collection: &str) -> Result<u64, AppError>;

    /// Appends documents to a collection and returns how many were written.
    ///
    /// Documents without an `_id` get a fresh object id.
    async fn insert_all(&self, collection: &str, documents: &[Document]) -> Result<u64, AppError>;

    /// Replaces the document whose `_id` equals `id`. Returns the number of documents replaced.
    async fn replace_one(
        &self,
        collection: &str,
        id: &JsonValue,
        document: &Document,
    ) -> Result<u64, AppError>;

    /// Swaps the full contents of a collection.
    ///
    /// The default runs [`delete_all`](DocumentStore::delete_all) then
    /// [`insert_all`](DocumentStore::insert_all) as two independent steps. A
    /// failure between them leaves the collection empty or partially written;
    /// no rollback is attempted. Backends with transactions override this.
    async fn replace_all(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<SwapCounts, AppError> {
        tracing::warn!(
            "Swapping '{}' without a transaction: a failure after delete loses data",
            collection
        );

        let deleted = self.delete_all(collection).await?;
        tracing::info!("Deleted {} documents from '{}'", deleted, collection);

        let inserted = self.insert_all(collection, documents).await?;
        tracing::info!("Inserted {} documents into '{}'", inserted, collection);

        Ok(SwapCounts {
            deleted,
            inserted,
            transactional: false,
        })
    }

    /// Releases connections. Called once on every exit path.
    async fn close(&self) {}
}
