//! In-memory document store.
//!
//! Holds collections in a mutex-guarded map and counts mutating calls, so
//! tests can assert that a run never touched the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::models::Document;
use crate::store::traits::{DocumentStore, SwapCounts};

/// In-memory store. Swaps happen under one lock and are therefore atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    mutations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with one pre-populated collection.
    ///
    /// Documents without an `_id` get one, as they would on insert.
    pub fn with_collection(collection: &str, documents: Vec<Document>) -> Self {
        let documents = documents
            .into_iter()
            .map(|mut doc| {
                doc.ensure_id();
                doc
            })
            .collect();
        let store = Self::new();
        if let Ok(mut collections) = store.collections.lock() {
            collections.insert(collection.to_string(), documents);
        }
        store
    }

    /// Returns a copy of a collection's current contents.
    pub fn snapshot(&self, collection: &str) -> Vec<Document> {
        self.lock()
            .map(|collections| collections.get(collection).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Number of mutating calls received so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<Document>>>, AppError> {
        self.collections
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }

    fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

fn with_ids(documents: &[Document]) -> Vec<Document> {
    documents
        .iter()
        .cloned()
        .map(|mut doc| {
            doc.ensure_id();
            doc
        })
        .collect()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, AppError> {
        Ok(self.lock()?.get(collection).cloned().unwrap_or_default())
    }

    async fn delete_all(&self, collection: &str) -> Result<u64, AppError> {
        self.record_mutation();
        let removed = self.lock()?.remove(collection).unwrap_or_default();
        Ok(removed.len() as u64)
    }

    async fn insert_all(&self, collection: &str, documents: &[Document]) -> Result<u64, AppError> {
        self.record_mutation();
        self.lock()?
            .entry(collection.to_string())
            .or_default()
            .extend(with_ids(documents));
        Ok(documents.len() as u64)
    }

    async fn replace_one(
        &self,
        collection: &str,
        id: &JsonValue,
        document: &Document,
    ) -> Result<u64, AppError> {
        self.record_mutation();
        let mut collections = self.lock()?;
        let slot = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id() == Some(id)));

        match slot {
            Some(existing) => {
                *existing = document.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn replace_all(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<SwapCounts, AppError> {
        self.record_mutation();
        let replacement = with_ids(documents);
        let inserted = replacement.len() as u64;
        let previous = self
            .lock()?
            .insert(collection.to_string(), replacement)
            .unwrap_or_default();

        Ok(SwapCounts {
            deleted: previous.len() as u64,
            inserted,
            transactional: true,
        })
    }
}
