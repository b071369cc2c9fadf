//! End-to-end replacement runs against the in-memory and file stores.

use content_migration::config::Scope;
use content_migration::models::{extended, Corpus, Document, ObjectId};
use content_migration::services::{
    DetectDuplicates, DuplicateDetector, Outcome, ReplacementOrchestrator, RunOptions,
};
use content_migration::store::backends::file::FileStore;
use content_migration::store::backends::memory::MemoryStore;
use content_migration::store::DocumentStore;
use serde_json::json;

const COLLECTION: &str = "h5p";
// Contains neither "abc" nor "123".
const FIXED_OID: &str = "5f9d88b9e4b0c8d6f4e3d2c1";

fn doc(value: serde_json::Value) -> Document {
    Document::from_value(value).unwrap()
}

fn commit_options() -> RunOptions {
    RunOptions {
        collection: COLLECTION.to_string(),
        dry_run: false,
        ..RunOptions::default()
    }
}

fn slides_document() -> Document {
    doc(json!({
        "_id": { "$oid": FIXED_OID },
        "slides": [
            { "subContentId": "abc" },
            { "subContentId": "123" },
            { "subContentId": "abc" }
        ]
    }))
}

fn quiz_document() -> Document {
    doc(json!({
        "_id": { "$oid": FIXED_OID },
        "updated": extended::date(chrono::DateTime::from_timestamp(1_600_000_000, 0).unwrap()),
        "slides": [
            { "subContentId": "abc", "title": "Intro" },
            { "subContentId": "abc", "title": "Outro" }
        ],
        "answers": [
            { "subContentId": "123" },
            { "subContentId": "123" },
            { "subContentId": "123" }
        ]
    }))
}

fn remaining_duplicates(documents: &[Document]) -> Vec<String> {
    let corpus = Corpus::serialize(documents).unwrap();
    DuplicateDetector::new("subContentId")
        .unwrap()
        .get_duplicates(corpus.as_str())
}

#[tokio::test]
async fn test_repeated_value_in_one_document_is_replaced() {
    let store = MemoryStore::with_collection(COLLECTION, vec![slides_document()]);
    let orchestrator = ReplacementOrchestrator::new(&store, commit_options()).unwrap();

    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.outcome, Outcome::Committed);
    assert_eq!(report.duplicates, vec!["abc".to_string()]);
    assert_eq!(report.occurrences_replaced, 2);

    let documents = store.snapshot(COLLECTION);
    assert_eq!(documents.len(), 1);
    assert!(remaining_duplicates(&documents).is_empty());

    let corpus = Corpus::serialize(&documents).unwrap();
    assert!(!corpus.as_str().contains("abc"));

    let slides = documents[0].get("slides").unwrap();
    assert_eq!(slides[1]["subContentId"], "123");
    assert_ne!(slides[0]["subContentId"], slides[2]["subContentId"]);
    assert_eq!(slides[0]["subContentId"].as_str().map(str::len), Some(36));
}

#[tokio::test]
async fn test_every_duplicate_replaced_and_object_id_kept() {
    let store = MemoryStore::with_collection(COLLECTION, vec![quiz_document()]);
    let orchestrator = ReplacementOrchestrator::new(&store, commit_options()).unwrap();

    let report = orchestrator.run().await.unwrap();

    // Keys serialize sorted, so "answers" is seen before "slides".
    assert_eq!(report.duplicates, vec!["123".to_string(), "abc".to_string()]);
    assert_eq!(report.occurrences_replaced, 5);

    let documents = store.snapshot(COLLECTION);
    assert!(remaining_duplicates(&documents).is_empty());

    let document = &documents[0];
    assert_eq!(
        document.id().and_then(ObjectId::from_value),
        ObjectId::parse_str(FIXED_OID)
    );
    assert_eq!(
        document.get("updated").and_then(extended::parse_date),
        chrono::DateTime::from_timestamp(1_600_000_000, 0)
    );
    assert_eq!(document.get("slides").unwrap()[1]["title"], "Outro");
}

#[tokio::test]
async fn test_uuid_duplicates_keep_corpus_length() {
    let duplicate = "0f8fad5b-d9cb-469f-a165-70867728950e";
    let documents = vec![
        doc(json!({ "_id": 1, "a": { "subContentId": duplicate } })),
        doc(json!({ "_id": 2, "b": { "subContentId": duplicate } })),
        doc(json!({ "_id": 3, "c": { "subContentId": "a1b2c3d4-0000-4000-8000-000000000000" } })),
    ];
    let store = MemoryStore::with_collection(COLLECTION, documents);
    let orchestrator = ReplacementOrchestrator::new(&store, commit_options()).unwrap();

    let report = orchestrator.run().await.unwrap();

    assert!(report.length_preserved());
    assert_eq!(report.affected_documents, 2);
    assert_eq!(store.snapshot(COLLECTION).len(), 3);
    assert!(remaining_duplicates(&store.snapshot(COLLECTION)).is_empty());
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let store = MemoryStore::with_collection(COLLECTION, vec![quiz_document()]);

    ReplacementOrchestrator::new(&store, commit_options())
        .unwrap()
        .run()
        .await
        .unwrap();
    let mutations = store.mutation_count();
    let after_first = store.snapshot(COLLECTION);

    let report = ReplacementOrchestrator::new(&store, commit_options())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::NoOp);
    assert_eq!(store.mutation_count(), mutations);
    assert_eq!(store.snapshot(COLLECTION), after_first);
}

#[tokio::test]
async fn test_document_scope_leaves_other_documents_untouched() {
    let untouched = doc(json!({ "_id": 7, "slides": [{ "subContentId": "abc" }] }));
    let store = MemoryStore::with_collection(COLLECTION, vec![untouched.clone(), slides_document()]);
    let options = RunOptions {
        scope: Scope::Document,
        ..commit_options()
    };

    let report = ReplacementOrchestrator::new(&store, options)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.updated, 1);
    let documents = store.snapshot(COLLECTION);
    assert_eq!(documents[0], untouched);
    let rewritten = Corpus::serialize_one(&documents[1]).unwrap();
    assert!(!rewritten.as_str().contains("abc"));
}

#[tokio::test]
async fn test_file_store_commit_rewrites_dump() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("h5p.json");
    let original = Corpus::serialize(&[quiz_document()]).unwrap();
    std::fs::write(&path, original.as_str()).unwrap();

    let store = FileStore::new(&path);
    let report = ReplacementOrchestrator::new(&store, commit_options())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Committed);
    assert!(report.swap.unwrap().transactional);

    let rewritten = store.find_all(COLLECTION).await.unwrap();
    assert_eq!(rewritten.len(), 1);
    assert!(remaining_duplicates(&rewritten).is_empty());
    assert_eq!(
        rewritten[0].id().and_then(ObjectId::from_value),
        ObjectId::parse_str(FIXED_OID)
    );
}

#[tokio::test]
async fn test_file_store_dry_run_leaves_dump_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("h5p.json");
    let original = Corpus::serialize(&[quiz_document()]).unwrap();
    std::fs::write(&path, original.as_str()).unwrap();

    let store = FileStore::new(&path);
    let options = RunOptions {
        collection: COLLECTION.to_string(),
        ..RunOptions::default()
    };
    let report = ReplacementOrchestrator::new(&store, options)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::DryRun);
    assert_eq!(report.occurrences_replaced, 5);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original.as_str());
}
