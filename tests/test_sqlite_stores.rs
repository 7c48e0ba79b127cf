//! Integration tests for the SQLite catalog and vector backends.
//!
//! Run with:
//!   cargo test --features sqlite --test test_sqlite_stores

use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::{NamedTempFile, TempDir};

use catalog_search::catalog::sqlite::SqliteCatalogStore;
use catalog_search::catalog::{CatalogRecord, CatalogStore, ImagePayload};
use catalog_search::index::embedder::HashingEmbedder;
use catalog_search::index::sqlite::SqliteVectorStore;
use catalog_search::index::{Embedder, EmbeddingIndex, VectorIndex, VectorStore};
use catalog_search::llm::LlmProvider;
use catalog_search::llm::providers::fixed::StaticProvider;
use catalog_search::search::{CatalogService, build_document};

// ── helpers ──────────────────────────────────────────────────────────────────

fn record(name: &str, category: &str) -> CatalogRecord {
    CatalogRecord {
        id: None,
        name: name.into(),
        description: format!("{name} for everyday use"),
        brand: "Acme".into(),
        category: category.into(),
        price: 12.5,
        release_date: NaiveDate::from_ymd_opt(2023, 11, 2).unwrap(),
        available: true,
        stock_quantity: 8,
        image: None,
    }
}

fn hashing_index(store: SqliteVectorStore) -> EmbeddingIndex {
    EmbeddingIndex::new(
        Embedder::Hashing(HashingEmbedder::new(128)),
        Arc::new(store) as Arc<dyn VectorStore>,
    )
}

// ── SqliteCatalogStore ────────────────────────────────────────────────────────

#[test]
fn catalog_open_creates_db() {
    let tmp = TempDir::new().expect("tempdir");
    let store = SqliteCatalogStore::open(tmp.path()).expect("open should succeed");
    assert!(store.db_path().exists());
    assert!(tmp.path().join("catalog.db").exists());
}

#[test]
fn catalog_records_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let saved = {
        let store = SqliteCatalogStore::open(tmp.path()).unwrap();
        let mut r = record("Wireless Mouse", "Electronics");
        r.image = Some(ImagePayload {
            name: "mouse.png".into(),
            content_type: "image/png".into(),
            data: vec![0x89, b'P', b'N', b'G'],
        });
        store.save(r).unwrap()
    };

    let reopened = SqliteCatalogStore::open(tmp.path()).unwrap();
    let fetched = reopened.find_by_id(saved.id.unwrap()).unwrap();
    assert_eq!(fetched, Some(saved));
}

#[test]
fn catalog_ids_are_not_reused_after_reopen() {
    let tmp = TempDir::new().unwrap();
    let first = SqliteCatalogStore::open(tmp.path()).unwrap().save(record("A", "X")).unwrap();
    let second = SqliteCatalogStore::open(tmp.path()).unwrap().save(record("B", "X")).unwrap();
    assert!(second.id.unwrap() > first.id.unwrap());
}

#[test]
fn catalog_batched_lookup_skips_unknown() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteCatalogStore::open(tmp.path()).unwrap();
    let a = store.save(record("A", "X")).unwrap();
    let b = store.save(record("B", "X")).unwrap();

    let found = store.find_all_by_id(&[b.id.unwrap(), 404, a.id.unwrap()]).unwrap();
    assert_eq!(found, vec![a, b]);
}

// ── SqliteVectorStore ────────────────────────────────────────────────────────

#[test]
fn index_open_creates_db() {
    let tmp = TempDir::new().unwrap();
    let _store = SqliteVectorStore::open(tmp.path()).expect("open should succeed");
    assert!(tmp.path().join("index.db").exists());
}

#[tokio::test]
async fn index_documents_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let mut r = record("Wireless Mouse", "Electronics");
    r.id = Some(42);
    let doc = build_document(&r).unwrap();

    hashing_index(SqliteVectorStore::open(tmp.path()).unwrap())
        .upsert(doc.clone())
        .await
        .unwrap();

    let reopened = hashing_index(SqliteVectorStore::open(tmp.path()).unwrap());
    let hits = reopened.similarity_search("cheap wireless mouse", 5, 0.70).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document, doc);
    assert_eq!(hits[0].document.record_id(), Some(42));
}

// ── CatalogService over SQLite ───────────────────────────────────────────────

#[tokio::test]
async fn service_over_sqlite_saves_indexes_and_searches() {
    let tmp = TempDir::new().unwrap();
    let mut template = NamedTempFile::new().unwrap();
    template.write_all(b"{{user_query}}\n{{context}}").unwrap();

    let catalog: Arc<dyn CatalogStore> = Arc::new(SqliteCatalogStore::open(tmp.path()).unwrap());
    let vectors = Arc::new(SqliteVectorStore::open(tmp.path()).unwrap());
    let index = EmbeddingIndex::new(
        Embedder::Hashing(HashingEmbedder::new(128)),
        Arc::clone(&vectors) as Arc<dyn VectorStore>,
    );
    let service = CatalogService::new(
        catalog,
        index,
        LlmProvider::Static(StaticProvider::new(r#"[{"id": 1}]"#)),
        template.path(),
    );

    let saved = service.save(record("Wireless Mouse", "Electronics"), None).await.unwrap();
    assert_eq!(saved.id, Some(1));
    assert_eq!(vectors.len().unwrap(), 1);

    let found = service.search("cheap wireless mouse").await.unwrap();
    assert_eq!(found, vec![saved.clone()]);

    assert!(service.delete(1).await.unwrap());
    assert_eq!(vectors.len().unwrap(), 0);
    assert!(service.search("wireless mouse").await.unwrap().is_empty());
}
