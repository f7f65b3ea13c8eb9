use std::path::Path;

use redb::{Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::debug;

use newsreel_common::Document;

use crate::error::{Result, StoreError};

/// Serialized documents keyed by their opaque file id.
const ARTICLES: TableDefinition<&str, &[u8]> = TableDefinition::new("articles");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    Replaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Absent,
}

/// Durable file-id → document store. All writes are ACID (backed by `redb`);
/// a `put`/`delete` returns only after the commit is durable. Reads through
/// a [`ReadSnapshot`] see a point-in-time MVCC view: writes committed after
/// `snapshot()` are invisible through that handle.
///
/// Concurrent puts for the same file id are serialized by the single-writer
/// commit order — last writer wins, and the Created/Replaced answer is
/// decided inside the same write transaction, so it cannot misreport what
/// was overwritten.
pub struct DocumentStore {
    db: Database,
}

impl DocumentStore {
    /// Open or create the store at the given path. With `fail_if_missing`
    /// the call refuses to create a fresh database.
    pub fn open(path: &Path, fail_if_missing: bool) -> Result<Self> {
        if fail_if_missing && !path.exists() {
            return Err(StoreError::Missing(path.display().to_string()));
        }
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// In-memory store for tests and ephemeral runs.
    pub fn open_in_memory() -> Result<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder().create_with_backend(backend)?;
        Self::init(db)
    }

    fn init(db: Database) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(ARTICLES)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Durably write a document under its file id.
    pub fn put(&self, document: &Document) -> Result<PutOutcome> {
        let bytes = serde_json::to_vec(document)?;
        let write_txn = self.db.begin_write()?;
        let replaced = {
            let mut table = write_txn.open_table(ARTICLES)?;
            let prev = table.insert(document.file_id.as_str(), bytes.as_slice())?;
            prev.is_some()
        };
        write_txn.commit()?;
        Ok(if replaced {
            PutOutcome::Replaced
        } else {
            PutOutcome::Created
        })
    }

    /// Durably remove a document.
    pub fn delete(&self, file_id: &str) -> Result<DeleteOutcome> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(ARTICLES)?;
            let prev = table.remove(file_id)?;
            prev.is_some()
        };
        write_txn.commit()?;
        Ok(if removed {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::Absent
        })
    }

    pub fn get(&self, file_id: &str) -> Result<Option<Document>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ARTICLES)?;
        let Some(guard) = table.get(file_id)? else {
            return Ok(None);
        };
        let document = serde_json::from_slice(guard.value())?;
        Ok(Some(document))
    }

    pub fn contains(&self, file_id: &str) -> Result<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ARTICLES)?;
        Ok(table.get(file_id)?.is_some())
    }

    /// Take a point-in-time read handle. Writes committed afterwards are
    /// invisible through it.
    pub fn snapshot(&self) -> Result<ReadSnapshot> {
        Ok(ReadSnapshot {
            txn: self.db.begin_read()?,
        })
    }
}

/// A consistent view of the store at the moment `snapshot()` was called.
pub struct ReadSnapshot {
    txn: ReadTransaction,
}

impl ReadSnapshot {
    /// Materialize every decodable document in the snapshot. Rows that fail
    /// to decode are logged and skipped — a corrupt record must not poison a
    /// rebuild. Embeddings are re-normalized on the way in: clustering
    /// assumes unit vectors.
    pub fn scan(&self) -> Result<Vec<Document>> {
        let table = match self.txn.open_table(ARTICLES) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut documents = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            match serde_json::from_slice::<Document>(value.value()) {
                Ok(mut document) => {
                    document.normalize_embeddings();
                    documents.push(document);
                }
                Err(e) => {
                    debug!(file_id = key.value(), error = %e, "Skipping undecodable row");
                }
            }
        }
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsreel_common::{Category, EmbeddingKey, Language};
    use std::collections::HashMap;

    fn doc(file_id: &str, fetch_time: u64) -> Document {
        Document {
            file_id: file_id.to_string(),
            url: format!("https://example.com/{file_id}"),
            host: "example.com".to_string(),
            title: format!("Title {file_id}"),
            pub_time: 0,
            fetch_time,
            ttl_secs: 3600,
            language: Language::En,
            category: Category::Society,
            embeddings: HashMap::new(),
        }
    }

    #[test]
    fn put_reports_created_then_replaced() {
        let store = DocumentStore::open_in_memory().unwrap();
        assert_eq!(store.put(&doc("a", 1)).unwrap(), PutOutcome::Created);
        assert_eq!(store.put(&doc("a", 2)).unwrap(), PutOutcome::Replaced);
        assert_eq!(store.get("a").unwrap().unwrap().fetch_time, 2);
    }

    #[test]
    fn delete_reports_deleted_then_absent() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.put(&doc("a", 1)).unwrap();
        assert_eq!(store.delete("a").unwrap(), DeleteOutcome::Deleted);
        assert_eq!(store.delete("a").unwrap(), DeleteOutcome::Absent);
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn contains_probes_existence() {
        let store = DocumentStore::open_in_memory().unwrap();
        assert!(!store.contains("a").unwrap());
        store.put(&doc("a", 1)).unwrap();
        assert!(store.contains("a").unwrap());
    }

    #[test]
    fn snapshot_is_point_in_time() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.put(&doc("a", 1)).unwrap();

        let snapshot = store.snapshot().unwrap();
        store.put(&doc("b", 2)).unwrap();
        store.delete("a").unwrap();

        let seen: Vec<String> = snapshot
            .scan()
            .unwrap()
            .into_iter()
            .map(|d| d.file_id)
            .collect();
        assert_eq!(seen, vec!["a".to_string()]);

        let fresh: Vec<String> = store
            .snapshot()
            .unwrap()
            .scan()
            .unwrap()
            .into_iter()
            .map(|d| d.file_id)
            .collect();
        assert_eq!(fresh, vec!["b".to_string()]);
    }

    #[test]
    fn scan_skips_undecodable_rows() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.put(&doc("good", 1)).unwrap();

        let write_txn = store.db.begin_write().unwrap();
        {
            let mut table = write_txn.open_table(ARTICLES).unwrap();
            table.insert("bad", b"not json".as_slice()).unwrap();
        }
        write_txn.commit().unwrap();

        let docs = store.snapshot().unwrap().scan().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].file_id, "good");
    }

    #[test]
    fn scan_normalizes_embeddings() {
        let store = DocumentStore::open_in_memory().unwrap();
        let mut d = doc("a", 1);
        d.embeddings.insert(EmbeddingKey::Sentence, vec![3.0, 4.0]);
        store.put(&d).unwrap();

        let docs = store.snapshot().unwrap().scan().unwrap();
        let embedding = docs[0].embedding(EmbeddingKey::Sentence).unwrap();
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }
}
