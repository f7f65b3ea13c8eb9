//! TTL-based eviction of the working set.

use tracing::{info, warn};

use newsreel_common::Document;
use newsreel_store::DocumentStore;

/// Drop documents whose TTL expired relative to the freshest fetch time in
/// the working set, and delete them from the store. Deletes are best-effort:
/// a failure is logged and the document is retried on the next cycle (it is
/// still excluded from this cycle's index).
pub fn evict_stale(store: &DocumentStore, documents: Vec<Document>) -> Vec<Document> {
    let reference_time = documents.iter().map(|d| d.fetch_time).max().unwrap_or(0);
    let (live, stale): (Vec<Document>, Vec<Document>) = documents
        .into_iter()
        .partition(|d| !d.is_stale(reference_time));

    if stale.is_empty() {
        return live;
    }

    let mut failed = 0usize;
    for doc in &stale {
        if let Err(e) = store.delete(&doc.file_id) {
            warn!(file_id = doc.file_id.as_str(), error = %e, "Stale delete failed");
            failed += 1;
        }
    }
    info!(
        evicted = stale.len(),
        failed, reference_time, "Evicted stale documents"
    );
    live
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsreel_common::{Category, Language};
    use std::collections::HashMap;

    fn doc(file_id: &str, fetch_time: u64, ttl_secs: u64) -> Document {
        Document {
            file_id: file_id.to_string(),
            url: format!("https://example.com/{file_id}"),
            host: "example.com".to_string(),
            title: format!("Title {file_id}"),
            pub_time: 0,
            fetch_time,
            ttl_secs,
            language: Language::En,
            category: Category::Society,
            embeddings: HashMap::new(),
        }
    }

    #[test]
    fn expired_documents_are_removed_and_deleted() {
        let store = DocumentStore::open_in_memory().unwrap();
        let old = doc("old", 100, 10);
        let fresh = doc("fresh", 200, 10);
        store.put(&old).unwrap();
        store.put(&fresh).unwrap();

        let live = evict_stale(&store, vec![old, fresh]);
        let ids: Vec<&str> = live.iter().map(|d| d.file_id.as_str()).collect();
        assert_eq!(ids, vec!["fresh"]);

        assert!(store.get("old").unwrap().is_none());
        assert!(store.get("fresh").unwrap().is_some());
    }

    #[test]
    fn reference_time_is_the_freshest_fetch() {
        let store = DocumentStore::open_in_memory().unwrap();
        // 100 + 150 >= 200: still live relative to the freshest document.
        let live = evict_stale(&store, vec![doc("a", 100, 150), doc("b", 200, 10)]);
        assert_eq!(live.len(), 2);
    }

    #[test]
    fn empty_working_set_is_a_no_op() {
        let store = DocumentStore::open_in_memory().unwrap();
        assert!(evict_stale(&store, Vec::new()).is_empty());
    }
}
