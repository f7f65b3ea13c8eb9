//! The rebuild loop: snapshot the store, evict, cluster per language,
//! publish.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info};

use newsreel_common::{
    AgencyRating, ClusterAlgorithm, ClusteringConfig, Document, EmbeddingKey, Language,
    ThreadIndex,
};
use newsreel_store::DocumentStore;

use crate::evictor::evict_stale;
use crate::hot::HotIndex;
use crate::{dbscan, slink, threader};

/// Counters from one rebuild cycle.
#[derive(Debug, Default)]
pub struct RebuildStats {
    pub scanned: usize,
    pub news: usize,
    pub live: usize,
    pub threads: usize,
}

impl std::fmt::Display for RebuildStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} scanned, {} news, {} live, {} threads",
            self.scanned, self.news, self.live, self.threads
        )
    }
}

/// Owns one full pass of the clustering pipeline. Exactly one instance runs,
/// on a dedicated thread; the only state it shares with request handlers is
/// the [`HotIndex`] it publishes into.
pub struct ClusterPipeline {
    store: Arc<DocumentStore>,
    rating: Arc<AgencyRating>,
    config: ClusteringConfig,
    index: Arc<HotIndex>,
}

impl ClusterPipeline {
    pub fn new(
        store: Arc<DocumentStore>,
        rating: Arc<AgencyRating>,
        config: ClusteringConfig,
        index: Arc<HotIndex>,
    ) -> Self {
        Self {
            store,
            rating,
            config,
            index,
        }
    }

    /// Run one rebuild cycle and publish the resulting index. Any failure
    /// leaves the previously published index in place.
    pub fn rebuild_once(&self) -> Result<RebuildStats> {
        let snapshot = self.store.snapshot()?;
        let mut documents = snapshot.scan()?;
        let scanned = documents.len();

        documents.retain(|d| d.is_news());
        let news = documents.len();

        let mut documents = evict_stale(&self.store, documents);
        let live = documents.len();

        documents.sort_by(|a, b| {
            a.fetch_time
                .cmp(&b.fetch_time)
                .then_with(|| a.file_id.cmp(&b.file_id))
                .then_with(|| a.title.len().cmp(&b.title.len()))
        });

        let iter_timestamp = if self.config.iter_timestamp_from_clock {
            chrono::Utc::now().timestamp().max(0) as u64
        } else {
            percentile_fetch_time(&documents, self.config.iter_timestamp_percentile)
        };

        let mut per_language: HashMap<Language, Vec<Document>> = HashMap::new();
        for document in documents {
            if self.config.languages.contains_key(&document.language) {
                per_language
                    .entry(document.language)
                    .or_default()
                    .push(document);
            }
        }

        let mut threads_by_language = HashMap::new();
        let mut total_threads = 0;
        for (language, documents) in per_language {
            let params = &self.config.languages[&language];
            let labels = match params.algorithm {
                ClusterAlgorithm::Slink => {
                    slink::cluster(&documents, EmbeddingKey::Sentence, params)
                }
                ClusterAlgorithm::Dbscan => dbscan::cluster(
                    &documents,
                    EmbeddingKey::Sentence,
                    params.dbscan_epsilon,
                    params.dbscan_min_points,
                ),
            };
            let threads =
                threader::assemble_threads(documents, &labels, &self.rating, params);
            debug!(language = %language, threads = threads.len(), "Clustered language partition");
            total_threads += threads.len();
            threads_by_language.insert(language, threads);
        }

        self.index.publish(ThreadIndex {
            threads: threads_by_language,
            iter_timestamp,
        });

        Ok(RebuildStats {
            scanned,
            news,
            live,
            threads: total_threads,
        })
    }

    /// Blocking rebuild loop; run it on its own thread. Cycle failures are
    /// absorbed: the current index stays published and the next tick retries.
    pub fn run(&self) {
        let interval = Duration::from_millis(self.config.rebuild_interval_ms);
        info!(interval_ms = self.config.rebuild_interval_ms, "Clustering loop started");
        loop {
            match self.rebuild_once() {
                Ok(stats) => debug!(%stats, "Rebuild complete"),
                Err(e) => error!(error = %e, "Rebuild failed, keeping current index"),
            }
            std::thread::sleep(interval);
        }
    }
}

/// Fetch time at the given percentile of the working set, which must be
/// sorted by fetch time ascending. The percentile guards against the small
/// share of documents with wrong dates; 0 when the set is empty.
fn percentile_fetch_time(sorted: &[Document], percentile: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let index = ((percentile * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
    sorted[index].fetch_time
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsreel_common::Category;

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
    fn percentile_picks_the_right_index() {
        let docs: Vec<Document> = (1..=10).map(|i| doc(&i.to_string(), i * 100)).collect();
        assert_eq!(percentile_fetch_time(&docs, 0.99), 1000);
        assert_eq!(percentile_fetch_time(&docs, 0.5), 600);
        assert_eq!(percentile_fetch_time(&docs, 0.0), 100);
        assert_eq!(percentile_fetch_time(&[], 0.99), 0);
    }

    #[test]
    fn stats_display() {
        let stats = RebuildStats {
            scanned: 5,
            news: 4,
            live: 3,
            threads: 2,
        };
        assert_eq!(format!("{stats}"), "5 scanned, 4 news, 3 live, 2 threads");
    }
}
