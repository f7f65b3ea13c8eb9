use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::Language;

/// TOML-backed service configuration loaded from disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub annotator: AnnotatorConfig,
    pub rating: RatingConfig,
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
    /// Request-handling worker threads.
    #[serde(default = "default_thread_pool_size")]
    pub thread_pool_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    /// Refuse to start when the database file does not exist yet.
    #[serde(default)]
    pub db_fail_if_missing: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnotatorConfig {
    /// Respond without storing anything when the annotator skips a document.
    #[serde(default = "default_true")]
    pub skip_irrelevant_docs: bool,
    /// Keep documents the classifier marks as not news.
    #[serde(default)]
    pub save_not_news: bool,
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,
    /// Language lexicon shared across languages.
    pub language_lexicon: PathBuf,
    /// Per-language classifier and embedder model files, keyed by language
    /// code.
    pub models: HashMap<Language, LanguageModels>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageModels {
    pub category_lexicon: PathBuf,
    pub word_vectors: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatingConfig {
    pub agency_rating: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusteringConfig {
    #[serde(default = "default_rebuild_interval_ms")]
    pub rebuild_interval_ms: u64,
    #[serde(default = "default_iter_timestamp_percentile")]
    pub iter_timestamp_percentile: f64,
    /// Use wall clock instead of the document-derived percentile as the
    /// index's notion of "now". Off by default; production deployments with
    /// trustworthy feeds turn it on.
    #[serde(default)]
    pub iter_timestamp_from_clock: bool,
    /// Per-language clustering parameters, keyed by language code. Only
    /// languages listed here are clustered.
    pub languages: HashMap<Language, ClusteringParams>,
}

/// Clustering algorithm, selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterAlgorithm {
    #[default]
    Slink,
    Dbscan,
}

/// Parameters for one language's clustering.
///
/// The `small`/`medium`/`large` thresholds drive batched single-link
/// clustering and are non-increasing as cluster size grows: large clusters
/// need stronger evidence per additional member to avoid topic drift. The
/// `dbscan_*` knobs apply only when `algorithm = "dbscan"`; the ban and
/// timestamp-moving switches apply to either algorithm.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusteringParams {
    #[serde(default)]
    pub algorithm: ClusterAlgorithm,
    #[serde(default = "default_small_cluster_threshold")]
    pub small_cluster_threshold: f32,
    #[serde(default = "default_small_cluster_size")]
    pub small_cluster_size: usize,
    #[serde(default = "default_medium_cluster_threshold")]
    pub medium_cluster_threshold: f32,
    #[serde(default = "default_medium_cluster_size")]
    pub medium_cluster_size: usize,
    #[serde(default = "default_large_cluster_threshold")]
    pub large_cluster_threshold: f32,
    #[serde(default = "default_large_cluster_size")]
    pub large_cluster_size: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_intersection_size")]
    pub batch_intersection_size: usize,
    #[serde(default)]
    pub use_timestamp_moving: bool,
    #[serde(default = "default_true")]
    pub ban_threads_from_same_site: bool,
    #[serde(default = "default_dbscan_epsilon")]
    pub dbscan_epsilon: f32,
    #[serde(default = "default_dbscan_min_points")]
    pub dbscan_min_points: usize,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            algorithm: ClusterAlgorithm::Slink,
            small_cluster_threshold: default_small_cluster_threshold(),
            small_cluster_size: default_small_cluster_size(),
            medium_cluster_threshold: default_medium_cluster_threshold(),
            medium_cluster_size: default_medium_cluster_size(),
            large_cluster_threshold: default_large_cluster_threshold(),
            large_cluster_size: default_large_cluster_size(),
            batch_size: default_batch_size(),
            batch_intersection_size: default_batch_intersection_size(),
            use_timestamp_moving: false,
            ban_threads_from_same_site: true,
            dbscan_epsilon: default_dbscan_epsilon(),
            dbscan_min_points: default_dbscan_min_points(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RankingConfig {
    /// Half-life of the freshness decay applied to thread scores.
    #[serde(default = "default_age_penalty_half_life_secs")]
    pub age_penalty_half_life_secs: u64,
    /// Upper bound on threads returned per query.
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            age_penalty_half_life_secs: default_age_penalty_half_life_secs(),
            max_threads: default_max_threads(),
        }
    }
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

fn default_true() -> bool {
    true
}

fn default_thread_pool_size() -> usize {
    4
}

fn default_min_text_length() -> usize {
    20
}

fn default_rebuild_interval_ms() -> u64 {
    100
}

fn default_iter_timestamp_percentile() -> f64 {
    0.99
}

fn default_small_cluster_threshold() -> f32 {
    0.015
}

fn default_small_cluster_size() -> usize {
    15
}

fn default_medium_cluster_threshold() -> f32 {
    0.01
}

fn default_medium_cluster_size() -> usize {
    50
}

fn default_large_cluster_threshold() -> f32 {
    0.005
}

fn default_large_cluster_size() -> usize {
    100
}

fn default_batch_size() -> usize {
    10_000
}

fn default_batch_intersection_size() -> usize {
    2_000
}

fn default_dbscan_epsilon() -> f32 {
    0.01
}

fn default_dbscan_min_points() -> usize {
    2
}

fn default_age_penalty_half_life_secs() -> u64 {
    3_600
}

fn default_max_threads() -> usize {
    1_000
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        port = 8080
        thread_pool_size = 8

        [store]
        db_path = "data/articles.redb"
        db_fail_if_missing = false

        [annotator]
        skip_irrelevant_docs = true
        save_not_news = false
        language_lexicon = "models/language_lexicon.txt"

        [annotator.models.ru]
        category_lexicon = "models/ru_categories.txt"
        word_vectors = "models/ru_vectors.txt"

        [annotator.models.en]
        category_lexicon = "models/en_categories.txt"
        word_vectors = "models/en_vectors.txt"

        [rating]
        agency_rating = "models/pagerank_rating.txt"

        [clustering]
        rebuild_interval_ms = 100
        iter_timestamp_percentile = 0.99

        [clustering.languages.ru]
        small_cluster_threshold = 0.015

        [clustering.languages.en]
        algorithm = "dbscan"
        medium_cluster_threshold = 0.012
        ban_threads_from_same_site = false
        dbscan_epsilon = 0.02

        [ranking]
        age_penalty_half_life_secs = 1800
        max_threads = 500
    "#;

    #[test]
    fn parses_full_config() {
        let config: FileConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.thread_pool_size, 8);
        assert!(!config.store.db_fail_if_missing);
        assert_eq!(config.annotator.models.len(), 2);
        assert_eq!(config.clustering.rebuild_interval_ms, 100);
        assert_eq!(config.ranking.max_threads, 500);

        let en = &config.clustering.languages[&Language::En];
        assert_eq!(en.algorithm, ClusterAlgorithm::Dbscan);
        assert!((en.medium_cluster_threshold - 0.012).abs() < 1e-9);
        assert!((en.dbscan_epsilon - 0.02).abs() < 1e-9);
        assert!(!en.ban_threads_from_same_site);
        // Unspecified fields fall back to defaults.
        assert_eq!(en.batch_size, 10_000);
        assert_eq!(en.batch_intersection_size, 2_000);
        assert_eq!(en.dbscan_min_points, 2);

        let ru = &config.clustering.languages[&Language::Ru];
        assert_eq!(ru.algorithm, ClusterAlgorithm::Slink);
        assert!(ru.ban_threads_from_same_site);
        assert_eq!(ru.small_cluster_size, 15);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(toml::from_str::<ServerConfig>("port = 1\nunknown_knob = true").is_err());
    }

    #[test]
    fn ranking_defaults_when_section_missing() {
        let without_ranking = SAMPLE.replace(
            "[ranking]\n        age_penalty_half_life_secs = 1800\n        max_threads = 500",
            "",
        );
        let config: FileConfig = toml::from_str(&without_ranking).unwrap();
        assert_eq!(config.ranking.age_penalty_half_life_secs, 3_600);
        assert_eq!(config.ranking.max_threads, 1_000);
    }
}
