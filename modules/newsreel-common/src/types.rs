use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Language of an article, as detected at annotation time.
///
/// Only `Ru` and `En` are clustered; everything else is stored but never
/// threaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Ru,
    En,
    Other,
    Undefined,
}

impl Language {
    /// Parse a query-surface language code. Only clustered languages are
    /// accepted here; storage-side deserialization goes through serde.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ru" => Some(Language::Ru),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::Ru => "ru",
            Language::En => "en",
            Language::Other => "other",
            Language::Undefined => "undefined",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Article category, as classified at annotation time.
///
/// `Any` never appears on a stored document; it exists for the query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Society,
    Economy,
    Technology,
    Sports,
    Entertainment,
    Science,
    Other,
    NotNews,
    Any,
    Undefined,
}

impl Category {
    /// Parse a serialized category tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "any" => Some(Category::Any),
            "society" => Some(Category::Society),
            "economy" => Some(Category::Economy),
            "technology" => Some(Category::Technology),
            "sports" => Some(Category::Sports),
            "entertainment" => Some(Category::Entertainment),
            "science" => Some(Category::Science),
            "other" => Some(Category::Other),
            "not_news" => Some(Category::NotNews),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Category::Society => "society",
            Category::Economy => "economy",
            Category::Technology => "technology",
            Category::Sports => "sports",
            Category::Entertainment => "entertainment",
            Category::Science => "science",
            Category::Other => "other",
            Category::NotNews => "not_news",
            Category::Any => "any",
            Category::Undefined => "undefined",
        }
    }

    /// Fixed precedence used to break ties in cluster category election.
    pub const ELECTION_ORDER: [Category; 7] = [
        Category::Society,
        Category::Economy,
        Category::Technology,
        Category::Sports,
        Category::Entertainment,
        Category::Science,
        Category::Other,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Tag for one of a document's embedding vectors. All vectors stored under
/// the same key share a fixed dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingKey {
    Sentence,
}

/// An annotated article. Immutable once written to the store; each rebuild
/// cycle works on its own clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub url: String,
    pub host: String,
    pub title: String,
    /// Publication time from the page itself, seconds since epoch. 0 when
    /// missing; unreliable either way.
    #[serde(default)]
    pub pub_time: u64,
    /// Ingestion time, seconds since epoch.
    pub fetch_time: u64,
    /// Client-supplied retention bound, seconds.
    pub ttl_secs: u64,
    pub language: Language,
    pub category: Category,
    #[serde(default)]
    pub embeddings: HashMap<EmbeddingKey, Vec<f32>>,
}

impl Document {
    pub fn is_news(&self) -> bool {
        self.category != Category::NotNews && self.category != Category::Undefined
    }

    pub fn is_stale(&self, reference_time: u64) -> bool {
        self.fetch_time + self.ttl_secs < reference_time
    }

    pub fn embedding(&self, key: EmbeddingKey) -> Option<&[f32]> {
        self.embeddings.get(&key).map(|v| v.as_slice())
    }

    /// Rescale every embedding to unit L2 norm. Clustering assumes unit
    /// vectors; this runs on every load so the assumption holds regardless
    /// of what was written.
    pub fn normalize_embeddings(&mut self) {
        for vector in self.embeddings.values_mut() {
            normalize(vector);
        }
    }
}

/// In-place L2 normalization. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Extract the host (DNS authority) from a URL. The host is the agency
/// identity used for rating lookups and same-site deduplication.
pub fn host_of(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            return host.to_lowercase();
        }
    }
    // Schemeless fallback: "example.com/path" -> "example.com"
    url.split("://")
        .last()
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or("")
        .to_lowercase()
}

/// A cluster of documents reporting the same event. Rebuilt from scratch
/// every cycle; never persisted.
#[derive(Debug, Clone)]
pub struct Thread {
    pub title: String,
    pub category: Category,
    pub language: Language,
    /// Representative timestamp: median member fetch time, or the maximum
    /// when timestamp moving is enabled.
    pub best_time: u64,
    /// Members in working-set order (fetch time ascending).
    pub documents: Vec<Document>,
}

impl Thread {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// One published generation of the thread index. Readers hold a refcounted
/// handle; writers replace the whole index atomically and never touch a
/// published instance.
#[derive(Debug, Default)]
pub struct ThreadIndex {
    /// Per-language threads, sorted by `best_time` ascending.
    pub threads: HashMap<Language, Vec<Thread>>,
    /// The index's notion of "now": a high percentile of member fetch times,
    /// or wall clock when configured so.
    pub iter_timestamp: u64,
}

impl ThreadIndex {
    pub fn threads_for(&self, language: Language) -> &[Thread] {
        self.threads.get(&language).map(|t| t.as_slice()).unwrap_or(&[])
    }

    pub fn thread_count(&self) -> usize {
        self.threads.values().map(|t| t.len()).sum()
    }
}
