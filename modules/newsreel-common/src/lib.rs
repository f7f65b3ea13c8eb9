pub mod config;
pub mod error;
pub mod rating;
pub mod types;

pub use config::{
    AnnotatorConfig, ClusterAlgorithm, ClusteringConfig, ClusteringParams, FileConfig,
    RankingConfig, StoreConfig,
};
pub use error::NewsreelError;
pub use rating::AgencyRating;
pub use types::{
    host_of, normalize, Category, Document, EmbeddingKey, Language, Thread, ThreadIndex,
};
