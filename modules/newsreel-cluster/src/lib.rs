//! The clustering core: stale eviction, batched single-link clustering,
//! thread assembly, ranking, and the hot-swapped index the frontend reads.

pub mod dbscan;
pub mod evictor;
pub mod hot;
pub mod pipeline;
pub mod ranker;
pub mod slink;
pub mod threader;

pub use hot::HotIndex;
pub use pipeline::{ClusterPipeline, RebuildStats};
pub use ranker::{rank, ScoredThread};
