use std::sync::Arc;

use newsreel_annotate::Annotator;
use newsreel_cluster::HotIndex;
use newsreel_common::{AgencyRating, RankingConfig};
use newsreel_store::DocumentStore;

/// Shared handles for the request handlers. The only mutable state shared
/// with the clustering loop is the [`HotIndex`].
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub annotator: Arc<Annotator>,
    pub rating: Arc<AgencyRating>,
    pub index: Arc<HotIndex>,
    pub ranking: RankingConfig,
    /// When set, a skipped document is acknowledged without storing
    /// anything; otherwise an existence marker is kept so replace and delete
    /// semantics still hold.
    pub skip_irrelevant_docs: bool,
}
