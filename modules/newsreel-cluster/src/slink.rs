//! Batched single-link agglomerative clustering over unit-norm embeddings.
//!
//! Full single-link needs an N×N distance matrix; for tens of thousands of
//! documents that is both too expensive and undesirable — articles far apart
//! in time should not thread together. Input documents arrive sorted by
//! fetch time, so the kernel slides a window of `batch_size` points with
//! `batch_intersection_size` points of overlap between successive batches,
//! clusters each batch independently, and stitches the labelings with a
//! union-find over the shared points. The distance matrix lives only for
//! the duration of one batch, bounding peak memory at `batch_size²` floats.

use newsreel_common::{Document, EmbeddingKey, ClusteringParams};

/// Cluster the documents and return one label per document. Labels are
/// arbitrary but equal labels mean "same thread". Documents must be sorted
/// by fetch time ascending; given a fixed input order the result is
/// deterministic.
pub fn cluster(documents: &[Document], key: EmbeddingKey, params: &ClusteringParams) -> Vec<usize> {
    let n = documents.len();
    if n == 0 {
        return Vec::new();
    }

    let batch_size = params.batch_size.max(2);
    let overlap = params.batch_intersection_size.clamp(1, batch_size - 1);

    let mut stitch = UnionFind::new(n);
    let mut start = 0;
    loop {
        let end = (start + batch_size).min(n);
        let local_labels = cluster_batch(&documents[start..end], key, params);
        for (offset, &label) in local_labels.iter().enumerate() {
            stitch.union(start + label, start + offset);
        }
        if end == n {
            break;
        }
        start = end - overlap;
    }

    (0..n).map(|i| stitch.find(i)).collect()
}

/// Single-link clustering of one batch. Returns batch-local labels.
///
/// Classic SLINK shape: maintain per-row nearest neighbors over a shrinking
/// distance matrix, repeatedly merge the globally closest pair, and fold the
/// absorbed row into the survivor with a pointwise minimum. The merge loop
/// stops at the first candidate whose distance exceeds the size-adaptive
/// threshold for the union it would create.
fn cluster_batch(documents: &[Document], key: EmbeddingKey, params: &ClusteringParams) -> Vec<usize> {
    let n = documents.len();
    if n < 2 {
        return vec![0; n];
    }

    let embeddings: Vec<&[f32]> = documents
        .iter()
        .map(|d| d.embedding(key).unwrap_or(&[]))
        .collect();

    // Distance matrix, diagonal at +inf so a row is never its own neighbor.
    let mut dist = vec![0.0f32; n * n];
    for i in 0..n {
        dist[i * n + i] = f32::INFINITY;
        for j in (i + 1)..n {
            let d = cosine_distance(embeddings[i], embeddings[j]);
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }

    let mut labels: Vec<usize> = (0..n).collect();
    let mut sizes = vec![1usize; n];
    let mut active = vec![true; n];

    // nn[i] is the closest active column of row i; scanning ascending keeps
    // the smallest index on ties, which makes merges deterministic.
    let row_min = |dist: &[f32], active: &[bool], i: usize| -> (usize, f32) {
        let mut nearest = i;
        let mut nearest_dist = f32::INFINITY;
        for k in 0..n {
            if k != i && active[k] && dist[i * n + k] < nearest_dist {
                nearest_dist = dist[i * n + k];
                nearest = k;
            }
        }
        (nearest, nearest_dist)
    };

    let mut nn = vec![0usize; n];
    let mut nn_dist = vec![f32::INFINITY; n];
    for i in 0..n {
        let (nearest, d) = row_min(&dist, &active, i);
        nn[i] = nearest;
        nn_dist[i] = d;
    }

    for _ in 0..n - 1 {
        let mut i = usize::MAX;
        let mut best = f32::INFINITY;
        for candidate in 0..n {
            if active[candidate] && nn_dist[candidate] < best {
                best = nn_dist[candidate];
                i = candidate;
            }
        }
        if i == usize::MAX || !best.is_finite() {
            break;
        }
        let j = nn[i];

        let merged_size = sizes[i] + sizes[j];
        if best > merge_threshold(merged_size, params) {
            break;
        }

        // Single-link merge: cluster j is absorbed into cluster i.
        for label in labels.iter_mut() {
            if *label == j {
                *label = i;
            }
        }
        sizes[i] = merged_size;

        for k in 0..n {
            if k == i || k == j || !active[k] {
                continue;
            }
            let folded = dist[j * n + k].min(dist[i * n + k]);
            dist[i * n + k] = folded;
            dist[k * n + i] = folded;
        }
        active[j] = false;
        nn_dist[j] = f32::INFINITY;
        for k in 0..n {
            dist[j * n + k] = f32::INFINITY;
            dist[k * n + j] = f32::INFINITY;
        }

        let (nearest, d) = row_min(&dist, &active, i);
        nn[i] = nearest;
        nn_dist[i] = d;
        // Rows whose nearest neighbor was the absorbed cluster point at a
        // dead column now; rescan them.
        for k in 0..n {
            if active[k] && k != i && nn[k] == j {
                let (nearest, d) = row_min(&dist, &active, k);
                nn[k] = nearest;
                nn_dist[k] = d;
            }
        }
    }

    labels
}

/// Distance threshold for a merge producing a cluster of `size` members.
/// Non-increasing in size: large clusters need stronger evidence per
/// additional member. Beyond the large bound only exact duplicates merge.
fn merge_threshold(size: usize, params: &ClusteringParams) -> f32 {
    if size < params.small_cluster_size {
        params.small_cluster_threshold
    } else if size <= params.medium_cluster_size {
        params.medium_cluster_threshold
    } else if size <= params.large_cluster_size {
        params.large_cluster_threshold
    } else {
        0.0
    }
}

/// Cosine distance rescaled to [0, 1] for unit-norm inputs.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    (1.0 - dot.clamp(-1.0, 1.0)) / 2.0
}

/// Union-find with path halving; stitches per-batch labelings into global
/// clusters through the overlap points.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}
