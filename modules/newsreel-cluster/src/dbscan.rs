//! Density-based clustering over the same cosine metric as the single-link
//! kernel. Kept as the alternative algorithm behind the startup-time
//! selection; it runs over the whole language partition in one pass.

use std::collections::VecDeque;

use newsreel_common::{Document, EmbeddingKey};

use crate::slink::cosine_distance;

const UNLABELED: usize = usize::MAX;

/// Classic DBSCAN. Core points need `min_points` neighbors (the point
/// itself included) within `epsilon` cosine distance. Outliers end up as
/// singleton labels so every document still joins exactly one thread.
/// Deterministic: points are seeded in input order and expanded FIFO.
pub fn cluster(
    documents: &[Document],
    key: EmbeddingKey,
    epsilon: f32,
    min_points: usize,
) -> Vec<usize> {
    let n = documents.len();
    let embeddings: Vec<&[f32]> = documents
        .iter()
        .map(|d| d.embedding(key).unwrap_or(&[]))
        .collect();

    let neighbors_of = |i: usize| -> Vec<usize> {
        (0..n)
            .filter(|&k| cosine_distance(embeddings[i], embeddings[k]) <= epsilon)
            .collect()
    };

    let mut labels = vec![UNLABELED; n];
    for seed in 0..n {
        if labels[seed] != UNLABELED {
            continue;
        }
        let seed_neighbors = neighbors_of(seed);
        if seed_neighbors.len() < min_points {
            continue; // noise unless a later cluster claims it as a border point
        }

        labels[seed] = seed;
        let mut queue: VecDeque<usize> = seed_neighbors.into();
        while let Some(point) = queue.pop_front() {
            if labels[point] != UNLABELED {
                continue;
            }
            labels[point] = seed;
            let expansion = neighbors_of(point);
            if expansion.len() >= min_points {
                queue.extend(expansion);
            }
        }
    }

    // Noise points become their own singleton threads.
    for (i, label) in labels.iter_mut().enumerate() {
        if *label == UNLABELED {
            *label = i;
        }
    }
    labels
}
