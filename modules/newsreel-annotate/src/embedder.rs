use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use newsreel_common::normalize;

/// Sentence embedder backed by a plain-text word-vector table.
///
/// File format: an optional `<count> <dim>` header followed by one
/// `<token> <f32 × dim>` record per line. A sentence embedding is the mean
/// of its tokens' vectors, rescaled to unit L2 norm. Tokens without a vector
/// contribute nothing; a sentence with no known tokens embeds to the zero
/// vector, which clusters with nothing.
#[derive(Debug)]
pub struct WordVecEmbedder {
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl WordVecEmbedder {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read word vectors: {}", path.display()))?;
        let embedder = Self::parse(&content)
            .with_context(|| format!("Failed to parse word vectors: {}", path.display()))?;
        info!(
            tokens = embedder.vectors.len(),
            dim = embedder.dim,
            path = %path.display(),
            "Word vectors loaded"
        );
        Ok(embedder)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut dim = 0usize;
        let mut vectors = HashMap::new();

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();

            // fastText-style "<count> <dim>" header.
            if lineno == 0 && fields.len() == 2 {
                if let (Ok(_), Ok(d)) = (fields[0].parse::<usize>(), fields[1].parse::<usize>()) {
                    dim = d;
                    continue;
                }
            }

            if fields.len() < 2 {
                bail!("line {}: record has no vector components", lineno + 1);
            }
            let token = fields[0].to_lowercase();
            let vector: Vec<f32> = fields[1..]
                .iter()
                .map(|raw| {
                    raw.parse::<f32>()
                        .with_context(|| format!("line {}: bad component {raw:?}", lineno + 1))
                })
                .collect::<Result<_>>()?;

            if dim == 0 {
                dim = vector.len();
            } else if vector.len() != dim {
                bail!(
                    "line {}: expected {dim} components, found {}",
                    lineno + 1,
                    vector.len()
                );
            }
            vectors.insert(token, vector);
        }

        if vectors.is_empty() {
            bail!("word-vector table is empty");
        }
        Ok(Self { dim, vectors })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Mean of the tokens' word vectors, unit-normalized.
    pub fn embed(&self, tokens: &[String]) -> Vec<f32> {
        let mut sum = vec![0.0f32; self.dim];
        let mut hits = 0usize;
        for token in tokens {
            if let Some(vector) = self.vectors.get(token) {
                for (acc, x) in sum.iter_mut().zip(vector) {
                    *acc += x;
                }
                hits += 1;
            }
        }
        if hits > 0 {
            let inv = 1.0 / hits as f32;
            for x in sum.iter_mut() {
                *x *= inv;
            }
        }
        normalize(&mut sum);
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenize;

    #[test]
    fn parses_with_header() {
        let embedder = WordVecEmbedder::parse("2 3\nbank 1 0 0\nrates 0 1 0\n").unwrap();
        assert_eq!(embedder.dim(), 3);
    }

    #[test]
    fn parses_without_header() {
        let embedder = WordVecEmbedder::parse("bank 1 0\nrates 0 1\n").unwrap();
        assert_eq!(embedder.dim(), 2);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        assert!(WordVecEmbedder::parse("bank 1 0\nrates 0 1 0\n").is_err());
    }

    #[test]
    fn embedding_is_unit_norm_mean() {
        let embedder = WordVecEmbedder::parse("bank 1 0\nrates 0 1\n").unwrap();
        let v = embedder.embed(&tokenize("Bank rates"));
        // Mean of (1,0) and (0,1) normalized: (1/√2, 1/√2).
        let expected = 1.0 / 2f32.sqrt();
        assert!((v[0] - expected).abs() < 1e-6);
        assert!((v[1] - expected).abs() < 1e-6);
    }

    #[test]
    fn unknown_tokens_embed_to_zero() {
        let embedder = WordVecEmbedder::parse("bank 1 0\n").unwrap();
        assert_eq!(embedder.embed(&tokenize("nothing known")), vec![0.0, 0.0]);
    }
}
