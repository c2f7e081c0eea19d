//! Cosine similarity ranking of a corpus against a single query.
//!
//! Ranking is a pure computation over vectors that were already fetched from
//! an embedding provider: score every corpus item, sort, drop everything
//! under the threshold, keep the top `limit`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::corpus::CorpusItem;
use crate::semantic::vector::{Embedding, EmbeddingSet, VectorError};

/// Default minimum similarity for a result to be returned
pub const DEFAULT_THRESHOLD: f32 = 0.5;
/// Default maximum number of results
pub const DEFAULT_LIMIT: usize = 3;

/// Errors that can occur while ranking. None of them are transient.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RankError {
    #[error("invalid vector: {0}")]
    InvalidVector(#[from] VectorError),

    #[error("corpus has {items} items but {vectors} embeddings")]
    LengthMismatch { items: usize, vectors: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankOptions {
    /// Minimum similarity score, within [-1.0, 1.0]
    pub threshold: f32,
    /// Maximum number of results, at least 1
    pub limit: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl RankOptions {
    pub fn validate(&self) -> Result<(), RankError> {
        if !(-1.0..=1.0).contains(&self.threshold) {
            return Err(RankError::InvalidArgument(format!(
                "threshold must be between -1.0 and 1.0, got {}",
                self.threshold
            )));
        }

        if self.limit == 0 {
            return Err(RankError::InvalidArgument(
                "limit must be a positive integer, got 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// A corpus item together with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    #[serde(flatten)]
    pub item: CorpusItem,
    pub similarity: f32,
}

/// Cosine of the angle between `a` and `b`.
///
/// Accumulates in f64 and clamps to [-1.0, 1.0], so a vector compared with
/// itself scores exactly 1.0. A zero vector has no direction and is rejected
/// instead of scoring 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, RankError> {
    if a.is_empty() || b.is_empty() {
        return Err(VectorError::Empty.into());
    }

    if a.len() != b.len() {
        return Err(VectorError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        }
        .into());
    }

    let (dot, norm_a, norm_b) =
        a.iter()
            .zip(b)
            .fold((0.0f64, 0.0f64, 0.0f64), |(dot, na, nb), (&x, &y)| {
                let (x, y) = (f64::from(x), f64::from(y));
                (dot + x * y, na + x * x, nb + y * y)
            });

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(VectorError::ZeroNorm.into());
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !similarity.is_finite() {
        return Err(VectorError::NonFinite.into());
    }

    Ok((similarity as f32).clamp(-1.0, 1.0))
}

/// Rank `corpus_items` by similarity of their vectors to `query`.
///
/// `corpus_vectors[i]` must be the embedding of `corpus_items[i]`.
///
/// # Returns
/// At most `options.limit` results, sorted by similarity (highest first),
/// all scoring at least `options.threshold`. Items with equal scores keep
/// their corpus order.
pub fn rank(
    query: &Embedding,
    corpus_vectors: &EmbeddingSet,
    corpus_items: &[CorpusItem],
    options: &RankOptions,
) -> Result<Vec<ScoredResult>, RankError> {
    options.validate()?;

    if corpus_vectors.len() != corpus_items.len() {
        return Err(RankError::LengthMismatch {
            items: corpus_items.len(),
            vectors: corpus_vectors.len(),
        });
    }

    if let Some(dims) = corpus_vectors.dims() {
        if dims != query.dims() {
            return Err(VectorError::DimensionMismatch {
                expected: query.dims(),
                got: dims,
            }
            .into());
        }
    }

    let mut results = corpus_items
        .iter()
        .zip(corpus_vectors.iter())
        .map(|(item, vector)| {
            cosine_similarity(query.as_slice(), vector.as_slice()).map(|similarity| {
                ScoredResult {
                    item: item.clone(),
                    similarity,
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // sort_by is stable, ties stay in corpus order
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });

    // threshold first, then limit
    results.retain(|result| result.similarity >= options.threshold);
    results.truncate(options.limit);

    Ok(results)
}
