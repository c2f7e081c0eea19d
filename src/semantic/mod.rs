//! Semantic search over a small in-memory corpus.
//!
//! # Architecture
//!
//! - `vector`: Validated embedding vectors
//! - `ranker`: Cosine similarity ranking with threshold and top-K
//! - `embeddings`: Embedding provider trait and the local fastembed provider
//! - `remote`: OpenAI-compatible HTTP embedding provider
//! - `service`: Embeds corpus and query, then ranks

pub mod embeddings;
mod ranker;
mod remote;
mod service;
mod vector;

pub use embeddings::{provider_from_config, EmbeddingError, EmbeddingProvider};
pub use ranker::{
    cosine_similarity, rank, RankError, RankOptions, ScoredResult, DEFAULT_LIMIT,
    DEFAULT_THRESHOLD,
};
pub use service::{SearchResponse, SemanticSearchError, SemanticSearchService};
pub use vector::{Embedding, EmbeddingSet, VectorError};
