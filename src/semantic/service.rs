//! Semantic search over a fixed corpus.
//!
//! Each search embeds the corpus descriptions (batch) and the query (single)
//! as two independent blocking tasks, waits for both, and ranks the result.
//! Nothing is cached between searches.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::corpus::Corpus;
use crate::semantic::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::semantic::ranker::{rank, RankError, RankOptions, ScoredResult};
use crate::semantic::vector::{Embedding, EmbeddingSet, VectorError};

/// Errors that can occur during semantic search operations.
#[derive(Debug, thiserror::Error)]
pub enum SemanticSearchError {
    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Ranking error: {0}")]
    Rank(#[from] RankError),

    #[error("Vector error: {0}")]
    Vector(#[from] VectorError),

    #[error("Embedding provider did not answer within {0} seconds")]
    Timeout(u64),

    #[error("Embedding task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<ScoredResult>,
}

pub struct SemanticSearchService {
    provider: Arc<dyn EmbeddingProvider>,
    corpus: Corpus,
    options: RankOptions,
    timeout: Option<Duration>,
}

impl SemanticSearchService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, corpus: Corpus, options: RankOptions) -> Self {
        Self {
            provider,
            corpus,
            options,
            timeout: None,
        }
    }

    /// Bound the time spent waiting on the embedding provider.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Ranking options used when a search does not pass its own.
    pub fn options(&self) -> RankOptions {
        self.options
    }

    /// Search the corpus for items similar to `query`.
    ///
    /// # Returns
    /// The query and at most `limit` results, highest similarity first.
    pub async fn search(
        &self,
        query: &str,
        options: Option<RankOptions>,
    ) -> Result<SearchResponse, SemanticSearchError> {
        if query.trim().is_empty() {
            return Err(SemanticSearchError::EmptyQuery);
        }

        let options = options.unwrap_or(self.options);
        options.validate()?;

        let (corpus_vectors, query_vector) = self.embed(query).await?;

        if corpus_vectors.len() != self.corpus.len() {
            log::warn!(
                "provider '{}' returned {} embeddings for {} corpus items",
                self.provider.name(),
                corpus_vectors.len(),
                self.corpus.len()
            );
            return Err(RankError::LengthMismatch {
                items: self.corpus.len(),
                vectors: corpus_vectors.len(),
            }
            .into());
        }

        let corpus_vectors = EmbeddingSet::new(corpus_vectors)?;
        let results = rank(&query_vector, &corpus_vectors, self.corpus.items(), &options)?;

        log::debug!(
            "query {query:?} matched {} of {} items",
            results.len(),
            self.corpus.len()
        );

        Ok(SearchResponse {
            query: query.to_string(),
            results,
        })
    }

    /// Embed corpus and query concurrently. Both must succeed.
    async fn embed(
        &self,
        query: &str,
    ) -> Result<(Vec<Embedding>, Embedding), SemanticSearchError> {
        let corpus_task = {
            let provider = self.provider.clone();
            let texts = self.corpus.descriptions();
            tokio::task::spawn_blocking(move || provider.embed_many(&texts))
        };

        let query_task = {
            let provider = self.provider.clone();
            let query = query.to_string();
            tokio::task::spawn_blocking(move || provider.embed(&query))
        };

        let both = async { tokio::try_join!(corpus_task, query_task) };

        let (corpus_vectors, query_vector) = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, both)
                .await
                .map_err(|_| SemanticSearchError::Timeout(timeout.as_secs()))??,
            None => both.await?,
        };

        Ok((corpus_vectors?, query_vector?))
    }
}
