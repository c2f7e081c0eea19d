//! Embedding providers.
//!
//! The ranker only ever sees vectors; where they come from is behind the
//! [`EmbeddingProvider`] trait:
//! - [`LocalEmbedding`] runs a fastembed (ONNX) model in-process, loaded
//!   lazily on first use
//! - [`RemoteEmbedding`](super::remote::RemoteEmbedding) calls an
//!   OpenAI-compatible embeddings endpoint

use fastembed::{InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::config::{Config, ProviderKind};
use crate::semantic::remote::RemoteEmbedding;
use crate::semantic::vector::{Embedding, VectorError};

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Invalid model name: {0}")]
    InvalidModel(String),

    #[error("Embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider returned {got} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("Provider returned an invalid vector: {0}")]
    Vector(#[from] VectorError),
}

/// Turns text into vectors.
///
/// Implementations are blocking; async callers should run them on the
/// blocking pool. `embed_many` must return exactly one vector per input, in
/// input order.
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    fn embed_many(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError>;
}

/// Build the provider selected in config.
pub fn provider_from_config(config: &Config) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    let semantic = &config.semantic_search;

    match semantic.provider {
        ProviderKind::Local => Ok(Arc::new(LocalEmbedding::new(
            semantic.model_name(),
            config.base_path().to_path_buf(),
        )?)),
        ProviderKind::Remote => Ok(Arc::new(RemoteEmbedding::new(
            &semantic.remote.endpoint,
            semantic.model_name(),
            semantic.remote.api_key(),
            semantic.request_timeout(),
        ))),
    }
}

/// Wrapper around fastembed's TextEmbedding model.
/// Uses a Mutex because fastembed's embed() requires &mut self.
pub struct LocalEmbedding {
    model: Mutex<Option<TextEmbedding>>,
    model_kind: fastembed::EmbeddingModel,
    model_name: String,
    cache_dir: PathBuf,
}

impl LocalEmbedding {
    /// Create a local provider for the given model name.
    ///
    /// Nothing is downloaded here. The model is fetched into
    /// `cache_dir/models` and loaded on the first embedding request.
    pub fn new(model_name: &str, cache_dir: PathBuf) -> Result<Self, EmbeddingError> {
        let model_kind = Self::parse_model_name(model_name)?;

        Ok(Self {
            model: Mutex::new(None),
            model_kind,
            model_name: model_name.to_string(),
            cache_dir,
        })
    }

    /// Check if the model has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.model
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    fn with_model<R>(
        &self,
        f: impl FnOnce(&mut TextEmbedding) -> Result<R, EmbeddingError>,
    ) -> Result<R, EmbeddingError> {
        let mut guard = self.model.lock().map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to acquire model lock: {}", e))
        })?;

        if guard.is_none() {
            *guard = Some(self.load()?);
        }

        let model = guard
            .as_mut()
            .ok_or_else(|| EmbeddingError::InitFailed("Model is not loaded".to_string()))?;

        f(model)
    }

    fn load(&self) -> Result<TextEmbedding, EmbeddingError> {
        log::info!("Loading embedding model '{}'", self.model_name);

        let models_dir = self.cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbeddingError::InitFailed(format!("Failed to create models directory: {}", e))
        })?;

        let options = InitOptions::new(self.model_kind.clone())
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);

        TextEmbedding::try_new(options).map_err(|e| EmbeddingError::InitFailed(e.to_string()))
    }

    /// Parse model name string to fastembed enum.
    fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
        match name.to_lowercase().as_str() {
            "all-minilm-l6-v2" | "allminiml6v2" => {
                Ok(fastembed::EmbeddingModel::AllMiniLML6V2)
            }
            "all-minilm-l6-v2-q" | "allminiml6v2q" => {
                Ok(fastembed::EmbeddingModel::AllMiniLML6V2Q)
            }
            "bge-small-en-v1.5" | "bgesmallenv15" => {
                Ok(fastembed::EmbeddingModel::BGESmallENV15)
            }
            "bge-small-en-v1.5-q" | "bgesmallenv15q" => {
                Ok(fastembed::EmbeddingModel::BGESmallENV15Q)
            }
            "bge-base-en-v1.5" | "bgebaseenv15" => {
                Ok(fastembed::EmbeddingModel::BGEBaseENV15)
            }
            "bge-base-en-v1.5-q" | "bgebaseenv15q" => {
                Ok(fastembed::EmbeddingModel::BGEBaseENV15Q)
            }
            _ => Err(EmbeddingError::InvalidModel(format!(
                "Unknown model: {}. Supported models: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5 (add -q suffix for quantized)",
                name
            ))),
        }
    }
}

impl EmbeddingProvider for LocalEmbedding {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let embeddings = self.with_model(|model| {
            model
                .embed(vec![text], None)
                .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))
        })?;

        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))?;

        Ok(Embedding::new(embedding)?)
    }

    fn embed_many(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let embeddings = self.with_model(|model| {
            model
                .embed(texts.to_vec(), None)
                .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))
        })?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: embeddings.len(),
            });
        }

        embeddings
            .into_iter()
            .map(|values| Embedding::new(values).map_err(Into::into))
            .collect()
    }
}
