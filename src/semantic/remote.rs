//! OpenAI-compatible embeddings over HTTP.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::semantic::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::semantic::vector::Embedding;

#[derive(Serialize, Debug)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize, Debug)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    index: Option<usize>,
    embedding: Vec<f32>,
}

pub struct RemoteEmbedding {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl RemoteEmbedding {
    pub fn new(endpoint: &str, model: &str, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key,
            timeout,
        }
    }

    fn post(&self) -> Result<reqwest::blocking::RequestBuilder, EmbeddingError> {
        log::debug!("POST {}", self.endpoint);

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;

        let request = client.post(&self.endpoint);
        Ok(match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        })
    }

    fn request(&self, input: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        let response = self
            .post()?
            .json(&EmbeddingsRequest {
                model: &self.model,
                input,
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            log::error!("embeddings endpoint returned {status}: {body}");
            return Err(EmbeddingError::EmbeddingFailed(format!(
                "endpoint returned {status}: {body}"
            )));
        }

        let mut data = response.json::<EmbeddingsResponse>()?.data;

        if data.len() != input.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: input.len(),
                got: data.len(),
            });
        }

        // entries may come back in any order when the endpoint reports indices
        if data.iter().all(|entry| entry.index.is_some()) {
            data.sort_by_key(|entry| entry.index);
        }

        data.into_iter()
            .map(|entry| Embedding::new(entry.embedding).map_err(Into::into))
            .collect()
    }
}

impl EmbeddingProvider for RemoteEmbedding {
    fn name(&self) -> &str {
        &self.model
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.request(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))
    }

    fn embed_many(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        self.request(texts)
    }
}
