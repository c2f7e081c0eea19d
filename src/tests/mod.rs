
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::corpus::{Corpus, CorpusItem};
use crate::semantic::{Embedding, EmbeddingError, EmbeddingProvider, SemanticSearchService};

/// Deterministic provider: every known text maps to a fixed vector.
#[derive(Default)]
pub struct FakeProvider {
    vectors: HashMap<String, Vec<f32>>,
    delay: Duration,
    fail_with: Option<String>,
    drop_last: bool,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new<'a>(pairs: impl IntoIterator<Item = (&'a str, Vec<f32>)>) -> Self {
        Self {
            vectors: pairs
                .into_iter()
                .map(|(text, vector)| (text.to_string(), vector))
                .collect(),
            ..Default::default()
        }
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every call with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    /// Return one vector less than asked for from `embed_many`.
    pub fn dropping_last(mut self) -> Self {
        self.drop_last = true;
        self
    }

    fn lookup(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let values = self
            .vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed(format!("no vector for {text:?}")))?;
        Ok(Embedding::new(values)?)
    }

    fn call<R>(&self, f: impl FnOnce() -> Result<R, EmbeddingError>) -> Result<R, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        std::thread::sleep(self.delay);
        let result = match &self.fail_with {
            Some(message) => Err(EmbeddingError::EmbeddingFailed(message.clone())),
            None => f(),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl EmbeddingProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.call(|| self.lookup(text))
    }

    fn embed_many(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        self.call(|| {
            let mut vectors = texts
                .iter()
                .map(|text| self.lookup(text))
                .collect::<Result<Vec<_>, _>>()?;
            if self.drop_last {
                vectors.pop();
            }
            Ok(vectors)
        })
    }
}

pub fn item(id: u64, title: &str, description: &str) -> CorpusItem {
    CorpusItem {
        id,
        title: title.to_string(),
        description: description.to_string(),
    }
}

/// Five items whose descriptions embed to the 2d vectors used throughout
/// the ranking scenarios, plus a handful of queries.
pub fn scenario_corpus() -> (Corpus, FakeProvider) {
    let corpus = Corpus::new(vec![
        item(1, "East", "points east"),
        item(2, "North", "points north"),
        item(3, "North East", "points north east"),
        item(4, "West", "points west"),
        item(5, "Mostly East", "points mostly east"),
    ])
    .unwrap();

    let provider = FakeProvider::new([
        ("points east", vec![1.0, 0.0]),
        ("points north", vec![0.0, 1.0]),
        ("points north east", vec![1.0, 1.0]),
        ("points west", vec![-1.0, 0.0]),
        ("points mostly east", vec![0.9, 0.1]),
        ("eastward", vec![1.0, 0.0]),
        ("northward", vec![0.0, 1.0]),
        ("nowhere", vec![0.0, 0.0]),
        ("three dimensional", vec![1.0, 0.0, 0.0]),
    ]);

    (corpus, provider)
}

pub fn scenario_service() -> (SemanticSearchService, Arc<FakeProvider>) {
    let (corpus, provider) = scenario_corpus();
    let provider = Arc::new(provider);
    let service = SemanticSearchService::new(provider.clone(), corpus, Default::default());
    (service, provider)
}
