use crate::{
    semantic::{RankOptions, DEFAULT_LIMIT, DEFAULT_THRESHOLD},
    storage::{BackendLocal, StorageManager},
};
use homedir::my_home;
use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
/// Default model for the local (fastembed) provider
const DEFAULT_LOCAL_MODEL: &str = "all-MiniLM-L6-v2";
/// Default model for the remote provider
const DEFAULT_REMOTE_MODEL: &str = "text-embedding-3-small";
const DEFAULT_REMOTE_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Upper bound for both embedding calls of one search, in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("config is malformed: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("config file is not valid utf8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("couldnt find home dir, set SEMSEARCH_BASE_PATH")]
    NoHomeDir,

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// fastembed model running in-process
    #[default]
    Local,
    /// OpenAI-compatible embeddings endpoint
    Remote,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteProviderConfig {
    #[serde(default = "default_remote_endpoint")]
    pub endpoint: String,

    /// Name of the environment variable holding the bearer token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for RemoteProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_REMOTE_ENDPOINT.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl RemoteProviderConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }
}

fn default_remote_endpoint() -> String {
    DEFAULT_REMOTE_ENDPOINT.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

/// Configuration for semantic search functionality
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SemanticSearchConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model name; defaults depend on the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Minimum similarity score [-1.0, 1.0]
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub remote: RemoteProviderConfig,
}

impl Default for SemanticSearchConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            threshold: DEFAULT_THRESHOLD,
            limit: DEFAULT_LIMIT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            remote: RemoteProviderConfig::default(),
        }
    }
}

impl SemanticSearchConfig {
    pub fn model_name(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(model), _) => model,
            (None, ProviderKind::Local) => DEFAULT_LOCAL_MODEL,
            (None, ProviderKind::Remote) => DEFAULT_REMOTE_MODEL,
        }
    }

    pub fn rank_options(&self) -> RankOptions {
        RankOptions {
            threshold: self.threshold,
            limit: self.limit,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// CSV or YAML corpus; the builtin movie list is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus_path: Option<PathBuf>,

    #[serde(default)]
    pub semantic_search: SemanticSearchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            corpus_path: None,
            semantic_search: SemanticSearchConfig::default(),
            base_path: PathBuf::new(),
        }
    }
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

/// `SEMSEARCH_BASE_PATH`, or `~/.local/share/semsearch`.
pub fn base_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var("SEMSEARCH_BASE_PATH") {
        return Ok(PathBuf::from(path));
    }

    let home = my_home()
        .map_err(|_| ConfigError::NoHomeDir)?
        .ok_or(ConfigError::NoHomeDir)?;

    Ok(home.join(".local/share/semsearch"))
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr.parse::<SocketAddr>().map_err(|err| {
            ConfigError::Invalid(format!(
                "listen_addr {:?} is not a socket address: {err}",
                self.listen_addr
            ))
        })?;

        let sem = &self.semantic_search;
        sem.rank_options()
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("semantic_search: {err}")))?;

        if sem.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "semantic_search.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if sem.model.as_deref().is_some_and(|model| model.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "semantic_search.model must not be empty".to_string(),
            ));
        }

        if sem.provider == ProviderKind::Remote {
            let endpoint = url::Url::parse(&sem.remote.endpoint).map_err(|err| {
                ConfigError::Invalid(format!(
                    "semantic_search.remote.endpoint {:?} is not a url: {err}",
                    sem.remote.endpoint
                ))
            })?;

            if !matches!(endpoint.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!(
                    "semantic_search.remote.endpoint must be http or https, got {:?}",
                    endpoint.scheme()
                )));
            }
        }

        Ok(())
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(&base_path()?)
    }

    pub fn load_with(base_path: &Path) -> Result<Self, ConfigError> {
        let store = BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            log::info!("writing default config to {}", base_path.join(CONFIG_FILE).display());
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str = String::from_utf8(store.read(CONFIG_FILE)?)?;
        let mut config: Self = serde_yml::from_str(&config_str)?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let store = BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Relative corpus paths are resolved against the base path.
    pub fn corpus_path(&self) -> Option<PathBuf> {
        self.corpus_path
            .as_ref()
            .map(|path| self.base_path.join(path))
    }
}
