use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_JOBS_ROOT: &str = "jobs";
const DEFAULT_JOB_WORKERS: usize = 10;
const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_LLM_MODEL: &str = "llama3.1";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the intake server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the HTTP listener binds to.
    pub server_host: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Root directory holding the date-partitioned job folders.
    pub jobs_root: PathBuf,
    /// Size of the bounded worker pool running asynchronous uploads.
    pub job_workers: usize,
    /// Session lifetime in seconds since creation; `0` disables expiry.
    pub session_ttl_secs: u64,
    /// Base URL of the OCR/document analysis service.
    pub ocr_service_url: Option<String>,
    /// Base URL of the entity detection service.
    pub entity_service_url: Option<String>,
    /// Language model backend used for classification and field extraction.
    pub llm_provider: LlmProvider,
    /// Ollama endpoint used when `llm_provider` is [`LlmProvider::Ollama`].
    pub ollama_url: String,
    /// Model identifier passed to the language model backend.
    pub llm_model: String,
}

/// Supported language model backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// No model configured; every call reports the provider as unavailable.
    None,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let job_workers = parse_optional::<usize>("JOB_WORKERS")?.unwrap_or(DEFAULT_JOB_WORKERS);
        if job_workers == 0 {
            return Err(ConfigError::InvalidValue("JOB_WORKERS".into()));
        }

        Ok(Self {
            server_host: load_env_optional("SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.into()),
            server_port: parse_optional("SERVER_PORT")?,
            jobs_root: load_env_optional("JOBS_ROOT")
                .unwrap_or_else(|| DEFAULT_JOBS_ROOT.into())
                .into(),
            job_workers,
            session_ttl_secs: parse_optional("SESSION_TTL_SECS")?
                .unwrap_or(DEFAULT_SESSION_TTL_SECS),
            ocr_service_url: load_env_optional("OCR_SERVICE_URL"),
            entity_service_url: load_env_optional("ENTITY_SERVICE_URL"),
            llm_provider: match load_env_optional("LLM_PROVIDER") {
                Some(value) => value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("LLM_PROVIDER".to_string()))?,
                None => LlmProvider::None,
            },
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.into()),
            llm_model: load_env_optional("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.into()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: DEFAULT_HOST.into(),
            server_port: None,
            jobs_root: DEFAULT_JOBS_ROOT.into(),
            job_workers: DEFAULT_JOB_WORKERS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            ocr_service_url: None,
            entity_service_url: None,
            llm_provider: LlmProvider::None,
            ollama_url: DEFAULT_OLLAMA_URL.into(),
            llm_model: DEFAULT_LLM_MODEL.into(),
        }
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for LlmProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load `.env` (when present) and build configuration from the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    Config::from_env()
}

/// Install an already-built configuration in the global cache.
///
/// Used by the binary after command-line overrides have been applied.
pub fn install_config(config: Config) {
    tracing::debug!(
        server_host = %config.server_host,
        server_port = ?config.server_port,
        jobs_root = %config.jobs_root.display(),
        job_workers = config.job_workers,
        llm_provider = ?config.llm_provider,
        "Loaded configuration"
    );
    if CONFIG.set(config).is_err() {
        tracing::warn!("Configuration already installed; keeping the first one");
    }
}
