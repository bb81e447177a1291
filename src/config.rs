use std::env;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_SUMMARY_MODEL: &str = "gpt-4o-mini";
const DEFAULT_UPLOAD_DIR: &str = "./uploaded_files";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the document summary service.
///
/// Built once at process start and handed to the components that need it. Every field has a
/// non-production default so the service boots (and tests run) without any environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres host name.
    pub db_host: String,
    /// Postgres port.
    pub db_port: u16,
    /// Postgres database name.
    pub db_name: String,
    /// Postgres user.
    pub db_user: String,
    /// Postgres password.
    pub db_pass: String,
    /// Full connection URL replacing the composed Postgres URL (e.g. `sqlite://docsum.db?mode=rwc`).
    pub database_url_override: Option<String>,
    /// Upper bound for pooled database connections.
    pub db_max_connections: u32,
    /// Deployment environment tag (`test`, `staging`, `production`, ...).
    pub environment: String,
    /// Service version reported at start-up.
    pub version: String,
    /// API key sent to the language-model provider.
    pub chatgpt_api_key: String,
    /// Base URL of the OpenAI-compatible API.
    pub openai_base_url: String,
    /// Chat model used for summaries.
    pub summary_model: String,
    /// Optional deadline for a single summarization request.
    pub summary_timeout_secs: Option<u64>,
    /// Directory uploaded files are stored under.
    pub upload_dir: PathBuf,
    /// HTTP listen port.
    pub server_port: u16,
    /// Maximum accepted request body size for uploads.
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset and fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            db_host: or("DB_HOST", "somehost"),
            db_port: parse_or(get("DB_PORT"), "DB_PORT", 5432)?,
            db_name: or("DB_NAME", "example"),
            db_user: or("DB_USER", "user"),
            db_pass: or("DB_PASS", "password"),
            database_url_override: get("DATABASE_URL"),
            db_max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10)?,
            environment: or("ENV", "test"),
            version: or("VERSION", "0.0.1"),
            chatgpt_api_key: or("CHATGPT_API_KEY", "example-api-key"),
            openai_base_url: or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            summary_model: or("SUMMARY_MODEL", DEFAULT_SUMMARY_MODEL),
            summary_timeout_secs: get("SUMMARY_TIMEOUT_SECS")
                .map(|value| parse_value(&value, "SUMMARY_TIMEOUT_SECS"))
                .transpose()?,
            upload_dir: PathBuf::from(or("UPLOAD_DIR", DEFAULT_UPLOAD_DIR)),
            server_port: parse_or(get("SERVER_PORT"), "SERVER_PORT", 8000)?,
            max_upload_bytes: parse_or(
                get("MAX_UPLOAD_BYTES"),
                "MAX_UPLOAD_BYTES",
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
        })
    }

    /// Connection URL for the metadata store.
    pub fn database_url(&self) -> String {
        match &self.database_url_override {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                urlencoding::encode(&self.db_user),
                urlencoding::encode(&self.db_pass),
                self.db_host,
                self.db_port,
                self.db_name
            ),
        }
    }
}

fn parse_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    value
        .map(|value| parse_value(&value, key))
        .transpose()
        .map(|parsed| parsed.unwrap_or(default))
}
