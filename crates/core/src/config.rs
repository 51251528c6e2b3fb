use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub enabled: bool,
    pub gemini_api_key: Option<SecretString>,
    pub gemini_base_url: String,
    pub gemini_flash_model: String,
    pub gemini_lite_model: String,
    pub groq_api_key: Option<SecretString>,
    pub groq_base_url: String,
    pub groq_model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Tunables for catalog queries and the recommendation pool.
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub recommend_limit: usize,
    pub candidate_pool: usize,
    pub price_trend_days: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_enabled: Option<bool>,
    pub gemini_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://lapsight.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                enabled: true,
                gemini_api_key: None,
                gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
                gemini_flash_model: "gemini-2.5-flash".to_string(),
                gemini_lite_model: "gemini-2.0-flash-lite".to_string(),
                groq_api_key: None,
                groq_base_url: "https://api.groq.com".to_string(),
                groq_model: "llama-3.3-70b-versatile".to_string(),
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            catalog: CatalogConfig {
                recommend_limit: 5,
                candidate_pool: 100,
                price_trend_days: 90,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmConfig {
    pub fn gemini_configured(&self) -> bool {
        has_secret(self.gemini_api_key.as_ref())
    }

    pub fn groq_configured(&self) -> bool {
        has_secret(self.groq_api_key.as_ref())
    }
}

fn has_secret(value: Option<&SecretString>) -> bool {
    value.map(|secret| !secret.expose_secret().trim().is_empty()).unwrap_or(false)
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("lapsight.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(enabled) = llm.enabled {
                self.llm.enabled = enabled;
            }
            if let Some(gemini_api_key_value) = llm.gemini_api_key {
                self.llm.gemini_api_key = Some(secret_value(gemini_api_key_value));
            }
            if let Some(gemini_base_url) = llm.gemini_base_url {
                self.llm.gemini_base_url = gemini_base_url;
            }
            if let Some(model) = llm.gemini_flash_model {
                self.llm.gemini_flash_model = model;
            }
            if let Some(model) = llm.gemini_lite_model {
                self.llm.gemini_lite_model = model;
            }
            if let Some(groq_api_key_value) = llm.groq_api_key {
                self.llm.groq_api_key = Some(secret_value(groq_api_key_value));
            }
            if let Some(groq_base_url) = llm.groq_base_url {
                self.llm.groq_base_url = groq_base_url;
            }
            if let Some(model) = llm.groq_model {
                self.llm.groq_model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(recommend_limit) = catalog.recommend_limit {
                self.catalog.recommend_limit = recommend_limit;
            }
            if let Some(candidate_pool) = catalog.candidate_pool {
                self.catalog.candidate_pool = candidate_pool;
            }
            if let Some(price_trend_days) = catalog.price_trend_days {
                self.catalog.price_trend_days = price_trend_days;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("LAPSIGHT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("LAPSIGHT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_number("LAPSIGHT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("LAPSIGHT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_number("LAPSIGHT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LAPSIGHT_LLM_ENABLED") {
            self.llm.enabled = parse_bool("LAPSIGHT_LLM_ENABLED", &value)?;
        }
        let gemini_key = read_env("LAPSIGHT_GEMINI_API_KEY").or_else(|| read_env("GEMINI_API_KEY"));
        if let Some(value) = gemini_key {
            self.llm.gemini_api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LAPSIGHT_GEMINI_BASE_URL") {
            self.llm.gemini_base_url = value;
        }
        let groq_key = read_env("LAPSIGHT_GROQ_API_KEY").or_else(|| read_env("GROQ_API_KEY"));
        if let Some(value) = groq_key {
            self.llm.groq_api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LAPSIGHT_GROQ_BASE_URL") {
            self.llm.groq_base_url = value;
        }
        if let Some(value) = read_env("LAPSIGHT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_number("LAPSIGHT_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LAPSIGHT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("LAPSIGHT_SERVER_PORT") {
            self.server.port = parse_number("LAPSIGHT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("LAPSIGHT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_number("LAPSIGHT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("LAPSIGHT_CATALOG_RECOMMEND_LIMIT") {
            self.catalog.recommend_limit =
                parse_number("LAPSIGHT_CATALOG_RECOMMEND_LIMIT", &value)?;
        }
        if let Some(value) = read_env("LAPSIGHT_CATALOG_CANDIDATE_POOL") {
            self.catalog.candidate_pool = parse_number("LAPSIGHT_CATALOG_CANDIDATE_POOL", &value)?;
        }
        if let Some(value) = read_env("LAPSIGHT_CATALOG_PRICE_TREND_DAYS") {
            self.catalog.price_trend_days =
                parse_number("LAPSIGHT_CATALOG_PRICE_TREND_DAYS", &value)?;
        }

        let log_level =
            read_env("LAPSIGHT_LOGGING_LEVEL").or_else(|| read_env("LAPSIGHT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LAPSIGHT_LOGGING_FORMAT").or_else(|| read_env("LAPSIGHT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.llm_enabled {
            self.llm.enabled = enabled;
        }
        if let Some(gemini_api_key) = overrides.gemini_api_key {
            self.llm.gemini_api_key = Some(secret_value(gemini_api_key));
        }
        if let Some(groq_api_key) = overrides.groq_api_key {
            self.llm.groq_api_key = Some(secret_value(groq_api_key));
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_catalog(&self.catalog)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("lapsight.toml"), PathBuf::from("config/lapsight.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    for (key, url) in
        [("llm.gemini_base_url", &llm.gemini_base_url), ("llm.groq_base_url", &llm.groq_base_url)]
    {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }

    for (key, model) in [
        ("llm.gemini_flash_model", &llm.gemini_flash_model),
        ("llm.gemini_lite_model", &llm.gemini_lite_model),
        ("llm.groq_model", &llm.groq_model),
    ] {
        if model.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{key} must not be empty")));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    if catalog.recommend_limit == 0 {
        return Err(ConfigError::Validation(
            "catalog.recommend_limit must be greater than zero".to_string(),
        ));
    }

    if catalog.candidate_pool < catalog.recommend_limit {
        return Err(ConfigError::Validation(
            "catalog.candidate_pool must be at least catalog.recommend_limit".to_string(),
        ));
    }

    if catalog.price_trend_days == 0 || catalog.price_trend_days > 3650 {
        return Err(ConfigError::Validation(
            "catalog.price_trend_days must be in range 1..=3650".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    catalog: Option<CatalogPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    enabled: Option<bool>,
    gemini_api_key: Option<String>,
    gemini_base_url: Option<String>,
    gemini_flash_model: Option<String>,
    gemini_lite_model: Option<String>,
    groq_api_key: Option<String>,
    groq_base_url: Option<String>,
    groq_model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    recommend_limit: Option<usize>,
    candidate_pool: Option<usize>,
    price_trend_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
