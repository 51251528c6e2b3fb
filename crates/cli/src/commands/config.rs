use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use lapsight_core::config::{resolve_config_path, AppConfig};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use toml::Value;

use crate::commands::{load_config, to_data, CommandResult};

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run() -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("config", failure),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let entries = effective_values(&config)
        .into_iter()
        .map(|(key, value, env_keys)| ConfigEntry {
            key,
            value,
            source: field_source(
                key,
                env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        })
        .collect::<Vec<_>>();

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(entries.iter().map(render_line));

    match to_data(&entries) {
        Ok(data) => CommandResult::success_with_data("config", lines.join("\n"), Some(data)),
        Err(failure) => CommandResult::from_failure("config", failure),
    }
}

type EffectiveValue = (&'static str, String, &'static [&'static str]);

fn effective_values(config: &AppConfig) -> Vec<EffectiveValue> {
    vec![
        field("database.url", config.database.url.clone(), &["LAPSIGHT_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["LAPSIGHT_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["LAPSIGHT_DATABASE_TIMEOUT_SECS"],
        ),
        field("llm.enabled", config.llm.enabled.to_string(), &["LAPSIGHT_LLM_ENABLED"]),
        field(
            "llm.gemini_api_key",
            redact_key(config.llm.gemini_api_key.as_ref()),
            &["LAPSIGHT_GEMINI_API_KEY", "GEMINI_API_KEY"],
        ),
        field(
            "llm.gemini_base_url",
            config.llm.gemini_base_url.clone(),
            &["LAPSIGHT_GEMINI_BASE_URL"],
        ),
        field("llm.gemini_flash_model", config.llm.gemini_flash_model.clone(), &[]),
        field("llm.gemini_lite_model", config.llm.gemini_lite_model.clone(), &[]),
        field(
            "llm.groq_api_key",
            redact_key(config.llm.groq_api_key.as_ref()),
            &["LAPSIGHT_GROQ_API_KEY", "GROQ_API_KEY"],
        ),
        field("llm.groq_base_url", config.llm.groq_base_url.clone(), &["LAPSIGHT_GROQ_BASE_URL"]),
        field("llm.groq_model", config.llm.groq_model.clone(), &[]),
        field(
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            &["LAPSIGHT_LLM_TIMEOUT_SECS"],
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["LAPSIGHT_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["LAPSIGHT_SERVER_PORT"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["LAPSIGHT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "catalog.recommend_limit",
            config.catalog.recommend_limit.to_string(),
            &["LAPSIGHT_CATALOG_RECOMMEND_LIMIT"],
        ),
        field(
            "catalog.candidate_pool",
            config.catalog.candidate_pool.to_string(),
            &["LAPSIGHT_CATALOG_CANDIDATE_POOL"],
        ),
        field(
            "catalog.price_trend_days",
            config.catalog.price_trend_days.to_string(),
            &["LAPSIGHT_CATALOG_PRICE_TREND_DAYS"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["LAPSIGHT_LOGGING_LEVEL", "LAPSIGHT_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["LAPSIGHT_LOGGING_FORMAT", "LAPSIGHT_LOG_FORMAT"],
        ),
    ]
}

fn field(key: &'static str, value: String, env_keys: &'static [&'static str]) -> EffectiveValue {
    (key, value, env_keys)
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(entry: &ConfigEntry) -> String {
    format!("- {} = {} (source: {})", entry.key, entry.value, entry.source)
}

/// Shows only the last four characters of a configured key.
fn redact_key(key: Option<&SecretString>) -> String {
    let Some(key) = key else {
        return "<unset>".to_string();
    };
    let trimmed = key.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let chars = trimmed.chars().collect::<Vec<_>>();
    if chars.len() <= 8 {
        return "<redacted>".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, field_source, redact_key};

    #[test]
    fn redact_key_hides_all_but_the_tail() {
        assert_eq!(redact_key(None), "<unset>");
        assert_eq!(redact_key(Some(&SecretString::from("   ".to_string()))), "<empty>");
        assert_eq!(redact_key(Some(&SecretString::from("short".to_string()))), "<redacted>");
        assert_eq!(
            redact_key(Some(&SecretString::from("AIzaSyExampleKey1234".to_string()))),
            "***1234"
        );
    }

    #[test]
    fn file_source_is_reported_for_present_keys() {
        let doc: Value = "[catalog]\nrecommend_limit = 3\n".parse().expect("toml");
        assert!(contains_path(&doc, "catalog.recommend_limit"));
        assert!(!contains_path(&doc, "catalog.candidate_pool"));

        let source = field_source(
            "catalog.recommend_limit",
            &["LAPSIGHT_TEST_UNSET_RECOMMEND_LIMIT"],
            Some(&doc),
            Some(std::path::Path::new("lapsight.toml")),
        );
        assert_eq!(source, "file (lapsight.toml)");

        let source = field_source("catalog.candidate_pool", &[], Some(&doc), None);
        assert_eq!(source, "default");
    }
}
