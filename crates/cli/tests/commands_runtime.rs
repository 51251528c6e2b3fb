use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use lapsight_cli::commands::recommend::RecommendArgs;
use lapsight_cli::commands::{analyze, config, doctor, games, migrate, recommend, seed};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_database(|| {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("LAPSIGHT_DATABASE_URL", "postgres://localhost/lapsight")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_demo_catalog_and_is_idempotent_within_a_day() {
    with_database(|| {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["status"], "ok");
        assert_eq!(first_payload["data"]["products"].as_array().map(Vec::len), Some(8));
        assert!(first_payload["data"]["price_points"].as_u64().unwrap_or_default() >= 8 * 60);

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);
        assert_eq!(second_payload["data"]["products"], first_payload["data"]["products"]);
        assert_eq!(second_payload["data"]["price_points"], 0);
    });
}

#[test]
fn analyze_reports_seeded_product_and_rejects_unknown_ids() {
    with_database(|| {
        assert_eq!(seed::run().exit_code, 0);

        let result = analyze::run("lap-legion-5");
        assert_eq!(result.exit_code, 0, "expected analysis success: {}", result.output);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "analyze");
        assert_eq!(payload["data"]["product"]["id"], "lap-legion-5");
        assert_eq!(payload["data"]["games"].as_array().map(Vec::len), Some(11));

        let missing = analyze::run("lap-does-not-exist");
        assert_eq!(missing.exit_code, 6);
        let payload = parse_payload(&missing.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "not_found");
    });
}

#[test]
fn recommend_ranks_seeded_catalog() {
    with_database(|| {
        assert_eq!(seed::run().exit_code, 0);

        let args = RecommendArgs {
            usage: vec!["gaming".to_string()],
            limit: Some(3),
            ..RecommendArgs::default()
        };
        let result = recommend::run(&args);
        assert_eq!(result.exit_code, 0, "expected recommend success: {}", result.output);

        let payload = parse_payload(&result.output);
        let ranked = payload["data"].as_array().cloned().unwrap_or_default();
        assert_eq!(ranked.len(), 3);
        let scores =
            ranked.iter().filter_map(|entry| entry["match_score"].as_f64()).collect::<Vec<_>>();
        assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]), "scores descending: {scores:?}");
    });
}

#[test]
fn recommend_with_empty_budget_window_returns_no_rows() {
    with_database(|| {
        assert_eq!(seed::run().exit_code, 0);

        let args =
            RecommendArgs { min: Some(0), max: Some(100_000), ..RecommendArgs::default() };
        let result = recommend::run(&args);
        assert_eq!(result.exit_code, 0);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"], Value::Array(Vec::new()));
        assert_eq!(payload["message"], "no laptops match the requested budget");
    });
}

#[test]
fn recommend_rejects_unknown_priority_before_touching_the_database() {
    with_env(&[], || {
        let args =
            RecommendArgs { priority: Some("cheapest".to_string()), ..RecommendArgs::default() };
        let result = recommend::run(&args);
        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
    });
}

#[test]
fn games_estimates_the_catalog_for_a_tier() {
    let result = games::run(6, Some(144));
    assert_eq!(result.exit_code, 0);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "games");
    assert_eq!(payload["data"].as_array().map(Vec::len), Some(11));

    let rejected = games::run(11, None);
    assert_eq!(rejected.exit_code, 6);
}

#[test]
fn config_attributes_env_sources_and_redacts_keys() {
    with_env(
        &[
            ("LAPSIGHT_DATABASE_URL", "sqlite::memory:"),
            ("LAPSIGHT_GROQ_API_KEY", "gsk_live_abcdefgh1234"),
        ],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0);
            let payload = parse_payload(&result.output);
            let entries = payload["data"].as_array().cloned().unwrap_or_default();

            let entry = |key: &str| {
                entries.iter().find(|entry| entry["key"] == key).cloned().unwrap_or_default()
            };
            assert_eq!(entry("database.url")["source"], "env (LAPSIGHT_DATABASE_URL)");
            assert_eq!(entry("llm.groq_api_key")["value"], "***1234");
            assert_eq!(entry("server.port")["source"], "default");
            assert!(!result.output.contains("gsk_live_abcdefgh1234"));
        },
    );
}

#[test]
fn doctor_flags_pending_migrations_until_migrate_runs() {
    with_database(|| {
        let before = doctor::run(true);
        assert_eq!(before.exit_code, 4, "expected schema failure: {}", before.output);
        let payload = parse_payload(&before.output);
        assert_eq!(payload["status"], "error");
        let checks = payload["data"]["checks"].as_array().cloned().unwrap_or_default();
        let schema = checks.iter().find(|check| check["name"] == "schema_migrations");
        assert_eq!(schema.map(|check| check["status"].clone()), Some(Value::from("fail")));

        assert_eq!(migrate::run().exit_code, 0);

        let after = doctor::run(true);
        assert_eq!(after.exit_code, 0, "expected clean doctor run: {}", after.output);
        let payload = parse_payload(&after.output);
        assert_eq!(payload["data"]["overall_status"], "pass");

        let human = doctor::run(false);
        assert!(human.output.starts_with("doctor: all readiness checks passed"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn database_url(dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", dir.join("lapsight.db").display())
}

/// Runs `test_fn` against a fresh on-disk database so state survives across
/// the separate connections each command opens.
fn with_database(test_fn: impl FnOnce()) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = database_url(dir.path());
    with_env(&[("LAPSIGHT_DATABASE_URL", url.as_str())], test_fn);
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "LAPSIGHT_DATABASE_URL",
        "LAPSIGHT_DATABASE_MAX_CONNECTIONS",
        "LAPSIGHT_DATABASE_TIMEOUT_SECS",
        "LAPSIGHT_LLM_ENABLED",
        "LAPSIGHT_GEMINI_API_KEY",
        "LAPSIGHT_GEMINI_BASE_URL",
        "LAPSIGHT_GROQ_API_KEY",
        "LAPSIGHT_GROQ_BASE_URL",
        "LAPSIGHT_LLM_TIMEOUT_SECS",
        "LAPSIGHT_SERVER_BIND_ADDRESS",
        "LAPSIGHT_SERVER_PORT",
        "LAPSIGHT_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "LAPSIGHT_CATALOG_RECOMMEND_LIMIT",
        "LAPSIGHT_CATALOG_CANDIDATE_POOL",
        "LAPSIGHT_CATALOG_PRICE_TREND_DAYS",
        "LAPSIGHT_LOGGING_LEVEL",
        "LAPSIGHT_LOGGING_FORMAT",
        "LAPSIGHT_LOG_LEVEL",
        "LAPSIGHT_LOG_FORMAT",
        "GEMINI_API_KEY",
        "GROQ_API_KEY",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
