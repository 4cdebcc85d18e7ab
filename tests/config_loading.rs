use std::io::Write;

use sondera_core::config::{AppConfig, RunOverrides};

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[research]
initial_search_query_count = 4
max_research_loops = 3

[model]
provider = "gemini"
model_id = "gemini-2.0-flash"
api_key = "test-key"
max_tokens = 4096
temperature = 0.2

[models]
query_generator = "gemini-2.0-flash"
reflection = "gemini-2.5-flash"
answer = "gemini-2.5-pro"

[retry]
max_retries = 3
initial_backoff_ms = 500
max_backoff_ms = 10000

[policy]
path = "custom-policy.json"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.research.initial_search_query_count, 4);
    assert_eq!(config.research.max_research_loops, 3);
    assert_eq!(config.model.provider, "gemini");
    assert_eq!(config.model.api_key, Some("test-key".to_string()));
    assert_eq!(config.models.answer, "gemini-2.5-pro");
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.policy.path, "custom-policy.json");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[model]\nmodel_id = \"gemini-2.0-flash\"\n")
        .expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.research.initial_search_query_count, 3);
    assert_eq!(config.research.max_research_loops, 2);
    assert_eq!(config.retry.max_retries, 2);
    assert_eq!(config.policy.path, "policy.json");
}

#[test]
fn test_api_key_env_expansion() {
    std::env::set_var("SONDERA_TEST_API_KEY", "expanded-key");

    let toml_content = r#"
[model]
model_id = "gemini-2.0-flash"
api_key = "${SONDERA_TEST_API_KEY}"
"#;
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.model.api_key, Some("expanded-key".to_string()));

    std::env::remove_var("SONDERA_TEST_API_KEY");
}

#[test]
fn test_missing_file_is_config_not_found() {
    let err = AppConfig::load(std::path::Path::new("/nonexistent/sondera.toml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/sondera.toml"));
}

#[test]
fn test_per_run_model_overrides() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[model]\nmodel_id = \"gemini-2.0-flash\"\n")
        .expect("write toml");
    let config = AppConfig::load(tmp.path()).expect("load config");

    let overrides = RunOverrides {
        reasoning_model: Some("gemini-exp".to_string()),
        query_generator_model: Some("gemini-lite".to_string()),
        ..Default::default()
    };

    assert_eq!(config.reflection_model(&overrides).model_id, "gemini-exp");
    assert_eq!(config.answer_model(&overrides).model_id, "gemini-exp");
    assert_eq!(
        config.query_generator_model(&overrides).model_id,
        "gemini-lite"
    );
}
