use std::io::Write;

use insightflow::config::{InsightflowConfig, ProviderConfig};
use insightflow::errors::{codes, InsightflowError};
use insightflow::providers::{build_ladder, LadderEntry, ProviderKind};
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

fn write_config(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

#[test]
fn file_config_overrides_provider_order() {
    let file = write_config(
        r#"{
            "providers": [
                { "kind": "local-model", "models": ["qwen2.5:7b"], "base_url": "http://gpu-box:11434" },
                { "kind": "groq", "models": ["llama-3.1-8b-instant"], "api_key_env": "TEAM_GROQ_KEY" }
            ],
            "request_timeout_seconds": 15
        }"#,
    );

    let config = InsightflowConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.request_timeout_seconds, 15.0);
    assert_eq!(config.providers[0].base_url(), "http://gpu-box:11434");
    assert_eq!(config.providers[1].credential().env_var(), Some("TEAM_GROQ_KEY"));

    let ladder = build_ladder(&config.registry().unwrap());
    assert_eq!(
        ladder.entries(),
        [
            LadderEntry { provider: ProviderKind::LocalModel, model: "qwen2.5:7b".to_string() },
            LadderEntry { provider: ProviderKind::Groq, model: "llama-3.1-8b-instant".to_string() },
        ]
    );
}

#[test]
fn empty_provider_list_is_rejected_before_any_run() {
    let file = write_config(r#"{ "providers": [] }"#);

    match InsightflowConfig::from_json_file(file.path()) {
        Err(InsightflowError::Configuration(err)) => assert_eq!(err.code(), codes::NO_PROVIDERS),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn duplicate_provider_is_rejected() {
    let config = InsightflowConfig::new().with_providers(vec![
        ProviderConfig::builtin(ProviderKind::Groq),
        ProviderConfig::builtin(ProviderKind::Groq),
    ]);
    assert_eq!(config.validate().unwrap_err().code(), codes::DUPLICATE_PROVIDER);
}

#[test]
fn malformed_file_is_a_serialization_error() {
    let file = write_config("{ not json");
    assert!(matches!(
        InsightflowConfig::from_json_file(file.path()),
        Err(InsightflowError::Serialization(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    assert!(matches!(
        InsightflowConfig::from_json_file(missing),
        Err(InsightflowError::Io(_))
    ));
}

#[test]
fn defaults_cover_every_provider() {
    let config = InsightflowConfig::from_json_file(write_config("{}").path()).unwrap();
    let kinds: Vec<_> = config.providers.iter().map(|p| p.kind).collect();
    assert_eq!(kinds, ProviderKind::ALL.to_vec());
    assert_eq!(config.request_timeout_seconds, 60.0);
}
