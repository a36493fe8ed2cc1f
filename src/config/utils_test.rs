use std::collections::HashMap;

use crate::config::{
    StorageConfig,
    constants::{DB_FILE_PATH, HISTORY_TOKEN_BUDGET, OLLAMA_ENDPOINT, REQUEST_TIMEOUT_SECS},
};

use super::*;

#[test]
fn test_load_configuration() {
    let config = load_configuration("./testdata/config.toml").expect("failed to load config");

    assert_eq!(config.general.verbose, true);

    let log = &config.log;
    assert_eq!(log.level.as_deref(), Some("debug"));
    let log_filters = log.filters.as_deref().unwrap_or_default();
    assert_eq!(log_filters.len(), 1);
    assert_eq!(log_filters[0].module.as_deref(), Some("ollagram::stream"));

    let log_file = log.file.as_ref().expect("log file should be set");
    assert_eq!(log_file.path, "/var/log/ollagram.log");
    assert_eq!(log_file.append, true);

    let telegram = &config.telegram;
    assert_eq!(telegram.token, "123:abc");
    assert_eq!(telegram.admin_ids, vec![1, 2]);
    assert_eq!(telegram.allow_all_users_in_groups, true);
    assert_eq!(telegram.poll_timeout_secs, 30);

    let backend = &config.backend;
    assert_eq!(backend.endpoint, "http://ollama:11434");
    assert_eq!(backend.default_model.as_deref(), Some("llama3.1:8b"));
    assert_eq!(backend.timeout_secs, 600);
    assert_eq!(backend.connect_timeout_secs, 5);

    assert_eq!(config.context.history_token_budget, 2048);
    assert_eq!(config.context.max_sessions, 5);

    match &config.storage {
        StorageConfig::Sqlite(sqlite) => {
            assert_eq!(sqlite.path(), Some("/var/lib/ollagram/users.db"));
        }
    }
}

#[test]
fn test_load_configuration_with_some_default_fields() {
    let config =
        load_configuration("./testdata/config_with_default.toml").expect("failed to load config");

    assert_eq!(config.general.verbose, false);
    assert_eq!(config.log.level.as_deref(), Some("info"));
    assert!(config.log.file.is_none());

    assert_eq!(config.telegram.token, "123:abc");
    assert!(config.telegram.admin_ids.is_empty());

    assert_eq!(config.backend.endpoint, OLLAMA_ENDPOINT);
    assert_eq!(config.backend.timeout_secs, REQUEST_TIMEOUT_SECS);
    assert_eq!(config.context.history_token_budget, HISTORY_TOKEN_BUDGET);

    match &config.storage {
        StorageConfig::Sqlite(sqlite) => assert_eq!(sqlite.path(), Some(DB_FILE_PATH)),
    }
}

#[test]
fn test_env_overrides() {
    let env = HashMap::from([
        ("TOKEN", "999:xyz"),
        ("ADMIN_IDS", "10, 20,30"),
        ("ALLOW_ALL_USERS_IN_GROUPS", "1"),
        ("OLLAMA_BASE_URL", "gpu-box"),
        ("INITMODEL", "qwen2.5"),
        ("TIMEOUT", "120"),
    ]);

    let config = Configuration::default()
        .with_env_from(|key| env.get(key).map(|v| v.to_string()))
        .expect("failed to apply env");

    assert_eq!(config.telegram.token, "999:xyz");
    assert_eq!(config.telegram.admin_ids, vec![10, 20, 30]);
    assert_eq!(config.telegram.allow_all_users_in_groups, true);
    assert_eq!(config.backend.endpoint, "http://gpu-box:11434");
    assert_eq!(config.backend.default_model.as_deref(), Some("qwen2.5"));
    assert_eq!(config.backend.timeout_secs, 120);
}

#[test]
fn test_env_overrides_invalid_admin_ids() {
    let err = Configuration::default()
        .with_env_from(|key| (key == "ADMIN_IDS").then(|| "1,abc".to_string()))
        .unwrap_err();
    assert!(format!("{err:?}").contains("ADMIN_IDS"));
}

#[test]
fn test_resolve_path() {
    let ret = resolve_path("$OLLAGRAM_UNSET_DIR/${OLLAGRAM_UNSET_USER}/config.toml")
        .expect("failed to resolve path");
    assert_eq!(ret, "//config.toml");

    let dir = "/tmp/test";
    let user_path = "user_path";
    unsafe {
        std::env::set_var("OLLAGRAM_TEST_PATH", dir);
        std::env::set_var("OLLAGRAM_USER_PATH", user_path);
    }
    let ret = resolve_path("$OLLAGRAM_TEST_PATH/${OLLAGRAM_USER_PATH}/config.toml")
        .expect("failed to resolve path");
    assert_eq!(ret, format!("{dir}/{user_path}/config.toml"));
}

#[test]
fn test_basename() {
    assert_eq!(basename("src/stream/render.rs"), "render.rs");
    assert_eq!(basename("main.rs"), "main.rs");
}
