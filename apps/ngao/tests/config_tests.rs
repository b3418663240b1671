//! Configuration loading: TOML sections, environment overrides and the
//! engine they open.

#![allow(clippy::unwrap_used)]

use ngao::config::{Backend, Config};
use ngao_core::{NgaoError, Permission, Role};
use std::collections::BTreeMap;

fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: BTreeMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn defaults_without_a_file() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.storage.backend, Backend::Redb);
    assert_eq!(config.security.rate_limit, 100);
    assert!(config.security.api_key().is_none());
}

#[test]
fn parses_every_section() {
    let config = Config::parse(
        r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [storage]
        backend = "memory"

        [security]
        api_key = "s3cret"
        rate_limit = 0
        cors_origins = "https://mis.example.go.ke"

        [permissions]
        chief = ["incidents.*", "registrations.view"]
        "#,
    )
    .unwrap();

    assert_eq!(config.server.port, 9000);
    assert_eq!(config.storage.backend, Backend::Memory);
    assert_eq!(config.security.api_key(), Some("s3cret"));
    assert_eq!(config.security.rate_limit, 0);
    assert_eq!(config.permissions["chief"].len(), 2);
}

#[test]
fn unknown_keys_are_rejected() {
    let result = Config::parse("[server]\nhots = \"0.0.0.0\"\n");
    assert!(matches!(result, Err(NgaoError::Validation(_))));
}

#[test]
fn empty_api_key_disables_auth() {
    let config = Config::parse("[security]\napi_key = \"\"\n").unwrap();
    assert!(config.security.api_key().is_none());
}

#[test]
fn environment_overrides_security() {
    let config = Config::parse("[security]\napi_key = \"from-file\"\nrate_limit = 5\n")
        .unwrap()
        .with_env(env(&[
            ("NGAO_API_KEY", "from-env"),
            ("NGAO_RATE_LIMIT", "250"),
            ("NGAO_CORS_ORIGINS", "*"),
        ]))
        .unwrap();

    assert_eq!(config.security.api_key(), Some("from-env"));
    assert_eq!(config.security.rate_limit, 250);
    assert_eq!(config.security.cors_origins.as_deref(), Some("*"));
}

#[test]
fn bad_rate_limit_in_environment_is_an_error() {
    let result = Config::default().with_env(env(&[("NGAO_RATE_LIMIT", "fast")]));
    assert!(matches!(result, Err(NgaoError::Validation(_))));
}

#[test]
fn permission_overrides_replace_role_grants() {
    let config = Config::parse(
        "[permissions]\nchief = [\"incidents.view\"]\nassistant_chief = [\"registrations.*\"]\n",
    )
    .unwrap();
    let table = config.permission_table().unwrap();

    assert!(table.allows(Role::Chief, Permission::INCIDENTS_VIEW));
    assert!(!table.allows(Role::Chief, Permission::REGISTRATIONS_CREATE));
    assert!(table.allows(Role::AssistantChief, Permission::REGISTRATIONS_APPROVE));
    assert!(table.allows(Role::CountyCommissioner, Permission::REGISTRATIONS_APPROVE));
}

#[test]
fn invalid_grant_is_rejected() {
    let config = Config::parse("[permissions]\nchief = [\"incidents.fly\"]\n").unwrap();
    assert!(config.permission_table().is_err());

    let config = Config::parse("[permissions]\nwizard = [\"incidents.view\"]\n").unwrap();
    assert!(config.permission_table().is_err());
}

#[test]
fn loads_file_and_opens_redb_engine() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ngao.redb");
    let path = dir.path().join("ngao.toml");
    std::fs::write(
        &path,
        format!("[storage]\nbackend = \"redb\"\npath = {:?}\n", db.display().to_string()),
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.storage.path, db);
    let engine = config.open_engine().unwrap();
    assert!(engine.is_persistent());
}

#[test]
fn missing_file_is_a_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(NgaoError::Storage(_))));
}
