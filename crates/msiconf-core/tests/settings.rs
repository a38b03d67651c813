use std::collections::HashMap;
use std::path::Path;

use msiconf_core::metadata::Polarity;
use msiconf_core::settings::{LogFormat, Settings, SettingsError};

#[test]
fn empty_document_yields_defaults() {
    let settings = Settings::from_toml_str("").expect("parse");
    assert_eq!(settings, Settings::default());
    assert_eq!(
        settings.default_adducts.for_polarity(Polarity::Positive),
        ["+H", "+Na", "+K"]
    );
    assert_eq!(settings.db.port, 5432);
    assert_eq!(settings.db.search_path, "knex,public");
    assert_eq!(settings.bus.capacity, 1024);
    assert!(settings.slack.webhook_url.is_none());
}

#[test]
fn file_sections_override_defaults() {
    let settings = Settings::from_toml_str(
        r##"
        [default_adducts]
        "+" = ["+H"]
        "-" = ["-H"]

        [slack]
        webhook_url = "https://hooks.slack.example/T000/B000"
        channel = "#metadata"

        [log]
        level = "debug"
        format = "json"

        [db]
        host = "db.internal"
        database = "metaspace"
        "##,
    )
    .expect("parse");

    assert_eq!(settings.default_adducts.positive, vec!["+H"]);
    assert_eq!(settings.default_adducts.for_polarity(Polarity::Negative), ["-H"]);
    assert_eq!(settings.slack.channel.as_deref(), Some("#metadata"));
    assert_eq!(settings.log.level, "debug");
    assert_eq!(settings.log.format, LogFormat::Json);
    assert_eq!(settings.db.host, "db.internal");
    assert_eq!(settings.db.database, "metaspace");
    assert_eq!(settings.db.user, "sm");
}

#[test]
fn environment_overrides_file_values() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("MSICONF_DB_HOST", "pg.example"),
        ("MSICONF_DB_PORT", "6543"),
        ("MSICONF_DB_PASSWORD", "hunter2"),
        ("MSICONF_SLACK_WEBHOOK_URL", "https://hooks.slack.example/x"),
        ("MSICONF_LOG_LEVEL", "warn"),
    ]);

    let mut settings = Settings::default();
    settings
        .apply_env_overrides(|var| env.get(var).map(|value| value.to_string()))
        .expect("overrides");

    assert_eq!(settings.db.host, "pg.example");
    assert_eq!(settings.db.port, 6543);
    assert_eq!(settings.db.password, "hunter2");
    assert_eq!(
        settings.slack.webhook_url.as_deref(),
        Some("https://hooks.slack.example/x")
    );
    assert_eq!(settings.log.level, "warn");
}

#[test]
fn empty_webhook_override_disables_notifications() {
    let mut settings = Settings::default();
    settings.slack.webhook_url = Some("https://hooks.slack.example/x".into());

    settings
        .apply_env_overrides(|var| (var == "MSICONF_SLACK_WEBHOOK_URL").then(String::new))
        .expect("overrides");

    assert!(settings.slack.webhook_url.is_none());
}

#[test]
fn invalid_port_override_is_reported() {
    let mut settings = Settings::default();
    let err = settings
        .apply_env_overrides(|var| (var == "MSICONF_DB_PORT").then(|| "five".to_string()))
        .unwrap_err();

    assert!(matches!(
        err,
        SettingsError::InvalidEnv { var: "MSICONF_DB_PORT", .. }
    ));
}

#[test]
fn missing_file_is_a_read_error() {
    let err = Settings::from_file(Path::new("/nonexistent/msiconf.toml")).unwrap_err();
    assert!(matches!(err, SettingsError::Read { .. }));
    assert!(err.to_string().contains("/nonexistent/msiconf.toml"));
}

#[test]
fn debug_output_redacts_password() {
    let mut settings = Settings::default();
    settings.db.password = "hunter2".into();
    let rendered = format!("{:?}", settings.db);
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("<redacted>"));
}
