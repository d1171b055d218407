//! Unit tests for configuration loading and validation

use db_backup_agent::config::{load_config, validate_database, ConfigError};
use test_utils::ConfigBuilder;
use std::fs;

#[test]
fn test_config_loading_valid() {
    let (path, _config, _temp_dir) = ConfigBuilder::minimal().write_toml();

    let loaded = load_config(&path);
    assert!(loaded.is_ok(), "Config should load successfully: {:?}", loaded.err());

    let loaded = loaded.unwrap();
    assert_eq!(loaded.database.database, "db");
    assert!(validate_database(&loaded.database).is_ok());
}

#[test]
fn test_config_loading_invalid_toml() {
    let builder = ConfigBuilder::new();
    let path = builder.temp_path().join("config.toml");
    fs::write(&path, "invalid { toml content").unwrap();

    assert!(matches!(load_config(&path), Err(ConfigError::ParseError(_))));
}

#[test]
fn test_config_loading_missing_file() {
    let builder = ConfigBuilder::new();
    let result = load_config(builder.temp_path().join("nope.toml"));
    assert!(matches!(result, Err(ConfigError::ReadError(_))));
}

#[test]
fn test_missing_database_section_rejected() {
    let builder = ConfigBuilder::new();
    let path = builder.temp_path().join("config.toml");
    fs::write(&path, "[backup]\ncooldown = 5\n").unwrap();

    assert!(load_config(&path).is_err());
}

#[test]
fn test_first_missing_field_order() {
    let config = ConfigBuilder::new().build();
    assert!(matches!(
        validate_database(&config.database),
        Err(ConfigError::MissingField("host"))
    ));

    let config = ConfigBuilder::minimal()
        .without_database_field("user")
        .without_database_field("database")
        .build();
    assert!(matches!(
        validate_database(&config.database),
        Err(ConfigError::MissingField("database"))
    ));
}

#[test]
fn test_empty_password_is_not_a_config_error() {
    // A blank password is caught later by the dump producer
    let config = ConfigBuilder::minimal().without_database_field("password").build();
    assert!(validate_database(&config.database).is_ok());
}

#[test]
fn test_json_config() {
    let builder = ConfigBuilder::new();
    let path = builder.temp_path().join("config.json");
    fs::write(
        &path,
        r#"{
            "database": { "host": "db.local", "port": 3307, "user": "u", "password": "p", "database": "shop" },
            "backup": { "retentionDays": 14, "cooldown": 0 },
            "instance": { "name": "My Server" }
        }"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.database.port, Some(3307));
    assert_eq!(config.backup.retention_days, 14);
    assert_eq!(config.backup.effective_cooldown_minutes(), 1);
    assert_eq!(config.instance.name.as_deref(), Some("My Server"));
}

#[test]
fn test_zero_retention_loads_as_default() {
    let builder = ConfigBuilder::new();
    let path = builder.temp_path().join("config.json");
    fs::write(
        &path,
        r#"{
            "database": { "host": "h", "user": "u", "password": "p", "database": "d" },
            "backup": { "retentionDays": 0 }
        }"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.backup.effective_retention_days(), 30);
}

#[test]
fn test_excessive_cooldown_rejected() {
    let (path, _config, _temp_dir) = ConfigBuilder::minimal().with_cooldown(10_000_000).write_toml();
    assert!(matches!(
        load_config(&path),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn test_empty_dump_command_rejected() {
    let (path, _config, _temp_dir) = ConfigBuilder::minimal().with_dump_command("  ").write_toml();
    assert!(load_config(&path).is_err());
}
