//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.
//! Backup and log directories live in a temp dir owned by the builder.

use db_backup_agent::config::{
    BackupSettings, Config, DatabaseConfig, DiscordConfig, InstanceSettings, LoggingSettings,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    database: DatabaseConfig,
    backup: BackupSettings,
    discord: Option<DiscordConfig>,
    logging: LoggingSettings,
    instance: InstanceSettings,
}

impl ConfigBuilder {
    /// Create a builder with empty database settings
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let backup = BackupSettings {
            backup_root: temp_dir.path().join("backups"),
            ..BackupSettings::default()
        };
        let logging = LoggingSettings {
            log_directory: temp_dir.path().join("logs"),
            log_level: "debug".to_string(),
            log_max_files: 5,
        };

        Self {
            temp_dir,
            database: DatabaseConfig::default(),
            backup,
            discord: None,
            logging,
            instance: InstanceSettings::default(),
        }
    }

    /// Complete database settings, 30-day retention, 10-minute cooldown
    pub fn minimal() -> Self {
        Self::new().with_database("localhost", "backup", "secret", "db")
    }

    pub fn with_database(mut self, host: &str, user: &str, password: &str, database: &str) -> Self {
        self.database = DatabaseConfig {
            host: host.to_string(),
            port: None,
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
        };
        self
    }

    /// Blank out one database field ("host", "user", "password" or "database")
    pub fn without_database_field(mut self, field: &str) -> Self {
        match field {
            "host" => self.database.host.clear(),
            "user" => self.database.user.clear(),
            "password" => self.database.password.clear(),
            "database" => self.database.database.clear(),
            other => panic!("Unknown database field: {}", other),
        }
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.backup.retention_days = days;
        self
    }

    pub fn with_cooldown(mut self, minutes: u64) -> Self {
        self.backup.cooldown = minutes;
        self
    }

    pub fn with_dump_command(mut self, command: &str) -> Self {
        self.backup.dump_command = command.to_string();
        self
    }

    pub fn with_backup_root(mut self, path: &Path) -> Self {
        self.backup.backup_root = path.to_path_buf();
        self
    }

    pub fn with_log_dir(mut self, path: &Path) -> Self {
        self.logging.log_directory = path.to_path_buf();
        self
    }

    /// Configure a Discord channel pointing at `api_base`
    pub fn with_discord(mut self, api_base: &str, channel_id: &str) -> Self {
        self.discord = Some(DiscordConfig {
            token: "test-token".to_string(),
            channel_id: channel_id.to_string(),
            api_base: api_base.to_string(),
            footer: "Automatic database backup".to_string(),
            timeout_seconds: 5,
        });
        self
    }

    pub fn with_instance_name(mut self, name: &str) -> Self {
        self.instance.name = Some(name.to_string());
        self
    }

    /// Temp dir backing this configuration
    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Build the configuration (temp dir is dropped, so only for pure tests)
    pub fn build(self) -> Config {
        self.into_parts().0
    }

    /// Build and keep the temp dir alive
    pub fn persist(self) -> (Config, TempDir) {
        self.into_parts()
    }

    /// Serialize to TOML, write it as `config.toml` in the temp dir and return its path
    pub fn write_toml(self) -> (PathBuf, Config, TempDir) {
        let (config, temp_dir) = self.into_parts();
        let path = temp_dir.path().join("config.toml");
        let content = toml::to_string_pretty(&config).expect("Failed to serialize config");
        fs::write(&path, content).expect("Failed to write config file");
        (path, config, temp_dir)
    }

    fn into_parts(self) -> (Config, TempDir) {
        let config = Config {
            database: self.database,
            backup: self.backup,
            discord: self.discord,
            logging: self.logging,
            instance: self.instance,
        };
        (config, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
