use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub backup: BackupSettings,
    #[serde(default)]
    pub discord: Option<DiscordConfig>,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub instance: InstanceSettings,
}

/// Data-source connection parameters
///
/// Every field defaults to empty so that an incomplete section still loads;
/// completeness is checked at the start of each cycle.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
}

impl DatabaseConfig {
    /// Name of the first required field (host, database, user) that is blank
    pub fn first_missing_field(&self) -> Option<&'static str> {
        [
            ("host", &self.host),
            ("database", &self.database),
            ("user", &self.user),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

/// Upper bound accepted for `backup.cooldown` (one year)
pub const MAX_COOLDOWN_MINUTES: u64 = 525_600;

/// Backup cadence, retention and storage settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupSettings {
    /// Entries older than this many days are removed by the sweep
    #[serde(default = "default_retention_days", alias = "retentionDays")]
    pub retention_days: u32,

    /// Minutes between the end of one cycle and the start of the next
    #[serde(default = "default_cooldown")]
    pub cooldown: u64,

    /// Root directory under which per-source backup trees are created
    #[serde(default = "default_backup_root")]
    pub backup_root: PathBuf,

    /// Dump tool binary (looked up on PATH unless absolute)
    #[serde(default = "default_dump_command")]
    pub dump_command: String,

    #[serde(default = "default_dump_timeout")]
    pub dump_timeout_seconds: u64,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            cooldown: default_cooldown(),
            backup_root: default_backup_root(),
            dump_command: default_dump_command(),
            dump_timeout_seconds: default_dump_timeout(),
        }
    }
}

impl BackupSettings {
    /// Cycle interval in minutes, clamped to `1..=MAX_COOLDOWN_MINUTES`
    pub fn effective_cooldown_minutes(&self) -> u64 {
        self.cooldown.clamp(1, MAX_COOLDOWN_MINUTES)
    }

    /// Delay between the end of one cycle and the start of the next.
    ///
    /// Both the scheduler's sleep and the "next backup" time shown in reports
    /// are derived from this.
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.effective_cooldown_minutes() * 60)
    }

    /// Retention window in days; `0` means the default of 30
    pub fn effective_retention_days(&self) -> u32 {
        match self.retention_days {
            0 => default_retention_days(),
            days => days,
        }
    }
}

/// Discord channel delivery settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscordConfig {
    /// Bot token used in the `Authorization: Bot` header
    pub token: String,

    /// Target text channel
    #[serde(alias = "channelId")]
    pub channel_id: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Footer text shown under every report
    #[serde(default = "default_footer")]
    pub footer: String,

    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

/// Diagnostic and audit logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_directory: default_log_directory(),
            log_level: default_log_level(),
            log_max_files: default_log_max_files(),
        }
    }
}

/// Instance naming
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InstanceSettings {
    /// Display name of this instance; sanitized into the source identifier.
    /// When unset the first guild visible to the Discord bot is used.
    #[serde(default)]
    pub name: Option<String>,
}

// Default value functions

fn default_retention_days() -> u32 { 30 }
fn default_cooldown() -> u64 { 10 }
fn default_backup_root() -> PathBuf { PathBuf::from("./backups") }
fn default_dump_command() -> String { "mysqldump".to_string() }
fn default_dump_timeout() -> u64 { 3600 }
fn default_api_base() -> String { "https://discord.com/api/v10".to_string() }
fn default_footer() -> String { "Automatic database backup".to_string() }
fn default_http_timeout() -> u64 { 60 }
fn default_log_directory() -> PathBuf { PathBuf::from("./logs") }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
