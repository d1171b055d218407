//! Per-instance context shared by every component of the lifecycle

use crate::config::{expand_tilde, Config, ConfigError};
use std::path::{Path, PathBuf};

/// Immutable identity and configuration of one running agent.
///
/// Built once at startup and passed by reference into every cycle.
#[derive(Debug, Clone)]
pub struct InstanceContext {
    source_id: String,
    display_name: String,
    config: Config,
    backup_root: PathBuf,
    log_dir: PathBuf,
}

impl InstanceContext {
    /// Build the context for an instance named `display_name`
    pub fn new(display_name: &str, config: Config) -> Result<Self, ConfigError> {
        let source_id = sanitize_source_id(display_name.trim());
        if source_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "instance name must not be empty".to_string(),
            ));
        }

        let backup_root = expand_tilde(&config.backup.backup_root).join(&source_id);
        let log_dir = expand_tilde(&config.logging.log_directory);

        Ok(Self {
            source_id,
            display_name: display_name.trim().to_string(),
            config,
            backup_root,
            log_dir,
        })
    }

    /// Sanitized name used to namespace storage and logs
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `<backup_root>/<source_id>`, the tree the sweeper and the cycle write to
    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// `<backup_root>/.<source_id>.lock`, outside the swept tree
    pub fn lock_path(&self) -> PathBuf {
        self.backup_root
            .with_file_name(format!(".{}.lock", self.source_id))
    }

    /// `<log_dir>/<source_id>_backup.log`
    pub fn audit_log_path(&self) -> PathBuf {
        self.log_dir.join(format!("{}_backup.log", self.source_id))
    }
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`
pub fn sanitize_source_id(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
