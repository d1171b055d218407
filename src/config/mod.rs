//! Configuration module for db-backup-agent
//!
//! This module handles loading and validating configuration from TOML (or JSON) files.
//!
//! ## Example Usage
//!
//! ```no_run
//! use db_backup_agent::config;
//!
//! let config = config::load_config("backup-config.toml")?;
//! println!("Backing up {} every {} minute(s)",
//!     config.database.database,
//!     config.backup.effective_cooldown_minutes());
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{load_config, validate_config, validate_database, ConfigError, Result};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
