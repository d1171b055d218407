//! Database Backup Agent Library
//!
//! This library provides a scheduled dump → compress → retain → deliver backup cycle
//! for a single database, reporting to a Discord channel.

pub mod config;
pub mod context;
pub mod error;
pub mod managers;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, Config};
pub use context::{sanitize_source_id, InstanceContext};
pub use error::CycleError;
pub use managers::backup::{BackupArtifact, BackupManager, CycleOutcome, CycleResult, DeliveryStatus};
pub use managers::logging::{init_logging, init_console_logging, LoggingConfig, LogGuard};
pub use managers::notification::{DiscordNotifier, NotificationSink};
pub use managers::scheduler::Scheduler;
