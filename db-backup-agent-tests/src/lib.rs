//! Test utilities for db-backup-agent
//!
//! This crate provides shared test utilities, fake components,
//! and helper functions for testing the backup agent.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, TestContext};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let ctx = TestContext::from_builder(ConfigBuilder::minimal());
//!     let manager = ctx.manager_with_sink(RecordingSink::new());
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::TestContext;

// Re-export types from the main crate for convenience
pub use db_backup_agent::config::{
    BackupSettings, Config, DatabaseConfig, DiscordConfig, InstanceSettings, LoggingSettings,
};
pub use db_backup_agent::managers::backup::{BackupManager, CycleOutcome, CycleResult, DeliveryStatus};
pub use db_backup_agent::context::InstanceContext;

// Re-export fake implementations from the main crate
pub use db_backup_agent::managers::notification::mock::{RecordingSink, SentReport};
pub use db_backup_agent::utils::archive::mock::MockArchiver;
pub use db_backup_agent::utils::dump::mock::MockDumpProducer;
pub use db_backup_agent::utils::executor::mock::{MockExecutor, MockResponse};

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
