//! Test context and harness for cycle testing
//!
//! Wires a temp-dir configuration into an [`InstanceContext`] and a
//! [`BackupManager`] built from fakes.

use crate::config_builder::ConfigBuilder;
use crate::fixtures::sample_dump_sql;
use db_backup_agent::config::Config;
use db_backup_agent::context::InstanceContext;
use db_backup_agent::managers::backup::BackupManager;
use db_backup_agent::managers::notification::NotificationSink;
use db_backup_agent::utils::archive::{Archiver, ZipArchiver};
use db_backup_agent::utils::dump::mock::MockDumpProducer;
use db_backup_agent::utils::dump::DumpProducer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Display name used by every test instance
pub const TEST_INSTANCE: &str = "TestServer";

/// Test context that owns the temp dir and the instance built on top of it
pub struct TestContext {
    temp_dir: TempDir,
    instance: InstanceContext,
}

impl TestContext {
    /// Context over a complete minimal configuration
    pub fn new() -> Self {
        Self::from_builder(ConfigBuilder::minimal())
    }

    pub fn from_builder(builder: ConfigBuilder) -> Self {
        let (config, temp_dir) = builder.persist();
        let instance =
            InstanceContext::new(TEST_INSTANCE, config).expect("Failed to build instance context");
        Self { temp_dir, instance }
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn instance(&self) -> &InstanceContext {
        &self.instance
    }

    pub fn config(&self) -> &Config {
        self.instance.config()
    }

    /// `<backup_root>/TestServer`
    pub fn backup_root(&self) -> &Path {
        self.instance.backup_root()
    }

    /// Manager with the given components
    pub fn manager(
        &self,
        dumper: Arc<dyn DumpProducer>,
        archiver: Arc<dyn Archiver>,
        sink: Option<Arc<dyn NotificationSink>>,
    ) -> BackupManager {
        BackupManager::new(self.instance.clone(), dumper, archiver, sink)
    }

    /// Manager with a working fake dump, the real zip archiver and `sink`
    pub fn manager_with_sink<S: NotificationSink + 'static>(&self, sink: S) -> BackupManager {
        self.manager(
            Arc::new(MockDumpProducer::writing(&sample_dump_sql())),
            Arc::new(ZipArchiver::new()),
            Some(Arc::new(sink)),
        )
    }

    /// Contents of the audit log, empty if it was never written
    pub fn audit_log(&self) -> String {
        std::fs::read_to_string(self.instance.audit_log_path()).unwrap_or_default()
    }

    /// Every file under the temp dir with the given extension
    pub fn files_with_extension(&self, extension: &str) -> Vec<PathBuf> {
        let mut found = Vec::new();
        collect_files(self.temp_dir.path(), extension, &mut found);
        found.sort();
        found
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_files(dir: &Path, extension: &str, found: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, extension, found);
        } else if path.extension().map(|e| e == extension).unwrap_or(false) {
            found.push(path);
        }
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Debug> ResultAssertions<T> for Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = format!("{:?}", e);
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}
