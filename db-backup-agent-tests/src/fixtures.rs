//! Test fixtures and sample data
//!
//! Provides dump producers with scripted behavior and helpers for aging files.

use async_trait::async_trait;
use db_backup_agent::config::DatabaseConfig;
use db_backup_agent::error::DumpError;
use db_backup_agent::utils::dump::{validate_params, DumpProducer};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// A few hundred lines of plausible dump output
pub fn sample_dump_sql() -> String {
    let mut sql = String::from(
        "-- MySQL dump 10.13\n\
         CREATE TABLE `users` (`id` int NOT NULL, `name` varchar(64), PRIMARY KEY (`id`));\n",
    );
    for i in 0..300 {
        sql.push_str(&format!("INSERT INTO `users` VALUES ({}, 'user-{}');\n", i, i));
    }
    sql
}

/// Dump producer that records the (tokio) instant of every call and can be
/// told to panic on given call numbers (1-based)
pub struct TimedDumpProducer {
    content: String,
    panic_on: HashSet<usize>,
    calls: Mutex<Vec<Instant>>,
}

impl TimedDumpProducer {
    pub fn new() -> Self {
        Self {
            content: sample_dump_sql(),
            panic_on: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn panicking_on(mut self, call: usize) -> Self {
        self.panic_on.insert(call);
        self
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().clone()
    }

    /// Gaps between consecutive calls
    pub fn gaps(&self) -> Vec<Duration> {
        self.call_times()
            .windows(2)
            .map(|w| w[1].duration_since(w[0]))
            .collect()
    }
}

impl Default for TimedDumpProducer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DumpProducer for TimedDumpProducer {
    async fn dump(&self, params: &DatabaseConfig, output: &Path) -> Result<(), DumpError> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push(Instant::now());
            calls.len()
        };
        if self.panic_on.contains(&call) {
            panic!("dump producer exploded on call {}", call);
        }
        validate_params(params)?;
        tokio::fs::write(output, &self.content)
            .await
            .map_err(|e| DumpError::ToolFailed(e.to_string()))
    }

    fn name(&self) -> &str {
        "timed-dump"
    }
}

/// Dump producer that always panics
pub struct PanickingDumpProducer;

#[async_trait]
impl DumpProducer for PanickingDumpProducer {
    async fn dump(&self, _params: &DatabaseConfig, _output: &Path) -> Result<(), DumpError> {
        panic!("dump producer exploded");
    }

    fn name(&self) -> &str {
        "panicking-dump"
    }
}

/// Backdate a file or directory's modification time by `age`
pub fn set_age(path: &Path, age: Duration) {
    let mtime = SystemTime::now() - age;
    File::open(path)
        .and_then(|f| f.set_modified(mtime))
        .unwrap_or_else(|e| panic!("Failed to set mtime of {:?}: {}", path, e));
}

/// Create a day folder with one archive inside, aged `age_days`
pub fn aged_day_folder(root: &Path, name: &str, age_days: u64) -> std::path::PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).expect("Failed to create day folder");
    let file = dir.join(format!("{}.zip", name));
    std::fs::write(&file, b"PK").expect("Failed to write archive");
    set_age(&file, DAY * age_days as u32);
    set_age(&dir, DAY * age_days as u32);
    dir
}
