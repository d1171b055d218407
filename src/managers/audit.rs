//! Audit log: one human-readable line per lifecycle event
//!
//! Lines look like `[2025-01-01T02:00:00.000Z] [SUCCESS] Backup created: ...` and are
//! appended to `<log_dir>/<source_id>_backup.log`. Every record is mirrored to `tracing`.
//! Writing never fails the caller; append errors are reported through `tracing::error!`.

use crate::context::InstanceContext;
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

/// Severity tag written in front of each message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Info,
    Success,
    Warn,
    Error,
}

impl AuditLevel {
    pub fn tag(&self) -> &'static str {
        match self {
            AuditLevel::Info => "[INFO]",
            AuditLevel::Success => "[SUCCESS]",
            AuditLevel::Warn => "[WARN]",
            AuditLevel::Error => "[ERROR]",
        }
    }
}

/// Append-only per-source event log
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_instance(ctx: &InstanceContext) -> Self {
        Self::new(ctx.audit_log_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render one log line (including the trailing newline)
    pub fn format_line(timestamp: DateTime<Utc>, level: AuditLevel, message: &str) -> String {
        format!(
            "[{}] {} {}\n",
            timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            level.tag(),
            message
        )
    }

    /// Append a record. Never fails.
    pub async fn record(&self, level: AuditLevel, message: &str) {
        match level {
            AuditLevel::Info | AuditLevel::Success => info!("{} {}", level.tag(), message),
            AuditLevel::Warn => warn!("{} {}", level.tag(), message),
            AuditLevel::Error => error!("{} {}", level.tag(), message),
        }

        let line = Self::format_line(Utc::now(), level, message);
        if let Err(e) = self.append(&line).await {
            error!("Failed to write audit log {:?}: {}", self.path, e);
        }
    }

    pub async fn info(&self, message: &str) {
        self.record(AuditLevel::Info, message).await
    }

    pub async fn success(&self, message: &str) {
        self.record(AuditLevel::Success, message).await
    }

    pub async fn warn(&self, message: &str) {
        self.record(AuditLevel::Warn, message).await
    }

    pub async fn error(&self, message: &str) {
        self.record(AuditLevel::Error, message).await
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
