//! Backup manager - orchestrates one backup cycle
//!
//! validate → sweep → dump → archive → deliver. Rescheduling is the scheduler's job;
//! this module only reports how the cycle ended.

use crate::config::validate_database;
use crate::context::InstanceContext;
use crate::error::CycleError;
use crate::managers::audit::AuditLog;
use crate::managers::notification::{format_megabytes, Attachment, BackupReport, NotificationSink};
use crate::utils::archive::{archive_dump, Archiver};
use crate::utils::dump::DumpProducer;
use crate::utils::retention::{self, SweepReport};
use chrono::{DateTime, Local, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

/// One backup attempt's output
#[derive(Debug, Clone)]
pub struct BackupArtifact {
    pub source_id: String,
    pub created_at: DateTime<Utc>,
    /// `<backup_root>/<YYYY-MM-DD>`
    pub storage_dir: PathBuf,
    /// Uncompressed dump, removed once the archive is verified
    pub dump_path: PathBuf,
    pub archive_path: PathBuf,
    pub size_bytes: u64,
}

impl BackupArtifact {
    /// Derive the paths of a new artifact from its creation time
    pub fn plan(ctx: &InstanceContext, created_at: DateTime<Utc>, archive_extension: &str) -> Self {
        let storage_dir = storage_dir_for(ctx.backup_root(), created_at);
        let dump_path = storage_dir.join(dump_file_name(ctx.source_id(), created_at));
        let archive_path = dump_path.with_extension(archive_extension);

        Self {
            source_id: ctx.source_id().to_string(),
            created_at,
            storage_dir,
            dump_path,
            archive_path,
            size_bytes: 0,
        }
    }

    pub fn archive_file_name(&self) -> String {
        self.archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Day folder (local date) under the source's backup root
pub fn storage_dir_for(backup_root: &Path, created_at: DateTime<Utc>) -> PathBuf {
    backup_root.join(created_at.with_timezone(&Local).format("%Y-%m-%d").to_string())
}

/// `<source_id>-<UTC ISO-8601 with ':' replaced by '-'>.sql`
pub fn dump_file_name(source_id: &str, created_at: DateTime<Utc>) -> String {
    format!(
        "{}-{}.sql",
        source_id,
        created_at.format("%Y-%m-%dT%H-%M-%S%.3fZ")
    )
}

/// What happened to the report after a successful backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    /// No sink configured
    Skipped,
    Failed(String),
}

/// A cycle that produced a verified archive
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub artifact: BackupArtifact,
    pub delivery: DeliveryStatus,
    /// Entries removed by the retention sweep
    pub swept: usize,
}

pub type CycleResult = Result<CycleOutcome, CycleError>;

pub struct BackupManager {
    ctx: InstanceContext,
    dumper: Arc<dyn DumpProducer>,
    archiver: Arc<dyn Archiver>,
    sink: Option<Arc<dyn NotificationSink>>,
    audit: AuditLog,
}

impl BackupManager {
    /// Create new backup manager
    pub fn new(
        ctx: InstanceContext,
        dumper: Arc<dyn DumpProducer>,
        archiver: Arc<dyn Archiver>,
        sink: Option<Arc<dyn NotificationSink>>,
    ) -> Self {
        let audit = AuditLog::for_instance(&ctx);
        Self {
            ctx,
            dumper,
            archiver,
            sink,
            audit,
        }
    }

    pub fn context(&self) -> &InstanceContext {
        &self.ctx
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// When the next cycle starts if one finishes at `from`
    pub fn next_run_after(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let interval = self.ctx.config().backup.cycle_interval();
        chrono::Duration::from_std(interval)
            .ok()
            .and_then(|delay| from.checked_add_signed(delay))
            .unwrap_or(from)
    }

    /// Run one full cycle now
    pub async fn run_cycle(&self) -> CycleResult {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one full cycle, stamping the artifact with `now`
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleResult {
        let config = self.ctx.config();

        if let Err(e) = validate_database(&config.database) {
            self.audit
                .error(&format!("Invalid configuration: {}", e))
                .await;
            return Err(CycleError::Config(e.to_string()));
        }

        let sweep = self.sweep(SystemTime::from(now)).await;

        let mut artifact = BackupArtifact::plan(&self.ctx, now, self.archiver.extension());

        if let Err(e) = tokio::fs::create_dir_all(&artifact.storage_dir).await {
            let message = format!(
                "Failed to create backup folder {}: {}",
                artifact.storage_dir.display(),
                e
            );
            self.audit.error(&message).await;
            return Err(CycleError::Unexpected(message));
        }

        debug!("Dumping with {} into {:?}", self.dumper.name(), artifact.dump_path);
        if let Err(e) = self.dumper.dump(&config.database, &artifact.dump_path).await {
            self.audit
                .error(&format!("Failed to create the backup file: {}", e))
                .await;
            return Err(e.into());
        }

        let archived = match archive_dump(self.archiver.as_ref(), &artifact.dump_path).await {
            Ok(archived) => archived,
            Err(e) => {
                self.audit
                    .error(&format!("Failed to compress the backup file: {}", e))
                    .await;
                return Err(e.into());
            }
        };
        for warning in &archived.warnings {
            self.audit.warn(warning).await;
        }

        artifact.archive_path = archived.path;
        artifact.size_bytes = archived.size_bytes;
        self.audit
            .success(&format!(
                "Backup created successfully: {}",
                artifact.archive_path.display()
            ))
            .await;

        let delivery = match self.deliver(&artifact).await {
            Ok(status) => status,
            Err(e) => {
                let reason = match e {
                    CycleError::Delivery(reason) => reason,
                    other => other.to_string(),
                };
                self.audit.error(&reason).await;
                DeliveryStatus::Failed(reason)
            }
        };

        Ok(CycleOutcome {
            artifact,
            delivery,
            swept: sweep.removed.len(),
        })
    }

    /// Remove expired entries under the source's backup root, logging each one
    pub async fn sweep(&self, now: SystemTime) -> SweepReport {
        let retention_days = self.ctx.config().backup.effective_retention_days();
        let report = retention::sweep(self.ctx.backup_root(), retention_days, now).await;

        for path in &report.removed {
            self.audit
                .info(&format!("Removed old backup: {}", path.display()))
                .await;
        }
        for failure in &report.failures {
            self.audit
                .error(&format!("Failed to remove old backup: {}", failure))
                .await;
        }

        if !report.removed.is_empty() {
            info!(
                "Retention sweep removed {} of {} entries (older than {} days)",
                report.removed.len(),
                report.scanned,
                retention_days
            );
        }
        report
    }

    async fn deliver(&self, artifact: &BackupArtifact) -> Result<DeliveryStatus, CycleError> {
        let sink = match self.sink {
            Some(ref sink) => sink,
            None => {
                self.audit
                    .info("No notification channel configured, backup kept locally")
                    .await;
                return Ok(DeliveryStatus::Skipped);
            }
        };

        let config = self.ctx.config();
        let footer = config.discord.as_ref().map(|d| {
            format!("{} \u{2022} Server: {}", d.footer, self.ctx.display_name())
        });
        let report = BackupReport::for_artifact(
            artifact,
            &config.database.database,
            self.next_run_after(artifact.created_at),
            footer,
        );
        let attachment = Attachment {
            path: artifact.archive_path.clone(),
            filename: artifact.archive_file_name(),
        };

        sink.send(&report, &attachment).await.map_err(|e| {
            CycleError::Delivery(format!(
                "Failed to send backup through {}: {:#}",
                sink.name(),
                e
            ))
        })?;

        self.audit
            .success(&format!(
                "Backup sent through {}. Size: {} MB",
                sink.name(),
                format_megabytes(artifact.size_bytes)
            ))
            .await;
        Ok(DeliveryStatus::Delivered)
    }
}
