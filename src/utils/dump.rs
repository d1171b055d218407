//! Dump producer: runs the external dump tool against the configured database

use crate::config::{BackupSettings, DatabaseConfig};
use crate::error::DumpError;
use crate::utils::executor::CommandExecutor;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Produces a full logical dump of one database into a single file
#[async_trait]
pub trait DumpProducer: Send + Sync {
    /// Write the dump to `output`. Leaves no file behind on failure.
    async fn dump(&self, params: &DatabaseConfig, output: &Path) -> Result<(), DumpError>;

    /// Tool name (for logging)
    fn name(&self) -> &str;
}

/// Every connection parameter must be non-empty before any I/O happens
pub fn validate_params(params: &DatabaseConfig) -> Result<(), DumpError> {
    let fields = [
        ("host", &params.host),
        ("user", &params.user),
        ("password", &params.password),
        ("database", &params.database),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(DumpError::MissingParameter(name));
        }
    }
    Ok(())
}

/// `mysqldump`-compatible producer
pub struct MysqlDumpProducer {
    executor: Arc<dyn CommandExecutor>,
    command: String,
    timeout: Duration,
}

impl MysqlDumpProducer {
    pub fn new(executor: Arc<dyn CommandExecutor>, command: &str, timeout: Duration) -> Self {
        Self {
            executor,
            command: command.to_string(),
            timeout,
        }
    }

    /// Build from the `[backup]` section
    pub fn from_settings(executor: Arc<dyn CommandExecutor>, settings: &BackupSettings) -> Self {
        Self::new(
            executor,
            &settings.dump_command,
            Duration::from_secs(settings.dump_timeout_seconds),
        )
    }

    fn build_args(params: &DatabaseConfig, output: &Path) -> Vec<String> {
        let mut args = vec![format!("--host={}", params.host)];
        if let Some(port) = params.port {
            args.push(format!("--port={}", port));
        }
        args.push(format!("--user={}", params.user));
        args.push("--single-transaction".to_string());
        args.push("--routines".to_string());
        args.push("--triggers".to_string());
        args.push(format!("--result-file={}", output.display()));
        args.push(params.database.clone());
        args
    }
}

#[async_trait]
impl DumpProducer for MysqlDumpProducer {
    async fn dump(&self, params: &DatabaseConfig, output: &Path) -> Result<(), DumpError> {
        validate_params(params)?;

        let args = Self::build_args(params, output);
        // MYSQL_PWD keeps the password out of the process list
        let envs = vec![("MYSQL_PWD".to_string(), params.password.clone())];

        info!(
            "Dumping database '{}' from {} to {:?}",
            params.database, params.host, output
        );

        if let Err(e) = self
            .executor
            .run_command(&self.command, &args, &envs, Some(self.timeout))
            .await
        {
            remove_partial(output).await;
            return Err(DumpError::ToolFailed(format!("{:#}", e)));
        }

        if tokio::fs::metadata(output).await.is_err() {
            return Err(DumpError::NoOutput(output.to_path_buf()));
        }

        debug!("Dump written to {:?}", output);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.command
    }
}

async fn remove_partial(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => debug!("Removed partial dump {:?}", output),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial dump {:?}: {}", output, e),
    }
}

/// Dump producers for tests
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Writes fixed content, or fails with a fixed message
    pub struct MockDumpProducer {
        content: Option<String>,
        failure: String,
        calls: AtomicUsize,
    }

    impl MockDumpProducer {
        /// Succeeds and writes `content`
        pub fn writing(content: &str) -> Self {
            Self {
                content: Some(content.to_string()),
                failure: String::new(),
                calls: AtomicUsize::new(0),
            }
        }

        /// Fails with `message` and writes nothing
        pub fn failing(message: &str) -> Self {
            Self {
                content: None,
                failure: message.to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DumpProducer for MockDumpProducer {
        async fn dump(&self, params: &DatabaseConfig, output: &Path) -> Result<(), DumpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            validate_params(params)?;
            match self.content {
                Some(ref content) => tokio::fs::write(output, content)
                    .await
                    .map_err(|e| DumpError::ToolFailed(e.to_string())),
                None => Err(DumpError::ToolFailed(self.failure.clone())),
            }
        }

        fn name(&self) -> &str {
            "mock-dump"
        }
    }
}
