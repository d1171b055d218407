//! Cycles that stop early, and what they leave behind

use db_backup_agent::error::CycleError;
use db_backup_agent::utils::ZipArchiver;
use std::sync::Arc;
use test_utils::test_context::ResultAssertions;
use test_utils::{
    sample_dump_sql, ConfigBuilder, DeliveryStatus, MockArchiver, MockDumpProducer, RecordingSink,
    TestContext,
};

#[tokio::test]
async fn test_incomplete_config_touches_no_backup_files() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().without_database_field("host"));
    let dumper = Arc::new(MockDumpProducer::writing("SELECT 1;"));
    let sink = RecordingSink::new();
    let manager = ctx.manager(
        dumper.clone(),
        Arc::new(ZipArchiver::new()),
        Some(Arc::new(sink.clone())),
    );

    let result = manager.run_cycle().await;

    assert!(matches!(result, Err(CycleError::Config(_))));
    assert_eq!(dumper.call_count(), 0);
    assert_eq!(sink.send_count(), 0);
    assert!(!ctx.backup_root().exists());
    assert!(ctx.audit_log().contains("[ERROR] Invalid configuration"));
}

#[tokio::test]
async fn test_missing_password_is_a_config_error() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().without_database_field("password"));
    let manager = ctx.manager_with_sink(RecordingSink::new());

    let result = manager.run_cycle().await;

    assert!(matches!(result, Err(CycleError::Config(_))));
    assert!(ctx.files_with_extension("sql").is_empty());
    assert!(ctx.files_with_extension("zip").is_empty());
}

#[tokio::test]
async fn test_dump_failure_skips_archive_and_delivery() {
    let ctx = TestContext::new();
    let sink = RecordingSink::new();
    let manager = ctx.manager(
        Arc::new(MockDumpProducer::failing("Access denied for user")),
        Arc::new(ZipArchiver::new()),
        Some(Arc::new(sink.clone())),
    );

    let result = manager.run_cycle().await;

    result.assert_err_contains("Access denied");
    assert_eq!(sink.send_count(), 0);
    assert!(ctx.files_with_extension("zip").is_empty());
    assert!(ctx
        .audit_log()
        .contains("[ERROR] Failed to create the backup file"));
}

#[tokio::test]
async fn test_empty_archive_keeps_dump() {
    let ctx = TestContext::new();
    let sink = RecordingSink::new();
    let manager = ctx.manager(
        Arc::new(MockDumpProducer::writing(&sample_dump_sql())),
        Arc::new(MockArchiver::Empty),
        Some(Arc::new(sink.clone())),
    );

    let result = manager.run_cycle().await;

    assert!(matches!(result, Err(CycleError::EmptyArchive(_))));
    assert_eq!(sink.send_count(), 0);
    assert!(ctx.files_with_extension("zip").is_empty());
    let dumps = ctx.files_with_extension("sql");
    assert_eq!(dumps.len(), 1);
    assert_eq!(std::fs::read_to_string(&dumps[0]).unwrap(), sample_dump_sql());
}

#[tokio::test]
async fn test_compression_failure_keeps_dump() {
    let ctx = TestContext::new();
    let manager = ctx.manager(
        Arc::new(MockDumpProducer::writing(&sample_dump_sql())),
        Arc::new(MockArchiver::Failing),
        None,
    );

    let result = manager.run_cycle().await;

    assert!(matches!(result, Err(CycleError::Archive(_))));
    assert!(ctx.files_with_extension("zip").is_empty());
    assert_eq!(ctx.files_with_extension("sql").len(), 1);
    assert!(ctx
        .audit_log()
        .contains("[ERROR] Failed to compress the backup file"));
}

#[tokio::test]
async fn test_delivery_failure_keeps_backup() {
    let ctx = TestContext::new();
    let sink = RecordingSink::failing("channel unreachable");
    let manager = ctx.manager_with_sink(sink.clone());

    let outcome = manager.run_cycle().await.assert_ok();

    match outcome.delivery {
        DeliveryStatus::Failed(ref reason) => assert!(reason.contains("channel unreachable")),
        ref other => panic!("Expected failed delivery, got {:?}", other),
    }
    assert!(outcome.artifact.archive_path.exists());
    assert_eq!(sink.send_count(), 1);

    let log = ctx.audit_log();
    assert!(log.contains("[SUCCESS] Backup created successfully"));
    assert!(log.contains("[ERROR] Failed to send backup"));
    assert!(!log.contains("Delivery failed:"));
}
