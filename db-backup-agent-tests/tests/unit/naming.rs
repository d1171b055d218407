//! Unit tests for source identifiers and artifact naming

use chrono::{TimeZone, Utc};
use db_backup_agent::managers::backup::{dump_file_name, BackupArtifact};
use db_backup_agent::{sanitize_source_id, InstanceContext};
use rstest::rstest;
use test_utils::ConfigBuilder;

#[rstest]
#[case("TestServer", "TestServer")]
#[case("My Server! 2024", "My_Server__2024")]
#[case("a/b\\c", "a_b_c")]
#[case("café", "caf_")]
#[case("already-ok_123", "already-ok_123")]
fn test_sanitize_source_id(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(sanitize_source_id(input), expected);
}

#[test]
fn test_blank_instance_name_rejected() {
    let config = ConfigBuilder::minimal().build();
    assert!(InstanceContext::new("   ", config).is_err());
}

#[test]
fn test_instance_paths_are_namespaced() {
    let (config, temp_dir) = ConfigBuilder::minimal().persist();
    let ctx = InstanceContext::new("My Server", config).unwrap();

    assert_eq!(ctx.source_id(), "My_Server");
    assert_eq!(ctx.display_name(), "My Server");
    assert_eq!(ctx.backup_root(), temp_dir.path().join("backups").join("My_Server"));
    assert_eq!(
        ctx.audit_log_path(),
        temp_dir.path().join("logs").join("My_Server_backup.log")
    );
    // Lock lives next to the source tree so a sweep never touches it
    assert!(!ctx.lock_path().starts_with(ctx.backup_root()));
}

#[test]
fn test_file_name_has_no_colons() {
    let ts = Utc.with_ymd_and_hms(2025, 6, 30, 23, 59, 59).unwrap();
    let name = dump_file_name("TestServer", ts);
    assert!(!name.contains(':'));
    assert_eq!(name, "TestServer-2025-06-30T23-59-59.000Z.sql");
}

#[test]
fn test_artifact_archive_sits_next_to_dump() {
    let (config, _temp_dir) = ConfigBuilder::minimal().persist();
    let ctx = InstanceContext::new("TestServer", config).unwrap();
    let ts = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();

    let artifact = BackupArtifact::plan(&ctx, ts, "zip");

    assert_eq!(artifact.dump_path.parent(), artifact.archive_path.parent());
    assert!(artifact.storage_dir.starts_with(ctx.backup_root()));
    assert_eq!(
        artifact.archive_file_name(),
        "TestServer-2025-06-30T12-00-00.000Z.zip"
    );
}
