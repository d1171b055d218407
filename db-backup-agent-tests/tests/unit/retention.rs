//! Unit tests for the retention sweep

use db_backup_agent::utils::retention::{age_in_days, sweep};
use rstest::rstest;
use std::fs;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use test_utils::{aged_day_folder, set_age, DAY};

#[tokio::test]
async fn test_sweep_removes_only_entries_past_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let kept_10 = aged_day_folder(root, "day-10", 10);
    let removed_31 = aged_day_folder(root, "day-31", 31);
    let kept_29 = aged_day_folder(root, "day-29", 29);
    let removed_40 = aged_day_folder(root, "day-40", 40);

    let report = sweep(root, 30, SystemTime::now()).await;

    assert!(report.is_clean());
    assert_eq!(report.scanned, 4);
    assert_eq!(report.removed.len(), 2);
    assert!(kept_10.exists());
    assert!(kept_29.exists());
    assert!(!removed_31.exists());
    assert!(!removed_40.exists());
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    aged_day_folder(root, "old", 45);
    aged_day_folder(root, "new", 1);

    let now = SystemTime::now();
    let first = sweep(root, 30, now).await;
    let second = sweep(root, 30, now).await;

    assert_eq!(first.removed.len(), 1);
    assert!(second.removed.is_empty());
    assert_eq!(second.scanned, 1);
}

#[tokio::test]
async fn test_sweep_missing_root_is_noop() {
    let temp_dir = TempDir::new().unwrap();
    let report = sweep(&temp_dir.path().join("absent"), 30, SystemTime::now()).await;
    assert!(report.is_clean());
    assert_eq!(report.scanned, 0);
}

#[tokio::test]
async fn test_sweep_removes_stray_files_too() {
    let temp_dir = TempDir::new().unwrap();
    let stray = temp_dir.path().join("leftover.sql");
    fs::write(&stray, "-- partial").unwrap();
    set_age(&stray, DAY * 60);

    let report = sweep(temp_dir.path(), 30, SystemTime::now()).await;

    assert_eq!(report.removed, vec![stray.clone()]);
    assert!(!stray.exists());
}

#[rstest]
#[case(0, 0.0)]
#[case(12 * 60 * 60, 0.5)]
#[case(3 * 24 * 60 * 60, 3.0)]
fn test_age_in_days(#[case] seconds: u64, #[case] expected: f64) {
    let now = SystemTime::now();
    let age = age_in_days(now - Duration::from_secs(seconds), now);
    assert!((age - expected).abs() < 1e-9);
}

#[test]
fn test_future_mtime_counts_as_new() {
    let now = SystemTime::now();
    assert_eq!(age_in_days(now + DAY, now), 0.0);
}
