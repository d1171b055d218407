//! MySQL integration tests
//!
//! These tests require Docker and verify the dump → zip → deliver cycle
//! against a real server.
//! Run with: `cargo test -p db-backup-agent-tests --test integration -- --ignored`

use super::common::{is_docker_available, write_dump_wrapper, ContainerGuard};
use anyhow::Result;
use db_backup_agent::error::CycleError;
use db_backup_agent::utils::{MysqlDumpProducer, RealExecutor, ZipArchiver};
use serial_test::serial;
use std::io::Read;
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use test_utils::{ConfigBuilder, RecordingSink, TestContext};

const ROOT_PASSWORD: &str = "testpass";

/// Helper to start a MySQL container and wait until it answers
fn start_mysql_container(name: &str) -> Result<()> {
    let output = Command::new("docker")
        .args([
            "run",
            "-d",
            "--name",
            name,
            "-e",
            &format!("MYSQL_ROOT_PASSWORD={}", ROOT_PASSWORD),
            "-e",
            "MYSQL_DATABASE=testdb",
            "mysql:8.0",
        ])
        .output()?;
    if !output.status.success() {
        anyhow::bail!(
            "docker run failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    for _ in 0..90 {
        let ready = Command::new("docker")
            .args([
                "exec",
                name,
                "mysql",
                "-uroot",
                &format!("-p{}", ROOT_PASSWORD),
                "-e",
                "SELECT 1",
                "testdb",
            ])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if ready {
            return Ok(());
        }
        thread::sleep(Duration::from_secs(1));
    }

    Err(anyhow::anyhow!("MySQL failed to become ready"))
}

/// Helper to execute SQL in container
fn exec_sql(container: &str, sql: &str) -> Result<()> {
    let output = Command::new("docker")
        .args([
            "exec",
            container,
            "mysql",
            "-uroot",
            &format!("-p{}", ROOT_PASSWORD),
            "testdb",
            "-e",
            sql,
        ])
        .output()?;
    if !output.status.success() {
        anyhow::bail!("SQL failed: {}", String::from_utf8_lossy(&output.stderr));
    }
    Ok(())
}

fn context_for(container: &str, password: &str) -> Result<(TestContext, MysqlDumpProducer)> {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new().with_database("127.0.0.1", "root", password, "testdb"),
    );
    let wrapper = write_dump_wrapper(ctx.temp_dir(), container)?;
    let dumper = MysqlDumpProducer::new(
        Arc::new(RealExecutor::new()),
        &wrapper.display().to_string(),
        Duration::from_secs(300),
    );
    Ok((ctx, dumper))
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_mysql_backup_cycle() -> Result<()> {
    if !is_docker_available() {
        eprintln!("Docker not available, skipping test");
        return Ok(());
    }

    let container = "db-backup-agent-test-mysql";
    let _guard = ContainerGuard::new(container.to_string());
    start_mysql_container(container)?;

    exec_sql(container, "CREATE TABLE items (id INT PRIMARY KEY, label VARCHAR(32))")?;
    exec_sql(container, "INSERT INTO items VALUES (1, 'alpha'), (2, 'beta'), (3, 'gamma')")?;

    let (ctx, dumper) = context_for(container, ROOT_PASSWORD)?;
    let sink = RecordingSink::new();
    let manager = ctx.manager(
        Arc::new(dumper),
        Arc::new(ZipArchiver::new()),
        Some(Arc::new(sink.clone())),
    );

    let outcome = manager.run_cycle().await?;

    assert_eq!(sink.send_count(), 1);
    assert!(ctx.files_with_extension("sql").is_empty());

    let file = std::fs::File::open(&outcome.artifact.archive_path)?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut dump = String::new();
    zip.by_index(0)?.read_to_string(&mut dump)?;
    assert!(dump.contains("CREATE TABLE `items`"));
    assert!(dump.contains("'gamma'"));

    Ok(())
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_mysql_wrong_password_fails_dump() -> Result<()> {
    if !is_docker_available() {
        eprintln!("Docker not available, skipping test");
        return Ok(());
    }

    let container = "db-backup-agent-test-mysql-auth";
    let _guard = ContainerGuard::new(container.to_string());
    start_mysql_container(container)?;

    let (ctx, dumper) = context_for(container, "wrong-password")?;
    let sink = RecordingSink::new();
    let manager = ctx.manager(
        Arc::new(dumper),
        Arc::new(ZipArchiver::new()),
        Some(Arc::new(sink.clone())),
    );

    let result = manager.run_cycle().await;

    assert!(matches!(result, Err(CycleError::Dump(_))));
    assert_eq!(sink.send_count(), 0);
    assert!(ctx.files_with_extension("zip").is_empty());
    assert!(ctx.files_with_extension("sql").is_empty());

    Ok(())
}
