//! Scheduler timing, checked on a paused tokio clock

use chrono::{TimeZone, Utc};
use db_backup_agent::config::MAX_COOLDOWN_MINUTES;
use db_backup_agent::error::CycleError;
use db_backup_agent::managers::scheduler::{Scheduler, SchedulerState, FALLBACK_DELAY, MIN_DELAY};
use db_backup_agent::utils::ZipArchiver;
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;
use test_utils::{ConfigBuilder, PanickingDumpProducer, TestContext, TimedDumpProducer};

const TEN_MINUTES: Duration = Duration::from_secs(10 * 60);

fn scheduler_with(ctx: &TestContext, dumper: Arc<TimedDumpProducer>) -> Scheduler {
    Scheduler::new(ctx.manager(dumper, Arc::new(ZipArchiver::new()), None))
}

#[tokio::test(start_paused = true)]
async fn test_fixed_delay_between_cycles() {
    let ctx = TestContext::new();
    let dumper = Arc::new(TimedDumpProducer::new());
    let mut scheduler = scheduler_with(&ctx, dumper.clone());

    let results = scheduler.run_cycles(3).await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(dumper.gaps(), vec![TEN_MINUTES, TEN_MINUTES]);
    assert_eq!(scheduler.cycles_run(), 3);
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_panic_falls_back_to_five_minutes() {
    let ctx = TestContext::new();
    let dumper = Arc::new(TimedDumpProducer::new().panicking_on(1));
    let mut scheduler = scheduler_with(&ctx, dumper.clone());

    let results = scheduler.run_cycles(3).await;

    assert!(matches!(results[0], Err(CycleError::Unexpected(_))));
    assert!(results[1].is_ok());
    assert!(results[2].is_ok());
    assert_eq!(dumper.gaps(), vec![FALLBACK_DELAY, TEN_MINUTES]);
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert!(ctx
        .audit_log()
        .contains("[ERROR] Unexpected error in backup routine"));
}

#[tokio::test]
async fn test_panicking_producer_is_contained() {
    let ctx = TestContext::new();
    let manager = ctx.manager(
        Arc::new(PanickingDumpProducer),
        Arc::new(ZipArchiver::new()),
        None,
    );
    let mut scheduler = Scheduler::new(manager);

    let (result, delay) = scheduler.trigger().await;

    assert!(matches!(result, Err(CycleError::Unexpected(ref m)) if m.contains("exploded")));
    assert_eq!(delay, FALLBACK_DELAY);
}

#[tokio::test]
async fn test_config_error_keeps_normal_interval() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().with_cooldown(15));
    let mut scheduler = scheduler_with(&ctx, Arc::new(TimedDumpProducer::new()));

    let (result, delay) = scheduler.trigger().await;

    assert!(matches!(result, Err(CycleError::Config(_))));
    assert_eq!(delay, Duration::from_secs(15 * 60));
}

#[tokio::test]
async fn test_zero_cooldown_clamped_to_one_minute() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().with_cooldown(0));
    let scheduler = scheduler_with(&ctx, Arc::new(TimedDumpProducer::new()));

    assert_eq!(scheduler.interval(), MIN_DELAY);
}

#[rstest]
#[case::zero(0)]
#[case::default(10)]
#[case::above_max(u64::MAX)]
#[tokio::test]
async fn test_reported_next_run_matches_sleep(#[case] cooldown: u64) {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().with_cooldown(cooldown));
    let scheduler = scheduler_with(&ctx, Arc::new(TimedDumpProducer::new()));
    let finished = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

    let next = scheduler.manager().next_run_after(finished);

    assert_eq!((next - finished).to_std().unwrap(), scheduler.interval());
    assert!(scheduler.interval() <= Duration::from_secs(MAX_COOLDOWN_MINUTES * 60));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_observed_between_cycles() {
    let ctx = TestContext::new();
    let dumper = Arc::new(TimedDumpProducer::new());
    let mut scheduler = scheduler_with(&ctx, dumper.clone());
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        scheduler
            .run_until(async {
                let _ = rx.await;
            })
            .await;
        scheduler
    });

    // Cycles start at 0, 10 and 20 minutes
    tokio::time::sleep(Duration::from_secs(25 * 60)).await;
    tx.send(()).unwrap();

    let scheduler = handle.await.unwrap();
    assert_eq!(scheduler.cycles_run(), 3);
    assert_eq!(dumper.call_times().len(), 3);
}
