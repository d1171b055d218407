use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use db_backup_agent::config::{self, validate_database, Config};
use db_backup_agent::managers::logging::{self, LoggingConfig};
use db_backup_agent::managers::scheduler::Scheduler;
use db_backup_agent::utils::locker::InstanceLock;
use db_backup_agent::utils::{Archiver, DumpProducer, MysqlDumpProducer, RealExecutor, ZipArchiver};
use db_backup_agent::{BackupManager, DeliveryStatus, DiscordNotifier, InstanceContext, NotificationSink};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "db-backup-agent")]
#[command(about = "Scheduled database backups delivered to a Discord channel", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML, or JSON when it ends in .json)
    #[arg(short, long, default_value = "./config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run backup cycles forever on the configured cooldown (default)
    Run,

    /// Run a single backup cycle and exit
    Once,

    /// Only apply the retention policy to existing backups
    Sweep,

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init_console_logging();
            return Err(e).with_context(|| format!("Failed to load {}", cli.config.display()));
        }
    };

    let command = cli.command.unwrap_or(Commands::Run);

    if let Commands::Validate = command {
        logging::init_console_logging();
        return handle_validate(&config);
    }

    // Setup logging with file rotation (must keep guard alive)
    let logging_config = LoggingConfig::from_settings(&config.logging);
    let _log_guard = logging::init_logging(&logging_config)?;

    let notifier = match config.discord {
        Some(ref discord) => Some(Arc::new(DiscordNotifier::new(discord.clone())?)),
        None => None,
    };

    let display_name = resolve_instance_name(&config, notifier.as_deref()).await;
    let ctx = InstanceContext::new(&display_name, config)?;
    info!(
        "Starting agent for '{}' (source id: {})",
        ctx.display_name(),
        ctx.source_id()
    );

    let _lock = InstanceLock::acquire(&ctx.lock_path(), ctx.source_id())?;

    let dumper: Arc<dyn DumpProducer> = Arc::new(MysqlDumpProducer::from_settings(
        Arc::new(RealExecutor::new()),
        &ctx.config().backup,
    ));
    let archiver: Arc<dyn Archiver> = Arc::new(ZipArchiver::new());
    let sink = notifier.map(|n| n as Arc<dyn NotificationSink>);

    let manager = BackupManager::new(ctx, dumper, archiver, sink);

    match command {
        Commands::Run => {
            let mut scheduler = Scheduler::new(manager);
            info!(
                "Backups every {} minute(s), keeping {} day(s)",
                scheduler.interval().as_secs() / 60,
                scheduler.manager().context().config().backup.effective_retention_days()
            );
            scheduler
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for shutdown signal: {}", e);
                        std::future::pending::<()>().await;
                    }
                })
                .await;
        }

        Commands::Once => {
            let mut scheduler = Scheduler::new(manager);
            let results = scheduler.run_cycles(1).await;
            match results.first() {
                Some(Ok(outcome)) => {
                    println!("✓ Backup created: {}", outcome.artifact.archive_path.display());
                    if let DeliveryStatus::Failed(ref reason) = outcome.delivery {
                        println!("⚠ Not delivered: {}", reason);
                    }
                }
                Some(Err(e)) => {
                    eprintln!("✗ Backup failed: {}", e);
                    std::process::exit(1);
                }
                None => std::process::exit(1),
            }
        }

        Commands::Sweep => {
            let report = manager.sweep(SystemTime::now()).await;
            println!(
                "Scanned {} entries, removed {}",
                report.scanned,
                report.removed.len()
            );
            for path in &report.removed {
                println!("  - {}", path.display());
            }
            if !report.is_clean() {
                for failure in &report.failures {
                    eprintln!("  ✗ {}", failure);
                }
                std::process::exit(1);
            }
        }

        // Handled before logging setup
        Commands::Validate => {}
    }

    Ok(())
}

/// Configured instance name, else the first guild the bot belongs to, else "default"
async fn resolve_instance_name(config: &Config, notifier: Option<&DiscordNotifier>) -> String {
    if let Some(name) = config.instance.name.as_deref().filter(|n| !n.trim().is_empty()) {
        return name.to_string();
    }

    if let Some(notifier) = notifier {
        match notifier.first_guild_name().await {
            Ok(Some(name)) => return name,
            Ok(None) => warn!("Bot is not a member of any guild"),
            Err(e) => warn!("Could not look up guild name: {:#}", e),
        }
    }

    "default".to_string()
}

fn handle_validate(config: &Config) -> Result<()> {
    println!("✓ Configuration file parsed\n");

    let db = &config.database;
    println!("Database:");
    println!("  Host: {}:{}", db.host, db.port.unwrap_or(3306));
    println!("  Database: {}", db.database);
    println!("  User: {}", db.user);

    println!("\nBackup:");
    println!("  Root: {}", config.backup.backup_root.display());
    println!("  Cooldown: {} minute(s)", config.backup.effective_cooldown_minutes());
    println!("  Retention: {} day(s)", config.backup.effective_retention_days());

    match config.discord {
        Some(ref discord) => println!("\nDiscord channel: {}", discord.channel_id),
        None => println!("\nDiscord: not configured (backups stay local)"),
    }

    let mut ok = true;

    if let Err(e) = validate_database(db) {
        eprintln!("\n✗ {}", e);
        ok = false;
    }

    match which::which(&config.backup.dump_command) {
        Ok(path) => println!("\n✓ Dump tool found: {}", path.display()),
        Err(_) => {
            eprintln!("\n⚠ Dump tool '{}' not found in PATH", config.backup.dump_command);
        }
    }

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
