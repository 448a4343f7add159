use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::Parser;
use tokio_util::sync::CancellationToken;

mod archive;
mod config;
mod db;
mod models;
mod observability;
mod seed;
mod supervisor;

use crate::{
    archive::Archiver, config::ArchivistConfig, db::DbPool, seed::Seeder, supervisor::Supervisor,
};

/// CLI arguments for the archivist
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Moves the oldest rows of the records table into backup files",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to a TOML config file. Without one, configuration comes from the
    /// environment (DB_HOST, DB_PORT, DB_NAME, DB_USER, DB_PASSWORD,
    /// BACKUP_DIR, DAYS_TO_BACKUP, INTERVAL).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Seed, drain and repeat until stopped (default)
    Run,
    /// Insert one batch of synthetic records and exit
    Seed {
        /// Number of records (defaults to seed.batch_size)
        #[arg(short = 'n', long)]
        count: Option<u32>,
    },
    /// Run a single archive cycle and exit
    Cycle,
    /// Archive cycles until the table is empty, without seeding
    Drain,
    /// Run database migrations and exit
    Migrate,
    /// Show enabled compile-time features
    Features,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Features) => run_features(),
        Some(Command::Migrate) => run_migrate(args.config.as_deref()).await,
        Some(Command::Seed { count }) => run_seed(args.config.as_deref(), count).await,
        Some(Command::Cycle) => run_cycle(args.config.as_deref()).await,
        Some(Command::Drain) => run_drain(args.config.as_deref()).await,
        Some(Command::Run) | None => run_supervisor(args.config.as_deref()).await,
    }
}

/// Load config, initialize observability and build the database pool.
///
/// Exits the process on any failure: nothing useful can run without these.
async fn bootstrap(config_path: Option<&Path>) -> (ArchivistConfig, Arc<DbPool>) {
    let config = match ArchivistConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            match config_path {
                Some(path) => eprintln!("Failed to load config from {}: {}", path.display(), e),
                None => eprintln!("Failed to load config from environment: {}", e),
            }
            std::process::exit(1);
        }
    };

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Failed to initialize tracing: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = observability::metrics::init_metrics(&config.observability.metrics) {
        tracing::error!(error = %e, "Failed to initialize metrics");
        std::process::exit(1);
    }

    // Tracing is not up while the config is validated, so warn here.
    if config.archive.retention_window_ignored() {
        tracing::warn!(
            retention_days = config.archive.retention_days,
            "archive.retention_days (DAYS_TO_BACKUP) is set but not used: \
             every cycle archives the oldest rows regardless of their age"
        );
    }

    let db = match DbPool::from_config(&config.database).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::error!(error = %e, "Failed to set up database");
            std::process::exit(1);
        }
    };

    (config, db)
}

/// Create the schema for one-shot commands, exiting on failure.
async fn ensure_schema_or_exit(db: &DbPool) {
    if let Err(e) = db.ensure_schema().await {
        tracing::error!(error = %e, "Failed to prepare database schema");
        std::process::exit(1);
    }
}

async fn run_supervisor(config_path: Option<&Path>) {
    let (config, db) = bootstrap(config_path).await;

    tracing::info!(
        backup_dir = %config.archive.backup_dir.display(),
        interval_secs = config.archive.interval_secs,
        batch_fraction = config.archive.batch_fraction,
        delete_strategy = ?config.archive.delete_strategy,
        "Archivist starting"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let supervisor = Supervisor::new(db.clone(), &config, shutdown);
    supervisor.run().await;

    db.close().await;
}

async fn run_seed(config_path: Option<&Path>, count: Option<u32>) {
    let (config, db) = bootstrap(config_path).await;
    ensure_schema_or_exit(&db).await;

    let count = count.unwrap_or(config.seed.batch_size);
    let seeder = Seeder::new(db.records(), config.seed.clone());
    let result = seeder.seed(count).await;
    db.close().await;

    if let Err(e) = result {
        tracing::error!(error = %e, "Seeding failed");
        std::process::exit(1);
    }
}

async fn run_cycle(config_path: Option<&Path>) {
    let (config, db) = bootstrap(config_path).await;
    ensure_schema_or_exit(&db).await;

    let archiver = Archiver::new(db.records(), config.archive.clone());
    let result = archiver.run_one_cycle().await;
    db.close().await;

    match result {
        Ok(outcome) => {
            println!(
                "{} rows before cycle, batch of {}: archived {}, deleted {}, {} remaining",
                outcome.total, outcome.batch, outcome.archived, outcome.deleted, outcome.remaining
            );
            if let Some(path) = outcome.artifact {
                println!("{}", path.display());
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Archive cycle failed");
            std::process::exit(1);
        }
    }
}

async fn run_drain(config_path: Option<&Path>) {
    let (config, db) = bootstrap(config_path).await;
    ensure_schema_or_exit(&db).await;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let archiver = Archiver::new(db.records(), config.archive.clone());
    let result = archiver.drain(&shutdown).await;
    db.close().await;

    match result {
        Ok(summary) => {
            println!(
                "{} cycles, {} rows deleted{}",
                summary.cycles,
                summary.deleted,
                if summary.interrupted { " (interrupted)" } else { "" }
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Drain failed");
            std::process::exit(1);
        }
    }
}

async fn run_migrate(config_path: Option<&Path>) {
    let (_config, db) = bootstrap(config_path).await;

    tracing::info!("Running database migrations");

    let result = db.run_migrations().await;
    db.close().await;

    match result {
        Ok(()) => tracing::info!("Database migrations completed successfully"),
        Err(e) => {
            tracing::error!(error = %e, "Database migrations failed");
            std::process::exit(1);
        }
    }
}

fn run_features() {
    let version = env!("CARGO_PKG_VERSION");

    let features: &[(&str, &str, bool)] = &[
        (
            "database-sqlite",
            "Databases",
            cfg!(feature = "database-sqlite"),
        ),
        (
            "database-postgres",
            "Databases",
            cfg!(feature = "database-postgres"),
        ),
        ("prometheus", "Infrastructure", cfg!(feature = "prometheus")),
    ];

    let profile = if cfg!(feature = "full") {
        "full"
    } else if cfg!(feature = "minimal") {
        "minimal"
    } else {
        "custom"
    };

    println!("Archivist v{version}\n");
    println!("Build profile: {profile}");
    match profile {
        "full" => println!("  (full = postgres, sqlite, prometheus)\n"),
        "minimal" => println!("  (minimal = postgres only)\n"),
        _ => println!(),
    }

    println!("Compile-time features:");

    let mut current_group = "";
    for &(name, group, enabled) in features {
        if group != current_group {
            if !current_group.is_empty() {
                println!();
            }
            println!("  {group}:");
            current_group = group;
        }
        let status = if enabled { "enabled" } else { "disabled" };
        println!("    {name:<32} {status}");
    }
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping after the current step");
    token.cancel();
}
