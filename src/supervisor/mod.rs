//! The outer seed-and-drain loop.
//!
//! ```text
//! Seeding ──► Draining ──(table empty)──► Seeding
//!    │            │
//!    └──(error)───┴──► Backoff ──(sleep)──► Seeding
//! ```
//!
//! The supervisor is the only place errors are caught. A failed pass is
//! logged, followed by a fixed backoff, and the next pass starts again from
//! seeding. Rows left behind by the failed pass stay in the table and are
//! archived by a later cycle, so archiving is at-least-once.
//!
//! Shutdown is cooperative: cancelling the token interrupts the interval and
//! backoff sleeps and stops the loop between cycles.

use std::{fmt, sync::Arc};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    archive::{ArchiveError, Archiver, DrainSummary},
    config::ArchivistConfig,
    db::{DbError, DbPool},
    observability::metrics,
    seed::Seeder,
};

/// Where the supervisor currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Seeding,
    Draining,
    Backoff,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Seeding => "seeding",
            Phase::Draining => "draining",
            Phase::Backoff => "backoff",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed supervisor pass.
#[derive(Debug, Error)]
pub enum PassError {
    #[error("Seeding failed: {0}")]
    Seed(#[source] DbError),

    #[error("Draining failed: {0}")]
    Drain(#[source] ArchiveError),
}

impl PassError {
    /// Phase the pass was in when it failed.
    pub fn phase(&self) -> Phase {
        match self {
            PassError::Seed(_) => Phase::Seeding,
            PassError::Drain(_) => Phase::Draining,
        }
    }
}

/// Counters for a finished [`Supervisor::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Passes that drained the table.
    pub passes: u64,
    /// Passes that failed and were restarted after backoff.
    pub restarts: u64,
    /// Rows deleted across all passes.
    pub deleted: u64,
}

pub struct Supervisor {
    db: Arc<DbPool>,
    seeder: Seeder,
    archiver: Archiver,
    seed_count: u32,
    backoff: std::time::Duration,
    shutdown: CancellationToken,
}

impl Supervisor {
    pub fn new(db: Arc<DbPool>, config: &ArchivistConfig, shutdown: CancellationToken) -> Self {
        Self {
            seeder: Seeder::new(db.records(), config.seed.clone()),
            archiver: Archiver::new(db.records(), config.archive.clone()),
            seed_count: config.seed.batch_size,
            backoff: config.supervisor.backoff(),
            db,
            shutdown,
        }
    }

    /// Run passes until the shutdown token is cancelled.
    pub async fn run(&self) -> RunStats {
        let mut stats = RunStats::default();

        tracing::info!(
            seed_count = self.seed_count,
            backoff_secs = self.backoff.as_secs(),
            "Starting archive supervisor"
        );

        while !self.shutdown.is_cancelled() {
            match self.run_pass().await {
                Ok(summary) => {
                    stats.deleted += summary.deleted;
                    if summary.interrupted {
                        break;
                    }
                    stats.passes += 1;
                    tracing::info!(
                        cycles = summary.cycles,
                        deleted = summary.deleted,
                        "Database is now empty, restarting the process"
                    );
                }
                Err(e) => {
                    stats.restarts += 1;
                    metrics::record_restart(e.phase().as_str());
                    tracing::error!(
                        phase = %e.phase(),
                        error = %e,
                        backoff_secs = self.backoff.as_secs(),
                        "Archive pass failed, restarting after backoff"
                    );
                    self.enter(Phase::Backoff);

                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.backoff) => {}
                    }
                }
            }
        }

        tracing::info!(
            passes = stats.passes,
            restarts = stats.restarts,
            deleted = stats.deleted,
            "Archive supervisor stopped"
        );
        stats
    }

    /// Seed once, then drain the table.
    pub async fn run_pass(&self) -> Result<DrainSummary, PassError> {
        self.enter(Phase::Seeding);
        self.db.ensure_schema().await.map_err(PassError::Seed)?;
        self.seeder
            .seed(self.seed_count)
            .await
            .map_err(PassError::Seed)?;

        self.enter(Phase::Draining);
        self.archiver
            .drain(&self.shutdown)
            .await
            .map_err(PassError::Drain)
    }

    fn enter(&self, phase: Phase) {
        tracing::debug!(phase = %phase, "Supervisor phase");
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::{
        config::{ArchiveConfig, SeedConfig, SupervisorConfig},
        db::tests::harness::create_sqlite_db,
    };

    fn config(backup_dir: std::path::PathBuf, seed_count: u32, backoff_secs: u64) -> ArchivistConfig {
        ArchivistConfig {
            archive: ArchiveConfig {
                backup_dir,
                interval_secs: 0,
                ..Default::default()
            },
            seed: SeedConfig {
                batch_size: seed_count,
                ..Default::default()
            },
            supervisor: SupervisorConfig { backoff_secs },
            ..Default::default()
        }
    }

    fn cancel_after(token: &CancellationToken, millis: u64) {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            token.cancel();
        });
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::Seeding.to_string(), "seeding");
        assert_eq!(Phase::Draining.to_string(), "draining");
        assert_eq!(Phase::Backoff.to_string(), "backoff");
    }

    #[tokio::test]
    async fn test_pass_seeds_then_drains() {
        let db = Arc::new(create_sqlite_db().await);
        let dir = TempDir::new().unwrap();
        let supervisor = Supervisor::new(
            db.clone(),
            &config(dir.path().to_path_buf(), 50, 5),
            CancellationToken::new(),
        );

        let summary = supervisor.run_pass().await.unwrap();

        assert_eq!(summary.deleted, 50);
        assert!(!summary.interrupted);
        assert!(summary.cycles > 0);
        assert_eq!(db.records().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pass_archives_leftovers_from_failed_pass() {
        let db = Arc::new(create_sqlite_db().await);
        let dir = TempDir::new().unwrap();
        let cfg = config(dir.path().to_path_buf(), 10, 5);

        Seeder::new(db.records(), cfg.seed.clone())
            .seed(7)
            .await
            .unwrap();

        let supervisor = Supervisor::new(db.clone(), &cfg, CancellationToken::new());
        let summary = supervisor.run_pass().await.unwrap();

        assert_eq!(summary.deleted, 17);
        assert_eq!(db.records().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_seed_failure_is_reported_as_seeding() {
        let db = Arc::new(create_sqlite_db().await);
        let dir = TempDir::new().unwrap();
        db.close().await;

        let supervisor = Supervisor::new(
            db,
            &config(dir.path().to_path_buf(), 10, 5),
            CancellationToken::new(),
        );

        let err = supervisor.run_pass().await.unwrap_err();
        assert_eq!(err.phase(), Phase::Seeding);
    }

    #[tokio::test]
    async fn test_write_failure_backs_off_without_deleting() {
        let db = Arc::new(create_sqlite_db().await);
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("backups");
        std::fs::write(&blocker, b"").unwrap();

        let shutdown = CancellationToken::new();
        let supervisor = Supervisor::new(db.clone(), &config(blocker, 10, 3600), shutdown.clone());

        cancel_after(&shutdown, 100);
        let stats = supervisor.run().await;

        assert_eq!(stats.restarts, 1);
        assert_eq!(stats.passes, 0);
        assert_eq!(db.records().count().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_run_restarts_after_draining() {
        let db = Arc::new(create_sqlite_db().await);
        let dir = TempDir::new().unwrap();

        let shutdown = CancellationToken::new();
        let supervisor = Supervisor::new(
            db.clone(),
            &config(dir.path().to_path_buf(), 5, 5),
            shutdown.clone(),
        );

        cancel_after(&shutdown, 150);
        let stats = supervisor.run().await;

        assert!(stats.passes >= 1, "no pass completed: {stats:?}");
        assert_eq!(stats.restarts, 0);
        assert!(stats.deleted >= 5 * stats.passes);
    }

    #[tokio::test]
    async fn test_run_returns_immediately_when_already_cancelled() {
        let db = Arc::new(create_sqlite_db().await);
        let dir = TempDir::new().unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let supervisor = Supervisor::new(db.clone(), &config(dir.path().to_path_buf(), 5, 5), shutdown);

        assert_eq!(supervisor.run().await, RunStats::default());
        assert_eq!(db.records().count().await.unwrap(), 0);
    }
}
