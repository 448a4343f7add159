use std::{path::PathBuf, sync::Arc};

use tokio_util::sync::CancellationToken;

use super::{artifact::ArtifactWriter, error::ArchiveResult};
use crate::{
    config::{ArchiveConfig, DeleteStrategy},
    db::RecordRepo,
    observability::metrics,
};

/// Result of one archive cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Rows in the table when the cycle started.
    pub total: i64,
    /// Batch size derived from `total`.
    pub batch: i64,
    /// Rows written to the artifact.
    pub archived: usize,
    /// Rows removed by the delete step.
    pub deleted: u64,
    /// Rows left after the cycle.
    pub remaining: i64,
    /// The artifact written, if the selection was non-empty.
    pub artifact: Option<PathBuf>,
}

impl CycleOutcome {
    /// True once the table holds no rows.
    pub fn is_drained(&self) -> bool {
        self.remaining == 0
    }
}

/// Totals for one drain loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Cycles that wrote an artifact.
    pub cycles: u64,
    /// Rows deleted across all cycles.
    pub deleted: u64,
    /// The loop stopped because of shutdown, not because the table emptied.
    pub interrupted: bool,
}

/// Runs archive cycles against the record store.
pub struct Archiver {
    repo: Arc<dyn RecordRepo>,
    writer: ArtifactWriter,
    config: ArchiveConfig,
}

impl Archiver {
    pub fn new(repo: Arc<dyn RecordRepo>, config: ArchiveConfig) -> Self {
        Self {
            writer: ArtifactWriter::from_config(&config),
            repo,
            config,
        }
    }

    /// Archive and delete the oldest fraction of the remaining rows.
    ///
    /// Rows are only deleted after their artifact has been written and synced.
    /// Any failure aborts the cycle; rows that were not deleted are picked up
    /// again by the next cycle, so an artifact may be written more than once.
    pub async fn run_one_cycle(&self) -> ArchiveResult<CycleOutcome> {
        let total = self.repo.count().await?;
        let batch = self.config.batch_size(total);

        if batch == 0 {
            tracing::debug!("No records to archive");
            return Ok(CycleOutcome::default());
        }

        tracing::info!(total, batch, "Starting backup and cleanup");

        let (archived, deleted, artifact) = match self.config.delete_strategy {
            DeleteStrategy::Reselect => {
                let records = self.repo.list_oldest(batch).await?;
                if records.is_empty() {
                    tracing::info!("No records found to back up");
                    (0, 0, None)
                } else {
                    let path = self.writer.write(&records).await?;
                    let deleted = self.repo.delete_oldest(batch).await?;
                    (records.len(), deleted, Some(path))
                }
            }
            DeleteStrategy::Selected => {
                let claimed = self.repo.claim_oldest(batch).await?;
                if claimed.records().is_empty() {
                    drop(claimed);
                    tracing::info!("No records found to back up");
                    (0, 0, None)
                } else {
                    // Dropping the claim on a write error rolls back the lock.
                    let records = claimed.records().to_vec();
                    let path = self.writer.write(&records).await?;
                    let deleted = claimed.delete_and_commit().await?;
                    (records.len(), deleted, Some(path))
                }
            }
        };

        if deleted != archived as u64 {
            tracing::warn!(
                archived,
                deleted,
                "Deleted row count differs from archived row count"
            );
        }

        let remaining = self.repo.count().await?;
        metrics::record_cycle(deleted, remaining);

        tracing::info!(deleted, remaining, "Records backed up and deleted");

        Ok(CycleOutcome {
            total,
            batch,
            archived,
            deleted,
            remaining,
            artifact,
        })
    }

    /// Run cycles until the table is empty.
    ///
    /// Sleeps `interval` between cycles, but not before the first one and not
    /// after the one that empties the table. Cancelling `shutdown` stops the
    /// loop at the next sleep or cycle boundary.
    pub async fn drain(&self, shutdown: &CancellationToken) -> ArchiveResult<DrainSummary> {
        let mut summary = DrainSummary::default();
        let interval = self.config.interval();

        loop {
            if shutdown.is_cancelled() {
                summary.interrupted = true;
                return Ok(summary);
            }

            let outcome = self.run_one_cycle().await?;
            if outcome.artifact.is_some() {
                summary.cycles += 1;
            }
            summary.deleted += outcome.deleted;

            if outcome.is_drained() {
                tracing::info!(
                    cycles = summary.cycles,
                    deleted = summary.deleted,
                    "Table is empty"
                );
                return Ok(summary);
            }

            tracing::info!(
                remaining = outcome.remaining,
                interval_secs = interval.as_secs(),
                "Sleeping before the next backup and cleanup"
            );

            tokio::select! {
                _ = shutdown.cancelled() => {
                    summary.interrupted = true;
                    return Ok(summary);
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}
