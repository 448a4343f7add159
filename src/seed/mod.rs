//! Synthetic record seeding.
//!
//! Every supervisor pass starts by inserting a fresh batch of records so the
//! drain loop always has something to archive. Seeding never looks at what is
//! already stored; rows left over from an interrupted pass simply stay and are
//! archived together with the new ones.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Utc};
use rand::{Rng, seq::SliceRandom};

use crate::{
    config::SeedConfig,
    db::{DbResult, RecordRepo},
    models::NewRecord,
    observability::metrics,
};

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Donald", "Edsger", "Frances", "Grace", "Hedy", "John",
    "Katherine", "Ken", "Leslie", "Linus", "Margaret", "Niklaus", "Radia", "Robin", "Sophie",
    "Tony",
];

const LAST_NAMES: &[&str] = &[
    "Allen", "Backus", "Conway", "Dijkstra", "Hamilton", "Hopper", "Johnson", "Knuth", "Lamarr",
    "Lamport", "Liskov", "Lovelace", "Milner", "O'Neil", "Perlman", "Ritchie", "Shannon", "Thompson",
    "Turing", "Wirth",
];

/// Inserts batches of synthetic records.
pub struct Seeder {
    repo: Arc<dyn RecordRepo>,
    config: SeedConfig,
}

impl Seeder {
    pub fn new(repo: Arc<dyn RecordRepo>, config: SeedConfig) -> Self {
        Self { repo, config }
    }

    /// Insert `count` freshly generated records.
    ///
    /// The store grows by exactly `count` rows. Errors are returned as-is.
    pub async fn seed(&self, count: u32) -> DbResult<u64> {
        let records = generate_records(count, Utc::now().naive_utc(), self.config.window());
        let inserted = self.repo.insert_many(&records).await?;

        metrics::record_seeded(inserted);
        tracing::info!(inserted, window_days = self.config.window_days, "Seeded records");

        Ok(inserted)
    }
}

/// Generate `count` records dated uniformly within `(now - window, now]`.
///
/// Dates are truncated to whole seconds so they survive every backend and the
/// artifact rendering unchanged.
pub fn generate_records(count: u32, now: NaiveDateTime, window: Duration) -> Vec<NewRecord> {
    let mut rng = rand::thread_rng();
    let window_secs = window.num_seconds().max(1);
    let now = truncate_to_seconds(now);

    (0..count)
        .map(|_| {
            let first = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Ada");
            let last = LAST_NAMES.choose(&mut rng).copied().unwrap_or("Lovelace");
            let offset = rng.gen_range(0..window_secs);
            NewRecord {
                name: format!("{first} {last}"),
                date: now - Duration::seconds(offset),
            }
        })
        .collect()
}

fn truncate_to_seconds(ts: NaiveDateTime) -> NaiveDateTime {
    ts - Duration::nanoseconds(ts.and_utc().timestamp_subsec_nanos() as i64)
}
