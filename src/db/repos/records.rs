use async_trait::async_trait;

use crate::{
    db::error::{DbError, DbResult},
    models::{NewRecord, Record},
};

/// Longest name the `records.name` column accepts.
pub const MAX_NAME_LEN: usize = 255;

#[async_trait]
pub trait RecordRepo: Send + Sync {
    /// Insert records in a single transaction. Returns the number of rows inserted.
    async fn insert_many(&self, records: &[NewRecord]) -> DbResult<u64>;

    /// Count all records in the table
    async fn count(&self) -> DbResult<i64>;

    /// List the `limit` records with the smallest `date`, oldest first.
    ///
    /// Ties on `date` are broken by `id` so repeated calls on an unchanged
    /// table return the same rows.
    async fn list_oldest(&self, limit: i64) -> DbResult<Vec<Record>>;

    // ==================== Archive Operations ====================

    /// Delete the `limit` oldest records, re-selecting them inside the
    /// DELETE statement.
    ///
    /// The deleted set is whatever is oldest at the time the statement runs,
    /// which matches an earlier [`RecordRepo::list_oldest`] call only when no
    /// other writer touched the table in between.
    async fn delete_oldest(&self, limit: i64) -> DbResult<u64>;

    /// Open a transaction holding the `limit` oldest records.
    ///
    /// The returned batch deletes exactly the rows it selected when
    /// [`ClaimedBatch::delete_and_commit`] is called. Dropping it without
    /// committing rolls the transaction back and leaves the table untouched.
    async fn claim_oldest(&self, limit: i64) -> DbResult<Box<dyn ClaimedBatch>>;
}

/// A set of records selected inside an open transaction.
#[async_trait]
pub trait ClaimedBatch: Send {
    /// The claimed records, oldest first
    fn records(&self) -> &[Record];

    /// Delete the claimed records by id and commit. Returns rows deleted.
    async fn delete_and_commit(self: Box<Self>) -> DbResult<u64>;
}

/// Reject records the schema would refuse, before any row is written.
pub fn validate_new_records(records: &[NewRecord]) -> DbResult<()> {
    for record in records {
        if record.name.trim().is_empty() {
            return Err(DbError::Validation("record name cannot be empty".into()));
        }
        if record.name.chars().count() > MAX_NAME_LEN {
            return Err(DbError::Validation(format!(
                "record name exceeds {MAX_NAME_LEN} characters"
            )));
        }
    }
    Ok(())
}
