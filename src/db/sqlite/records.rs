use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use crate::{
    db::{
        error::DbResult,
        repos::{ClaimedBatch, INSERT_CHUNK_SIZE, RecordRepo, validate_new_records},
    },
    models::{NewRecord, Record},
};

const SELECT_OLDEST: &str = r#"
    SELECT id, name, date
    FROM records
    ORDER BY date ASC, id ASC
    LIMIT ?
"#;

pub struct SqliteRecordRepo {
    pool: SqlitePool,
}

impl SqliteRecordRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordRepo for SqliteRecordRepo {
    async fn insert_many(&self, records: &[NewRecord]) -> DbResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        validate_new_records(records)?;

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in records.chunks(INSERT_CHUNK_SIZE) {
            let mut builder = QueryBuilder::<Sqlite>::new("INSERT INTO records (name, date) ");
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.name.as_str()).push_bind(record.date);
            });
            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_oldest(&self, limit: i64) -> DbResult<Vec<Record>> {
        let records = sqlx::query_as::<_, Record>(SELECT_OLDEST)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn delete_oldest(&self, limit: i64) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM records
            WHERE id IN (
                SELECT id FROM records
                ORDER BY date ASC, id ASC
                LIMIT ?
            )
            "#,
        )
        .bind(limit)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn claim_oldest(&self, limit: i64) -> DbResult<Box<dyn ClaimedBatch>> {
        // SQLite has no row locks; the open transaction serializes writers instead
        let mut tx = self.pool.begin().await?;

        let records = sqlx::query_as::<_, Record>(SELECT_OLDEST)
            .bind(limit)
            .fetch_all(&mut *tx)
            .await?;

        Ok(Box::new(SqliteClaimedBatch { tx, records }))
    }
}

struct SqliteClaimedBatch {
    tx: Transaction<'static, Sqlite>,
    records: Vec<Record>,
}

#[async_trait]
impl ClaimedBatch for SqliteClaimedBatch {
    fn records(&self) -> &[Record] {
        &self.records
    }

    async fn delete_and_commit(self: Box<Self>) -> DbResult<u64> {
        let Self { mut tx, records } = *self;

        let mut deleted = 0;
        if !records.is_empty() {
            let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM records WHERE id IN (");
            let mut ids = builder.separated(", ");
            for record in &records {
                ids.push_bind(record.id);
            }
            ids.push_unseparated(")");
            deleted = builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(deleted)
    }
}
