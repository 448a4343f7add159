use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::{
    db::{
        error::DbResult,
        repos::{ClaimedBatch, INSERT_CHUNK_SIZE, RecordRepo, validate_new_records},
    },
    models::{NewRecord, Record},
};

// `id` is SERIAL (int4) in tables created by older deployments; widen it so it
// always decodes as i64.
const SELECT_OLDEST: &str = r#"
    SELECT id::BIGINT AS id, name::TEXT AS name, date
    FROM records
    ORDER BY date ASC, id ASC
    LIMIT $1
"#;

const SELECT_OLDEST_FOR_UPDATE: &str = r#"
    SELECT id::BIGINT AS id, name::TEXT AS name, date
    FROM records
    ORDER BY date ASC, id ASC
    LIMIT $1
    FOR UPDATE
"#;

pub struct PostgresRecordRepo {
    pool: PgPool,
}

impl PostgresRecordRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordRepo for PostgresRecordRepo {
    async fn insert_many(&self, records: &[NewRecord]) -> DbResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        validate_new_records(records)?;

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in records.chunks(INSERT_CHUNK_SIZE) {
            let mut builder = QueryBuilder::<Postgres>::new("INSERT INTO records (name, date) ");
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
                LIMIT $1
            )
            "#,
        )
        .bind(limit)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn claim_oldest(&self, limit: i64) -> DbResult<Box<dyn ClaimedBatch>> {
        let mut tx = self.pool.begin().await?;

        let records = sqlx::query_as::<_, Record>(SELECT_OLDEST_FOR_UPDATE)
            .bind(limit)
            .fetch_all(&mut *tx)
            .await?;

        Ok(Box::new(PostgresClaimedBatch { tx, records }))
    }
}

struct PostgresClaimedBatch {
    tx: Transaction<'static, Postgres>,
    records: Vec<Record>,
}

#[async_trait]
impl ClaimedBatch for PostgresClaimedBatch {
    fn records(&self) -> &[Record] {
        &self.records
    }

    async fn delete_and_commit(self: Box<Self>) -> DbResult<u64> {
        let Self { mut tx, records } = *self;
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();

        let result = sqlx::query("DELETE FROM records WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
