//! Shared tests for RecordRepo implementations

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::{
    db::{DbError, repos::RecordRepo},
    models::{NewRecord, Record},
};

// ============================================================================
// Test Input Helpers
// ============================================================================

fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn record_at(name: &str, hours: i64) -> NewRecord {
    NewRecord {
        name: name.to_string(),
        date: base_time() + Duration::hours(hours),
    }
}

fn names(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.name.as_str()).collect()
}

// ============================================================================
// Insert / Count Tests
// ============================================================================

pub async fn test_insert_and_count(repo: &dyn RecordRepo) {
    assert_eq!(repo.count().await.unwrap(), 0);

    let inserted = repo
        .insert_many(&[record_at("a", 1), record_at("b", 2), record_at("c", 3)])
        .await
        .expect("Failed to insert");

    assert_eq!(inserted, 3);
    assert_eq!(repo.count().await.unwrap(), 3);
}

pub async fn test_insert_empty_is_noop(repo: &dyn RecordRepo) {
    assert_eq!(repo.insert_many(&[]).await.unwrap(), 0);
    assert_eq!(repo.count().await.unwrap(), 0);
}

pub async fn test_insert_never_deduplicates(repo: &dyn RecordRepo) {
    let batch = vec![record_at("same", 1); 4];
    repo.insert_many(&batch).await.unwrap();
    repo.insert_many(&batch).await.unwrap();
    assert_eq!(repo.count().await.unwrap(), 8);
}

pub async fn test_insert_rejects_empty_name(repo: &dyn RecordRepo) {
    let result = repo
        .insert_many(&[record_at("ok", 1), record_at("  ", 2)])
        .await;

    assert!(matches!(result, Err(DbError::Validation(_))));
    assert_eq!(repo.count().await.unwrap(), 0);
}

pub async fn test_insert_spans_chunks(repo: &dyn RecordRepo) {
    let batch: Vec<NewRecord> = (0..2500)
        .map(|i| record_at(&format!("r{i}"), i))
        .collect();
    assert_eq!(repo.insert_many(&batch).await.unwrap(), 2500);
    assert_eq!(repo.count().await.unwrap(), 2500);
}

// ============================================================================
// Oldest-First Selection Tests
// ============================================================================

pub async fn test_list_oldest_orders_by_date(repo: &dyn RecordRepo) {
    repo.insert_many(&[
        record_at("newest", 30),
        record_at("oldest", 1),
        record_at("middle", 10),
    ])
    .await
    .unwrap();

    let records = repo.list_oldest(10).await.unwrap();
    assert_eq!(names(&records), vec!["oldest", "middle", "newest"]);

    let records = repo.list_oldest(2).await.unwrap();
    assert_eq!(names(&records), vec!["oldest", "middle"]);
}

pub async fn test_list_oldest_breaks_ties_by_id(repo: &dyn RecordRepo) {
    repo.insert_many(&[record_at("first", 5), record_at("second", 5), record_at("third", 5)])
        .await
        .unwrap();

    let records = repo.list_oldest(2).await.unwrap();
    assert_eq!(names(&records), vec!["first", "second"]);
    assert!(records[0].id < records[1].id);

    // Unchanged table, same answer
    let again = repo.list_oldest(2).await.unwrap();
    assert_eq!(records, again);
}

pub async fn test_list_oldest_on_empty_table(repo: &dyn RecordRepo) {
    assert!(repo.list_oldest(5).await.unwrap().is_empty());
}

pub async fn test_list_oldest_round_trips_fields(repo: &dyn RecordRepo) {
    repo.insert_many(&[record_at("Ada Lovelace", 7)])
        .await
        .unwrap();

    let records = repo.list_oldest(1).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].id > 0);
    assert_eq!(records[0].name, "Ada Lovelace");
    assert_eq!(records[0].date, base_time() + Duration::hours(7));
}

// ============================================================================
// Retention Tests
// ============================================================================

pub async fn test_delete_oldest_removes_oldest(repo: &dyn RecordRepo) {
    repo.insert_many(&[
        record_at("c", 3),
        record_at("a", 1),
        record_at("d", 4),
        record_at("b", 2),
    ])
    .await
    .unwrap();

    let deleted = repo.delete_oldest(2).await.expect("Failed to delete");
    assert_eq!(deleted, 2);

    let remaining = repo.list_oldest(10).await.unwrap();
    assert_eq!(names(&remaining), vec!["c", "d"]);
}

pub async fn test_delete_oldest_on_empty_table(repo: &dyn RecordRepo) {
    assert_eq!(repo.delete_oldest(3).await.unwrap(), 0);
}

pub async fn test_delete_oldest_reselects(repo: &dyn RecordRepo) {
    repo.insert_many(&[record_at("a", 10), record_at("b", 20), record_at("c", 30)])
        .await
        .unwrap();

    let selected = repo.list_oldest(2).await.unwrap();
    assert_eq!(names(&selected), vec!["a", "b"]);

    // Another writer slips in an older row between select and delete
    repo.insert_many(&[record_at("late", 1)]).await.unwrap();

    assert_eq!(repo.delete_oldest(2).await.unwrap(), 2);
    let remaining = repo.list_oldest(10).await.unwrap();
    assert_eq!(names(&remaining), vec!["b", "c"]);
}

pub async fn test_claim_oldest_deletes_exactly_claimed(repo: &dyn RecordRepo) {
    repo.insert_many(&[record_at("a", 1), record_at("b", 2), record_at("c", 3)])
        .await
        .unwrap();

    let batch = repo.claim_oldest(2).await.expect("Failed to claim");
    assert_eq!(names(batch.records()), vec!["a", "b"]);

    let deleted = batch.delete_and_commit().await.expect("Failed to commit");
    assert_eq!(deleted, 2);

    let remaining = repo.list_oldest(10).await.unwrap();
    assert_eq!(names(&remaining), vec!["c"]);
}

pub async fn test_claim_dropped_rolls_back(repo: &dyn RecordRepo) {
    repo.insert_many(&[record_at("a", 1), record_at("b", 2)])
        .await
        .unwrap();

    let batch = repo.claim_oldest(1).await.unwrap();
    assert_eq!(batch.records().len(), 1);
    drop(batch);

    assert_eq!(repo.count().await.unwrap(), 2);
}

pub async fn test_claim_on_empty_table(repo: &dyn RecordRepo) {
    let batch = repo.claim_oldest(5).await.unwrap();
    assert!(batch.records().is_empty());
    assert_eq!(batch.delete_and_commit().await.unwrap(), 0);
}

// ============================================================================
// SQLite Tests
// ============================================================================

#[cfg(feature = "database-sqlite")]
mod sqlite_tests {
    use crate::db::{
        sqlite::SqliteRecordRepo,
        tests::harness::{create_sqlite_pool, run_sqlite_migrations},
    };

    async fn create_repo() -> SqliteRecordRepo {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        SqliteRecordRepo::new(pool)
    }

    macro_rules! sqlite_test {
        ($name:ident) => {
            #[tokio::test]
            async fn $name() {
                let repo = create_repo().await;
                super::$name(&repo).await;
            }
        };
    }

    sqlite_test!(test_insert_and_count);
    sqlite_test!(test_insert_empty_is_noop);
    sqlite_test!(test_insert_never_deduplicates);
    sqlite_test!(test_insert_rejects_empty_name);
    sqlite_test!(test_insert_spans_chunks);
    sqlite_test!(test_list_oldest_orders_by_date);
    sqlite_test!(test_list_oldest_breaks_ties_by_id);
    sqlite_test!(test_list_oldest_on_empty_table);
    sqlite_test!(test_list_oldest_round_trips_fields);
    sqlite_test!(test_delete_oldest_removes_oldest);
    sqlite_test!(test_delete_oldest_on_empty_table);
    sqlite_test!(test_delete_oldest_reselects);
    sqlite_test!(test_claim_oldest_deletes_exactly_claimed);
    sqlite_test!(test_claim_dropped_rolls_back);
    sqlite_test!(test_claim_on_empty_table);
}

// ============================================================================
// PostgreSQL Tests
// ============================================================================

#[cfg(feature = "database-postgres")]
mod postgres_tests {
    use crate::db::{
        postgres::PostgresRecordRepo,
        tests::harness::postgres::{create_isolated_postgres_pool, run_postgres_migrations},
    };

    macro_rules! postgres_test {
        ($name:ident) => {
            #[tokio::test]
            #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
            async fn $name() {
                let pool = create_isolated_postgres_pool().await;
                run_postgres_migrations(&pool).await;
                let repo = PostgresRecordRepo::new(pool);
                super::$name(&repo).await;
            }
        };
    }

    postgres_test!(test_insert_and_count);
    postgres_test!(test_insert_empty_is_noop);
    postgres_test!(test_insert_never_deduplicates);
    postgres_test!(test_insert_rejects_empty_name);
    postgres_test!(test_insert_spans_chunks);
    postgres_test!(test_list_oldest_orders_by_date);
    postgres_test!(test_list_oldest_breaks_ties_by_id);
    postgres_test!(test_list_oldest_on_empty_table);
    postgres_test!(test_list_oldest_round_trips_fields);
    postgres_test!(test_delete_oldest_removes_oldest);
    postgres_test!(test_delete_oldest_on_empty_table);
    postgres_test!(test_delete_oldest_reselects);
    postgres_test!(test_claim_oldest_deletes_exactly_claimed);
    postgres_test!(test_claim_dropped_rolls_back);
    postgres_test!(test_claim_on_empty_table);
}
