//! Integration tests for the migration runner against a real database.
//!
//! Requires TEST_DATABASE_URL (see postgres_store.rs); skips otherwise.
//! The lifecycle test rolls the newest migration back and forward again, so
//! point these at a throwaway database only.

use std::sync::Arc;

use stockroom::migration::{ensure_schema, Migrator};
use stockroom::{connect, MaySqlExecutor, SqlExecutor};

fn test_executor() -> Option<Arc<MaySqlExecutor>> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping");
            return None;
        }
    };
    let client = connect(&url).expect("connect to test database");
    Some(Arc::new(MaySqlExecutor::new(client)))
}

fn table_exists(executor: &dyn SqlExecutor, table: &str) -> bool {
    let rows = executor
        .query_all(
            "SELECT EXISTS (
                SELECT FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )",
            &[&table],
        )
        .expect("information_schema query");
    rows[0].get(0)
}

/// One sequential pass over the whole lifecycle. Kept as a single test so
/// rollback and re-apply never race each other in parallel threads.
#[test]
fn test_schema_lifecycle() {
    let Some(executor) = test_executor() else { return };

    // First run applies whatever is missing; the second is a no-op.
    ensure_schema(executor.as_ref()).expect("first ensure");
    let applied_again = ensure_schema(executor.as_ref()).expect("second ensure");
    assert_eq!(applied_again, 0, "ensure_schema is idempotent");

    let migrator = Migrator::new();
    let status = migrator.status(executor.as_ref()).expect("status");
    assert!(status.is_up_to_date());
    assert!(!status.applied.is_empty());
    for record in &status.applied {
        assert_eq!(record.checksum.len(), 64, "sha-256 hex checksum");
        assert!(record.success);
    }
    let versions: Vec<i64> = status.applied.iter().map(|m| m.version).collect();
    let mut sorted = versions.clone();
    sorted.sort_unstable();
    assert_eq!(versions, sorted, "applied history is ordered");

    // Roll the newest step (the auth tables) back.
    let reverted = migrator
        .down(executor.as_ref(), Some(1))
        .expect("down one step");
    assert_eq!(reverted, 1);
    assert!(!table_exists(executor.as_ref(), "sessions"));
    assert!(!table_exists(executor.as_ref(), "users"));

    let status = migrator.status(executor.as_ref()).expect("status");
    assert_eq!(status.pending.len(), 1);
    assert!(!status.is_up_to_date());

    // And forward again.
    let applied = migrator.up(executor.as_ref(), None).expect("up");
    assert_eq!(applied, 1);
    assert!(table_exists(executor.as_ref(), "users"));
    assert!(table_exists(executor.as_ref(), "sessions"));
    assert!(migrator
        .status(executor.as_ref())
        .expect("status")
        .is_up_to_date());
}

#[test]
fn test_state_table_shape() {
    let Some(executor) = test_executor() else { return };
    // status() creates the state table without applying any step, so this
    // cannot race the lifecycle test's rollback window.
    Migrator::new().status(executor.as_ref()).expect("status");

    assert!(table_exists(executor.as_ref(), "stockroom_migrations"));

    let rows = executor
        .query_all(
            "SELECT column_name FROM information_schema.columns
             WHERE table_schema = 'public' AND table_name = 'stockroom_migrations'
             ORDER BY ordinal_position",
            &[],
        )
        .expect("columns query");
    let columns: Vec<String> = rows.iter().map(|r| r.get(0)).collect();
    assert_eq!(
        columns,
        [
            "version",
            "name",
            "checksum",
            "applied_at",
            "execution_time_ms",
            "success"
        ]
    );

    let rows = executor
        .query_all(
            "SELECT EXISTS (
                SELECT FROM pg_indexes
                WHERE schemaname = 'public'
                AND tablename = 'stockroom_migrations'
                AND indexname = 'idx_stockroom_migrations_applied_at'
            )",
            &[],
        )
        .expect("index query");
    let exists: bool = rows[0].get(0);
    assert!(exists, "applied_at index should exist");
}
