//! Migrator - Core migration execution engine

use std::collections::HashSet;
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::info;

use crate::executor::{SqlError, SqlExecutor};
use crate::migration::state_table::initialize_state_table;
use crate::migration::{steps, Migration, MigrationError, SchemaManager};

/// Row from the `stockroom_migrations` state table.
#[derive(Debug, Clone)]
pub struct AppliedMigration {
    pub version: i64,
    pub name: String,
    pub checksum: String,
    pub applied_at: DateTime<Utc>,
    pub execution_time_ms: Option<i64>,
    pub success: bool,
}

impl AppliedMigration {
    fn from_row(row: &may_postgres::Row) -> Result<Self, SqlError> {
        let parse = |col: &str, e: may_postgres::Error| {
            SqlError::Parse(format!("stockroom_migrations.{col}: {e}"))
        };
        Ok(Self {
            version: row.try_get(0).map_err(|e| parse("version", e))?,
            name: row.try_get(1).map_err(|e| parse("name", e))?,
            checksum: row.try_get(2).map_err(|e| parse("checksum", e))?,
            applied_at: row.try_get(3).map_err(|e| parse("applied_at", e))?,
            execution_time_ms: row.try_get(4).map_err(|e| parse("execution_time_ms", e))?,
            success: row.try_get(5).map_err(|e| parse("success", e))?,
        })
    }
}

/// A registered migration that has not been applied yet.
#[derive(Debug, Clone)]
pub struct PendingMigration {
    pub version: i64,
    pub name: String,
    pub checksum: String,
}

/// Applied vs. pending migrations, as reported by [`Migrator::status`].
#[derive(Debug)]
pub struct MigrationStatus {
    pub applied: Vec<AppliedMigration>,
    pub pending: Vec<PendingMigration>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Core migration execution engine
///
/// The `Migrator` holds the registered migrations (compiled into the
/// binary), compares them against the state table, and applies or rolls
/// back steps in version order.
pub struct Migrator {
    migrations: Vec<Box<dyn Migration>>,
}

impl Migrator {
    /// Create a Migrator with the built-in schema steps registered.
    pub fn new() -> Self {
        Self::with_migrations(steps::builtin())
    }

    /// Create a Migrator with an explicit set of migrations.
    pub fn with_migrations(mut migrations: Vec<Box<dyn Migration>>) -> Self {
        migrations.sort_by_key(|m| m.version());
        Self { migrations }
    }

    /// Get migration status (applied vs pending)
    ///
    /// Ensures the state table exists, then compares registered migrations
    /// with the recorded ones. Checksums of applied migrations are
    /// validated here, so every `up`/`down` call re-checks for drift.
    ///
    /// # Errors
    ///
    /// `ChecksumMismatch` if an applied migration's DDL changed,
    /// `UnknownApplied` if the state table holds a version this binary
    /// does not register, and `Database` for state-table failures.
    pub fn status(&self, executor: &dyn SqlExecutor) -> Result<MigrationStatus, MigrationError> {
        initialize_state_table(executor)?;

        let applied = Self::query_applied_migrations(executor)?;
        let registered_versions: HashSet<i64> =
            self.migrations.iter().map(|m| m.version()).collect();

        let mut applied_records = Vec::new();
        let mut pending = Vec::new();

        for migration in &self.migrations {
            let current_checksum = migration.checksum();
            if let Some(record) = applied.iter().find(|r| r.version == migration.version()) {
                if record.checksum != current_checksum {
                    return Err(MigrationError::ChecksumMismatch {
                        version: migration.version(),
                        name: migration.name().to_string(),
                        stored: record.checksum.clone(),
                        current: current_checksum,
                    });
                }
                applied_records.push(record.clone());
            } else {
                pending.push(PendingMigration {
                    version: migration.version(),
                    name: migration.name().to_string(),
                    checksum: current_checksum,
                });
            }
        }

        // Records with no registered counterpart mean the database is ahead
        // of this binary.
        for record in &applied {
            if !registered_versions.contains(&record.version) {
                return Err(MigrationError::UnknownApplied {
                    version: record.version,
                    name: record.name.clone(),
                });
            }
        }

        Ok(MigrationStatus {
            applied: applied_records,
            pending,
        })
    }

    /// Apply pending migrations
    ///
    /// # Arguments
    ///
    /// * `executor` - The database executor
    /// * `steps` - Number of migrations to apply (None = all pending)
    ///
    /// # Returns
    ///
    /// Returns the number of migrations applied.
    pub fn up(
        &self,
        executor: &dyn SqlExecutor,
        steps: Option<usize>,
    ) -> Result<usize, MigrationError> {
        let status = self.status(executor)?;
        if status.pending.is_empty() {
            return Ok(0);
        }

        let applied_versions: HashSet<i64> = status.applied.iter().map(|r| r.version).collect();
        let to_apply = steps.unwrap_or(status.pending.len());
        let manager = SchemaManager::new(executor);
        let mut applied_count = 0;

        for migration in &self.migrations {
            if applied_count == to_apply {
                break;
            }
            if applied_versions.contains(&migration.version()) {
                continue;
            }

            info!(
                "applying migration {} ({})",
                migration.version(),
                migration.name()
            );
            let start = Instant::now();
            migration
                .up(&manager)
                .map_err(|e| MigrationError::ExecutionFailed {
                    version: migration.version(),
                    name: migration.name().to_string(),
                    error: e.to_string(),
                })?;

            let execution_time = start.elapsed().as_millis() as i64;
            Self::record_migration(executor, migration.as_ref(), execution_time)?;
            applied_count += 1;
        }

        Ok(applied_count)
    }

    /// Rollback migrations
    ///
    /// Rolls back the last N applied migrations (newest first) by executing
    /// their reverse DDL.
    ///
    /// # Arguments
    ///
    /// * `executor` - The database executor
    /// * `steps` - Number of migrations to rollback (default: 1)
    ///
    /// # Returns
    ///
    /// Returns the number of migrations rolled back.
    pub fn down(
        &self,
        executor: &dyn SqlExecutor,
        steps: Option<usize>,
    ) -> Result<usize, MigrationError> {
        let status = self.status(executor)?;
        if status.applied.is_empty() {
            return Ok(0);
        }

        let steps = steps.unwrap_or(1);
        let mut applied = status.applied;
        applied.sort_by_key(|m| std::cmp::Reverse(m.version));

        let manager = SchemaManager::new(executor);
        let mut rolled_back = 0;

        for record in applied.iter().take(steps) {
            let migration = self
                .migrations
                .iter()
                .find(|m| m.version() == record.version)
                .ok_or_else(|| MigrationError::UnknownApplied {
                    version: record.version,
                    name: record.name.clone(),
                })?;

            if migration.down_statements().is_empty() {
                return Err(MigrationError::Irreversible {
                    version: record.version,
                    name: record.name.clone(),
                });
            }

            info!("rolling back migration {} ({})", record.version, record.name);
            migration
                .down(&manager)
                .map_err(|e| MigrationError::ExecutionFailed {
                    version: record.version,
                    name: record.name.clone(),
                    error: e.to_string(),
                })?;

            Self::remove_migration_record(executor, record.version)?;
            rolled_back += 1;
        }

        Ok(rolled_back)
    }

    /// Query applied migrations from the state table
    fn query_applied_migrations(
        executor: &dyn SqlExecutor,
    ) -> Result<Vec<AppliedMigration>, MigrationError> {
        let sql = "SELECT version, name, checksum, applied_at, execution_time_ms, success \
                   FROM stockroom_migrations \
                   ORDER BY version ASC";

        let rows = executor.query_all(sql, &[])?;

        let mut records = Vec::new();
        for row in rows {
            records.push(AppliedMigration::from_row(&row)?);
        }

        Ok(records)
    }

    /// Record a migration in the state table
    fn record_migration(
        executor: &dyn SqlExecutor,
        migration: &dyn Migration,
        execution_time_ms: i64,
    ) -> Result<(), MigrationError> {
        let sql = "INSERT INTO stockroom_migrations \
                   (version, name, checksum, applied_at, execution_time_ms, success) \
                   VALUES ($1, $2, $3, $4, $5, $6)";

        let version = migration.version();
        let name = migration.name();
        let checksum = migration.checksum();
        let applied_at = Utc::now();
        let success = true;

        executor.execute(
            sql,
            &[
                &version,
                &name,
                &checksum,
                &applied_at,
                &execution_time_ms,
                &success,
            ],
        )?;

        Ok(())
    }

    /// Remove a migration record from the state table
    fn remove_migration_record(
        executor: &dyn SqlExecutor,
        version: i64,
    ) -> Result<(), MigrationError> {
        executor.execute(
            "DELETE FROM stockroom_migrations WHERE version = $1",
            &[&version],
        )?;
        Ok(())
    }
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use may_postgres::types::ToSql;
    use std::sync::Mutex;

    /// Records executed SQL; reports an empty state table.
    struct RecordingExecutor {
        statements: Mutex<Vec<String>>,
    }

    impl RecordingExecutor {
        fn new() -> Self {
            Self {
                statements: Mutex::new(Vec::new()),
            }
        }

        fn executed(&self) -> Vec<String> {
            self.statements.lock().unwrap().clone()
        }
    }

    impl SqlExecutor for RecordingExecutor {
        fn execute(&self, query: &str, _params: &[&dyn ToSql]) -> Result<u64, SqlError> {
            self.statements.lock().unwrap().push(query.to_string());
            Ok(0)
        }

        fn query_one(
            &self,
            _query: &str,
            _params: &[&dyn ToSql],
        ) -> Result<may_postgres::Row, SqlError> {
            Err(SqlError::Query(
                "query_one unsupported in recording stub".to_string(),
            ))
        }

        fn query_all(
            &self,
            _query: &str,
            _params: &[&dyn ToSql],
        ) -> Result<Vec<may_postgres::Row>, SqlError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_fresh_database_reports_all_builtin_pending() {
        let executor = RecordingExecutor::new();
        let status = Migrator::new().status(&executor).expect("status");

        assert!(status.applied.is_empty());
        assert_eq!(status.pending.len(), steps::builtin().len());
        assert!(!status.is_up_to_date());

        let versions: Vec<i64> = status.pending.iter().map(|p| p.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        assert_eq!(versions, sorted, "pending migrations are version-ordered");
    }

    #[test]
    fn test_up_applies_all_pending_in_order() {
        let executor = RecordingExecutor::new();
        let applied = Migrator::new().up(&executor, None).expect("up");
        assert_eq!(applied, steps::builtin().len());

        let executed = executor.executed();
        let pos = |needle: &str| {
            executed
                .iter()
                .position(|sql| sql.contains(needle))
                .unwrap_or_else(|| panic!("no statement containing {needle:?}"))
        };
        assert!(pos("CREATE TABLE IF NOT EXISTS products") < pos("borrow_requests"));
        assert!(pos("CREATE TABLE IF NOT EXISTS borrow_requests") < pos("CREATE TABLE IF NOT EXISTS users"));

        let records = executed
            .iter()
            .filter(|sql| sql.contains("INSERT INTO stockroom_migrations"))
            .count();
        assert_eq!(records, steps::builtin().len());
    }

    #[test]
    fn test_up_honors_step_limit() {
        let executor = RecordingExecutor::new();
        let applied = Migrator::new().up(&executor, Some(1)).expect("up");
        assert_eq!(applied, 1);

        let executed = executor.executed();
        assert!(executed.iter().any(|sql| sql.contains("products")));
        assert!(!executed
            .iter()
            .any(|sql| sql.contains("CREATE TABLE IF NOT EXISTS borrow_requests")));
    }

    #[test]
    fn test_down_on_empty_state_is_noop() {
        let executor = RecordingExecutor::new();
        let rolled_back = Migrator::new().down(&executor, None).expect("down");
        assert_eq!(rolled_back, 0);
    }
}
