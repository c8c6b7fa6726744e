//! Migration state table management

use super::schema_manager::SchemaManager;
use crate::executor::{SqlError, SqlExecutor};
use sea_query::{ColumnDef, Expr, Index, IndexCreateStatement, Table, TableCreateStatement};

/// Build the `stockroom_migrations` state tracking table
///
/// This table stores metadata about applied migrations:
/// - Version (timestamp)
/// - Name (human-readable)
/// - Checksum (SHA-256 hash of the migration's forward DDL)
/// - Applied timestamp
/// - Execution time
/// - Success status
pub fn create_state_table() -> TableCreateStatement {
    Table::create()
        .table("stockroom_migrations")
        .if_not_exists()
        .col(
            ColumnDef::new("version")
                .big_integer()
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new("name").string().string_len(255).not_null())
        .col(
            ColumnDef::new("checksum")
                .string()
                .string_len(64)
                .not_null(),
        )
        .col(
            ColumnDef::new("applied_at")
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(ColumnDef::new("execution_time_ms").big_integer().null())
        .col(
            ColumnDef::new("success")
                .boolean()
                .not_null()
                .default(true),
        )
        .to_owned()
}

/// Build the index on `applied_at` for faster status queries
pub fn create_state_table_index() -> IndexCreateStatement {
    Index::create()
        .if_not_exists()
        .name("idx_stockroom_migrations_applied_at")
        .table("stockroom_migrations")
        .col(Expr::col("applied_at"))
        .to_owned()
}

/// Initialize the migration state table
///
/// Creates the `stockroom_migrations` table and its index if they don't
/// exist. Safe to call on every startup.
pub fn initialize_state_table(executor: &dyn SqlExecutor) -> Result<(), SqlError> {
    let manager = SchemaManager::new(executor);
    manager.create_table(create_state_table())?;
    manager.create_index(create_state_table_index())?;
    Ok(())
}
