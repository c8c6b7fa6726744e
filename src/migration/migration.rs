//! Migration trait definition

use super::checksum::statement_checksum;
use super::schema_manager::SchemaManager;
use crate::executor::SqlError;

/// Trait that all migrations must implement
///
/// Each migration declares its forward and reverse DDL as statement lists.
/// The default `up()`/`down()` run those statements in order; override them
/// only for steps that need logic beyond plain DDL (data backfills, say).
///
/// Note: the crate runs on coroutines (may runtime), so these methods are
/// synchronous, not async. The executor handles coroutine scheduling
/// internally.
pub trait Migration: Send + Sync {
    /// Get the migration name (human-readable identifier)
    fn name(&self) -> &str;

    /// Get the migration version (timestamp: YYYYMMDDHHMMSS)
    fn version(&self) -> i64;

    /// Forward DDL, one statement per entry, executed in order
    fn up_statements(&self) -> &[&str];

    /// Reverse DDL. An empty list marks the migration as irreversible.
    fn down_statements(&self) -> &[&str];

    /// Checksum recorded in the state table when this migration is applied
    fn checksum(&self) -> String {
        statement_checksum(self.up_statements())
    }

    /// Apply the migration (forward migration)
    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), SqlError> {
        for sql in self.up_statements() {
            manager.execute(sql, &[])?;
        }
        Ok(())
    }

    /// Rollback the migration (reverse migration)
    fn down(&self, manager: &SchemaManager<'_>) -> Result<(), SqlError> {
        for sql in self.down_statements() {
            manager.execute(sql, &[])?;
        }
        Ok(())
    }
}
