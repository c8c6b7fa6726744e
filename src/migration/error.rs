//! Migration-specific error types

use crate::executor::SqlError;

/// Migration-specific errors
#[derive(Debug)]
pub enum MigrationError {
    /// Database execution error while talking to the state table
    Database(SqlError),
    /// A migration's DDL changed after it was applied
    ChecksumMismatch {
        version: i64,
        name: String,
        stored: String,
        current: String,
    },
    /// The state table records a version this binary does not know about
    UnknownApplied { version: i64, name: String },
    /// Rollback requested for a migration with no reverse DDL
    Irreversible { version: i64, name: String },
    /// A migration step failed partway through
    ExecutionFailed {
        version: i64,
        name: String,
        error: String,
    },
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::Database(e) => write!(f, "Database error: {}", e),
            MigrationError::ChecksumMismatch {
                version,
                name,
                stored,
                current,
            } => {
                write!(
                    f,
                    "Migration '{}' (version {}) has been modified after being applied.\n\
                     Stored checksum: {}\n\
                     Current checksum: {}\n\
                     This indicates the migration DDL was edited after deployment.",
                    name, version, stored, current
                )
            }
            MigrationError::UnknownApplied { version, name } => {
                write!(
                    f,
                    "Applied migration '{}' (version {}) is not registered in this build.\n\
                     The database is ahead of the binary; deploy a build that includes it.",
                    name, version
                )
            }
            MigrationError::Irreversible { version, name } => {
                write!(
                    f,
                    "Migration '{}' (version {}) has no reverse DDL and cannot be rolled back",
                    name, version
                )
            }
            MigrationError::ExecutionFailed {
                version,
                name,
                error,
            } => {
                write!(
                    f,
                    "Migration '{}' (version {}) failed during execution: {}",
                    name, version, error
                )
            }
        }
    }
}

impl std::error::Error for MigrationError {}

impl From<SqlError> for MigrationError {
    fn from(error: SqlError) -> Self {
        MigrationError::Database(error)
    }
}
