//! SchemaManager - Provides methods for schema operations in migrations

use crate::executor::{SqlError, SqlExecutor};
use sea_query::{
    IndexCreateStatement, IndexDropStatement, TableCreateStatement, TableDropStatement,
};

/// SchemaManager provides methods for performing schema operations in migrations
///
/// This struct borrows a [`SqlExecutor`] and provides convenient methods for
/// common schema operations. DDL built with sea-query goes through
/// [`create_table`](Self::create_table) and friends; hand-written statements
/// go through [`execute`](Self::execute).
pub struct SchemaManager<'a> {
    executor: &'a dyn SqlExecutor,
}

impl<'a> SchemaManager<'a> {
    /// Create a new SchemaManager borrowing the given executor
    pub fn new(executor: &'a dyn SqlExecutor) -> Self {
        Self { executor }
    }

    /// Create a table
    ///
    /// # Example
    /// ```rust,no_run
    /// use sea_query::{Table, ColumnDef};
    ///
    /// # fn demo(manager: &stockroom::migration::SchemaManager<'_>) -> Result<(), stockroom::SqlError> {
    /// let table = Table::create()
    ///     .table("audit_log")
    ///     .if_not_exists()
    ///     .col(ColumnDef::new("id").big_integer().not_null().auto_increment().primary_key())
    ///     .col(ColumnDef::new("entry").string().not_null())
    ///     .to_owned();
    ///
    /// manager.create_table(table)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn create_table(&self, table: TableCreateStatement) -> Result<(), SqlError> {
        let builder = sea_query::PostgresQueryBuilder;
        let sql = table.build(builder);
        // DDL statements typically don't have parameters
        self.executor.execute(&sql, &[]).map(|_| ())
    }

    /// Drop a table
    pub fn drop_table(&self, table: TableDropStatement) -> Result<(), SqlError> {
        let builder = sea_query::PostgresQueryBuilder;
        let sql = table.build(builder);
        self.executor.execute(&sql, &[]).map(|_| ())
    }

    /// Create an index
    pub fn create_index(&self, index: IndexCreateStatement) -> Result<(), SqlError> {
        let builder = sea_query::PostgresQueryBuilder;
        let sql = index.build(builder);
        self.executor.execute(&sql, &[]).map(|_| ())
    }

    /// Drop an index
    pub fn drop_index(&self, index: IndexDropStatement) -> Result<(), SqlError> {
        let builder = sea_query::PostgresQueryBuilder;
        let sql = index.build(builder);
        self.executor.execute(&sql, &[]).map(|_| ())
    }

    /// Execute raw SQL
    ///
    /// # Example
    /// ```rust,no_run
    /// # fn demo(manager: &stockroom::migration::SchemaManager<'_>) -> Result<(), stockroom::SqlError> {
    /// manager.execute("CREATE EXTENSION IF NOT EXISTS \"uuid-ossp\"", &[])?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn execute(
        &self,
        sql: &str,
        params: &[&dyn may_postgres::types::ToSql],
    ) -> Result<(), SqlError> {
        self.executor.execute(sql, params).map(|_| ())
    }

    /// Get a reference to the underlying executor
    pub fn executor(&self) -> &dyn SqlExecutor {
        self.executor
    }
}
