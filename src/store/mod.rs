//! Persistence interface
//!
//! [`InventoryStore`] is the seam between the domain managers and storage.
//! Two implementations ship: [`PostgresStore`] for production and
//! [`MemoryStore`] for tests and demos. Row-to-entity mapping happens
//! inside the implementations; callers only ever see `entity` types.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::entity::{
    BorrowRequest, NewBorrowRequest, NewProduct, Product, ProductPatch, RequestStatus,
    UnknownLabel, ValidationError,
};
use crate::executor::SqlError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Errors crossing the store boundary.
#[derive(Debug)]
pub enum StoreError {
    /// Input rejected before any statement ran.
    Validation(ValidationError),
    /// The targeted row is gone upstream (stale local cache).
    NotFound { entity: &'static str, id: i64 },
    /// Failure from the database layer; the operation was aborted.
    Database(SqlError),
    /// A row came back in a shape the entities cannot represent.
    Mapping(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Validation(e) => write!(f, "validation failed: {e}"),
            StoreError::NotFound { entity, id } => write!(f, "{entity} {id} not found"),
            StoreError::Database(e) => write!(f, "database error: {e}"),
            StoreError::Mapping(s) => write!(f, "row mapping error: {s}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Validation(e) => Some(e),
            StoreError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::Validation(err)
    }
}

impl From<SqlError> for StoreError {
    fn from(err: SqlError) -> Self {
        StoreError::Database(err)
    }
}

impl From<UnknownLabel> for StoreError {
    fn from(err: UnknownLabel) -> Self {
        StoreError::Mapping(err.to_string())
    }
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Storage operations required by the catalog, the dashboard, and the
/// change-feed poller.
///
/// Implementations must be safe to call from any coroutine; handles are
/// cheap to clone and share one underlying state.
pub trait InventoryStore {
    /// All products, ordered by name.
    fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    /// All borrow requests, newest first, each joined with the referenced
    /// product's `{id, name, total_stock}`. Requests whose product was
    /// deleted come back with `product: None`.
    fn list_borrow_requests(&self) -> Result<Vec<BorrowRequest>, StoreError>;

    /// Case-insensitive exact name lookup, for the catalog's dedup-merge.
    fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, StoreError>;

    /// Insert a product and return the stored row (with its assigned id).
    fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// Apply a partial update; absent fields are left untouched.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when the id no longer exists.
    fn update_product(&self, id: i32, patch: ProductPatch) -> Result<Product, StoreError>;

    /// Delete a product. Outstanding borrow requests keep their
    /// `product_id` and simply dangle; nothing cascades.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when the id no longer exists.
    fn delete_product(&self, id: i32) -> Result<(), StoreError>;

    /// Insert a borrow request as `Pending` and return the stored row,
    /// joined with its product projection.
    fn insert_borrow_request(&self, request: NewBorrowRequest)
        -> Result<BorrowRequest, StoreError>;

    /// Set the status and `updated_at` of one request; returns the
    /// refreshed joined row.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when the id no longer exists.
    fn update_borrow_request_status(
        &self,
        id: i64,
        status: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<BorrowRequest, StoreError>;

    /// Requests with `updated_at` strictly after the watermark, oldest
    /// first. Drives the change-feed poller.
    fn list_requests_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<BorrowRequest>, StoreError>;

    /// Every request id, unordered. The poller's cheap scan for detecting
    /// rows deleted out of band.
    fn list_request_ids(&self) -> Result<Vec<i64>, StoreError>;
}
