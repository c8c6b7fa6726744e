//! In-memory store
//!
//! Mutex-held vectors with serial id assignment, matching the Postgres
//! store's semantics operation for operation. First-class rather than a
//! test double: the demos run on it, and the flow tests in `tests/` drive
//! the real managers against it.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::debug;

use crate::entity::{
    BorrowRequest, NewBorrowRequest, NewProduct, Product, ProductPatch, ProductRef, RequestStatus,
};
use crate::executor::SqlError;
use crate::store::{InventoryStore, StoreError};

#[derive(Debug)]
struct Inner {
    products: Vec<Product>,
    // Stored with `product: None`; the join is resolved at read time so
    // deletes orphan naturally.
    requests: Vec<BorrowRequest>,
    next_product_id: i32,
    next_request_id: i64,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            requests: Vec::new(),
            next_product_id: 1,
            next_request_id: 1,
        }
    }
}

/// Shared-handle in-memory [`InventoryStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Database(SqlError::Other("memory store lock poisoned".to_string())))
    }

    /// Remove a borrow request directly, bypassing the trait surface.
    ///
    /// The application never deletes requests; this mirrors out-of-band
    /// cleanup (manual SQL) that the change feed has to tolerate. Returns
    /// whether a row was removed.
    pub fn delete_borrow_request(&self, id: i64) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        let before = inner.requests.len();
        inner.requests.retain(|r| r.id != id);
        inner.requests.len() < before
    }
}

fn joined(request: &BorrowRequest, products: &[Product]) -> BorrowRequest {
    let mut row = request.clone();
    row.product = products
        .iter()
        .find(|p| p.id == request.product_id)
        .map(|p| ProductRef {
            id: p.id,
            name: p.name.clone(),
            total_stock: p.total_stock,
        });
    row
}

impl InventoryStore for MemoryStore {
    fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let inner = self.lock()?;
        let mut products = inner.products.clone();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    fn list_borrow_requests(&self) -> Result<Vec<BorrowRequest>, StoreError> {
        let inner = self.lock()?;
        let mut requests: Vec<BorrowRequest> = inner
            .requests
            .iter()
            .map(|r| joined(r, &inner.products))
            .collect();
        // Newest first, like the dashboard's default ordering.
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, StoreError> {
        let wanted = name.trim().to_lowercase();
        let inner = self.lock()?;
        Ok(inner
            .products
            .iter()
            .find(|p| p.name.to_lowercase() == wanted)
            .cloned())
    }

    fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.next_product_id;
        inner.next_product_id += 1;

        let row = Product {
            id,
            name: product.name,
            total_stock: product.total_stock,
            status: product.status,
            created_at: Utc::now(),
        };
        debug!("memory store inserted product id={id}");
        inner.products.push(row.clone());
        Ok(row)
    }

    fn update_product(&self, id: i32, patch: ProductPatch) -> Result<Product, StoreError> {
        let mut inner = self.lock()?;
        let row = inner
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound {
                entity: "product",
                id: i64::from(id),
            })?;

        if let Some(name) = patch.name {
            row.name = name;
        }
        if let Some(total_stock) = patch.total_stock {
            row.total_stock = total_stock;
        }
        if let Some(status) = patch.status {
            row.status = status;
        }
        Ok(row.clone())
    }

    fn delete_product(&self, id: i32) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let before = inner.products.len();
        inner.products.retain(|p| p.id != id);
        if inner.products.len() == before {
            return Err(StoreError::NotFound {
                entity: "product",
                id: i64::from(id),
            });
        }
        debug!("memory store deleted product id={id}");
        Ok(())
    }

    fn insert_borrow_request(
        &self,
        request: NewBorrowRequest,
    ) -> Result<BorrowRequest, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.next_request_id;
        inner.next_request_id += 1;

        // Same instant for both timestamps marks the row as fresh for the
        // feed poller's insert/update classification.
        let now = Utc::now();
        let row = BorrowRequest {
            id,
            product_id: request.product_id,
            product: None,
            total: request.total,
            requester_name: request.requester_name,
            class: request.class,
            comment: request.comment,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        debug!("memory store inserted borrow request id={id}");
        inner.requests.push(row.clone());
        Ok(joined(&row, &inner.products))
    }

    fn update_borrow_request_status(
        &self,
        id: i64,
        status: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<BorrowRequest, StoreError> {
        let mut inner = self.lock()?;
        let row = inner
            .requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound {
                entity: "borrow request",
                id,
            })?;

        row.status = status;
        row.updated_at = updated_at;
        let row = row.clone();
        Ok(joined(&row, &inner.products))
    }

    fn list_requests_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<BorrowRequest>, StoreError> {
        let inner = self.lock()?;
        let mut rows: Vec<BorrowRequest> = inner
            .requests
            .iter()
            .filter(|r| r.updated_at > since)
            .map(|r| joined(r, &inner.products))
            .collect();
        rows.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    fn list_request_ids(&self) -> Result<Vec<i64>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.requests.iter().map(|r| r.id).collect())
    }
}
