//! Product catalog
//!
//! CRUD over products with the dedup-merge rule on create: adding stock
//! under an existing name (case-insensitively) tops up that row instead of
//! fragmenting the catalog. The store handle is injected; the local product
//! list is a cache that is only touched after the store acknowledges.

use log::{debug, info};

use crate::entity::{
    BorrowRequest, NewProduct, Product, ProductPatch, ValidationError,
};
use crate::stock::{reconcile, StockedProduct};
use crate::store::{InventoryStore, StoreError};

pub struct ProductCatalog<S: InventoryStore> {
    store: S,
    products: Vec<Product>,
}

impl<S: InventoryStore> ProductCatalog<S> {
    /// An empty catalog over a store handle; call [`load`](Self::load)
    /// before reading.
    pub fn new(store: S) -> Self {
        Self {
            store,
            products: Vec::new(),
        }
    }

    /// Replace the cache with the store's current product list.
    ///
    /// # Errors
    ///
    /// Propagates the store failure; the previous cache is kept.
    pub fn load(&mut self) -> Result<(), StoreError> {
        let products = self.store.list_products()?;
        debug!("catalog loaded {} products", products.len());
        self.products = products;
        Ok(())
    }

    /// The cached product list, in store order.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Create a product, merging into an existing row on a
    /// case-insensitive name match.
    ///
    /// On a match the existing row's `total_stock` is increased by the new
    /// quantity and its status is left as it was; otherwise a new row is
    /// inserted. Either way the returned product is the stored row.
    ///
    /// # Errors
    ///
    /// `StoreError::Validation` for a blank name or non-positive quantity;
    /// store failures abort with the cache unchanged.
    pub fn create(&mut self, mut input: NewProduct) -> Result<Product, StoreError> {
        input.normalize();
        input.validate()?;

        match self.store.find_product_by_name(&input.name)? {
            Some(existing) => {
                let merged_total = existing
                    .total_stock
                    .checked_add(input.total_stock)
                    .ok_or_else(|| {
                        ValidationError::new("total_stock", "total stock overflow")
                    })?;
                // Merge keeps the existing status; only the quantity grows.
                let patch = ProductPatch {
                    total_stock: Some(merged_total),
                    ..ProductPatch::default()
                };
                let updated = self.store.update_product(existing.id, patch)?;
                info!(
                    "merged {} units into product '{}' (id={})",
                    input.total_stock, updated.name, updated.id
                );
                self.cache_upsert(updated.clone());
                Ok(updated)
            }
            None => {
                let created = self.store.insert_product(input)?;
                info!("created product '{}' (id={})", created.name, created.id);
                self.cache_upsert(created.clone());
                Ok(created)
            }
        }
    }

    /// Apply a partial update. An empty patch is a plain fetch.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when the id is gone upstream; validation and
    /// store failures abort with the cache unchanged.
    pub fn update(&mut self, id: i32, mut patch: ProductPatch) -> Result<Product, StoreError> {
        patch.normalize();
        patch.validate()?;

        let updated = self.store.update_product(id, patch)?;
        self.cache_upsert(updated.clone());
        Ok(updated)
    }

    /// Delete a product and drop it from the cache.
    ///
    /// Outstanding borrow requests referencing it are left alone; their
    /// product reference dangles and reconciliation skips them.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when the id is already gone.
    pub fn remove(&mut self, id: i32) -> Result<(), StoreError> {
        self.store.delete_product(id)?;
        self.products.retain(|p| p.id != id);
        info!("removed product id={id}");
        Ok(())
    }

    /// The cached products annotated with available stock, derived against
    /// the given request set at call time.
    pub fn stocked(&self, requests: &[BorrowRequest]) -> Vec<StockedProduct> {
        reconcile(&self.products, requests)
    }

    fn cache_upsert(&mut self, product: Product) {
        match self.products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => self.products.push(product),
        }
    }
}
