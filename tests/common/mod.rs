//! Shared fixtures for the flow tests.

use fake::faker::name::en::Name;
use fake::Fake;
use rand::seq::SliceRandom;
use rand::Rng;

use stockroom::entity::{NewBorrowRequest, NewProduct, Product, ProductStatus, SchoolClass};
use stockroom::store::{InventoryStore, MemoryStore};

/// The department's starting inventory, inserted through the store trait.
/// Returned in insertion order: laptop, projector, cable.
pub fn seed_catalog(store: &MemoryStore) -> Vec<Product> {
    [("Laptop", 8), ("Projector", 3), ("HDMI Cable", 12)]
        .iter()
        .map(|(name, total_stock)| {
            store
                .insert_product(NewProduct {
                    name: (*name).to_string(),
                    total_stock: *total_stock,
                    status: ProductStatus::Available,
                })
                .expect("seed product")
        })
        .collect()
}

/// A plausible borrow-form submission against the given product.
pub fn fake_submission(product_id: i32) -> NewBorrowRequest {
    let mut rng = rand::thread_rng();
    NewBorrowRequest {
        product_id,
        total: rng.gen_range(1..=3),
        requester_name: Name().fake(),
        class: *SchoolClass::ALL.choose(&mut rng).expect("non-empty roster"),
        comment: None,
    }
}
