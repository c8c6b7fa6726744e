//! Stock reconciliation
//!
//! Derives per-product available stock from the product list and the live
//! request set. Pure functions: available stock is computed on demand and
//! never persisted, so it cannot drift from ground truth.

use serde::Serialize;

use crate::entity::{BorrowRequest, Product, ProductStatus};

/// A product annotated with its derived availability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockedProduct {
    #[serde(flatten)]
    pub product: Product,
    /// `max(0, total_stock - reserved)`; never negative.
    pub available_stock: i32,
}

impl StockedProduct {
    /// Status as shown on the dashboard: a fully-reserved product whose
    /// stored status is still `Available` reads as `CheckedOut`.
    pub fn display_status(&self) -> ProductStatus {
        if self.available_stock == 0 && self.product.status == ProductStatus::Available {
            ProductStatus::CheckedOut
        } else {
            self.product.status
        }
    }
}

/// Units of one product currently reserved by non-terminal requests.
///
/// Requests whose status does not reserve stock contribute nothing,
/// regardless of their history.
pub fn reserved_total(product_id: i32, requests: &[BorrowRequest]) -> i64 {
    requests
        .iter()
        .filter(|r| r.product_id == product_id && r.status.reserves_stock())
        .map(|r| i64::from(r.total))
        .sum()
}

/// Available units of one product, clamped at zero.
pub fn available_stock(product: &Product, requests: &[BorrowRequest]) -> i32 {
    let reserved = reserved_total(product.id, requests);
    let available = i64::from(product.total_stock) - reserved;
    i32::try_from(available.max(0)).unwrap_or(i32::MAX)
}

/// Annotate every product with its available stock.
///
/// Output order follows input product order. Requests referencing a product
/// id not present in `products` contribute to no product's sum.
pub fn reconcile(products: &[Product], requests: &[BorrowRequest]) -> Vec<StockedProduct> {
    products
        .iter()
        .map(|product| StockedProduct {
            available_stock: available_stock(product, requests),
            product: product.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{RequestStatus, SchoolClass};
    use chrono::Utc;

    fn product(id: i32, name: &str, total_stock: i32) -> Product {
        Product {
            id,
            name: name.to_string(),
            total_stock,
            status: ProductStatus::Available,
            created_at: Utc::now(),
        }
    }

    fn request(product_id: i32, total: i32, status: RequestStatus) -> BorrowRequest {
        let now = Utc::now();
        BorrowRequest {
            id: 0,
            product_id,
            product: None,
            total,
            requester_name: "Budi".to_string(),
            class: SchoolClass::XTkj1,
            comment: None,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_borrowed_counts_returned_does_not() {
        // Laptop with 5 total: 2 borrowed and 1 already returned leaves 3.
        let products = vec![product(1, "Laptop", 5)];
        let requests = vec![
            request(1, 2, RequestStatus::Borrowed),
            request(1, 1, RequestStatus::Returned),
        ];
        let stocked = reconcile(&products, &requests);
        assert_eq!(stocked[0].available_stock, 3);
    }

    #[test]
    fn test_available_stock_clamps_at_zero() {
        let products = vec![product(1, "Laptop", 5)];
        let requests = vec![request(1, 10, RequestStatus::Pending)];
        let stocked = reconcile(&products, &requests);
        assert_eq!(stocked[0].available_stock, 0);
    }

    #[test]
    fn test_product_without_requests_keeps_full_stock() {
        let products = vec![product(3, "Crimping Tool", 12)];
        let stocked = reconcile(&products, &[]);
        assert_eq!(stocked[0].available_stock, 12);
    }

    #[test]
    fn test_orphaned_requests_are_ignored() {
        let products = vec![product(1, "Router", 4)];
        // Request against a product id that no longer exists.
        let requests = vec![
            request(99, 3, RequestStatus::Borrowed),
            request(1, 1, RequestStatus::Pending),
        ];
        let stocked = reconcile(&products, &requests);
        assert_eq!(stocked[0].available_stock, 3);
    }

    #[test]
    fn test_rejected_never_contributes() {
        let products = vec![product(1, "Access Point", 2)];
        let requests = vec![request(1, 2, RequestStatus::Rejected)];
        assert_eq!(reconcile(&products, &requests)[0].available_stock, 2);
    }

    #[test]
    fn test_output_order_follows_input_order() {
        let products = vec![product(2, "B", 1), product(1, "A", 1)];
        let stocked = reconcile(&products, &[]);
        assert_eq!(stocked[0].product.id, 2);
        assert_eq!(stocked[1].product.id, 1);
    }

    #[test]
    fn test_display_status_reports_checked_out_when_exhausted() {
        let mut stocked = StockedProduct {
            product: product(1, "Projector", 1),
            available_stock: 0,
        };
        assert_eq!(stocked.display_status(), ProductStatus::CheckedOut);

        stocked.available_stock = 1;
        assert_eq!(stocked.display_status(), ProductStatus::Available);

        // A non-available stored status wins over the exhaustion rule.
        stocked.available_stock = 0;
        stocked.product.status = ProductStatus::InMaintenance;
        assert_eq!(stocked.display_status(), ProductStatus::InMaintenance);
    }

    #[test]
    fn test_reserved_total_sums_across_requests() {
        let requests = vec![
            request(1, 2, RequestStatus::Pending),
            request(1, 3, RequestStatus::Borrowed),
            request(1, 4, RequestStatus::Returned),
            request(2, 5, RequestStatus::Pending),
        ];
        assert_eq!(reserved_total(1, &requests), 5);
        assert_eq!(reserved_total(2, &requests), 5);
        assert_eq!(reserved_total(3, &requests), 0);
    }
}
