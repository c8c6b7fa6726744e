//! Dashboard Server Demo
//!
//! Serves the dashboard's read side over HTTP with may_minihttp: derived
//! product availability, the borrow-request table, and (with the default
//! `metrics` feature) a Prometheus scrape endpoint. Data lives in the
//! in-memory store, seeded at startup.
//!
//! Run with:
//! ```bash
//! cargo run --example dashboard_server
//! curl localhost:8080/products
//! curl localhost:8080/requests
//! curl localhost:8080/metrics
//! ```

use std::io;

use may_minihttp::{HttpServer, HttpService, Request, Response};

use stockroom::catalog::ProductCatalog;
use stockroom::entity::{NewBorrowRequest, NewProduct, ProductStatus, RequestStatus, SchoolClass};
use stockroom::stock;
use stockroom::store::{InventoryStore, MemoryStore, StoreError};
use stockroom::Dashboard;

#[derive(Clone)]
struct DashboardService {
    store: MemoryStore,
}

impl DashboardService {
    /// Products annotated with availability, derived per request so the
    /// numbers can never go stale.
    fn products_json(&self) -> io::Result<Vec<u8>> {
        let products = self.store.list_products().map_err(to_io)?;
        let requests = self.store.list_borrow_requests().map_err(to_io)?;
        serde_json::to_vec(&stock::reconcile(&products, &requests)).map_err(io::Error::from)
    }

    fn requests_json(&self) -> io::Result<Vec<u8>> {
        let requests = self.store.list_borrow_requests().map_err(to_io)?;
        serde_json::to_vec(&requests).map_err(io::Error::from)
    }
}

fn to_io(err: StoreError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

impl HttpService for DashboardService {
    fn call(&mut self, req: Request, rsp: &mut Response) -> io::Result<()> {
        match req.path() {
            "/products" => {
                rsp.header("Content-Type: application/json");
                rsp.body_vec(self.products_json()?);
            }
            "/requests" => {
                rsp.header("Content-Type: application/json");
                rsp.body_vec(self.requests_json()?);
            }
            "/healthz" => {
                rsp.header("Content-Type: text/plain");
                rsp.body("ok");
            }
            #[cfg(feature = "metrics")]
            "/metrics" => {
                rsp.header("Content-Type: text/plain; charset=utf-8");
                rsp.body_vec(stockroom::metrics::METRICS.scrape().into_bytes());
            }
            _ => {
                rsp.status_code(404, "Not Found");
            }
        }
        Ok(())
    }
}

/// A catalog plus two requests, one already handed out, so every endpoint
/// has something to show.
fn seed_demo_data(store: &MemoryStore) -> Result<(), StoreError> {
    let mut catalog = ProductCatalog::new(store.clone());
    let laptop = catalog.create(NewProduct {
        name: "Laptop".to_string(),
        total_stock: 5,
        status: ProductStatus::Available,
    })?;
    let projector = catalog.create(NewProduct {
        name: "Projector".to_string(),
        total_stock: 2,
        status: ProductStatus::Available,
    })?;
    catalog.create(NewProduct {
        name: "HDMI Cable".to_string(),
        total_stock: 10,
        status: ProductStatus::Available,
    })?;

    let mut dashboard = Dashboard::new(store.clone());
    dashboard.submit_request(NewBorrowRequest {
        product_id: laptop.id,
        total: 2,
        requester_name: "Budi Santoso".to_string(),
        class: SchoolClass::XTkj1,
        comment: None,
    })?;
    let second = dashboard.submit_request(NewBorrowRequest {
        product_id: projector.id,
        total: 1,
        requester_name: "Siti Rahma".to_string(),
        class: SchoolClass::XiTkj2,
        comment: Some("rapat OSIS".to_string()),
    })?;

    if dashboard.open_edit(second.id) {
        dashboard.change_status(RequestStatus::Borrowed);
        dashboard.apply_changes()?;
        dashboard.close_edit();
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let store = MemoryStore::new();
    seed_demo_data(&store)?;

    let addr = std::env::var("HOST_PORT").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    println!("Dashboard server running at http://{addr}");
    println!("   GET /products   derived availability per product");
    println!("   GET /requests   the borrow-request table");
    println!("   GET /healthz    liveness probe");
    #[cfg(feature = "metrics")]
    println!("   GET /metrics    Prometheus scrape");

    let server = HttpServer(DashboardService { store }).start(&addr)?;
    server
        .join()
        .map_err(|e| format!("server error: {e:?}"))?;
    Ok(())
}
