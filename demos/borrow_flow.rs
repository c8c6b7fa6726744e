//! Borrow Flow Demo
//!
//! Walks the whole department workflow on the in-memory store: seed the
//! catalog, take a student submission, keep an admin dashboard live through
//! the polling change feed, and process the request through its lifecycle.
//! No database required.
//!
//! Run with:
//! ```bash
//! cargo run --example borrow_flow
//! ```

use std::time::Duration;

use stockroom::catalog::ProductCatalog;
use stockroom::entity::{NewBorrowRequest, NewProduct, ProductStatus, RequestStatus, SchoolClass};
use stockroom::feed::{spawn_poller, FeedHub};
use stockroom::store::{InventoryStore, MemoryStore};
use stockroom::Dashboard;

fn print_availability(
    catalog: &ProductCatalog<MemoryStore>,
    store: &MemoryStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let requests = store.list_borrow_requests()?;
    for stocked in catalog.stocked(&requests) {
        println!(
            "   {:<12} total {:>2}  available {:>2}  [{}]",
            stocked.product.name,
            stocked.product.total_stock,
            stocked.available_stock,
            stocked.display_status()
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let store = MemoryStore::new();

    // Example 1: Seed the catalog; a repeated name merges instead of duplicating.
    println!("Example 1: Seeding the catalog");
    let mut catalog = ProductCatalog::new(store.clone());
    for (name, total_stock) in [("Laptop", 5), ("Projector", 2), ("Laptop", 3)] {
        let product = catalog.create(NewProduct {
            name: name.to_string(),
            total_stock,
            status: ProductStatus::Available,
        })?;
        println!(
            "   + {} -> id={} total_stock={}",
            name, product.id, product.total_stock
        );
    }
    print_availability(&catalog, &store)?;
    println!();

    // Example 2: Start the change feed and an admin dashboard on it.
    println!("Example 2: Starting the live feed");
    let hub = FeedHub::default();
    let mut dashboard = Dashboard::with_feed(store.clone(), hub.subscribe());
    dashboard.load()?;
    let poller = spawn_poller(store.clone(), hub.clone(), Duration::from_millis(100));
    std::thread::sleep(Duration::from_millis(300));
    println!("   feed poller running, {} subscriber", hub.subscriber_count());
    println!();

    // Example 3: A student submits the borrow form (its own dashboard; the
    // public form shares no state with the admin view).
    println!("Example 3: Student submission");
    let laptop = catalog
        .products()
        .iter()
        .find(|p| p.name == "Laptop")
        .ok_or("laptop missing from catalog")?
        .clone();
    let mut form = Dashboard::new(store.clone());
    let submitted = form.submit_request(NewBorrowRequest {
        product_id: laptop.id,
        total: 3,
        requester_name: "Siti Rahma".to_string(),
        class: SchoolClass::XiTkj1,
        comment: Some("praktikum jaringan".to_string()),
    })?;
    println!(
        "   request id={} for {} x{} ({})",
        submitted.id, laptop.name, submitted.total, submitted.status
    );

    // The admin dashboard picks it up from the feed, no reload.
    std::thread::sleep(Duration::from_millis(300));
    let applied = dashboard.pump_events();
    println!("   admin dashboard absorbed {applied} feed event(s)");
    let (shown, total) = dashboard.counts();
    println!("   admin table now shows {shown} of {total} requests");
    print_availability(&catalog, &store)?;
    println!();

    // Example 4: The admin hands the laptops out, then takes them back.
    println!("Example 4: Processing the request");
    if dashboard.open_edit(submitted.id) {
        for next in [RequestStatus::Borrowed, RequestStatus::Returned] {
            dashboard.change_status(next);
            if let Some(committed) = dashboard.apply_changes()? {
                println!("   -> {}", committed.status);
            }
        }
        dashboard.close_edit();
    }
    print_availability(&catalog, &store)?;
    println!();

    // Example 5: A row deleted behind the application's back disappears from
    // the dashboard on the next pump.
    println!("Example 5: Out-of-band cleanup");
    store.delete_borrow_request(submitted.id);
    std::thread::sleep(Duration::from_millis(300));
    dashboard.pump_events();
    let (shown, total) = dashboard.counts();
    println!("   admin table now shows {shown} of {total} requests");

    poller.stop();
    println!("\nDone.");
    Ok(())
}
