//! Seed Catalog Demo
//!
//! Loads products from a CSV file into the catalog, demonstrating the
//! dedup-merge rule: repeating a name (case-insensitively) tops up the
//! existing row's stock instead of creating a duplicate. With DATABASE_URL
//! set the rows go to PostgreSQL (migrations run first); otherwise to the
//! in-memory store.
//!
//! CSV columns: `name,total_stock,status` (status may be empty).
//!
//! Run with:
//! ```bash
//! cargo run --example seed_catalog -- inventory.csv
//! ```
//! or without an argument to use the built-in sample.

use std::sync::Arc;

use serde::Deserialize;

use stockroom::catalog::ProductCatalog;
use stockroom::entity::{NewProduct, ProductStatus};
use stockroom::migration;
use stockroom::store::{InventoryStore, MemoryStore, PostgresStore};
use stockroom::{connect, MaySqlExecutor};

const SAMPLE_CSV: &str = "\
name,total_stock,status
Laptop,5,available
Projector,2,available
HDMI Cable,10,
laptop,3,
Crimping Tool,6,in-maintenance
";

#[derive(Debug, Deserialize)]
struct CsvRow {
    name: String,
    total_stock: i32,
    #[serde(default)]
    status: Option<String>,
}

impl CsvRow {
    fn into_new_product(self) -> Result<NewProduct, Box<dyn std::error::Error>> {
        let status = match self.status.as_deref().map(str::trim) {
            Some("") | None => ProductStatus::Available,
            Some(label) => label.parse()?,
        };
        Ok(NewProduct {
            name: self.name,
            total_stock: self.total_stock,
            status,
        })
    }
}

fn seed<S: InventoryStore>(store: S, data: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut catalog = ProductCatalog::new(store);
    catalog.load()?;
    let before = catalog.products().len();

    let mut reader = csv::Reader::from_reader(data.as_bytes());
    for record in reader.deserialize() {
        let row: CsvRow = record?;
        let name = row.name.clone();
        match catalog.create(row.into_new_product()?) {
            Ok(product) => println!(
                "   {} -> id={} total_stock={}",
                name, product.id, product.total_stock
            ),
            Err(e) => println!("   {name} skipped: {e}"),
        }
    }

    println!(
        "\n{} products before the run, {} after:",
        before,
        catalog.products().len()
    );
    for product in catalog.products() {
        println!(
            "   {:<16} {:>3} [{}]",
            product.name, product.total_stock, product.status
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let data = match std::env::args().nth(1) {
        Some(path) => {
            println!("Seeding from {path}");
            std::fs::read_to_string(path)?
        }
        None => {
            println!("Seeding from the built-in sample (pass a CSV path to use your own)");
            SAMPLE_CSV.to_string()
        }
    };

    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            println!("DATABASE_URL set; seeding PostgreSQL\n");
            let client = connect(&url)?;
            let executor = Arc::new(MaySqlExecutor::new(client));
            let applied = migration::ensure_schema(executor.as_ref())?;
            if applied > 0 {
                println!("   applied {applied} migration(s)");
            }
            seed(PostgresStore::new(executor), &data)
        }
        Err(_) => {
            println!("DATABASE_URL not set; seeding the in-memory store\n");
            seed(MemoryStore::new(), &data)
        }
    }
}
