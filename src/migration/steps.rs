//! Built-in schema migrations
//!
//! The whole schema in three steps: the product catalog, the borrow
//! request ledger, and the auth tables. `borrow_requests.product_id`
//! deliberately carries no foreign key: deleting a product must orphan
//! its requests, not cascade into them.

use super::migration::Migration;

/// All migrations compiled into this build, unsorted.
pub fn builtin() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(CreateProducts),
        Box::new(CreateBorrowRequests),
        Box::new(CreateAuthTables),
    ]
}

/// Migration: Create Products
/// Version: 20250601090000
pub struct CreateProducts;

impl Migration for CreateProducts {
    fn name(&self) -> &str {
        "create_products"
    }

    fn version(&self) -> i64 {
        20250601090000
    }

    fn up_statements(&self) -> &[&str] {
        &[
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id SERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                total_stock INTEGER NOT NULL CHECK (total_stock >= 0),
                status VARCHAR(32) NOT NULL DEFAULT 'available',
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            // The duplicate-merge lookup matches case-insensitively.
            "CREATE INDEX IF NOT EXISTS idx_products_lower_name ON products (LOWER(name))",
        ]
    }

    fn down_statements(&self) -> &[&str] {
        &["DROP TABLE IF EXISTS products"]
    }
}

/// Migration: Create Borrow Requests
/// Version: 20250601090500
pub struct CreateBorrowRequests;

impl Migration for CreateBorrowRequests {
    fn name(&self) -> &str {
        "create_borrow_requests"
    }

    fn version(&self) -> i64 {
        20250601090500
    }

    fn up_statements(&self) -> &[&str] {
        &[
            r#"
            CREATE TABLE IF NOT EXISTS borrow_requests (
                id BIGSERIAL PRIMARY KEY,
                product_id INTEGER NOT NULL,
                total INTEGER NOT NULL CHECK (total >= 1),
                requester_name VARCHAR(255) NOT NULL,
                class VARCHAR(32) NOT NULL,
                comment TEXT,
                status VARCHAR(16) NOT NULL DEFAULT 'pending',
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_borrow_requests_product_id ON borrow_requests(product_id)",
            // The change feed scans by watermark.
            "CREATE INDEX IF NOT EXISTS idx_borrow_requests_updated_at ON borrow_requests(updated_at)",
            "CREATE INDEX IF NOT EXISTS idx_borrow_requests_status ON borrow_requests(status)",
        ]
    }

    fn down_statements(&self) -> &[&str] {
        &["DROP TABLE IF EXISTS borrow_requests"]
    }
}

/// Migration: Create Auth Tables
/// Version: 20250615104500
pub struct CreateAuthTables;

impl Migration for CreateAuthTables {
    fn name(&self) -> &str {
        "create_auth_tables"
    }

    fn version(&self) -> i64 {
        20250615104500
    }

    fn up_statements(&self) -> &[&str] {
        &[
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id)",
        ]
    }

    fn down_statements(&self) -> &[&str] {
        &["DROP TABLE IF EXISTS sessions", "DROP TABLE IF EXISTS users"]
    }
}
