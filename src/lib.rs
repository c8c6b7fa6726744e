//! # Stockroom
//!
//! Coroutine-native inventory-borrowing tracker for a school department,
//! over PostgreSQL using the `may` runtime.
//!
//! See [README on GitHub](https://github.com/microscaler/stockroom) for full architecture.

pub mod auth;
pub mod catalog;
pub mod collection;
pub mod config;
pub mod connection;
pub mod dashboard;
pub mod entity;
pub mod executor;
pub mod feed;
pub mod migration;
pub mod session;
pub mod stock;
pub mod store;

#[cfg(feature = "metrics")]
pub mod metrics;
#[cfg(feature = "tracing")]
pub mod trace;

pub use connection::{connect, ConnectionError};
pub use dashboard::Dashboard;
pub use executor::{MaySqlExecutor, SqlError, SqlExecutor};
