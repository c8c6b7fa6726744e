//! Domain entities
//!
//! Plain data types for the inventory domain: products, borrow requests,
//! users, and the input/patch types that cross the store boundary. Store
//! rows are mapped into these types at the persistence edge; nothing
//! backend-shaped leaks past `store`.

use std::fmt;

pub mod product;
pub mod request;
pub mod user;

pub use product::{NewProduct, Product, ProductPatch, ProductStatus};
pub use request::{BorrowRequest, NewBorrowRequest, ProductRef, RequestStatus, SchoolClass};
pub use user::{Session, User};

/// A stored label did not match any known enum variant.
///
/// Returned by the `FromStr` impls on [`ProductStatus`], [`RequestStatus`]
/// and [`SchoolClass`] when decoding rows or user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel {
    /// Which field the label belongs to (`"product status"`, `"class"`, ...).
    pub field: &'static str,
    /// The offending value, verbatim.
    pub value: String,
}

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} label: {:?}", self.field, self.value)
    }
}

impl std::error::Error for UnknownLabel {}

/// Input rejected before it reaches the store.
///
/// Raised by the `validate()` methods on [`NewProduct`], [`ProductPatch`]
/// and [`NewBorrowRequest`]; invalid input is never sent upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}
