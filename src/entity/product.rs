//! Product entity
//!
//! Catalog rows with owned stock totals. Available stock is never stored
//! here; it is derived by `crate::stock` from the live request set.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{UnknownLabel, ValidationError};

/// Administrative condition of a catalog item.
///
/// Independent of computed availability: a product can be `Available` here
/// while every unit is out on loan. The wire names are the kebab-case labels
/// stored in the `products.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductStatus {
    Available,
    Lost,
    CheckedOut,
    Disposed,
    UnderAudit,
    InMaintenance,
}

impl ProductStatus {
    /// All statuses, in form-dropdown order.
    pub const ALL: [ProductStatus; 6] = [
        ProductStatus::Available,
        ProductStatus::Lost,
        ProductStatus::CheckedOut,
        ProductStatus::Disposed,
        ProductStatus::UnderAudit,
        ProductStatus::InMaintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Available => "available",
            ProductStatus::Lost => "lost",
            ProductStatus::CheckedOut => "checked-out",
            ProductStatus::Disposed => "disposed",
            ProductStatus::UnderAudit => "under-audit",
            ProductStatus::InMaintenance => "in-maintenance",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownLabel {
                field: "product status",
                value: s.to_string(),
            })
    }
}

/// A catalog row as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Assigned by the store on insert.
    pub id: i32,
    pub name: String,
    /// Total units owned, regardless of how many are out on loan.
    pub total_stock: i32,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a product.
///
/// The catalog merges this into an existing row when the name already
/// exists case-insensitively, so "creation" may end up as an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub total_stock: i32,
    pub status: ProductStatus,
}

impl NewProduct {
    /// Trim whitespace from the name.
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
    }

    /// Reject empty names and non-positive stock before any store call.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "product name is required"));
        }
        if self.total_stock < 1 {
            return Err(ValidationError::new(
                "total_stock",
                "total stock must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Partial update for a product; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub total_stock: Option<i32>,
    pub status: Option<ProductStatus>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.total_stock.is_none() && self.status.is_none()
    }

    /// Trim whitespace from a present name.
    pub fn normalize(&mut self) {
        if let Some(name) = &mut self.name {
            *name = name.trim().to_string();
        }
    }

    /// Same rules as [`NewProduct::validate`], applied only to fields present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ValidationError::new("name", "product name is required"));
            }
        }
        if let Some(total) = self.total_stock {
            if total < 1 {
                return Err(ValidationError::new(
                    "total_stock",
                    "total stock must be at least 1",
                ));
            }
        }
        Ok(())
    }
}
