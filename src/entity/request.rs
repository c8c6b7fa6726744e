//! Borrow request entity
//!
//! One row per borrow form submission. The `product_id` reference is weak:
//! deleting a product leaves its requests behind with a dangling id, and the
//! joined `product` projection becomes `None` for them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{UnknownLabel, ValidationError};

/// Lifecycle status of a borrow request.
///
/// Created as `Pending`; administrators may move it to any other status.
/// Only `Pending` and `Borrowed` reserve stock against the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Borrowed,
    Returned,
    Rejected,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::Pending,
        RequestStatus::Borrowed,
        RequestStatus::Returned,
        RequestStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Borrowed => "borrowed",
            RequestStatus::Returned => "returned",
            RequestStatus::Rejected => "rejected",
        }
    }

    /// Whether a request in this status counts against available stock.
    pub fn reserves_stock(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Borrowed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownLabel {
                field: "request status",
                value: s.to_string(),
            })
    }
}

/// Fixed roster of classes that may borrow equipment.
///
/// TKJ is the school's computer & network engineering program; grades X-XII
/// each run two parallel classes. Labels are stored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchoolClass {
    #[serde(rename = "X TKJ 1")]
    XTkj1,
    #[serde(rename = "X TKJ 2")]
    XTkj2,
    #[serde(rename = "XI TKJ 1")]
    XiTkj1,
    #[serde(rename = "XI TKJ 2")]
    XiTkj2,
    #[serde(rename = "XII TKJ 1")]
    XiiTkj1,
    #[serde(rename = "XII TKJ 2")]
    XiiTkj2,
}

impl SchoolClass {
    /// All classes, in form-dropdown order.
    pub const ALL: [SchoolClass; 6] = [
        SchoolClass::XTkj1,
        SchoolClass::XTkj2,
        SchoolClass::XiTkj1,
        SchoolClass::XiTkj2,
        SchoolClass::XiiTkj1,
        SchoolClass::XiiTkj2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchoolClass::XTkj1 => "X TKJ 1",
            SchoolClass::XTkj2 => "X TKJ 2",
            SchoolClass::XiTkj1 => "XI TKJ 1",
            SchoolClass::XiTkj2 => "XI TKJ 2",
            SchoolClass::XiiTkj1 => "XII TKJ 1",
            SchoolClass::XiiTkj2 => "XII TKJ 2",
        }
    }
}

impl fmt::Display for SchoolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchoolClass {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| UnknownLabel {
                field: "class",
                value: s.to_string(),
            })
    }
}

/// Product fields joined onto a request by the store's list query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: i32,
    pub name: String,
    pub total_stock: i32,
}

/// A borrow request as persisted, with the joined product projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowRequest {
    /// Assigned by the store on insert.
    pub id: i64,
    /// Weak reference; kept even after the product is deleted.
    pub product_id: i32,
    /// Joined projection; `None` when `product_id` dangles.
    pub product: Option<ProductRef>,
    /// Quantity requested.
    pub total: i32,
    pub requester_name: String,
    pub class: SchoolClass,
    pub comment: Option<String>,
    pub status: RequestStatus,
    /// Set at insert, immutable afterwards.
    pub created_at: DateTime<Utc>,
    /// Set at insert, overwritten on every status change.
    pub updated_at: DateTime<Utc>,
}

impl BorrowRequest {
    /// Name of the referenced product, or empty when the reference dangles.
    /// Used for search and sort so orphaned rows stay visible.
    pub fn product_name(&self) -> &str {
        self.product.as_ref().map(|p| p.name.as_str()).unwrap_or("")
    }
}

/// Input for a borrow form submission. Status is not accepted here:
/// every request starts out `Pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBorrowRequest {
    pub product_id: i32,
    pub total: i32,
    pub requester_name: String,
    pub class: SchoolClass,
    pub comment: Option<String>,
}

impl NewBorrowRequest {
    /// Trim whitespace; an emptied comment becomes `None`.
    pub fn normalize(&mut self) {
        self.requester_name = self.requester_name.trim().to_string();
        self.comment = self
            .comment
            .take()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
    }

    /// Form rules, checked before the store is touched.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.product_id < 1 {
            return Err(ValidationError::new("product_id", "select a product"));
        }
        if self.total < 1 {
            return Err(ValidationError::new(
                "total",
                "quantity must be at least 1",
            ));
        }
        if self.requester_name.trim().is_empty() {
            return Err(ValidationError::new("requester_name", "name is required"));
        }
        Ok(())
    }
}
