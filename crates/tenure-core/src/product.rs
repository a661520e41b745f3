//! # Product Catalog Types
//!
//! Read-only metadata supplied by the catalog and billing-schedule
//! collaborators. The lifecycle engine never writes these.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::identity::{BillingScheduleId, ProductId};

/// Kind of product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    /// A bundle of component products.
    Package,
    /// Physical or digital material.
    Material,
    /// A fee.
    Fee,
}

impl ProductType {
    /// Wire name of the product type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Package => "PRODUCT_TYPE_PACKAGE",
            Self::Material => "PRODUCT_TYPE_MATERIAL",
            Self::Fee => "PRODUCT_TYPE_FEE",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRODUCT_TYPE_PACKAGE" => Ok(Self::Package),
            "PRODUCT_TYPE_MATERIAL" => Ok(Self::Material),
            "PRODUCT_TYPE_FEE" => Ok(Self::Fee),
            other => Err(CoreError::UnknownProductType(other.to_string())),
        }
    }
}

/// Catalog entry for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier.
    pub product_id: ProductId,
    /// Kind of product.
    pub product_type: ProductType,
    /// Billing schedule for recurring products; `None` for one-time products.
    #[serde(default)]
    pub billing_schedule_id: Option<BillingScheduleId>,
    /// At most one live StudentProduct per student.
    #[serde(default)]
    pub is_unique: bool,
    /// End dates snap to billing-period boundaries instead of pro-rating.
    #[serde(default)]
    pub disable_pro_rating: bool,
}

impl Product {
    /// Whether the product is billed once rather than per period.
    pub fn is_one_time(&self) -> bool {
        self.billing_schedule_id.is_none()
    }
}

/// Fixed validity window of a one-time package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// The package's product identifier.
    pub package_id: ProductId,
    /// First day the package is valid.
    pub package_start_date: NaiveDate,
    /// Last day the package is valid.
    pub package_end_date: NaiveDate,
}

/// One period of a billing schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingSchedulePeriod {
    /// Period identifier.
    pub billing_schedule_period_id: String,
    /// Owning schedule.
    pub billing_schedule_id: BillingScheduleId,
    /// First day of the period.
    pub start_date: NaiveDate,
    /// Last day of the period.
    pub end_date: NaiveDate,
}

/// Ordering rules attached to a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSetting {
    /// Requires the student to be enrolled at the order's location.
    #[serde(default)]
    pub is_enrollment_required: Option<bool>,
    /// Permits leave-of-absence orders.
    #[serde(default)]
    pub is_pausable: Option<bool>,
}
