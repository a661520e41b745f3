//! # Order Types and Order-Item Payloads
//!
//! The order layer validates each line item and hands the lifecycle engine
//! an [`OrderItemData`]. Which lifecycle operation runs is decided by a
//! closed match over [`OrderType`] and the item's cancel flag; see
//! [`OrderType::action`].

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::identity::{LocationId, ProductId, StudentId, StudentProductId};
use crate::product::{Product, ProductSetting};
use crate::student_product::StudentProduct;

// ─── Order Type ─────────────────────────────────────────────────────

/// The type of an order, as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OrderType {
    /// First purchase of a product.
    New,
    /// Purchase made as part of enrolling the student.
    Enrollment,
    /// Change (or cancellation) of an existing product.
    Update,
    /// Student withdraws.
    Withdrawal,
    /// Student graduates.
    Graduate,
    /// Leave of absence.
    Loa,
    /// Return from a leave of absence.
    Resume,
    /// Manually priced billing with no product lifecycle.
    CustomBilling,
}

impl OrderType {
    /// All order types, in declaration order.
    pub const ALL: [OrderType; 8] = [
        Self::New,
        Self::Enrollment,
        Self::Update,
        Self::Withdrawal,
        Self::Graduate,
        Self::Loa,
        Self::Resume,
        Self::CustomBilling,
    ];

    /// Wire name of the order type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "ORDER_TYPE_NEW",
            Self::Enrollment => "ORDER_TYPE_ENROLLMENT",
            Self::Update => "ORDER_TYPE_UPDATE",
            Self::Withdrawal => "ORDER_TYPE_WITHDRAWAL",
            Self::Graduate => "ORDER_TYPE_GRADUATE",
            Self::Loa => "ORDER_TYPE_LOA",
            Self::Resume => "ORDER_TYPE_RESUME",
            Self::CustomBilling => "ORDER_TYPE_CUSTOM_BILLING",
        }
    }

    /// The lifecycle action for an item of this order type.
    ///
    /// An UPDATE item flagged as a cancellation becomes [`OrderItemAction::Cancel`].
    /// Custom billing has no lifecycle action.
    pub fn action(&self, is_cancel: bool) -> Option<OrderItemAction> {
        match self {
            Self::New => Some(OrderItemAction::Create),
            Self::Enrollment => Some(OrderItemAction::Enroll),
            Self::Update if is_cancel => Some(OrderItemAction::Cancel),
            Self::Update => Some(OrderItemAction::Update),
            Self::Withdrawal => Some(OrderItemAction::Withdraw),
            Self::Graduate => Some(OrderItemAction::Graduate),
            Self::Loa => Some(OrderItemAction::Pause),
            Self::Resume => Some(OrderItemAction::Resume),
            Self::CustomBilling => None,
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownOrderType(s.to_string()))
    }
}

impl TryFrom<String> for OrderType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderType> for String {
    fn from(value: OrderType) -> Self {
        value.as_str().to_string()
    }
}

/// The lifecycle operation an order item maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderItemAction {
    /// Create a new StudentProduct.
    Create,
    /// Create a new StudentProduct as part of enrollment.
    Enroll,
    /// Split the current interval at the effective date.
    Update,
    /// Cancel from the effective date.
    Cancel,
    /// Schedule a withdrawal.
    Withdraw,
    /// Schedule a graduation.
    Graduate,
    /// Schedule a leave of absence.
    Pause,
    /// Resume from a leave of absence.
    Resume,
}

impl OrderItemAction {
    /// Whether the action creates a fresh StudentProduct row.
    pub fn creates_student_product(&self) -> bool {
        matches!(self, Self::Create | Self::Enroll | Self::Resume)
    }
}

// ─── Order Item Data ────────────────────────────────────────────────

/// A validated order line item, as consumed by the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemData {
    /// The order's type.
    pub order_type: OrderType,
    /// The item is a cancellation bill item.
    #[serde(default)]
    pub is_cancel: bool,
    /// Student the order is for.
    pub student_id: StudentId,
    /// Location the order was placed at.
    pub location_id: LocationId,
    /// Resolved product metadata.
    pub product: Product,
    /// Ordering rules for the product.
    #[serde(default)]
    pub product_setting: ProductSetting,
    /// Whether the student is enrolled at the order's location.
    #[serde(default)]
    pub is_enrolled_in_location: bool,
    /// Existing StudentProduct targeted by update-like orders.
    #[serde(default)]
    pub student_product_id: Option<StudentProductId>,
    /// Version of that StudentProduct the client last observed.
    #[serde(default)]
    pub student_product_version: u32,
    /// Declared start date (new orders, LOA start).
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Date a scheduled change takes effect.
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
    /// Declared end date (LOA end).
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Present when the order cancels the product.
    #[serde(default)]
    pub cancellation_date: Option<NaiveDate>,
    /// Package this item is bundled under, when ordered with its package.
    #[serde(default)]
    pub package_associated_id: Option<ProductId>,
    /// Existing package StudentProduct this item is added to.
    #[serde(default)]
    pub associated_student_product_id: Option<StudentProductId>,
    /// The StudentProduct produced for this item by the lifecycle engine.
    #[serde(default)]
    pub student_product: Option<StudentProduct>,
    /// The predecessor row rewritten by a split, when one occurred.
    #[serde(default)]
    pub root_student_product: Option<StudentProduct>,
}

impl OrderItemData {
    /// The lifecycle action for this item.
    pub fn action(&self) -> Option<OrderItemAction> {
        self.order_type.action(self.is_cancel)
    }

    /// Whether the product is billed once.
    pub fn is_one_time_product(&self) -> bool {
        self.product.is_one_time()
    }

    /// Whether the item is a bundled component.
    pub fn is_associated(&self) -> bool {
        self.package_associated_id.is_some() || self.associated_student_product_id.is_some()
    }
}

/// A package ↔ component pairing declared on an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductAssociation {
    /// The package product.
    pub package_id: ProductId,
    /// The component product bundled under it.
    pub product_id: ProductId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_type_parse_roundtrip() {
        for t in OrderType::ALL {
            assert_eq!(t.as_str().parse::<OrderType>().unwrap(), t);
        }
    }

    #[test]
    fn test_unknown_order_type_rejected() {
        let err = "ORDER_TYPE_REFUND".parse::<OrderType>().unwrap_err();
        assert_eq!(err, CoreError::UnknownOrderType("ORDER_TYPE_REFUND".into()));
    }

    #[test]
    fn test_update_with_cancel_flag_is_cancel() {
        assert_eq!(OrderType::Update.action(true), Some(OrderItemAction::Cancel));
        assert_eq!(OrderType::Update.action(false), Some(OrderItemAction::Update));
        assert_eq!(OrderType::New.action(true), Some(OrderItemAction::Create));
    }

    #[test]
    fn test_custom_billing_has_no_action() {
        assert_eq!(OrderType::CustomBilling.action(false), None);
    }

    #[test]
    fn test_order_type_serde_uses_wire_name() {
        let json = serde_json::to_string(&OrderType::Loa).unwrap();
        assert_eq!(json, "\"ORDER_TYPE_LOA\"");
        assert!(serde_json::from_str::<OrderType>("\"ORDER_TYPE_X\"").is_err());
    }
}
