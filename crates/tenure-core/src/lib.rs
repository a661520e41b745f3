//! # tenure-core — Foundational Types for the Tenure Billing Engine
//!
//! Leaf crate of the workspace. Defines the entity model the lifecycle
//! engine mutates and the primitives every other crate agrees on.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `StudentProductId`, `StudentId`, `ProductId`,
//!    `LocationId`, `BillingScheduleId`. No bare strings cross crate
//!    boundaries.
//!
//! 2. **Chains are rows, not pointers.** StudentProduct segments link to
//!    each other by identifier and share a root key, so chains can be
//!    loaded, locked and queried one row at a time.
//!
//! 3. **One day-boundary policy.** Dates are calendar days in a single
//!    operational timezone, produced only by [`BusinessCalendar`].
//!
//! 4. **Closed enums with wire names.** Labels, statuses and order types
//!    parse from and render to their wire strings; unknown strings are
//!    rejected.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tenure-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod order;
pub mod product;
pub mod student_product;
pub mod temporal;

pub use error::CoreError;
pub use identity::{BillingScheduleId, LocationId, ProductId, StudentId, StudentProductId};
pub use order::{OrderItemAction, OrderItemData, OrderType, ProductAssociation};
pub use product::{BillingSchedulePeriod, Package, Product, ProductSetting, ProductType};
pub use student_product::{
    ProductStatus, StudentAssociatedProduct, StudentProduct, StudentProductLabel,
};
pub use temporal::{day_after, day_before, BusinessCalendar, Clock, FixedClock, SystemClock};
