//! # tenure-lifecycle — Student-Product Lifecycle Engine
//!
//! Maintains, per student and product, a chain of effective-dated
//! StudentProduct records and mutates it in response to validated order
//! items.
//!
//! ## Architecture
//!
//! ```text
//! OrderItemData ──▶ dispatch ──▶ lifecycle ──▶ RecordStore (caller's tx)
//!                      │             │
//!                      │             ├── uniqueness
//!                      │             └── version check
//!                      └──────────▶ association
//! ```
//!
//! Every operation takes the caller's transaction as a [`RecordStore`]
//! and performs all of its reads and writes through it. Rows are locked
//! before they are mutated, and every write of an existing row is a
//! compare-and-swap on the version the caller observed, so concurrent
//! writers to the same chain serialize and the loser is told to retry.
//!
//! ## Chain invariants
//!
//! - Dated records of one chain share a root and tile time without gaps or
//!   overlaps, predecessor end + 1 day = successor start.
//! - At most one record per chain has no forward link (the tail).
//! - Versions only increase, by exactly one per write.
//!
//! [`RecordStore`]: tenure_store::RecordStore

pub mod association;
pub mod chain;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod setting;
pub mod uniqueness;
pub mod version;
pub mod void;

pub use association::is_superseded;
pub use chain::StudentProductPage;
pub use config::EngineConfig;
pub use dispatch::parse_order_type;
pub use engine::{LifecycleEngine, Mutation};
pub use error::{ErrorCode, LifecycleError};
pub use lifecycle::Reverted;
pub use setting::{validate_product_setting_for_create, validate_product_setting_for_loa};
pub use version::check_version;
pub use void::Voided;
