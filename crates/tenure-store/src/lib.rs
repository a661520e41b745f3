//! # tenure-store — Record Store for the Tenure Billing Engine
//!
//! The lifecycle engine never talks to a database directly. It is written
//! against the repository traits in [`repository`], each method running
//! inside the caller's transaction.
//!
//! [`MemoryStore`] is the in-process adapter: snapshot-isolated
//! transactions, no-wait row locks, compare-and-swap version checks and
//! all-or-nothing commit.

pub mod error;
pub mod memory;
pub mod repository;

pub use error::StoreError;
pub use memory::{MemoryStore, MemoryTransaction};
pub use repository::{
    BillingScheduleStore, CatalogStore, RecordStore, StudentAssociatedProductStore,
    StudentProductStore, Transaction,
};
