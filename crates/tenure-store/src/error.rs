//! # Store Errors

use thiserror::Error;

use tenure_core::StudentProductId;

/// Errors raised by a record store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No row with the given key exists.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of record looked up.
        kind: &'static str,
        /// Key that was looked up.
        id: String,
    },

    /// A row with the given key already exists.
    #[error("{kind} already exists: {id}")]
    AlreadyExists {
        /// Kind of record inserted.
        kind: &'static str,
        /// Duplicate key.
        id: String,
    },

    /// Compare-and-swap failed: the stored version moved.
    #[error("version conflict on {id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Row that failed the check.
        id: StudentProductId,
        /// Version the writer presented.
        expected: u32,
        /// Version actually stored.
        actual: u32,
    },

    /// The row is locked by another open transaction.
    #[error("{id} is locked by another transaction")]
    RowLocked {
        /// The locked row.
        id: StudentProductId,
    },

    /// The transaction was already committed or rolled back.
    #[error("transaction is closed")]
    TransactionClosed,

    /// Backend failure (connection, I/O).
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Shorthand for a missing student product.
    pub fn student_product_not_found(id: StudentProductId) -> Self {
        Self::NotFound {
            kind: "student product",
            id: id.to_string(),
        }
    }
}
