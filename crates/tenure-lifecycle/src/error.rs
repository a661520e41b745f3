//! # Lifecycle Errors
//!
//! The taxonomy callers see from every engine operation. Each variant maps
//! to a stable [`ErrorCode`] so a transport layer can pick a status without
//! matching on message text:
//!
//! | Class | Variants | Code |
//! |---|---|---|
//! | Precondition | `FailedPrecondition`, `VoidRejected` | `FailedPrecondition` |
//! | Concurrency | `VersionMismatch`, store `VersionConflict` / `RowLocked` | `Aborted` |
//! | Integrity | `UniquenessConflict` | `InvalidArgument` |
//! | Integrity | `DuplicateAssociation` | `AlreadyExists` |
//! | Capability | `Unsupported`, `Unimplemented` | `Unimplemented` |
//! | Collaborator | `Store` | per store error |

use thiserror::Error;

use tenure_core::{
    CoreError, OrderType, ProductId, StudentId, StudentProductId, StudentProductLabel,
};
use tenure_store::StoreError;

/// Stable classification of a [`LifecycleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The request is valid but the record is not in a state that allows it.
    FailedPrecondition,
    /// A concurrent writer won; re-read and retry.
    Aborted,
    /// The request conflicts with existing data or is malformed.
    InvalidArgument,
    /// The relationship being created already exists.
    AlreadyExists,
    /// Unexpected collaborator failure.
    Internal,
    /// The operation is not supported for this input.
    Unimplemented,
}

impl ErrorCode {
    /// Whether a caller may retry after re-reading current state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Errors raised by lifecycle, association and uniqueness operations.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Missing date, date outside the interval, pending conflicting label,
    /// missing identifier, or an otherwise invalid state for the request.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// The caller observed a stale version of the row.
    #[error(
        "version mismatch on {student_product_id}: stored version is {stored}, request carries {expected}"
    )]
    VersionMismatch {
        /// Row whose version was checked.
        student_product_id: StudentProductId,
        /// Version currently stored.
        stored: u32,
        /// Version the caller presented.
        expected: u32,
    },

    /// A component product is already bundled under the package and the
    /// existing bundle entry is still live.
    #[error(
        "product {product_id} is already associated with {package_student_product_id} via {associated_student_product_id}"
    )]
    DuplicateAssociation {
        /// Component product.
        product_id: ProductId,
        /// Component StudentProduct already associated.
        associated_student_product_id: StudentProductId,
        /// Package StudentProduct.
        package_student_product_id: StudentProductId,
    },

    /// The student already holds a live instance of a unique product.
    #[error("unique product {product_id} conflicts with {existing_student_product_id} for {student_id}: {reason}")]
    UniquenessConflict {
        /// Student placing the order.
        student_id: StudentId,
        /// Unique product ordered.
        product_id: ProductId,
        /// The conflicting existing row.
        existing_student_product_id: StudentProductId,
        /// What made it conflict.
        reason: String,
    },

    /// The operation does not apply to this kind of product.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A void was refused because the chain has moved past the order.
    #[error("cannot void {order_type} order: {student_product_id} is labelled {label}")]
    VoidRejected {
        /// Row the void targeted.
        student_product_id: StudentProductId,
        /// Its current label.
        label: StudentProductLabel,
        /// The order type being voided.
        order_type: OrderType,
    },

    /// An order type string did not name a known order type.
    #[error("unknown order type: {0}")]
    UnknownOrderType(String),

    /// The order type is known but has no lifecycle handling.
    #[error("{0}")]
    Unimplemented(String),

    /// Engine configuration is invalid.
    #[error("invalid engine configuration: {0}")]
    Config(String),

    /// A collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LifecycleError {
    /// The stable classification of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::FailedPrecondition(_) | Self::VoidRejected { .. } => ErrorCode::FailedPrecondition,
            Self::VersionMismatch { .. } => ErrorCode::Aborted,
            Self::DuplicateAssociation { .. } => ErrorCode::AlreadyExists,
            Self::UniquenessConflict { .. } | Self::UnknownOrderType(_) => {
                ErrorCode::InvalidArgument
            }
            Self::Unsupported(_) | Self::Unimplemented(_) => ErrorCode::Unimplemented,
            Self::Config(_) => ErrorCode::Internal,
            Self::Store(err) => match err {
                StoreError::VersionConflict { .. } | StoreError::RowLocked { .. } => {
                    ErrorCode::Aborted
                }
                StoreError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
                StoreError::NotFound { .. }
                | StoreError::TransactionClosed
                | StoreError::Backend(_) => ErrorCode::Internal,
            },
        }
    }

    /// Shorthand for a precondition failure.
    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        Self::FailedPrecondition(msg.into())
    }

    /// Short label for metrics.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::FailedPrecondition(_) => "failed_precondition",
            Self::VersionMismatch { .. } => "version_mismatch",
            Self::DuplicateAssociation { .. } => "duplicate_association",
            Self::UniquenessConflict { .. } => "uniqueness_conflict",
            Self::Unsupported(_) => "unsupported",
            Self::VoidRejected { .. } => "void_rejected",
            Self::UnknownOrderType(_) => "unknown_order_type",
            Self::Unimplemented(_) => "unimplemented",
            Self::Config(_) => "config",
            Self::Store(_) => "store",
        }
    }
}

impl From<CoreError> for LifecycleError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownOrderType(s) => Self::UnknownOrderType(s),
            CoreError::InvalidConfig(s) => Self::Config(s),
            other => Self::FailedPrecondition(other.to_string()),
        }
    }
}
