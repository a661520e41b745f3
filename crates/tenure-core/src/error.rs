//! # Core Error Type
//!
//! Failures that originate in the domain primitives themselves: parsing a
//! wire string into a closed enum, or building a value from configuration.
//! Storage and lifecycle errors live in their own crates and wrap this one.

use thiserror::Error;

/// Errors raised while constructing or parsing core domain values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An order type string did not name a known order type.
    #[error("unknown order type: {0}")]
    UnknownOrderType(String),

    /// A label string did not name a known student-product label.
    #[error("invalid student product label: {0}")]
    UnknownLabel(String),

    /// A status string did not name a known student-product status.
    #[error("invalid student product status: {0}")]
    UnknownStatus(String),

    /// A product type string did not name a known product type.
    #[error("invalid product type: {0}")]
    UnknownProductType(String),

    /// Configuration value out of range or malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
