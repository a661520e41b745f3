//! # Version Guard
//!
//! Every write to an existing StudentProduct is preceded by this check and
//! then issued as a compare-and-swap with the same expected version. The
//! guard fails fast with a typed error; the store's CAS catches anything
//! that moved between the read and the write.

use tenure_core::StudentProduct;

use crate::error::LifecycleError;

/// Compare the stored version of `stored` against the version the caller observed.
pub fn check_version(stored: &StudentProduct, expected: u32) -> Result<(), LifecycleError> {
    if stored.version_number != expected {
        return Err(LifecycleError::VersionMismatch {
            student_product_id: stored.student_product_id,
            stored: stored.version_number,
            expected,
        });
    }
    Ok(())
}
